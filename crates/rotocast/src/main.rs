// rotocast entry point.
//
// Startup sequence:
// 1. Parse command-line flags
// 2. Initialize tracing (stderr, so stdout carries only the analysis)
// 3. Load config and apply flag overrides
// 4. Run the analysis and print it

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rotocast::app::{self, RunOptions};
use rotocast::cli::Cli;
use rotocast::config;

fn main() -> anyhow::Result<()> {
    // 1. Parse flags
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!("rotocast starting up");

    // 3. Load config
    let mut config =
        config::load_config(&cli.config_dir).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config::validate(&config).context("invalid command-line override")?;
    info!(
        "Config loaded: league={}, snapshot={}",
        config.league.name,
        config.snapshot_path().display()
    );

    // 4. Run
    let options = RunOptions {
        find_trades: !cli.no_trades,
        export: cli.export,
        show_rosters: cli.rosters,
        show_partners: cli.partners,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app::run(&config, options, &mut out)?;
    out.flush()?;

    info!("rotocast finished");
    Ok(())
}

/// Initialize tracing to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rotocast=info,rotocast_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
