//! trellis-replay: run a scripted AR session headlessly.
//!
//! Reads layer catalogs from a directory, replays a scenario of timed
//! sensor and UI steps against the lifecycle controller, and prints every
//! sink command as one JSON line on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use trellis_catalog::JsonCatalogSource;
use trellis_lifecycle::ControllerSettings;

mod producer;
mod replay;
mod scenario;

use replay::Replay;
use scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "trellis-replay",
    about = "Replay a scripted AR session through the trellis lifecycle controller",
    version
)]
struct Cli {
    /// Directory holding one `<layer>.json` definition per layer
    #[arg(short, long, env = "TRELLIS_CATALOG")]
    catalog: PathBuf,

    /// Scenario file with the timed steps to replay
    #[arg(short, long)]
    scenario: PathBuf,

    /// Controller settings (JSON); defaults apply when omitted
    #[arg(long, env = "TRELLIS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Simulated frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info,trellis=debug" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.settings {
        Some(path) => ControllerSettings::load(path)?,
        None => ControllerSettings::default(),
    };
    let scenario = Scenario::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    anyhow::ensure!(cli.tick_ms > 0, "--tick-ms must be positive");

    tracing::info!(
        catalog = %cli.catalog.display(),
        scenario = %cli.scenario.display(),
        steps = scenario.steps.len(),
        tick_ms = cli.tick_ms,
        "Starting replay"
    );

    let source = JsonCatalogSource::new(&cli.catalog);
    let mut replay = Replay::new(settings, Box::new(source), &scenario, Duration::from_millis(cli.tick_ms))?;

    let stdout = std::io::stdout();
    let summary = replay.run(&scenario, &mut stdout.lock())?;

    tracing::info!(
        ticks = summary.ticks,
        placements = summary.placements,
        errors = summary.errors,
        menu_requests = summary.menu_requests,
        "Replay finished"
    );
    Ok(())
}
