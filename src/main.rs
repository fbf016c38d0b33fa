//! GRIDSPLIT harness.
//!
//! Entry point. Loads configuration, initialises structured logging and
//! either plans the current round once (`plan`) or watches the feed and
//! plans each round as its deadline window opens (`watch`). Every plan is
//! printed to stdout as one JSON line for the submission layer.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use gridsplit::config::AppConfig;
use gridsplit::engine::RoundWatcher;
use gridsplit::feed::{JsonFileSource, SnapshotSource};
use gridsplit::strategy::{self, PlanReport};

const USAGE: &str = "usage: gridsplit [plan|watch] [config.toml]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plan,
    Watch,
}

/// One line of stdout output.
#[derive(Serialize)]
struct Emitted<'a> {
    emitted_at: DateTime<Utc>,
    report: &'a PlanReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let mut args = std::env::args().skip(1);
    let mode = match args.next().as_deref() {
        None | Some("plan") => Mode::Plan,
        Some("watch") => Mode::Watch,
        Some(other) => bail!("unknown mode '{other}'\n{USAGE}"),
    };
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());

    let cfg = AppConfig::load(&config_path)?;
    init_logging();

    let params = cfg.strategy_params();
    info!(
        agent_name = %cfg.agent.name,
        mode = ?mode,
        snapshot_path = %cfg.feed.snapshot_path,
        params = %params,
        "GRIDSPLIT starting up"
    );

    let source = JsonFileSource::new(&cfg.feed.snapshot_path, cfg.protocol_constants());
    match mode {
        Mode::Plan => {
            let snapshot = source.fetch().await?;
            let report = strategy::plan_with_report(&snapshot, &params)?;
            emit(&report)?;
        }
        Mode::Watch => watch(RoundWatcher::new(source, params), cfg.agent.poll_interval_ms).await?,
    }

    Ok(())
}

/// Poll until Ctrl+C, emitting a report whenever a round is planned.
async fn watch<S: SnapshotSource>(mut watcher: RoundWatcher<S>, poll_interval_ms: u64) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_millis(poll_interval_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(poll_interval_ms, "Watching round feed. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match watcher.poll().await {
                    Ok(Some(report)) => emit(&report)?,
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "Poll failed, continuing"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(last_round = ?watcher.round_id(), "GRIDSPLIT shut down cleanly.");
    Ok(())
}

fn emit(report: &PlanReport) -> Result<()> {
    let line = serde_json::to_string(&Emitted {
        emitted_at: Utc::now(),
        report,
    })?;
    println!("{line}");
    Ok(())
}

/// Initialise the `tracing` subscriber. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridsplit=info"));

    let json_logging = std::env::var("GRIDSPLIT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
