use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use clickpilot::clicker::{ClickConfig, ClickMode, ClickPosition, ClickType, ClickerEngine};
use clickpilot::executor::AutomationEngine;
use clickpilot::script;

/// Clickpilot CLI
#[derive(Debug, Parser)]
#[command(
    name = clickpilot::PKG_NAME,
    version = clickpilot::PKG_VERSION,
    about = "Scheduled auto-clicking and desktop automation script playback"
)]
struct Args {
    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an automation script from a JSON file
    Run {
        /// Path to the script JSON file
        script: PathBuf,

        /// Log actions instead of simulating input
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// Run the fixed-cadence auto-clicker
    Click {
        /// Click position as "x,y"; repeat for a sequence of positions
        #[arg(long = "pos", value_parser = parse_position)]
        positions: Vec<ClickPosition>,

        /// Clicks per second
        #[arg(long = "rate", default_value_t = 5.0)]
        rate: f64,

        /// Total clicks to perform (0 = until Ctrl+C)
        #[arg(long = "count", default_value_t = 0)]
        count: u64,

        /// Click type: left, right, or double
        #[arg(long = "click-type", default_value = "left", value_parser = parse_click_type)]
        click_type: ClickType,

        /// Click at the live cursor position instead of a fixed sequence
        #[arg(long = "follow-cursor")]
        follow_cursor: bool,

        /// Random extra delay of up to this many milliseconds per click
        #[arg(long = "jitter-ms", default_value_t = 0)]
        jitter_ms: u64,

        /// Log clicks instead of simulating input
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// Print the JSON Schema for the script format and exit
    Schema,
}

fn parse_position(s: &str) -> Result<ClickPosition, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'x,y', got '{s}'"))?;
    let x: i32 = x.trim().parse().map_err(|_| format!("bad x in '{s}'"))?;
    let y: i32 = y.trim().parse().map_err(|_| format!("bad y in '{s}'"))?;
    Ok(ClickPosition::new(x, y))
}

fn parse_click_type(s: &str) -> Result<ClickType, String> {
    match s.to_lowercase().as_str() {
        "left" => Ok(ClickType::Left),
        "right" => Ok(ClickType::Right),
        "double" => Ok(ClickType::Double),
        other => Err(format!("unknown click type '{other}' (left|right|double)")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Honor --log-level by initializing tracing directly at that level.
    if let Some(level) = &args.log_level {
        let level = match level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        };
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    } else {
        clickpilot::init_tracing();
    }

    match args.command {
        Command::Run { script, dry_run } => run_script(&script, dry_run).await,
        Command::Click {
            positions,
            rate,
            count,
            click_type,
            follow_cursor,
            jitter_ms,
            dry_run,
        } => {
            let config = ClickConfig {
                positions,
                rate_per_second: rate,
                total_clicks: count,
                click_type,
                mode: if follow_cursor {
                    ClickMode::FollowCursor
                } else {
                    ClickMode::StaticSequence
                },
                jitter_ms,
            };
            run_clicker(config, dry_run).await
        }
        Command::Schema => {
            let schema = script::generate_schema();
            let json = serde_json::to_string_pretty(&schema)?;
            println!("{json}");
            Ok(())
        }
    }
}

async fn run_script(path: &Path, dry_run: bool) -> anyhow::Result<()> {
    info!(
        version = clickpilot::PKG_VERSION,
        script = %path.display(),
        dry_run,
        "Starting script run"
    );

    let script = script::load_from_path_async(path)
        .await
        .with_context(|| format!("Failed to load script {}", path.display()))?;
    debug!(name = %script.name, actions = script.len(), "Script loaded");

    let mut engine = AutomationEngine::new(dry_run);
    engine.on_log(|msg| info!(target: "clickpilot::run", "{msg}"));

    let (tx, mut rx) = mpsc::unbounded_channel();
    engine.on_done(move |summary| {
        let _ = tx.send(summary.clone());
    });

    engine.start(script)?;

    let summary = tokio::select! {
        summary = rx.recv() => summary,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping run");
            engine.stop();
            rx.recv().await
        }
    };
    engine.wait();

    match summary {
        Some(summary) if summary.stopped_early => {
            info!(
                actions_run = summary.actions_run,
                "Run stopped by request"
            );
        }
        Some(summary) if summary.failures > 0 => {
            warn!(
                actions_run = summary.actions_run,
                failures = summary.failures,
                "Run completed with failures"
            );
        }
        Some(summary) => {
            info!(actions_run = summary.actions_run, "Run completed");
        }
        None => warn!("Run ended without a completion summary"),
    }
    Ok(())
}

async fn run_clicker(config: ClickConfig, dry_run: bool) -> anyhow::Result<()> {
    let mut engine = ClickerEngine::new(config, dry_run)?;
    engine.on_status(|msg| info!(target: "clickpilot::click", "{msg}"));
    engine.start()?;

    // Poll for completion so Ctrl+C stays responsive either way.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping clicker");
                engine.stop();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if !engine.is_running() {
                    break;
                }
            }
        }
    }
    info!(clicks = engine.clicks_executed(), "Clicker exited");
    Ok(())
}
