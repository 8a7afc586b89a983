use anyhow::{Context, Result, bail};
use rand::random_range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::clicker::config::{ClickConfig, ClickMode};
use crate::executor::actions::ActionExecutor;
use crate::executor::cancel::{CancelToken, sleep_interruptible};

/// Lifecycle of the click scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClickerStatus {
    Stopped,
    Running,
    /// A click primitive failed; the loop ended early.
    Error,
}

type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Fixed-cadence click loop on a worker thread.
///
/// A restricted sibling of `executor::AutomationEngine`: the "script" is an
/// endless (or bounded) repetition of one click step, with the same
/// atomic-flag cancellation and the same executor underneath. The status
/// callback fires from the worker thread.
pub struct ClickerEngine {
    config: ClickConfig,
    status: Arc<Mutex<ClickerStatus>>,
    clicks: Arc<AtomicU64>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
    on_status: Option<StatusCallback>,
    dry_run: bool,
}

impl ClickerEngine {
    /// Create a scheduler for a validated configuration.
    pub fn new(config: ClickConfig, dry_run: bool) -> Result<Self> {
        config.validate().context("Invalid click configuration")?;
        Ok(Self {
            config,
            status: Arc::new(Mutex::new(ClickerStatus::Stopped)),
            clicks: Arc::new(AtomicU64::new(0)),
            cancel: CancelToken::new(),
            handle: None,
            on_status: None,
            dry_run,
        })
    }

    /// Register a status-text callback (started/stopped/progress messages).
    pub fn on_status(&mut self, cb: impl Fn(&str) + Send + Sync + 'static) {
        self.on_status = Some(Arc::new(cb));
    }

    /// The configuration this scheduler runs.
    pub fn config(&self) -> &ClickConfig {
        &self.config
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ClickerStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Is the click loop currently active?
    pub fn is_running(&self) -> bool {
        self.status() == ClickerStatus::Running
    }

    /// Clicks executed in the current (or last) session.
    pub fn clicks_executed(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }

    /// Start the click loop on a background thread.
    /// Rejected while already running.
    pub fn start(&mut self) -> Result<()> {
        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            if *status == ClickerStatus::Running {
                bail!("clicker is already running");
            }
            *status = ClickerStatus::Running;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.cancel.reset();
        self.clicks.store(0, Ordering::SeqCst);

        let config = self.config.clone();
        let status = Arc::clone(&self.status);
        let clicks = Arc::clone(&self.clicks);
        let cancel = self.cancel.clone();
        let on_status = self.on_status.clone();
        let dry_run = self.dry_run;

        info!(
            target: "clickpilot::clicker",
            rate = config.rate_per_second,
            total = config.total_clicks,
            mode = ?config.mode,
            "Starting click loop"
        );

        let handle = thread::Builder::new()
            .name("clickpilot-clicker".into())
            .spawn(move || {
                click_worker(&config, &status, &clicks, &cancel, on_status.as_ref(), dry_run);
            });
        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                notify(self.on_status.as_ref(), "Auto-clicker started");
                Ok(())
            }
            Err(err) => Err(self.abort_start(err)),
        }
    }

    /// Roll back the `Running` status committed by `start` when the worker
    /// thread could not be spawned, so the scheduler stays usable.
    fn abort_start(&mut self, err: std::io::Error) -> anyhow::Error {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = ClickerStatus::Stopped;
        anyhow::Error::new(err).context("Failed to spawn clicker worker thread")
    }

    /// Stop the click loop and wait for the worker to exit.
    ///
    /// The worker re-checks the flag at sub-second granularity, so this
    /// returns promptly even for very low click rates.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Block until the loop finishes on its own (bounded runs).
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn notify(on_status: Option<&StatusCallback>, msg: &str) {
    debug!(target: "clickpilot::clicker", "{msg}");
    if let Some(cb) = on_status {
        cb(msg);
    }
}

fn click_worker(
    config: &ClickConfig,
    status: &Arc<Mutex<ClickerStatus>>,
    clicks: &Arc<AtomicU64>,
    cancel: &CancelToken,
    on_status: Option<&StatusCallback>,
    dry_run: bool,
) {
    let mut executor = ActionExecutor::new(dry_run);
    let delay = config.delay_between_clicks();
    let (button, double) = config.click_type.as_click();
    let mut position_index = 0usize;

    let outcome: Result<bool> = (|| {
        loop {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            let executed = clicks.load(Ordering::SeqCst);
            if !config.is_unlimited() && executed >= config.total_clicks {
                return Ok(true);
            }

            if config.mode == ClickMode::StaticSequence {
                let position = &config.positions[position_index % config.positions.len()];
                executor
                    .mouse_move_to(position.x, position.y)
                    .with_context(|| format!("moving to {position}"))?;
                position_index += 1;
            }
            executor.mouse_click(button, double)?;

            let executed = clicks.fetch_add(1, Ordering::SeqCst) + 1;
            if executed % 10 == 0 {
                notify(on_status, &format!("Clicks executed: {executed}"));
            }

            let jitter = if config.jitter_ms > 0 {
                Duration::from_millis(random_range(0..=config.jitter_ms))
            } else {
                Duration::ZERO
            };
            if !sleep_interruptible(delay + jitter, cancel) {
                return Ok(false);
            }
        }
    })();

    let executed = clicks.load(Ordering::SeqCst);
    let mut st = status.lock().unwrap_or_else(PoisonError::into_inner);
    match outcome {
        Ok(true) => {
            *st = ClickerStatus::Stopped;
            drop(st);
            notify(on_status, &format!("Completed. Total clicks: {executed}"));
        }
        Ok(false) => {
            *st = ClickerStatus::Stopped;
            drop(st);
            notify(
                on_status,
                &format!("Auto-clicker stopped. Total clicks: {executed}"),
            );
        }
        Err(err) => {
            *st = ClickerStatus::Error;
            drop(st);
            error!(target: "clickpilot::clicker", error = %err, "Click loop failed");
            notify(on_status, &format!("Error: {err:#}"));
        }
    }
}
