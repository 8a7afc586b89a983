use anyhow::{Result, bail};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

use crate::executor::actions::{ActionExecutor, Outcome};
use crate::executor::cancel::CancelToken;
use crate::script::Script;

/// Lifecycle of an engine run: `Idle → Running → {Completed, Failed, Stopping → Idle}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// No run in progress. Initial state; also re-entered after a stop.
    Idle,
    /// A worker thread is advancing through the script.
    Running,
    /// A stop was requested; the worker has not yet acknowledged it.
    Stopping,
    /// The last run reached the end of the script.
    Completed,
    /// The worker aborted outside an action boundary (e.g., a callback panic).
    Failed,
}

/// Per-run state, reset every time a run starts. Not persisted.
#[derive(Debug, Clone)]
pub struct RunState {
    pub current_index: usize,
    pub status: EngineStatus,
    pub last_error: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            current_index: 0,
            status: EngineStatus::Idle,
            last_error: None,
        }
    }
}

/// Final tally handed to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Actions that were attempted (including failed and skipped ones).
    pub actions_run: usize,
    /// Actions that failed. Skips do not count.
    pub failures: usize,
    /// True when the run ended because `stop` was requested.
    pub stopped_early: bool,
}

type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;
type DoneCallback = Arc<dyn Fn(&RunSummary) + Send + Sync>;

/// Runs a script on a dedicated worker thread, action by action, with
/// cooperative cancellation and continue-on-error semantics.
///
/// Contract notes for callers:
/// - `on_log` / `on_done` fire from the worker thread; a caller driving a
///   single-threaded presentation layer must marshal them itself.
/// - `stop` only sets a flag and returns; the `on_done` callback is the
///   authoritative signal that the run has ceased.
/// - There is no per-action timeout: a stuck external process can stall a run
///   indefinitely. That is an inherent limit of driving an uncontrolled host.
/// - Each action is attempted exactly once per run; re-running is a caller
///   decision.
pub struct AutomationEngine {
    state: Arc<Mutex<RunState>>,
    cancel: CancelToken,
    on_log: Option<LogCallback>,
    on_done: Option<DoneCallback>,
    handle: Option<JoinHandle<()>>,
    dry_run: bool,
}

impl AutomationEngine {
    /// Create an idle engine.
    /// - dry_run: forwarded to the executor; actions log instead of injecting input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::default())),
            cancel: CancelToken::new(),
            on_log: None,
            on_done: None,
            handle: None,
            dry_run,
        }
    }

    /// Register the per-action log callback. Must be set before `start`.
    pub fn on_log(&mut self, cb: impl Fn(&str) + Send + Sync + 'static) {
        self.on_log = Some(Arc::new(cb));
    }

    /// Register the completion callback. Must be set before `start`.
    pub fn on_done(&mut self, cb: impl Fn(&RunSummary) + Send + Sync + 'static) {
        self.on_done = Some(Arc::new(cb));
    }

    /// Start running `script` on a background thread.
    ///
    /// Rejected with an error while a run is in progress; the in-flight run is
    /// not disturbed. The engine clones nothing from the caller afterwards:
    /// the script is owned by the run until `on_done` fires.
    pub fn start(&mut self, script: Script) -> Result<()> {
        {
            let mut st = self.lock_state();
            match st.status {
                EngineStatus::Running | EngineStatus::Stopping => {
                    bail!("automation engine is already running")
                }
                _ => {}
            }
            *st = RunState {
                current_index: 0,
                status: EngineStatus::Running,
                last_error: None,
            };
        }
        // Reap the previous run's thread, if any.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.cancel.reset();

        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let on_log = self.on_log.clone();
        let on_done = self.on_done.clone();
        let dry_run = self.dry_run;

        info!(
            target: "clickpilot::engine",
            script = %script.name,
            actions = script.len(),
            "Starting automation run"
        );

        let handle = thread::Builder::new()
            .name("clickpilot-run".into())
            .spawn(move || {
                let body = catch_unwind(AssertUnwindSafe(|| {
                    run_worker(&script, &state, &cancel, on_log.as_ref(), on_done.as_ref(), dry_run);
                }));
                if body.is_err() {
                    error!(target: "clickpilot::engine", "run worker aborted on a panic");
                    let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
                    st.status = EngineStatus::Failed;
                    st.last_error = Some("run worker panicked".into());
                }
            });
        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => Err(self.abort_start(err)),
        }
    }

    /// Roll back the `Running` status committed by `start` when the worker
    /// thread could not be spawned, so the engine stays usable.
    fn abort_start(&mut self, err: std::io::Error) -> anyhow::Error {
        self.lock_state().status = EngineStatus::Idle;
        anyhow::Error::new(err).context("Failed to spawn automation worker thread")
    }

    /// Request a stop. Sets the cancellation flag and returns immediately; the
    /// worker acknowledges it between actions or inside an interruptible wait.
    pub fn stop(&mut self) {
        let mut st = self.lock_state();
        if st.status == EngineStatus::Running {
            st.status = EngineStatus::Stopping;
            debug!(target: "clickpilot::engine", "Stop requested");
            self.cancel.cancel();
        }
    }

    /// Block until the current run's worker thread has exited.
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EngineStatus {
        self.lock_state().status
    }

    /// Is a run currently in progress (running or stopping)?
    pub fn is_running(&self) -> bool {
        matches!(
            self.status(),
            EngineStatus::Running | EngineStatus::Stopping
        )
    }

    /// Index of the action the current (or last) run is at.
    pub fn current_index(&self) -> usize {
        self.lock_state().current_index
    }

    /// Message of the most recent action failure in the current (or last) run.
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        // Guard sections are tiny; recover the data on poison instead of
        // propagating a panic from another thread.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_worker(
    script: &Script,
    state: &Arc<Mutex<RunState>>,
    cancel: &CancelToken,
    on_log: Option<&LogCallback>,
    on_done: Option<&DoneCallback>,
    dry_run: bool,
) {
    let log = |msg: &str| {
        debug!(target: "clickpilot::engine", "{msg}");
        if let Some(cb) = on_log {
            cb(msg);
        }
    };

    let total = script.len();
    let mut executor = ActionExecutor::new(dry_run);
    let mut actions_run = 0usize;
    let mut failures = 0usize;
    let mut stopped_early = false;

    for (index, action) in script.actions.iter().enumerate() {
        // A pending stop request wins before the next action starts; actions
        // after this index never execute.
        if cancel.is_cancelled() {
            stopped_early = true;
            break;
        }
        {
            let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
            st.current_index = index;
        }
        log(&format!("[{}/{}] {}", index + 1, total, action.describe()));

        // The action boundary: a panicking platform call becomes a recorded
        // failure, never a dead worker thread.
        let result = catch_unwind(AssertUnwindSafe(|| executor.execute(action, cancel)));
        actions_run += 1;
        match result {
            Ok(Ok(Outcome::Completed)) => {}
            Ok(Ok(Outcome::Skipped { reason })) => {
                log(&format!("[{}/{}] skipped: {reason}", index + 1, total));
            }
            Ok(Err(err)) => {
                failures += 1;
                let msg = format!("[{}/{}] failed: {err:#}", index + 1, total);
                log(&msg);
                let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
                st.last_error = Some(format!("{err:#}"));
            }
            Err(_) => {
                failures += 1;
                let msg = format!("[{}/{}] failed: action panicked", index + 1, total);
                log(&msg);
                let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
                st.last_error = Some("action panicked".into());
            }
        }
    }

    // A stop request that lands during the final action still counts.
    if !stopped_early && cancel.is_cancelled() {
        stopped_early = true;
    }

    {
        let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
        st.status = if stopped_early {
            EngineStatus::Idle
        } else {
            EngineStatus::Completed
        };
    }

    if stopped_early {
        log(&format!(
            "stopped by request after {actions_run}/{total} actions"
        ));
    } else if failures > 0 {
        log(&format!("completed with {failures} failure(s)"));
    } else {
        log("completed");
    }

    let summary = RunSummary {
        actions_run,
        failures,
        stopped_early,
    };
    info!(
        target: "clickpilot::engine",
        actions_run = summary.actions_run,
        failures = summary.failures,
        stopped_early = summary.stopped_early,
        "Run finished"
    );
    if let Some(cb) = on_done {
        cb(&summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Action;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_script(n: usize, ms: u64) -> Script {
        Script {
            name: "test".into(),
            actions: (0..n).map(|_| Action::Wait { milliseconds: ms }).collect(),
        }
    }

    fn collecting_engine(dry_run: bool) -> (AutomationEngine, Arc<Mutex<Vec<RunSummary>>>) {
        let mut engine = AutomationEngine::new(dry_run);
        let summaries: Arc<Mutex<Vec<RunSummary>>> = Arc::default();
        let sink = Arc::clone(&summaries);
        engine.on_done(move |summary| {
            sink.lock().unwrap().push(summary.clone());
        });
        (engine, summaries)
    }

    #[test]
    fn clean_run_reports_all_actions_and_no_failures() {
        let (mut engine, summaries) = collecting_engine(true);
        engine.start(wait_script(4, 1)).unwrap();
        engine.wait();

        assert_eq!(engine.status(), EngineStatus::Completed);
        let summaries = summaries.lock().unwrap();
        assert_eq!(
            summaries.as_slice(),
            &[RunSummary {
                actions_run: 4,
                failures: 0,
                stopped_early: false,
            }]
        );
    }

    #[test]
    fn failed_action_does_not_stop_the_rest() {
        let (mut engine, summaries) = collecting_engine(true);
        let logs: Arc<Mutex<Vec<String>>> = Arc::default();
        let log_sink = Arc::clone(&logs);
        engine.on_log(move |msg| log_sink.lock().unwrap().push(msg.to_string()));

        let script = Script {
            name: "with-failure".into(),
            actions: vec![
                Action::Wait { milliseconds: 1 },
                // Unknown key token fails at execution even in dry-run.
                Action::SendKeys {
                    sequence: "<BAD>".into(),
                },
                Action::Wait { milliseconds: 1 },
            ],
        };
        engine.start(script).unwrap();
        engine.wait();

        assert_eq!(engine.status(), EngineStatus::Completed);
        let summary = summaries.lock().unwrap()[0].clone();
        assert_eq!(summary.actions_run, 3);
        assert_eq!(summary.failures, 1);
        assert!(!summary.stopped_early);
        assert!(engine.last_error().unwrap().contains("BAD"));

        // The action after the failure was still attempted.
        let logs = logs.lock().unwrap();
        assert!(logs.iter().any(|m| m.starts_with("[3/3]")), "logs: {logs:?}");
    }

    #[test]
    fn stop_during_long_wait_is_prompt() {
        // Dry-run skips sleeps, so exercise the real interruptible wait.
        let (mut engine, summaries) = collecting_engine(false);

        engine.start(wait_script(2, 30_000)).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let start = Instant::now();
        engine.stop();
        engine.wait();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(engine.status(), EngineStatus::Idle);
        let summary = summaries.lock().unwrap()[0].clone();
        assert!(summary.stopped_early);
        // The second wait never started.
        assert!(summary.actions_run <= 1);
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let (mut engine, summaries) = collecting_engine(false);

        engine.start(wait_script(1, 2_000)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(engine.is_running());
        assert!(engine.start(wait_script(1, 1)).is_err());
        // The in-flight run is undisturbed.
        assert!(engine.is_running());

        engine.stop();
        engine.wait();
        assert_eq!(summaries.lock().unwrap().len(), 1);
    }

    #[test]
    fn engine_is_reusable_after_completion() {
        let (mut engine, summaries) = collecting_engine(true);
        engine.start(wait_script(1, 1)).unwrap();
        engine.wait();
        engine.start(wait_script(2, 1)).unwrap();
        engine.wait();

        let summaries = summaries.lock().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].actions_run, 2);
    }

    #[test]
    fn log_callback_sees_every_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut engine = AutomationEngine::new(true);
        let c = Arc::clone(&counter);
        engine.on_log(move |msg| {
            if msg.starts_with('[') && msg.contains("wait") {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        engine.start(wait_script(3, 1)).unwrap();
        engine.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_spawn_leaves_engine_idle_and_reusable() {
        let (mut engine, summaries) = collecting_engine(true);

        // Drive the spawn-error branch directly; an actual spawn failure
        // (thread exhaustion) cannot be forced portably.
        engine.lock_state().status = EngineStatus::Running;
        let err = engine.abort_start(std::io::Error::other("out of threads"));
        assert!(format!("{err:#}").contains("spawn"), "got: {err:#}");
        assert_eq!(engine.status(), EngineStatus::Idle);
        assert!(!engine.is_running());

        // A later start must not be rejected as "already running".
        engine.start(wait_script(1, 1)).unwrap();
        engine.wait();
        assert_eq!(engine.status(), EngineStatus::Completed);
        assert_eq!(summaries.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_script_completes_immediately() {
        let (mut engine, summaries) = collecting_engine(true);
        engine.start(Script::new("empty")).unwrap();
        engine.wait();
        assert_eq!(engine.status(), EngineStatus::Completed);
        assert_eq!(
            summaries.lock().unwrap()[0],
            RunSummary {
                actions_run: 0,
                failures: 0,
                stopped_early: false,
            }
        );
    }
}
