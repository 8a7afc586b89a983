#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for Clickpilot.

This module wires together:
- `actions`: one-action-at-a-time execution against the host platform
  (process launch, key injection, text entry, window activation, mouse),
  behind a capability descriptor and an optional dry-run mode.
- `engine`: the automation engine that runs a whole `Script` on a worker
  thread with cooperative cancellation and continue-on-error semantics.
- `cancel`: the shared cancellation flag and interruptible sleep.

Typical usage:
```no_run
use clickpilot::executor::AutomationEngine;
use clickpilot::script;

let script = script::load_from_str(r#"{"name":"demo","actions":[{"type":"wait","milliseconds":100}]}"#)?;
let mut engine = AutomationEngine::new(false);
engine.on_log(|msg| println!("{msg}"));
engine.on_done(|summary| println!("done: {summary:?}"));
engine.start(script)?;
engine.wait();
# anyhow::Ok(())
```

Public re-exports:
- `ActionExecutor`, `Capabilities`, `Outcome`, `MouseButton`: low-level execution.
- `AutomationEngine`, `EngineStatus`, `RunState`, `RunSummary`: run lifecycle.
- `CancelToken`, `sleep_interruptible`: cooperative cancellation primitives.
*/

pub mod actions;
pub mod cancel;
pub mod engine;

// Re-exports for convenient access from `clickpilot::executor::*`
pub use actions::{ActionExecutor, Capabilities, MouseButton, Outcome};
pub use cancel::{CancelToken, sleep_interruptible};
pub use engine::{AutomationEngine, EngineStatus, RunState, RunSummary};
