//! Click scheduler module for Clickpilot.
//!
//! Computes target positions and an inter-click cadence from a `ClickConfig`
//! and drives the OS click primitive at that cadence on a worker thread —
//! structurally a restricted special case of `executor::AutomationEngine`
//! (one repeated step, same cooperative cancellation).
//!
//! Example:
//! ```no_run
//! use clickpilot::clicker::{ClickConfig, ClickPosition, ClickerEngine};
//!
//! let config = ClickConfig {
//!     positions: vec![ClickPosition::new(100, 200)],
//!     rate_per_second: 10.0,
//!     total_clicks: 50,
//!     ..Default::default()
//! };
//! let mut engine = ClickerEngine::new(config, false)?;
//! engine.on_status(|msg| println!("{msg}"));
//! engine.start()?;
//! engine.wait();
//! # anyhow::Ok(())
//! ```

pub mod config;
pub mod engine;

pub use config::{ClickConfig, ClickConfigError, ClickMode, ClickPosition, ClickType};
pub use engine::{ClickerEngine, ClickerStatus};
