#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Clickpilot — scheduled auto-clicking and desktop automation script playback.
//!
//! The crate is split into cohesive modules; the binary in `main.rs` is a thin
//! CLI over the library surface:
//! - `script`: Script/Action data model, JSON loader, validation, schema helpers.
//! - `executor`: Action execution against the host platform and the automation engine.
//! - `clicker`: the fixed-cadence click scheduler.
//! - `utils`: key-sequence grammar and (platform-dependent) window helpers.
//!
//! Use `clickpilot::prelude::*` to bring commonly used items into scope quickly.

/// Public module: click scheduler (configuration and engine).
pub mod clicker;
/// Public module: action execution (executor, engine, cancellation).
pub mod executor;
/// Public module: script data model, loader, and schema helpers.
pub mod script;
/// Public module: utilities (key grammar, window helpers).
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    use tracing::Level;
    use tracing_subscriber::fmt;

    // Parse RUST_LOG as a simple level (trace|debug|info|warn|error)
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| match s.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        })
        .unwrap_or(Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use clickpilot::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;

    // External crates (namespaced) if callers want direct access
    pub use crate as clickpilot;
    pub use enigo;
    pub use rand;

    // Frequently used internal modules
    pub use crate::{clicker, executor, script, utils};
}
