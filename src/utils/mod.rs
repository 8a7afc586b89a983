//! Utilities for Clickpilot.
//!
//! Submodules:
//! - `keys`: the `send_keys` escape grammar (`<ENTER>` tokens, literal characters).
//! - `window`: OS-specific window activation helpers (no-op on unsupported platforms).

pub mod keys;
pub mod window;
