//! Script module for Clickpilot.
//!
//! Wires together the Script/Action data models and the loading/validation
//! helpers. Import from here for a convenient, stable API.
//!
//! Example:
//! use clickpilot::script::{Script, load_from_path};
//!
//! let script = load_from_path("scripts/open_notepad.json")?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{Action, Script};

// Re-export loader utilities
pub use loader::{
    ScriptError, generate_schema, load_from_path, load_from_path_async, load_from_reader,
    load_from_str, script_from_value, validate_script, write_schema_to_writer,
};
