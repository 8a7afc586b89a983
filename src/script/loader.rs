use anyhow::{Context, Result};
use schemars::{Schema, schema_for};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::models::{Action, Script};
use crate::utils::keys::{self, KeyParseError};

/// Validation error raised while loading or checking a script.
///
/// These surface before a run ever starts; a script that fails validation is
/// never handed to the engine.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The top-level document was not a JSON object with the expected shape.
    #[error("script must be a JSON object")]
    NotAnObject,

    /// `actions` was present but not an array.
    #[error("'actions' must be an array, got {0}")]
    ActionsNotArray(String),

    /// An entry in `actions` had a missing, unrecognized, or malformed `type`.
    #[error("action at index {index} has invalid or unrecognized type '{kind}': {source}")]
    InvalidAction {
        index: usize,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// A `launch_process` action had an empty command.
    #[error("action at index {index}: launch_process requires a non-empty 'command'")]
    EmptyCommand { index: usize },

    /// A `launch_process` settle delay was negative or not a finite number.
    #[error("action at index {index}: launch_process 'wait' must be finite and >= 0, got {wait}")]
    InvalidSettleDelay { index: usize, wait: f64 },

    /// A `send_keys` sequence failed the key grammar.
    #[error("action at index {index}: {source}")]
    BadKeySequence {
        index: usize,
        #[source]
        source: KeyParseError,
    },
}

/// Load and validate a script from a string slice.
pub fn load_from_str(s: &str) -> Result<Script> {
    let value: Value =
        serde_json::from_str(s).context("Failed to parse script as JSON")?;
    script_from_value(&value)
}

/// Load and validate a script from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Script> {
    let value: Value =
        serde_json::from_reader(reader).context("Failed to parse script JSON from reader")?;
    script_from_value(&value)
}

/// Load and validate a script from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Script> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open script file {}", path_ref.display()))?;
    let script = load_from_reader(file)?;
    debug!("Loaded script from {}", path_ref.display());
    Ok(script)
}

/// Load and validate a script from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Script> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read script file {}", path_ref.display()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse script JSON from {}", path_ref.display()))?;
    let script = script_from_value(&value)?;
    debug!("Loaded script from {}", path_ref.display());
    Ok(script)
}

/// Build a validated `Script` from a parsed JSON value.
///
/// Actions are converted one at a time so a malformed entry reports its index
/// and the offending `type` value rather than an opaque deserialization error.
pub fn script_from_value(value: &Value) -> Result<Script> {
    let obj = value.as_object().ok_or(ScriptError::NotAnObject)?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unnamed Script")
        .to_string();

    let actions = match obj.get("actions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(raw)) => raw
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_action(index, entry))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(ScriptError::ActionsNotArray(json_type_name(other).into()).into()),
    };

    let script = Script { name, actions };
    validate_script(&script)?;
    Ok(script)
}

fn parse_action(index: usize, entry: &Value) -> Result<Action, ScriptError> {
    serde_json::from_value::<Action>(entry.clone()).map_err(|source| {
        let kind = entry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        ScriptError::InvalidAction {
            index,
            kind,
            source,
        }
    })
}

/// Check per-action invariants that the serde shape alone cannot express.
///
/// - `launch_process` needs a non-empty command and a finite, non-negative
///   settle delay.
/// - Every `send_keys` sequence must parse under the key grammar, so an
///   unknown key token is rejected here instead of mid-run.
pub fn validate_script(script: &Script) -> Result<(), ScriptError> {
    for (index, action) in script.actions.iter().enumerate() {
        match action {
            Action::LaunchProcess { command, wait, .. } => {
                if command.trim().is_empty() {
                    return Err(ScriptError::EmptyCommand { index });
                }
                if !wait.is_finite() || *wait < 0.0 {
                    return Err(ScriptError::InvalidSettleDelay { index, wait: *wait });
                }
            }
            Action::SendKeys { sequence } => {
                keys::parse_sequence(sequence)
                    .map_err(|source| ScriptError::BadKeySequence { index, source })?;
            }
            Action::Wait { .. } | Action::TypeText { .. } | Action::WindowActivate { .. } => {}
        }
    }
    Ok(())
}

/// Generate the JSON Schema for the Script model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Script)
}

/// Write the JSON Schema for the Script model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
