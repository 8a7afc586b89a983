use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One automation step, tagged by kind.
///
/// Actions are pure values: constructing one performs no I/O. Execution is a
/// separate, explicit step owned by `executor::ActionExecutor`. The JSON form
/// uses a `type` tag, e.g.:
///
/// ```json
/// { "type": "send_keys", "sequence": "hi<ENTER>" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Start an external process in the background.
    ///
    /// Execution pauses for `wait` seconds after a successful launch before the
    /// next action begins (a settle delay, not an error path).
    LaunchProcess {
        /// Program to start (binary name or path).
        command: String,
        /// Arguments passed to the program.
        #[serde(default)]
        args: Vec<String>,
        /// Working directory for the new process.
        #[serde(default)]
        cwd: Option<String>,
        /// Settle delay in seconds after launch (default: 0).
        #[serde(default)]
        wait: f64,
    },

    /// Suspend execution for the given duration. No side effect.
    Wait {
        /// Duration in milliseconds.
        milliseconds: u64,
    },

    /// Inject a key sequence using the escape grammar from `utils::keys`:
    /// `<ENTER>` and friends denote named keys, everything else is literal.
    SendKeys { sequence: String },

    /// Inject literal text, character by character, no escape interpretation.
    TypeText { text: String },

    /// Bring the first window whose title contains the fragment to the
    /// foreground. Best-effort and platform-dependent.
    WindowActivate {
        /// Case-sensitive title fragment to search for.
        title: String,
    },
}

impl Action {
    /// Human-readable one-line description used in run logs.
    pub fn describe(&self) -> String {
        match self {
            Action::LaunchProcess {
                command,
                args,
                wait,
                ..
            } => {
                if *wait > 0.0 {
                    format!(
                        "launch_process '{command}' ({} args, settle {wait}s)",
                        args.len()
                    )
                } else {
                    format!("launch_process '{command}' ({} args)", args.len())
                }
            }
            Action::Wait { milliseconds } => format!("wait {milliseconds}ms"),
            Action::SendKeys { sequence } => format!("send_keys '{sequence}'"),
            Action::TypeText { text } => format!("type_text ({} chars)", text.chars().count()),
            Action::WindowActivate { title } => format!("window_activate '{title}'"),
        }
    }

    /// The JSON `type` tag for this action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::LaunchProcess { .. } => "launch_process",
            Action::Wait { .. } => "wait",
            Action::SendKeys { .. } => "send_keys",
            Action::TypeText { .. } => "type_text",
            Action::WindowActivate { .. } => "window_activate",
        }
    }
}

/// An ordered, named list of actions; the unit of load/save/run.
///
/// A `Script` is a plain value until it is handed to the engine. Order is
/// significant and is the execution order. The engine clones the script at the
/// start of a run, so callers may keep editing their copy freely; the running
/// sequence itself is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    /// Display name of the script.
    pub name: String,

    /// Actions, executed strictly in order.
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Script {
    /// Create an empty script with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Number of actions in the script.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if the script has no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_mentions_the_kind() {
        let a = Action::Wait { milliseconds: 250 };
        assert_eq!(a.describe(), "wait 250ms");

        let a = Action::LaunchProcess {
            command: "notepad".into(),
            args: vec!["file.txt".into()],
            cwd: None,
            wait: 0.0,
        };
        assert!(a.describe().contains("notepad"));
        assert_eq!(a.kind(), "launch_process");
    }

    #[test]
    fn script_json_round_trip() {
        let script = Script {
            name: "demo".into(),
            actions: vec![
                Action::LaunchProcess {
                    command: "notepad".into(),
                    args: vec![],
                    cwd: Some("C:\\temp".into()),
                    wait: 1.5,
                },
                Action::Wait { milliseconds: 500 },
                Action::SendKeys {
                    sequence: "hi<ENTER>".into(),
                },
                Action::TypeText {
                    text: "hello world".into(),
                },
                Action::WindowActivate {
                    title: "Notepad".into(),
                },
            ],
        };

        let json = serde_json::to_string(&script).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(script, back);
    }

    #[test]
    fn launch_process_optional_fields_default() {
        let a: Action =
            serde_json::from_str(r#"{"type":"launch_process","command":"calc"}"#).unwrap();
        assert_eq!(
            a,
            Action::LaunchProcess {
                command: "calc".into(),
                args: vec![],
                cwd: None,
                wait: 0.0,
            }
        );
    }
}
