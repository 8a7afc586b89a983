use anyhow::{Context, Result, bail};
use enigo::Keyboard as _;
use enigo::Mouse as _;
use enigo::{Button as EButton, Coordinate, Direction, Enigo, Key, Settings};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::executor::cancel::{CancelToken, sleep_interruptible};
use crate::script::Action;
use crate::utils::keys::{self, KeyToken, NamedKey};
use crate::utils::window;

/// What the host platform can do, probed once at executor construction.
///
/// Dispatch asks this descriptor which backends exist and picks the best
/// available; adding a backend means extending the descriptor, not changing
/// the executor's shape.
#[derive(Debug, Copy, Clone)]
pub struct Capabilities {
    /// A privileged backend that can inject keys without stealing focus.
    pub background_input: bool,
    /// The plain foreground-input backend (enigo).
    pub foreground_input: bool,
    /// Whether windows can be enumerated and activated by title.
    pub window_enumeration: bool,
}

impl Capabilities {
    /// Probe the current platform.
    pub fn detect() -> Self {
        Self {
            background_input: background_input_available(),
            foreground_input: true,
            window_enumeration: window::enumeration_supported(),
        }
    }
}

#[cfg(windows)]
fn background_input_available() -> bool {
    // A per-window SendInput/SendMessage backend is not wired up yet, so even
    // on Windows the executor reports it unavailable and uses foreground input.
    false
}

#[cfg(not(windows))]
fn background_input_available() -> bool {
    false
}

/// Non-failure result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran to completion.
    Completed,
    /// The action could not run on this platform and was skipped.
    /// Reported to the caller but not counted as a failure.
    Skipped { reason: String },
}

/// Which key-injection backend a `send_keys`/`type_text` will use.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum KeyBackend {
    Background,
    Foreground,
}

fn select_key_backend(caps: &Capabilities) -> Result<KeyBackend> {
    if caps.background_input {
        return Ok(KeyBackend::Background);
    }
    if caps.foreground_input {
        debug!(
            target: "clickpilot::actions",
            "background key injection unavailable; falling back to foreground input"
        );
        return Ok(KeyBackend::Foreground);
    }
    bail!("no key injection backend available on this platform")
}

/// Mouse button used by click actions and the click scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Executes one action at a time against the host platform, with optional
/// dry-run mode. In dry-run mode, actions are only logged and no real input is
/// simulated (validation such as key-sequence parsing still applies).
///
/// The executor holds no mutable state between calls; side effects live
/// entirely in the process table, input device state, and window manager.
pub struct ActionExecutor {
    dry_run: bool,
    capabilities: Capabilities,
    enigo: Option<Enigo>,
}

impl ActionExecutor {
    /// Create a new executor.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            capabilities: Capabilities::detect(),
            enigo: None,
        }
    }

    /// Returns whether the executor is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The platform capabilities this executor dispatches against.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Perform one action. `Err` is an execution failure; `Ok(Skipped)` marks
    /// an unsupported-on-platform soft skip. The cancel token makes the timed
    /// suspensions (`wait`, the launch settle delay) interruptible.
    pub fn execute(&mut self, action: &Action, cancel: &CancelToken) -> Result<Outcome> {
        match action {
            Action::LaunchProcess {
                command,
                args,
                cwd,
                wait,
            } => self.launch_process(command, args, cwd.as_deref(), *wait, cancel),
            Action::Wait { milliseconds } => self.wait_ms(*milliseconds, cancel),
            Action::SendKeys { sequence } => self.send_keys(sequence),
            Action::TypeText { text } => self.type_text(text),
            Action::WindowActivate { title } => self.window_activate(title),
        }
    }

    /// Start an external process, then pause for the settle delay.
    fn launch_process(
        &mut self,
        command: &str,
        args: &[String],
        cwd: Option<&str>,
        wait: f64,
        cancel: &CancelToken,
    ) -> Result<Outcome> {
        if command.is_empty() {
            bail!("launch_process: 'command' is required");
        }
        // Converted before the dry-run check so a bad settle delay (the
        // loader catches these, direct callers may not) fails in every mode.
        let settle = if wait > 0.0 {
            Some(Duration::try_from_secs_f64(wait).with_context(|| {
                format!("launch_process: 'wait' must be a finite number of seconds, got {wait}")
            })?)
        } else {
            None
        };
        if self.dry_run {
            info!(target: "clickpilot::actions", %command, ?args, cwd, wait, "DRY-RUN launch_process");
            return Ok(Outcome::Completed);
        }
        trace!(target: "clickpilot::actions", %command, ?args, "launch_process");
        let mut cmd = Command::new(command);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.spawn()
            .with_context(|| format!("Failed to start process '{command}'"))?;
        if let Some(settle) = settle {
            // A stop request cuts the settle delay short but the launched
            // process is left alone.
            sleep_interruptible(settle, cancel);
        }
        Ok(Outcome::Completed)
    }

    /// Suspend for the given duration. Always succeeds; interruptible.
    fn wait_ms(&self, milliseconds: u64, cancel: &CancelToken) -> Result<Outcome> {
        if self.dry_run {
            info!(target: "clickpilot::actions", milliseconds, "DRY-RUN wait");
            return Ok(Outcome::Completed);
        }
        trace!(target: "clickpilot::actions", milliseconds, "wait");
        sleep_interruptible(Duration::from_millis(milliseconds), cancel);
        Ok(Outcome::Completed)
    }

    /// Inject a key sequence under the escape grammar.
    ///
    /// The sequence is parsed before the dry-run check so an unknown key token
    /// is a failure in every mode.
    fn send_keys(&mut self, sequence: &str) -> Result<Outcome> {
        let tokens = keys::parse_sequence(sequence)?;
        if tokens.is_empty() {
            return Ok(Outcome::Completed);
        }
        if self.dry_run {
            info!(target: "clickpilot::actions", %sequence, tokens = tokens.len(), "DRY-RUN send_keys");
            return Ok(Outcome::Completed);
        }
        let backend = select_key_backend(&self.capabilities)?;
        // Both routes drive enigo today; a privileged per-window backend would
        // slot in on the Background arm once one is linked.
        trace!(target: "clickpilot::actions", %sequence, ?backend, "send_keys");
        let enigo = self.ensure_enigo()?;
        for token in tokens {
            match token {
                KeyToken::Named(named) => {
                    enigo.key(map_named_key(named), Direction::Click)?;
                }
                KeyToken::Literal(ch) => {
                    enigo.key(Key::Unicode(ch), Direction::Click)?;
                }
            }
        }
        Ok(Outcome::Completed)
    }

    /// Type literal text (unicode), no escape interpretation.
    fn type_text(&mut self, text: &str) -> Result<Outcome> {
        if text.is_empty() {
            return Ok(Outcome::Completed);
        }
        if self.dry_run {
            info!(target: "clickpilot::actions", chars = text.chars().count(), "DRY-RUN type_text");
            return Ok(Outcome::Completed);
        }
        select_key_backend(&self.capabilities)?;
        trace!(target: "clickpilot::actions", chars = text.chars().count(), "type_text");
        let enigo = self.ensure_enigo()?;
        enigo.text(text)?;
        Ok(Outcome::Completed)
    }

    /// Bring the first window whose title contains the fragment to the
    /// foreground. Soft-skips on platforms without window enumeration.
    fn window_activate(&self, title: &str) -> Result<Outcome> {
        if title.is_empty() {
            return Ok(Outcome::Completed);
        }
        if self.dry_run {
            info!(target: "clickpilot::actions", %title, "DRY-RUN window_activate");
            return Ok(Outcome::Completed);
        }
        if !self.capabilities.window_enumeration {
            return Ok(Outcome::Skipped {
                reason: "window activation is not supported on this platform".into(),
            });
        }
        let focused = window::activate_window(title)
            .with_context(|| format!("window_activate('{title}') failed"))?;
        if focused {
            debug!(target: "clickpilot::actions", %title, "window_activate: focused");
            Ok(Outcome::Completed)
        } else {
            warn!(target: "clickpilot::actions", %title, "window_activate: no match");
            bail!("no matching window for title fragment '{title}'")
        }
    }

    /// Move mouse cursor to absolute screen coordinates.
    pub fn mouse_move_to(&mut self, x: i32, y: i32) -> Result<()> {
        if self.dry_run {
            info!(target: "clickpilot::actions", x, y, "DRY-RUN mouse_move_to");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "clickpilot::actions", x, y, "mouse_move_to");
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        Ok(())
    }

    /// Click a mouse button at the current cursor position, optionally as a
    /// double-click.
    pub fn mouse_click(&mut self, button: MouseButton, double: bool) -> Result<()> {
        if self.dry_run {
            info!(target: "clickpilot::actions", ?button, double, "DRY-RUN mouse_click");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        let btn = map_mouse_button(button);
        trace!(target: "clickpilot::actions", ?button, double, "mouse_click");
        let presses = if double { 2 } else { 1 };
        for _ in 0..presses {
            enigo.button(btn, Direction::Click)?;
        }
        Ok(())
    }

    fn ensure_enigo(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            trace!(target: "clickpilot::actions", "Initializing Enigo");
            self.enigo =
                Some(Enigo::new(&Settings::default()).context("Failed to initialize Enigo")?);
        }
        Ok(self.enigo.as_mut().expect("Enigo must be initialized"))
    }
}

fn map_named_key(key: NamedKey) -> Key {
    match key {
        NamedKey::Enter => Key::Return,
        NamedKey::Tab => Key::Tab,
        NamedKey::Esc => Key::Escape,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::Delete => Key::Delete,
        NamedKey::Home => Key::Home,
        NamedKey::End => Key::End,
        NamedKey::PageUp => Key::PageUp,
        NamedKey::PageDown => Key::PageDown,
        NamedKey::Up => Key::UpArrow,
        NamedKey::Down => Key::DownArrow,
        NamedKey::Left => Key::LeftArrow,
        NamedKey::Right => Key::RightArrow,
        NamedKey::Space => Key::Space,
    }
}

fn map_mouse_button(btn: MouseButton) -> EButton {
    match btn {
        MouseButton::Left => EButton::Left,
        MouseButton::Middle => EButton::Middle,
        MouseButton::Right => EButton::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dry() -> ActionExecutor {
        ActionExecutor::new(true)
    }

    #[test]
    fn dry_run_wait_completes_without_sleeping() {
        let mut ex = dry();
        let cancel = CancelToken::new();
        let start = std::time::Instant::now();
        let outcome = ex
            .execute(&Action::Wait { milliseconds: 60_000 }, &cancel)
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn send_keys_rejects_unknown_token_even_in_dry_run() {
        let mut ex = dry();
        let cancel = CancelToken::new();
        let err = ex
            .execute(
                &Action::SendKeys {
                    sequence: "<NOPE>".into(),
                },
                &cancel,
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("NOPE"));
    }

    #[test]
    fn empty_type_text_is_noop_success() {
        let mut ex = ActionExecutor::new(false);
        let cancel = CancelToken::new();
        // Empty text short-circuits before any backend is touched.
        let outcome = ex
            .execute(&Action::TypeText { text: String::new() }, &cancel)
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
    }

    #[test]
    fn launch_process_requires_command() {
        let mut ex = dry();
        let cancel = CancelToken::new();
        let err = ex
            .execute(
                &Action::LaunchProcess {
                    command: String::new(),
                    args: vec![],
                    cwd: None,
                    wait: 0.0,
                },
                &cancel,
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("command"));
    }

    #[test]
    fn launch_process_rejects_non_finite_settle_delay() {
        let mut ex = dry();
        let cancel = CancelToken::new();
        let err = ex
            .execute(
                &Action::LaunchProcess {
                    command: "true".into(),
                    args: vec![],
                    cwd: None,
                    wait: f64::INFINITY,
                },
                &cancel,
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("'wait'"), "got: {err:#}");
    }

    #[test]
    fn backend_selection_prefers_background() {
        let caps = Capabilities {
            background_input: true,
            foreground_input: true,
            window_enumeration: false,
        };
        assert_eq!(select_key_backend(&caps).unwrap(), KeyBackend::Background);

        let caps = Capabilities {
            background_input: false,
            foreground_input: true,
            window_enumeration: false,
        };
        assert_eq!(select_key_backend(&caps).unwrap(), KeyBackend::Foreground);

        let caps = Capabilities {
            background_input: false,
            foreground_input: false,
            window_enumeration: false,
        };
        assert!(select_key_backend(&caps).is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn window_activate_is_skipped_without_enumeration() {
        let mut ex = ActionExecutor::new(false);
        let cancel = CancelToken::new();
        let outcome = ex
            .execute(
                &Action::WindowActivate {
                    title: "Notepad".into(),
                },
                &cancel,
            )
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
    }

    #[test]
    fn empty_window_title_is_noop() {
        let mut ex = ActionExecutor::new(false);
        let cancel = CancelToken::new();
        let outcome = ex
            .execute(&Action::WindowActivate { title: String::new() }, &cancel)
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
    }
}
