use anyhow::Result;
use tracing::{debug, warn};

/// Whether this platform build carries a window-enumeration backend at all.
///
/// The executor consults this before attempting `window_activate`; without a
/// backend the action is reported as skipped rather than failed.
pub fn enumeration_supported() -> bool {
    cfg!(windows)
}

/// Attempt to focus a window whose title contains the given fragment
/// (case-sensitive containment).
///
/// Returns:
/// - Ok(true) if a matching window was brought to the foreground.
/// - Ok(false) if enumeration ran but no window matched.
/// - Err(_) only for unexpected internal errors.
///
/// Notes:
/// - This is a placeholder. A real Windows implementation would use the
///   `windows` crate to enumerate top-level windows (GetWindowTextW), match by
///   title fragment, restore if minimized (ShowWindow/SW_RESTORE), and call
///   SetForegroundWindow.
/// - Callers should gate on [`enumeration_supported`] first; on platforms
///   without a backend this returns Ok(false).
pub fn activate_window(title_fragment: &str) -> Result<bool> {
    debug!(target: "clickpilot::window", %title_fragment, "activate_window requested");
    activate_window_impl(title_fragment)
}

#[cfg(windows)]
fn activate_window_impl(title_fragment: &str) -> Result<bool> {
    // Win32 integration (EnumWindows, GetWindowTextW, SetForegroundWindow) is
    // not linked yet; report no match so the run logs a failure rather than
    // silently succeeding.
    warn!(
        target: "clickpilot::window",
        %title_fragment,
        "activate_window is not implemented yet on Windows; returning Ok(false)"
    );
    Ok(false)
}

#[cfg(not(windows))]
fn activate_window_impl(_title_fragment: &str) -> Result<bool> {
    // No-op on platforms without window enumeration.
    warn!(
        target: "clickpilot::window",
        "activate_window is not supported on this platform; returning Ok(false)"
    );
    Ok(false)
}
