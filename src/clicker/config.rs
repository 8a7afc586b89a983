use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::executor::MouseButton;

/// Configuration error for the click scheduler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClickConfigError {
    #[error("at least one click position is required in static_sequence mode")]
    NoPositions,
    #[error("click rate must be a positive, finite number, got {0}")]
    InvalidRate(f64),
}

/// A screen position where a click should occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClickPosition {
    pub x: i32,
    pub y: i32,
    /// Optional user-facing label shown in status text.
    #[serde(default)]
    pub label: Option<String>,
}

impl ClickPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, label: None }
    }
}

impl fmt::Display for ClickPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} ({}, {})", self.x, self.y),
            None => write!(f, "({}, {})", self.x, self.y),
        }
    }
}

/// Kind of click the scheduler performs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClickType {
    #[default]
    Left,
    Right,
    Double,
}

impl ClickType {
    /// Map to the executor's click primitive: (button, double).
    pub fn as_click(self) -> (MouseButton, bool) {
        match self {
            ClickType::Left => (MouseButton::Left, false),
            ClickType::Right => (MouseButton::Right, false),
            ClickType::Double => (MouseButton::Left, true),
        }
    }
}

/// How the scheduler picks click targets.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    /// Cycle through the configured positions in order.
    #[default]
    StaticSequence,
    /// Click wherever the cursor currently is.
    FollowCursor,
}

/// Configuration for the click scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClickConfig {
    /// Positions to cycle through in `static_sequence` mode.
    #[serde(default)]
    pub positions: Vec<ClickPosition>,

    /// Clicks per second.
    #[serde(default = "default_rate")]
    pub rate_per_second: f64,

    /// Total clicks to perform; 0 means run until stopped.
    #[serde(default)]
    pub total_clicks: u64,

    #[serde(default)]
    pub click_type: ClickType,

    #[serde(default)]
    pub mode: ClickMode,

    /// Upper bound of uniform random jitter added to each inter-click delay,
    /// in milliseconds. 0 disables jitter.
    #[serde(default)]
    pub jitter_ms: u64,
}

fn default_rate() -> f64 {
    5.0
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            rate_per_second: default_rate(),
            total_clicks: 0,
            click_type: ClickType::default(),
            mode: ClickMode::default(),
            jitter_ms: 0,
        }
    }
}

impl ClickConfig {
    /// Check the invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), ClickConfigError> {
        if self.mode == ClickMode::StaticSequence && self.positions.is_empty() {
            return Err(ClickConfigError::NoPositions);
        }
        if !self.rate_per_second.is_finite() || self.rate_per_second <= 0.0 {
            return Err(ClickConfigError::InvalidRate(self.rate_per_second));
        }
        Ok(())
    }

    /// Base delay between clicks derived from the rate.
    pub fn delay_between_clicks(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_per_second)
    }

    /// True when the scheduler should run until stopped.
    pub fn is_unlimited(&self) -> bool {
        self.total_clicks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_mode_requires_positions() {
        let config = ClickConfig::default();
        assert_eq!(config.validate(), Err(ClickConfigError::NoPositions));

        let config = ClickConfig {
            mode: ClickMode::FollowCursor,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rate_must_be_positive_and_finite() {
        let with_rate = |rate| ClickConfig {
            positions: vec![ClickPosition::new(10, 20)],
            rate_per_second: rate,
            ..Default::default()
        };
        assert_eq!(
            with_rate(0.0).validate(),
            Err(ClickConfigError::InvalidRate(0.0))
        );
        assert!(with_rate(f64::NAN).validate().is_err());
        // An infinite rate would make delay_between_clicks zero and the loop
        // a busy spin.
        assert_eq!(
            with_rate(f64::INFINITY).validate(),
            Err(ClickConfigError::InvalidRate(f64::INFINITY))
        );
        assert!(with_rate(120.0).validate().is_ok());
    }

    #[test]
    fn delay_is_inverse_of_rate() {
        let config = ClickConfig {
            positions: vec![ClickPosition::new(0, 0)],
            rate_per_second: 4.0,
            ..Default::default()
        };
        assert_eq!(config.delay_between_clicks(), Duration::from_millis(250));
    }

    #[test]
    fn position_display_includes_label() {
        let mut pos = ClickPosition::new(3, 4);
        assert_eq!(pos.to_string(), "(3, 4)");
        pos.label = Some("OK button".into());
        assert_eq!(pos.to_string(), "OK button (3, 4)");
    }

    #[test]
    fn click_type_maps_to_primitive() {
        use crate::executor::MouseButton;
        assert_eq!(ClickType::Left.as_click(), (MouseButton::Left, false));
        assert_eq!(ClickType::Right.as_click(), (MouseButton::Right, false));
        assert_eq!(ClickType::Double.as_click(), (MouseButton::Left, true));
    }

    #[test]
    fn config_json_defaults() {
        let config: ClickConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.rate_per_second, 5.0);
        assert!(config.is_unlimited());
        assert_eq!(config.click_type, ClickType::Left);
        assert_eq!(config.mode, ClickMode::StaticSequence);
    }
}
