use crate::dispatch::Button;
use crate::error::MenuError;
use palette::Srgba;
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};

pub const DEFAULT_OUTER_RADIUS: f64 = 100.0;
pub const DEFAULT_INNER_RADIUS: f64 = 20.0;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
pub const DEFAULT_SUBMENU_DELAY_MS: u64 = 500;
pub const DEFAULT_SCALING_FACTOR: f64 = 0.65;
pub const DEFAULT_LINE_WIDTH: f64 = 0.7;
pub const DEFAULT_FONT_SIZE: f64 = 15.0;

/// When a press on the host turns into a visible menu.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OpenPolicy {
    /// Open on release if the pointer stayed inside the inner radius.
    #[strum(to_string = "tap", serialize = "TapOpen")]
    Tap,
    /// Open after the initial delay while the trigger button is held.
    #[strum(to_string = "taphold", serialize = "tap-hold", serialize = "TapHoldOpen")]
    TapHold,
    /// Open immediately on press.
    #[default]
    #[strum(to_string = "drag", serialize = "DragOpen")]
    Drag,
}

/// Behaviour shared by every node of one menu hierarchy.
///
/// When deserialized with `pen_mode = true` the pen preset replaces
/// `open_policy` and `submenu_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolicyFields")]
pub struct Policy {
    pub open_policy: OpenPolicy,
    pub auto_open_submenus: bool,
    pub relocate_submenus_to_cursor: bool,
    pub initial_delay_ms: u64,
    pub submenu_delay_ms: u64,
    pub trigger_button: Button,
    pub pen_mode: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            open_policy: OpenPolicy::Drag,
            auto_open_submenus: false,
            relocate_submenus_to_cursor: true,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            submenu_delay_ms: DEFAULT_SUBMENU_DELAY_MS,
            trigger_button: Button::Right,
            pen_mode: false,
        }
    }
}

/// Field-by-field form of [`Policy`] as it appears in configuration files.
#[derive(Deserialize)]
#[serde(default)]
struct PolicyFields {
    open_policy: OpenPolicy,
    auto_open_submenus: bool,
    relocate_submenus_to_cursor: bool,
    initial_delay_ms: u64,
    submenu_delay_ms: u64,
    trigger_button: Button,
    pen_mode: bool,
}

impl Default for PolicyFields {
    fn default() -> Self {
        let Policy {
            open_policy,
            auto_open_submenus,
            relocate_submenus_to_cursor,
            initial_delay_ms,
            submenu_delay_ms,
            trigger_button,
            pen_mode,
        } = Policy::default();
        Self {
            open_policy,
            auto_open_submenus,
            relocate_submenus_to_cursor,
            initial_delay_ms,
            submenu_delay_ms,
            trigger_button,
            pen_mode,
        }
    }
}

impl From<PolicyFields> for Policy {
    fn from(fields: PolicyFields) -> Self {
        let policy = Self {
            open_policy: fields.open_policy,
            auto_open_submenus: fields.auto_open_submenus,
            relocate_submenus_to_cursor: fields.relocate_submenus_to_cursor,
            initial_delay_ms: fields.initial_delay_ms,
            submenu_delay_ms: fields.submenu_delay_ms,
            trigger_button: fields.trigger_button,
            pen_mode: fields.pen_mode,
        };
        // mouse mode leaves an explicit open policy alone
        if policy.pen_mode {
            policy.with_pen_mode(true)
        } else {
            policy
        }
    }
}

impl Policy {
    pub fn tap() -> Self {
        Self {
            open_policy: OpenPolicy::Tap,
            ..Self::default()
        }
    }

    /// Tap-and-hold waits twice as long as the other policies before opening.
    pub fn tap_hold() -> Self {
        Self {
            open_policy: OpenPolicy::TapHold,
            initial_delay_ms: 2 * DEFAULT_INITIAL_DELAY_MS,
            ..Self::default()
        }
    }

    /// Pens cannot hover reliably, so pen mode taps open and gives submenus
    /// more time; mouse mode goes back to drag-open.
    pub fn with_pen_mode(mut self, pen_mode: bool) -> Self {
        self.pen_mode = pen_mode;
        if pen_mode {
            self.open_policy = OpenPolicy::Tap;
            self.submenu_delay_ms = DEFAULT_SUBMENU_DELAY_MS * 3 / 2;
        } else {
            self.open_policy = OpenPolicy::Drag;
            self.submenu_delay_ms = DEFAULT_SUBMENU_DELAY_MS;
        }
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn submenu_delay(&self) -> Duration {
        Duration::from_millis(self.submenu_delay_ms)
    }
}

/// Per-node presentation attributes. Only the radii and `line_north` feed the
/// interaction logic; the rest is read by renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub fill_color: Srgba<f64>,
    pub line_color: Srgba<f64>,
    pub selected_color: Srgba<f64>,
    pub font_color: Srgba<f64>,
    pub font_family: String,
    pub font_size: f64,
    pub line_width: f64,
    pub scaling_factor: f64,
    pub line_north: bool,
    pub clip: bool,
    outer_radius: f64,
    inner_radius: f64,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            fill_color: Srgba::new(0.8, 0.8, 0.8, 1.0),
            line_color: Srgba::new(0.0, 0.0, 0.0, 0.35),
            selected_color: Srgba::new(0.655, 0.655, 0.655, 1.0),
            font_color: Srgba::new(0.0, 0.0, 0.0, 1.0),
            font_family: "Sans".to_string(),
            font_size: DEFAULT_FONT_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            line_north: false,
            clip: false,
            outer_radius: DEFAULT_OUTER_RADIUS,
            inner_radius: DEFAULT_INNER_RADIUS,
        }
    }
}

impl Appearance {
    pub fn outer_radius(&self) -> f64 {
        self.outer_radius
    }

    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }

    /// Rejects non-positive radii and keeps the previous value.
    pub fn set_outer_radius(&mut self, radius: f64) -> Result<(), MenuError> {
        self.outer_radius = Self::checked_radius("outer", radius)?;
        Ok(())
    }

    pub fn set_inner_radius(&mut self, radius: f64) -> Result<(), MenuError> {
        self.inner_radius = Self::checked_radius("inner", radius)?;
        Ok(())
    }

    /// Half-transparent variant of the selected colour, used for the
    /// default-selected slice.
    pub fn default_selected_color(&self) -> Srgba<f64> {
        let (r, g, b, _) = self.selected_color.into_components();
        Srgba::new(r, g, b, 0.5)
    }

    fn checked_radius(which: &str, radius: f64) -> Result<f64, MenuError> {
        if radius > 0.0 && radius.is_finite() {
            Ok(radius)
        } else {
            log::warn!("ignoring {which} radius {radius}, keeping the previous value");
            Err(MenuError::Configuration(format!(
                "{which} radius must be positive, got {radius}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_policy_deserialization() {
        let cases = vec![
            ("\"tap\"", OpenPolicy::Tap),
            ("\"TapOpen\"", OpenPolicy::Tap),
            ("\"TAPHOLD\"", OpenPolicy::TapHold),
            ("\"tap-hold\"", OpenPolicy::TapHold),
            ("\"drag\"", OpenPolicy::Drag),
            ("\"DragOpen\"", OpenPolicy::Drag),
        ];

        for (json, expected) in cases {
            let deserialized: OpenPolicy = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized, expected);
        }
    }

    #[test]
    fn test_policy_fills_missing_fields() {
        let policy: Policy =
            serde_json::from_str(r#"{ "open_policy": "tap", "trigger_button": "left" }"#).unwrap();
        assert_eq!(policy.open_policy, OpenPolicy::Tap);
        assert_eq!(policy.trigger_button, Button::Left);
        assert_eq!(policy.initial_delay(), Duration::from_millis(200));
        assert!(policy.relocate_submenus_to_cursor);
    }

    #[test]
    fn test_pen_mode_presets() {
        let pen = Policy::default().with_pen_mode(true);
        assert_eq!(pen.open_policy, OpenPolicy::Tap);
        assert_eq!(pen.submenu_delay(), Duration::from_millis(750));

        let mouse = pen.with_pen_mode(false);
        assert_eq!(mouse.open_policy, OpenPolicy::Drag);
        assert_eq!(mouse.submenu_delay(), Duration::from_millis(500));

        assert_eq!(Policy::tap_hold().initial_delay(), Duration::from_millis(400));
    }

    #[test]
    fn test_pen_mode_key_applies_preset() {
        let pen: Policy = serde_json::from_str(r#"{ "pen_mode": true }"#).unwrap();
        assert!(pen.pen_mode);
        assert_eq!(pen.open_policy, OpenPolicy::Tap);
        assert_eq!(pen.submenu_delay(), Duration::from_millis(750));

        let pen: Policy =
            serde_json::from_str(r#"{ "pen_mode": true, "open_policy": "drag" }"#).unwrap();
        assert_eq!(pen.open_policy, OpenPolicy::Tap);

        let mouse: Policy =
            serde_json::from_str(r#"{ "pen_mode": false, "open_policy": "taphold" }"#).unwrap();
        assert_eq!(mouse.open_policy, OpenPolicy::TapHold);
        assert_eq!(mouse.submenu_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_radius_keeps_previous_value() {
        let mut appearance = Appearance::default();
        assert!(appearance.set_outer_radius(0.0).is_err());
        assert!(appearance.set_outer_radius(-5.0).is_err());
        assert_eq!(appearance.outer_radius(), DEFAULT_OUTER_RADIUS);

        appearance.set_outer_radius(140.0).unwrap();
        assert_eq!(appearance.outer_radius(), 140.0);

        assert!(appearance.set_inner_radius(f64::NAN).is_err());
        assert_eq!(appearance.inner_radius(), DEFAULT_INNER_RADIUS);
    }
}
