use crate::sys::exec::ExecCommand;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use palette::Srgba;
use piemenu::{Appearance, IconName, Label, Policy};
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, DeserializeFromStr)]
#[serde(into = "String")]
pub struct HexColor(pub Srgba<f64>);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid colour '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(String);

impl FromStr for HexColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map(|v| v as f64 / 255.0)
                .map_err(|_| err())
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self(Srgba::new(channel(0)?, channel(2)?, channel(4)?, alpha)))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b, a) = self.0.into_format::<u8, u8>().into_components();
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Optional overrides on top of [`Appearance::default`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub outer_radius: Option<f64>,
    pub inner_radius: Option<f64>,
    pub scaling_factor: Option<f64>,
    pub line_width: Option<f64>,
    pub line_north: Option<bool>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub fill_color: Option<HexColor>,
    pub line_color: Option<HexColor>,
    pub selected_color: Option<HexColor>,
    pub font_color: Option<HexColor>,
}

impl AppearanceConfig {
    pub fn apply(&self, appearance: &mut Appearance) {
        // invalid radii are logged and skipped by the setters
        if let Some(radius) = self.outer_radius {
            appearance.set_outer_radius(radius).ok();
        }
        if let Some(radius) = self.inner_radius {
            appearance.set_inner_radius(radius).ok();
        }
        if let Some(factor) = self.scaling_factor {
            appearance.scaling_factor = factor;
        }
        if let Some(width) = self.line_width {
            appearance.line_width = width;
        }
        if let Some(line_north) = self.line_north {
            appearance.line_north = line_north;
        }
        if let Some(family) = &self.font_family {
            appearance.font_family = family.clone();
        }
        if let Some(size) = self.font_size {
            appearance.font_size = size;
        }
        let colors = [
            (self.fill_color, &mut appearance.fill_color),
            (self.line_color, &mut appearance.line_color),
            (self.selected_color, &mut appearance.selected_color),
            (self.font_color, &mut appearance.font_color),
        ];
        for (color, slot) in colors {
            if let Some(HexColor(color)) = color {
                *slot = color;
            }
        }
    }
}

/// One slice: a command when `items` is empty, a submenu otherwise.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryConfig {
    pub label: Label,
    pub icon: Option<IconName>,
    pub exec: Option<ExecCommand>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub appearance: Option<AppearanceConfig>,
    #[serde(default)]
    pub items: Vec<EntryConfig>,
}

fn enabled() -> bool {
    true
}

impl EntryConfig {
    pub fn is_submenu(&self) -> bool {
        !self.items.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuConfig {
    pub label: Label,
    pub icon: Option<IconName>,
    pub default_selected: Option<usize>,
    pub items: Vec<EntryConfig>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            label: Label::new("pied"),
            icon: None,
            default_selected: None,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub policy: Policy,
    pub appearance: AppearanceConfig,
    /// Take colours from the GTK theme instead of the configured ones.
    pub theme_colors: bool,
    pub menu: MenuConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            appearance: AppearanceConfig::default(),
            theme_colors: true,
            menu: MenuConfig::default(),
        }
    }
}

impl Config {
    /// Shown until the user has a config file: a single slice that writes
    /// the default one and opens it.
    pub fn setup() -> Self {
        let mut config = Self::default();
        config.menu.items.push(EntryConfig {
            label: Label::new("Setup"),
            icon: Some(IconName::new("preferences-system")),
            exec: Some(ExecCommand::new(SETUP_COMMAND)),
            enabled: true,
            appearance: None,
            items: Vec::new(),
        });
        config
    }
}

pub const SETUP_COMMAND: &str = "PIED_SETUP";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<std::path::PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "pied", "pied").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config_path = get_config_path()?;

    let s = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(
            config::Environment::with_prefix("PIED")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(s.try_deserialize()?)
}

pub fn load_or_setup() -> Config {
    if let Ok(path) = get_config_path()
        && !path.exists()
    {
        return Config::setup();
    }

    match load_config() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load config, falling back to setup menu: {}", e);
            Config::setup()
        }
    }
}

pub fn write_default_config() -> std::io::Result<std::path::PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

use crate::events::AppEvent;
use async_channel::Sender;

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };
    let config_dir = match config_path.parent() {
        Some(p) => p.to_path_buf(),
        None => return,
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", e);
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {}", e);
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == &config_path)
                    && tx.send(AppEvent::ConfigReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piemenu::{Button, OpenPolicy};

    #[test]
    fn test_hex_color_parsing() {
        let cases = vec![
            ("#ffffff", Srgba::new(1.0, 1.0, 1.0, 1.0)),
            ("#000000", Srgba::new(0.0, 0.0, 0.0, 1.0)),
            ("#ff000080", Srgba::new(1.0, 0.0, 0.0, 128.0 / 255.0)),
        ];
        for (s, expected) in cases {
            assert_eq!(s.parse::<HexColor>(), Ok(HexColor(expected)));
        }

        for bad in ["ffffff", "#fff", "#gg0000", "#ff00ff0"] {
            assert!(bad.parse::<HexColor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_hex_color_display() {
        let color: HexColor = "#1a2b3c".parse().unwrap();
        assert_eq!(color.to_string(), "#1a2b3cff");
    }

    #[test]
    fn test_config_deserialization() {
        let json = r##"{
            "policy": { "open_policy": "TapHoldOpen", "trigger_button": "middle" },
            "appearance": { "outer_radius": 120.0, "fill_color": "#202020" },
            "menu": {
                "items": [
                    { "label": "Terminal", "icon": "utilities-terminal", "exec": "foot" },
                    { "label": "More", "items": [ { "label": "Files", "exec": "nautilus" } ] },
                    { "label": "Off", "enabled": false }
                ]
            }
        }"##;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.policy.open_policy, OpenPolicy::TapHold);
        assert_eq!(config.policy.trigger_button, Button::Middle);
        assert!(config.theme_colors);
        assert_eq!(config.menu.label.as_str(), "pied");
        assert_eq!(config.menu.items.len(), 3);
        assert!(!config.menu.items[0].is_submenu());
        assert!(config.menu.items[1].is_submenu());
        assert_eq!(config.menu.items[1].items[0].label.as_str(), "Files");
        assert!(!config.menu.items[2].enabled);

        let mut appearance = Appearance::default();
        config.appearance.apply(&mut appearance);
        assert_eq!(appearance.outer_radius(), 120.0);
        assert_eq!(appearance.inner_radius(), 20.0);
        assert!((appearance.fill_color.red - 32.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_radius_override_is_ignored() {
        let overrides = AppearanceConfig {
            outer_radius: Some(-3.0),
            inner_radius: Some(12.0),
            ..AppearanceConfig::default()
        };
        let mut appearance = Appearance::default();
        overrides.apply(&mut appearance);
        assert_eq!(appearance.outer_radius(), 100.0);
        assert_eq!(appearance.inner_radius(), 12.0);
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(!config.menu.items.is_empty());
        assert!(config.menu.items.iter().any(EntryConfig::is_submenu));
    }

    #[test]
    fn test_setup_menu_has_setup_slice() {
        let config = Config::setup();
        assert_eq!(config.menu.items.len(), 1);
        assert_eq!(
            config.menu.items[0].exec.as_ref().map(|e| e.as_str()),
            Some(SETUP_COMMAND)
        );
    }
}
