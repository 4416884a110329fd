use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use super::collections::HashMap;
use crate::actor::focus::ShortcutCommand;
use crate::layout_engine::geometry::{Chrome, ScaleLimits};
use crate::model::window::MAX_Z_INDEX;
use crate::sys::keys::Key;

// keep in sync with the bundled floatpane.default.toml
const DEPRECATED_MAP: &[(&str, &str)] = &[("fit", "fit_to_square"), ("zoom_reset", "restore")];

pub fn data_dir() -> Option<PathBuf> { dirs::home_dir().map(|home| home.join(".floatpane")) }
pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("floatpane").join("config.toml"))
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    keys: HashMap<String, ShortcutCommand>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub settings: Settings,
    pub keys: Vec<(Key, ShortcutCommand)>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub geometry: GeometrySettings,
    #[serde(default)]
    pub gestures: GestureSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default)]
    pub focus: FocusSettings,
    #[serde(default)]
    pub host: HostSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GeometrySettings {
    #[serde(default = "default_abs_min_scale")]
    pub abs_min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Lower bound for both outer window dimensions
    #[serde(default = "default_min_window_size")]
    pub min_window_size: f64,
    #[serde(default = "default_header_height")]
    pub header_height: f64,
    /// Border thickness on each side of the viewport
    #[serde(default = "default_border_size")]
    pub border_size: f64,
    #[serde(default = "default_base_z_index")]
    pub base_z_index: i32,
    /// Gap kept between a maximized window and the screen edges
    #[serde(default = "default_screen_margin")]
    pub screen_margin: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            abs_min_scale: default_abs_min_scale(),
            max_scale: default_max_scale(),
            min_window_size: default_min_window_size(),
            header_height: default_header_height(),
            border_size: default_border_size(),
            base_z_index: default_base_z_index(),
            screen_margin: default_screen_margin(),
        }
    }
}

impl GeometrySettings {
    pub fn scale_limits(&self) -> ScaleLimits {
        ScaleLimits {
            min: self.abs_min_scale,
            max: self.max_scale,
        }
    }

    pub fn chrome(&self) -> Chrome {
        Chrome {
            header_height: self.header_height,
            border_size: self.border_size,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.abs_min_scale <= 0.0 {
            issues.push(format!("abs_min_scale must be positive, got {}", self.abs_min_scale));
        }
        if self.max_scale <= self.abs_min_scale {
            issues.push(format!(
                "max_scale ({}) must be greater than abs_min_scale ({})",
                self.max_scale, self.abs_min_scale
            ));
        }
        if self.min_window_size <= 0.0 {
            issues.push(format!(
                "min_window_size must be positive, got {}",
                self.min_window_size
            ));
        }
        if self.min_window_size <= self.header_height + 2.0 * self.border_size {
            issues.push(format!(
                "min_window_size ({}) leaves no room for a viewport below the header and border",
                self.min_window_size
            ));
        }
        if !(0..MAX_Z_INDEX / 2).contains(&self.base_z_index) {
            issues.push(format!(
                "base_z_index must be between 0 and {}, got {}",
                MAX_Z_INDEX / 2 - 1,
                self.base_z_index
            ));
        }
        for (name, value) in [
            ("header_height", self.header_height),
            ("border_size", self.border_size),
            ("screen_margin", self.screen_margin),
        ] {
            if value < 0.0 {
                issues.push(format!("{name} must be non-negative, got {value}"));
            }
        }

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GestureSettings {
    /// Two-finger distances below this are treated as this distance
    #[serde(default = "default_pinch_min_distance")]
    pub pinch_min_distance: f64,
    /// Largest per-frame pinch scale change, as a fraction
    #[serde(default = "default_pinch_max_step")]
    pub pinch_max_step: f64,
    /// Pinch ratios closer to 1 than this are ignored
    #[serde(default = "default_pinch_epsilon")]
    pub pinch_epsilon: f64,
    /// Scale change per wheel notch when zooming
    #[serde(default = "default_wheel_zoom_step")]
    pub wheel_zoom_step: f64,
    /// Pixels scrolled by one keyboard pan
    #[serde(default = "default_pan_step")]
    pub pan_step: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            pinch_min_distance: default_pinch_min_distance(),
            pinch_max_step: default_pinch_max_step(),
            pinch_epsilon: default_pinch_epsilon(),
            wheel_zoom_step: default_wheel_zoom_step(),
            pan_step: default_pan_step(),
        }
    }
}

impl GestureSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.pinch_min_distance < 0.0 {
            issues.push(format!(
                "pinch_min_distance must be non-negative, got {}",
                self.pinch_min_distance
            ));
        }
        if !(self.pinch_max_step > 0.0 && self.pinch_max_step < 1.0) {
            issues.push(format!(
                "pinch_max_step must be between 0 and 1, got {}",
                self.pinch_max_step
            ));
        }
        if self.pinch_epsilon < 0.0 || self.pinch_epsilon >= self.pinch_max_step {
            issues.push(format!(
                "pinch_epsilon must be non-negative and below pinch_max_step, got {}",
                self.pinch_epsilon
            ));
        }
        if !(self.wheel_zoom_step > 0.0 && self.wheel_zoom_step < 1.0) {
            issues.push(format!(
                "wheel_zoom_step must be between 0 and 1, got {}",
                self.wheel_zoom_step
            ));
        }
        if self.pan_step <= 0.0 {
            issues.push(format!("pan_step must be positive, got {}", self.pan_step));
        }

        issues
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PersistenceSettings {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "debounce_ms", default = "default_debounce")]
    pub debounce: Duration,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Directory for the file-backed store; defaults to ~/.floatpane
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            storage_key: default_storage_key(),
            store_dir: None,
        }
    }
}

impl PersistenceSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.debounce.is_zero() {
            issues.push("debounce_ms must be at least 1".to_string());
        }
        if self.storage_key.trim().is_empty() {
            issues.push("storage_key must not be empty".to_string());
        }
        issues
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FocusSettings {
    /// Two Escape presses closer than this close every window
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "escape_double_press_ms", default = "default_escape_window")]
    pub escape_double_press: Duration,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            escape_double_press: default_escape_window(),
        }
    }
}

/// Describes the host canvas grid that content is detached from.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct HostSettings {
    #[serde(default = "default_cell_size")]
    pub cell_width: f64,
    #[serde(default = "default_cell_size")]
    pub cell_height: f64,
    #[serde(default = "default_cell_gap")]
    pub cell_gap: f64,
    /// Host canvas zoom level used as the reference for default window sizes
    #[serde(default = "default_min_canvas_scale")]
    pub min_canvas_scale: f64,
    #[serde(default = "default_content_size")]
    pub content_width: f64,
    #[serde(default = "default_content_size")]
    pub content_height: f64,
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Panel ids in canonical order
    #[serde(default = "default_panels")]
    pub panels: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            cell_width: default_cell_size(),
            cell_height: default_cell_size(),
            cell_gap: default_cell_gap(),
            min_canvas_scale: default_min_canvas_scale(),
            content_width: default_content_size(),
            content_height: default_content_size(),
            columns: default_columns(),
            panels: default_panels(),
        }
    }
}

impl HostSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.cell_width <= 0.0 || self.cell_height <= 0.0 {
            issues.push("cell_width and cell_height must be positive".to_string());
        }
        if self.cell_gap < 0.0 {
            issues.push(format!("cell_gap must be non-negative, got {}", self.cell_gap));
        }
        if self.min_canvas_scale <= 0.0 {
            issues.push(format!(
                "min_canvas_scale must be positive, got {}",
                self.min_canvas_scale
            ));
        }
        if self.content_width <= 0.0 || self.content_height <= 0.0 {
            issues.push("content_width and content_height must be positive".to_string());
        }
        if self.columns == 0 {
            issues.push("columns must be at least 1".to_string());
        }
        if self.panels.is_empty() {
            issues.push("panels must list at least one panel id".to_string());
        }
        let mut seen = super::collections::HashSet::default();
        for panel in &self.panels {
            if !seen.insert(panel) {
                issues.push(format!("Duplicate panel id '{panel}'"));
            }
        }

        issues
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.geometry.validate());
        issues.extend(self.gestures.validate());
        issues.extend(self.persistence.validate());
        issues.extend(self.host.validate());
        issues
    }
}

fn default_abs_min_scale() -> f64 { 0.1 }
fn default_max_scale() -> f64 { 3.0 }
fn default_min_window_size() -> f64 { 200.0 }
fn default_header_height() -> f64 { 32.0 }
fn default_border_size() -> f64 { 2.0 }
fn default_base_z_index() -> i32 { 1000 }
fn default_screen_margin() -> f64 { 24.0 }

fn default_pinch_min_distance() -> f64 { 180.0 }
fn default_pinch_max_step() -> f64 { 0.12 }
fn default_pinch_epsilon() -> f64 { 0.01 }
fn default_wheel_zoom_step() -> f64 { 0.1 }
fn default_pan_step() -> f64 { 40.0 }

fn default_debounce() -> Duration { Duration::from_millis(500) }
fn default_storage_key() -> String { "floatpane.windows".to_string() }
fn default_escape_window() -> Duration { Duration::from_millis(400) }

fn default_cell_size() -> f64 { 800.0 }
fn default_cell_gap() -> f64 { 20.0 }
fn default_min_canvas_scale() -> f64 { 0.5 }
fn default_content_size() -> f64 { 760.0 }
fn default_columns() -> u32 { 4 }
fn default_panels() -> Vec<String> { (1..=8).map(|i| format!("panel-{i}")).collect() }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../floatpane.default.toml"))
            .expect("bundled default config must parse")
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile {
            settings: self.settings.clone(),
            keys: self.keys.iter().map(|(key, command)| (key.to_string(), *command)).collect(),
        };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        let mut seen = super::collections::HashSet::default();
        for (key, _) in &self.keys {
            if !seen.insert(*key) {
                issues.push(format!("Key '{key}' is bound more than once"));
            }
        }

        issues
    }

    /// no need to pull in a dep for just this
    fn levenshtein(a: &str, b: &str) -> usize {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let mut d = vec![vec![0usize; b_chars.len() + 1]; a_chars.len() + 1];
        for (i, row) in d.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=b_chars.len() {
            d[0][j] = j;
        }
        for i in 1..=a_chars.len() {
            for j in 1..=b_chars.len() {
                let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
                d[i][j] = std::cmp::min(
                    std::cmp::min(d[i - 1][j] + 1, d[i][j - 1] + 1),
                    d[i - 1][j - 1] + cost,
                );
            }
        }
        d[a_chars.len()][b_chars.len()]
    }

    // Pulls the token out of serde's "unknown variant `...`" message.
    fn extract_unknown_variant(err: &str) -> Option<String> {
        let needle = "unknown variant `";
        let start = err.find(needle)?;
        let rest = &err[start + needle.len()..];
        let end = rest.find('`')?;
        Some(rest[..end].to_string())
    }

    // Closest builtin shortcut command, plus its replacement if the match is a
    // deprecated name.
    fn suggest_similar_command(unknown: &str) -> Option<(String, Option<String>)> {
        let unknown = unknown.to_lowercase();

        for &(dep, repl) in DEPRECATED_MAP.iter() {
            if dep == unknown {
                return Some((repl.to_string(), None));
            }
        }

        let best = ShortcutCommand::builtin_candidates()
            .iter()
            .map(|cand| (cand, Self::levenshtein(&unknown, cand)))
            .min_by_key(|(_, dist)| *dist)?;

        let (cand, dist) = best;
        let threshold = std::cmp::max(3usize, cand.len() / 2);
        if dist > threshold {
            return None;
        }
        let replacement = DEPRECATED_MAP
            .iter()
            .find(|(dep, _)| *dep == cand.as_str())
            .map(|(_, repl)| repl.to_string());
        Some((cand.clone(), replacement))
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<ConfigFile>(buf) {
            Ok(c) => {
                let mut keys = Vec::new();
                for (key, cmd) in c.keys {
                    let Ok(parsed) = Key::from_str(&key) else {
                        bail!("Could not parse key: {key}");
                    };
                    keys.push((parsed, cmd));
                }
                keys.sort_by_key(|(key, _)| key.to_string());
                Ok(Config { settings: c.settings, keys })
            }
            Err(e) => {
                let msg = e.to_string();
                let Some(unknown) = Self::extract_unknown_variant(&msg) else {
                    bail!("{msg}");
                };
                match Self::suggest_similar_command(&unknown) {
                    Some((suggestion, Some(repl))) => bail!(
                        "{msg}\nDid you mean `{suggestion}`? Note: `{suggestion}` is deprecated; use `{repl}` instead."
                    ),
                    Some((suggestion, None)) => bail!("{msg}\nDid you mean `{suggestion}`?"),
                    None => bail!("{msg}"),
                }
            }
        }
    }
}
