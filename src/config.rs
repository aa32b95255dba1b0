use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How rendered inline fields are laid out; only changes a CSS class suffix.
#[derive(
    clap::ValueEnum, Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq,
)]
#[serde(rename_all = "kebab-case")]
pub enum FieldDisplayMode {
    #[default]
    Inline,
    Compact,
    HiddenKey,
}

impl FieldDisplayMode {
    /// Class suffix appended to field widgets.
    pub const fn class_suffix(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Compact => "compact",
            Self::HiddenKey => "hidden-key",
        }
    }
}

/// Options that shape inline field and inline query rendering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Prefix marking inline code as an expression query
    pub inline_query_prefix: String,
    /// Prefix marking inline code as a script query
    pub inline_js_query_prefix: String,
    /// Evaluate expression queries
    pub enable_inline_dataview: bool,
    /// Evaluate script queries
    pub enable_inline_dataview_js: bool,
    /// Layout class for field widgets
    pub inline_field_display_mode: FieldDisplayMode,
    /// Replace fields with widgets in live preview (marks only when false)
    pub pretty_render_inline_fields_in_live_preview: bool,
    /// Text shown for null values
    pub render_null_as: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inline_query_prefix: "=".to_string(),
            inline_js_query_prefix: "$=".to_string(),
            enable_inline_dataview: true,
            enable_inline_dataview_js: false,
            inline_field_display_mode: FieldDisplayMode::Inline,
            pretty_render_inline_fields_in_live_preview: true,
            render_null_as: "-".to_string(),
        }
    }
}

/// Settings overrides collected from command-line style flags.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub query_prefix: Option<String>,
    pub js_query_prefix: Option<String>,
    pub no_inline_queries: bool,
    pub inline_js: bool,
    pub field_mode: Option<FieldDisplayMode>,
    pub source_mode: bool,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
}

impl SettingsOverrides {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            query_prefix: other.query_prefix.clone().or_else(|| self.query_prefix.clone()),
            js_query_prefix: other
                .js_query_prefix
                .clone()
                .or_else(|| self.js_query_prefix.clone()),
            no_inline_queries: self.no_inline_queries || other.no_inline_queries,
            inline_js: self.inline_js || other.inline_js,
            field_mode: other.field_mode.or(self.field_mode),
            source_mode: self.source_mode || other.source_mode,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Apply the overrides on top of loaded settings.
    pub fn apply(&self, settings: &Settings) -> Settings {
        let mut out = settings.clone();
        if let Some(prefix) = &self.query_prefix {
            out.inline_query_prefix.clone_from(prefix);
        }
        if let Some(prefix) = &self.js_query_prefix {
            out.inline_js_query_prefix.clone_from(prefix);
        }
        if self.no_inline_queries {
            out.enable_inline_dataview = false;
        }
        if self.inline_js {
            out.enable_inline_dataview_js = true;
        }
        if let Some(mode) = self.field_mode {
            out.inline_field_display_mode = mode;
        }
        out
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("live-preview").join("settings.json");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("live-preview")
                .join("settings.json");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("live-preview").join("settings.json");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("live-preview")
                .join("settings.json");
        }
    }

    PathBuf::from(".live-preview.json")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".live-preview.json")
}

/// Load settings from a JSON file; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    Ok(load_settings_value(path)?
        .map(serde_json::from_value::<Settings>)
        .transpose()
        .with_context(|| format!("Invalid settings in {}", path.display()))?
        .unwrap_or_default())
}

/// Load the global settings and let keys present in the local file win.
pub fn load_layered_settings(global: &Path, local: &Path) -> Result<Settings> {
    let mut merged = serde_json::to_value(Settings::default())
        .context("Failed to serialize default settings")?;
    for path in [global, local] {
        let Some(serde_json::Value::Object(layer)) = load_settings_value(path)? else {
            continue;
        };
        if let serde_json::Value::Object(base) = &mut merged {
            base.extend(layer);
        }
    }
    serde_json::from_value(merged).context("Invalid merged settings")
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("Failed to write settings {}", path.display()))
}

pub fn clear_settings(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

fn load_settings_value(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse settings {}", path.display()))
}

pub fn parse_flag_tokens(tokens: &[String]) -> SettingsOverrides {
    let mut flags = SettingsOverrides::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--no-inline-queries" {
            flags.no_inline_queries = true;
        } else if token == "--inline-js" {
            flags.inline_js = true;
        } else if token == "--source-mode" {
            flags.source_mode = true;
        } else if token == "--perf" {
            flags.perf = true;
        } else if token == "--query-prefix" {
            if let Some(next) = tokens.get(i + 1) {
                flags.query_prefix = Some(next.clone());
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--query-prefix=") {
            flags.query_prefix = Some(value.to_string());
        } else if token == "--js-query-prefix" {
            if let Some(next) = tokens.get(i + 1) {
                flags.js_query_prefix = Some(next.clone());
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--js-query-prefix=") {
            flags.js_query_prefix = Some(value.to_string());
        } else if token == "--field-mode" {
            if let Some(next) = tokens.get(i + 1) {
                flags.field_mode = parse_field_mode(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--field-mode=") {
            flags.field_mode = parse_field_mode(value);
        } else if token == "--render-debug-log" {
            if let Some(next) = tokens.get(i + 1) {
                flags.render_debug_log = Some(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--render-debug-log=") {
            flags.render_debug_log = Some(PathBuf::from(value));
        }
        i += 1;
    }
    flags
}

fn parse_field_mode(s: &str) -> Option<FieldDisplayMode> {
    match s {
        "inline" => Some(FieldDisplayMode::Inline),
        "compact" => Some(FieldDisplayMode::Compact),
        "hidden-key" => Some(FieldDisplayMode::HiddenKey),
        _ => None,
    }
}
