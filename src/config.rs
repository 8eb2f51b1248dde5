//! Configuration file support for winbar.
//!
//! Loads settings from ~/.config/winbar/config.toml if it exists,
//! otherwise uses the built-in defaults.
//!
//! Also provides `BarConfig` - the validated runtime configuration with
//! compiled icon and title rules. It is built once at startup and passed
//! by reference to the renderer.

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::icon::{IconResolver, IconRule};
use crate::title::{FormatterRule, TitleFormatter};

/// Name of the click handler executable installed next to `winbar`.
pub const FOCUS_COMMAND_NAME: &str = "winbar-focus";

// =============================================================================
// Runtime Configuration (validated values)
// =============================================================================

/// Underline and text colors, as hex literals understood by the bar.
#[derive(Debug, Clone)]
pub struct Palette {
    pub focused: String,
    pub urgent: String,
    pub unfocused: String,
    pub focused_text: String,
}

/// Immutable rendering configuration.
#[derive(Debug, Clone)]
pub struct BarConfig {
    pub icons: IconResolver,
    pub titles: TitleFormatter,
    /// 1-based bar font index used for icon glyphs
    pub icon_font: u32,
    /// Pixel offset inserted between window fragments
    pub separator_offset: u32,
    /// Command the bar runs (with the window id appended) on left click
    pub click_command: String,
    pub colors: Palette,
}

impl BarConfig {
    /// Validate a file configuration and compile its rules.
    ///
    /// Every configuration defect is reported here, before the bar starts
    /// listening for events.
    pub fn from_config(config: &Config, identity: &Identity) -> Result<Self> {
        let icons = config
            .icons
            .iter()
            .map(|rule| IconRule::parse(&rule.pattern, &rule.glyph))
            .collect::<Result<Vec<_>>>()
            .context("invalid icon rule")?;
        let icons = IconResolver::new(icons)?;

        let formatters = config
            .formatters
            .iter()
            .map(|rule| {
                FormatterRule::new(
                    &rule.class,
                    &identity.expand(&rule.strip),
                    &identity.expand(&rule.replace),
                )
            })
            .collect::<Result<Vec<_>>>()
            .context("invalid formatter rule")?;
        let titles = TitleFormatter::new(formatters, config.general.max_length)?;

        let colors = Palette {
            focused: checked_color("focused", &config.colors.focused)?,
            urgent: checked_color("urgent", &config.colors.urgent)?,
            unfocused: checked_color("unfocused", &config.colors.unfocused)?,
            focused_text: checked_color("focused_text", &config.colors.focused_text)?,
        };

        let click_command = match &config.general.click_command {
            Some(command) => shellexpand::tilde(command).into_owned(),
            None => default_click_command()?,
        };

        Ok(Self {
            icons,
            titles,
            icon_font: config.general.icon_font,
            separator_offset: config.general.separator_offset,
            click_command,
            colors,
        })
    }
}

/// `winbar-focus` in the directory of the running executable.
pub fn default_click_command() -> Result<String> {
    let exe = std::env::current_exe().context("locate running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    let dir = exe
        .parent()
        .with_context(|| format!("executable {:?} has no parent directory", exe))?;
    Ok(dir.join(FOCUS_COMMAND_NAME).to_string_lossy().into_owned())
}

fn checked_color(name: &str, value: &str) -> Result<String> {
    if parse_color(value).is_none() {
        bail!("invalid {} color {:?} (expected #rgb, #argb, #rrggbb or #aarrggbb)", name, value);
    }
    Ok(value.to_string())
}

/// Parse a bar color literal (e.g., "#fff" or "#b4619a") to u32
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#')?;
    if !matches!(hex.len(), 3 | 4 | 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

// =============================================================================
// Identity (placeholder values for formatter rules)
// =============================================================================

/// Login and host name substituted for `{user}` and `{host}` in rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub host: String,
}

impl Identity {
    pub fn new(user: &str, host: &str) -> Self {
        Self {
            user: user.to_string(),
            host: host.to_string(),
        }
    }

    /// Identity of the current process.
    pub fn current() -> Self {
        Self {
            user: current_user().unwrap_or_default(),
            host: host_name().unwrap_or_default(),
        }
    }

    pub fn expand(&self, s: &str) -> String {
        s.replace("{user}", &self.user).replace("{host}", &self.host)
    }
}

fn current_user() -> Option<String> {
    for var in ["LOGNAME", "USER", "LNAME", "USERNAME"] {
        if let Ok(user) = std::env::var(var) {
            if !user.is_empty() {
                return Some(user);
            }
        }
    }

    // SAFETY: getpwuid returns NULL or a pointer to a static passwd entry,
    // and pw_name is a NUL-terminated string inside it.
    unsafe {
        let pw = libc::getpwuid(libc::geteuid());
        if pw.is_null() || (*pw).pw_name.is_null() {
            return None;
        }
        CStr::from_ptr((*pw).pw_name).to_str().ok().map(str::to_owned)
    }
}

fn host_name() -> Option<String> {
    match hostname::get() {
        Ok(host) => Some(host.to_string_lossy().into_owned()),
        Err(e) => {
            log::warn!("Failed to read host name: {}", e);
            None
        }
    }
}

// =============================================================================
// File-based Configuration (TOML parsing)
// =============================================================================

/// Top-level configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub colors: ColorConfig,
    /// Ordered icon rules; replaces the defaults when present
    pub icons: Vec<IconRuleConfig>,
    /// Ordered title formatters; replaces the defaults when present
    pub formatters: Vec<FormatterConfig>,
}

/// General settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Longest title shown before truncation
    pub max_length: usize,
    pub icon_font: u32,
    pub separator_offset: u32,
    /// Click handler; defaults to winbar-focus next to the winbar binary
    pub click_command: Option<String>,
}

/// Color settings (hex strings like "#b4619a")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub focused: String,
    pub urgent: String,
    pub unfocused: String,
    pub focused_text: String,
}

/// One `[[icons]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct IconRuleConfig {
    /// "*" or field=value, e.g. "class=Spotify"
    #[serde(rename = "match")]
    pub pattern: String,
    pub glyph: String,
}

impl IconRuleConfig {
    pub fn new(pattern: &str, glyph: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            glyph: glyph.to_string(),
        }
    }
}

/// One `[[formatters]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct FormatterConfig {
    /// Regex matched against the start of the window class
    pub class: String,
    /// Text removed from the title; may contain {user} and {host}
    pub strip: String,
    #[serde(default)]
    pub replace: String,
}

impl FormatterConfig {
    pub fn new(class: &str, strip: &str) -> Self {
        Self {
            class: class.to_string(),
            strip: strip.to_string(),
            replace: String::new(),
        }
    }
}

impl Config {
    /// Load config from default path (~/.config/winbar/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("winbar")
            .join("config.toml")
    }

    /// Load config from a path, falling back to defaults on any error
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Load config from a path given explicitly by the user
    pub fn load_required(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let contents = std::fs::read_to_string(&expanded)
            .with_context(|| format!("read config {:?}", expanded))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("parse config {:?}", expanded))?;
        log::info!("Loaded config from {:?}", expanded);
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            colors: ColorConfig::default(),
            icons: default_icons(),
            formatters: default_formatters(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_length: 10,
            icon_font: 3,
            separator_offset: 12,
            click_command: None,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            focused: "#b4619a".to_string(),
            urgent: "#e84f4f".to_string(),
            unfocused: "#404040".to_string(),
            focused_text: "#fff".to_string(),
        }
    }
}

fn default_icons() -> Vec<IconRuleConfig> {
    vec![
        IconRuleConfig::new("class=Spotify", "\u{f9c6}"),
        IconRuleConfig::new("class=Emacs", "\u{e779}"),
        IconRuleConfig::new("class=firefox", "\u{e745}"),
        IconRuleConfig::new("class=XTerm", "\u{e795}"),
        IconRuleConfig::new("class=Code", "\u{e70c}"),
        IconRuleConfig::new("class=code-oss-dev", "\u{e70c}"),
        IconRuleConfig::new("class=Signal", "\u{f70d}"),
        IconRuleConfig::new("*", "\u{f2d0}"),
    ]
}

fn default_formatters() -> Vec<FormatterConfig> {
    vec![
        FormatterConfig::new("Chromium", " – Chromium"),
        FormatterConfig::new("Firefox", " – Mozilla Firefox"),
        FormatterConfig::new("Emacs", " – Doom Emacs"),
        FormatterConfig::new("XTerm", "{user}@{host}: "),
    ]
}
