//! Configuration file support for gk
//!
//! Config file location: `~/.config/gk/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [ui]
//! double_click_ms = 300
//! scroll_align = "center"
//! diff_mode = "window"
//! separator = " "
//! status_timeout_ms = 4000
//! time_mode = "relative"
//! time_format = "%Y-%m-%d %H:%M"
//! graph_width = 10
//!
//! [log]
//! all = false
//! max_count = 5000
//! file = "/tmp/gk.log"
//!
//! [search]
//! regex = false
//! case_sensitive = false
//!
//! [theme.defs]
//! green1 = "#A3BE8C"
//!
//! [theme.colors]
//! diff_added = "green1"
//! selection = "dark_gray"
//! ```

use crate::color;
use crate::list::ScrollAlign;
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

// ============================================================================
// Theme Configuration
// ============================================================================

/// Color tokens; each value is a def name, hex, 256-color index or ANSI name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub text: Option<String>,
    pub text_muted: Option<String>,
    pub primary: Option<String>,
    pub accent: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub success: Option<String>,
    pub border: Option<String>,
    pub border_active: Option<String>,
    pub selection: Option<String>,
    pub search_match: Option<String>,
    pub commit_id: Option<String>,
    pub refs: Option<String>,
    pub diff_added: Option<String>,
    pub diff_removed: Option<String>,
    pub diff_hunk: Option<String>,
    pub diff_file: Option<String>,
    pub diff_meta: Option<String>,
    pub status_bar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Named color definitions (e.g., green1 = "#A3BE8C")
    pub defs: HashMap<String, String>,
    pub colors: ThemeColors,
}

/// Resolved theme, all ratatui colors ready to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub text_muted: Color,
    pub primary: Color,
    pub accent: Color,
    pub error: Color,
    pub warning: Color,
    pub success: Color,
    pub border: Color,
    pub border_active: Color,
    pub selection: Color,
    pub search_match: Color,
    pub commit_id: Color,
    pub refs: Color,
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_hunk: Color,
    pub diff_file: Color,
    pub diff_meta: Color,
    pub status_bar: Color,
}

impl Default for Theme {
    fn default() -> Self {
        ThemeConfig::default().resolve()
    }
}

/// Semantic color of a piece of row text, resolved against the theme at
/// draw time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Text,
    Muted,
    Primary,
    Accent,
    Error,
    Warning,
    Success,
    CommitId,
    Refs,
    DiffAdded,
    DiffRemoved,
    DiffHunk,
    DiffFile,
    DiffMeta,
}

impl Theme {
    pub fn fg(&self, tone: Tone) -> Color {
        match tone {
            Tone::Text => self.text,
            Tone::Muted => self.text_muted,
            Tone::Primary => self.primary,
            Tone::Accent => self.accent,
            Tone::Error => self.error,
            Tone::Warning => self.warning,
            Tone::Success => self.success,
            Tone::CommitId => self.commit_id,
            Tone::Refs => self.refs,
            Tone::DiffAdded => self.diff_added,
            Tone::DiffRemoved => self.diff_removed,
            Tone::DiffHunk => self.diff_hunk,
            Tone::DiffFile => self.diff_file,
            Tone::DiffMeta => self.diff_meta,
        }
    }

    pub fn style(&self, tone: Tone) -> Style {
        let style = Style::default().fg(self.fg(tone));
        match tone {
            Tone::DiffFile | Tone::Refs => style.add_modifier(Modifier::BOLD),
            _ => style,
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        let color = if focused {
            self.border_active
        } else {
            self.border
        };
        Style::default().fg(color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().bg(self.selection)
    }

    pub fn match_style(&self) -> Style {
        Style::default().bg(self.search_match).fg(Color::Black)
    }
}

impl ThemeConfig {
    /// Resolve tokens to concrete colors; unknown values fall back to
    /// terminal palette defaults
    pub fn resolve(&self) -> Theme {
        let defs = &self.defs;
        let colors = &self.colors;
        let resolve = |token: &Option<String>, fallback: Color| -> Color {
            token
                .as_deref()
                .and_then(|value| color::resolve_color(value, defs))
                .unwrap_or(fallback)
        };

        Theme {
            text: resolve(&colors.text, Color::Reset),
            text_muted: resolve(&colors.text_muted, Color::DarkGray),
            primary: resolve(&colors.primary, Color::Cyan),
            accent: resolve(&colors.accent, Color::Magenta),
            error: resolve(&colors.error, Color::Red),
            warning: resolve(&colors.warning, Color::Yellow),
            success: resolve(&colors.success, Color::Green),
            border: resolve(&colors.border, Color::DarkGray),
            border_active: resolve(&colors.border_active, Color::Gray),
            selection: resolve(&colors.selection, Color::DarkGray),
            search_match: resolve(&colors.search_match, Color::Yellow),
            commit_id: resolve(&colors.commit_id, Color::Yellow),
            refs: resolve(&colors.refs, Color::Green),
            diff_added: resolve(&colors.diff_added, Color::Green),
            diff_removed: resolve(&colors.diff_removed, Color::Red),
            diff_hunk: resolve(&colors.diff_hunk, Color::Cyan),
            diff_file: resolve(&colors.diff_file, Color::Reset),
            diff_meta: resolve(&colors.diff_meta, Color::Blue),
            status_bar: resolve(&colors.status_bar, Color::Blue),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// How commit dates are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    #[default]
    Relative,
    Absolute,
}

/// Initial display mode of the diff panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelMode {
    #[default]
    Window,
    Fullscreen,
}

/// UI configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Two clicks on the same cell within this many milliseconds are a double-click
    pub double_click_ms: u64,
    /// Where the selection lands when a list has to scroll
    pub scroll_align: ScrollAlign,
    /// Whether the diff panel opens as a window or fullscreen
    pub diff_mode: PanelMode,
    /// Placed between the segments of a segmented row
    pub separator: String,
    /// How long status bar messages stay up
    pub status_timeout_ms: u64,
    pub time_mode: TimeMode,
    /// Format for absolute dates (strftime or `[year]-[month]` syntax)
    pub time_format: String,
    /// Columns for the log's commit graph; 0 hides it
    pub graph_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            double_click_ms: 300,
            scroll_align: ScrollAlign::Center,
            diff_mode: PanelMode::Window,
            separator: " ".to_string(),
            status_timeout_ms: 4000,
            time_mode: TimeMode::Relative,
            time_format: String::new(),
            graph_width: 10,
        }
    }
}

/// What the log panel loads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Show commits from all refs
    pub all: bool,
    pub max_count: Option<usize>,
    /// Diagnostics log file; logging is off without one
    pub file: Option<PathBuf>,
}

/// Defaults for new searches
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub regex: bool,
    pub case_sensitive: bool,
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub log: LogConfig,
    pub search: SearchConfig,
    pub theme: ThemeConfig,
}

impl Config {
    /// Get all possible config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("gk").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("gk").join("config.toml"));
        }

        // Platform-specific config dir (~/Library/Application Support on macOS)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("gk").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load config from the XDG config path.
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| {
                Self::parse(&content)
                    .map_err(|e| {
                        eprintln!("Warning: Failed to parse config: {}", e);
                        e
                    })
                    .ok()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.ui.double_click_ms, 300);
        assert_eq!(config.ui.scroll_align, ScrollAlign::Center);
        assert_eq!(config.ui.separator, " ");
        assert_eq!(config.ui.graph_width, 10);
        assert!(!config.log.all);
        assert!(config.log.file.is_none());
        assert_eq!(config.theme.resolve(), Theme::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r##"
[ui]
double_click_ms = 450
scroll_align = "top"
diff_mode = "fullscreen"
time_mode = "absolute"
graph_width = 0

[log]
max_count = 200

[search]
regex = true

[theme.defs]
green1 = "#A3BE8C"

[theme.colors]
diff_added = "green1"
selection = "236"
"##,
        )
        .unwrap();
        assert_eq!(config.ui.double_click_ms, 450);
        assert_eq!(config.ui.scroll_align, ScrollAlign::Top);
        assert_eq!(config.ui.diff_mode, PanelMode::Fullscreen);
        assert_eq!(config.ui.time_mode, TimeMode::Absolute);
        assert_eq!(config.ui.status_timeout_ms, 4000);
        assert_eq!(config.ui.graph_width, 0);
        assert_eq!(config.log.max_count, Some(200));
        assert!(config.search.regex);
        assert!(!config.search.case_sensitive);

        let theme = config.theme.resolve();
        assert_eq!(theme.diff_added, Color::Rgb(163, 190, 140));
        assert_eq!(theme.selection, Color::Indexed(236));
        assert_eq!(theme.diff_removed, Color::Red);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::parse("[ui]\nscroll_align = \"sideways\"").is_err());
    }

    #[test]
    fn test_unknown_color_falls_back() {
        let config = Config::parse("[theme.colors]\ntext = \"notacolor\"").unwrap();
        assert_eq!(config.theme.resolve().text, Color::Reset);
    }
}
