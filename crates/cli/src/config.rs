//! Configuration loading from stays.toml.

use std::path::{Path, PathBuf};

use protocol::{DisplayMode, SortOrder, Theme};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// What the sandbox host exposes.
    #[serde(default)]
    pub host: HostConfig,

    /// Arguments the widget is launched with.
    #[serde(default)]
    pub tool_input: ToolInputConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Sandbox host configuration.
#[derive(Debug, Deserialize)]
pub struct HostConfig {
    #[serde(default = "enabled")]
    pub call_tool: bool,

    #[serde(default = "enabled")]
    pub set_widget_state: bool,

    #[serde(default = "enabled")]
    pub send_follow_up_message: bool,

    pub theme: Option<Theme>,

    pub display_mode: Option<DisplayMode>,

    /// Artificial delay added to every tool call, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            call_tool: true,
            set_widget_state: true,
            send_follow_up_message: true,
            theme: None,
            display_mode: None,
            latency_ms: 0,
        }
    }
}

/// Initial `toolInput`. Unset fields are left out.
#[derive(Debug, Default, Deserialize)]
pub struct ToolInputConfig {
    pub city: Option<String>,
    pub min_rating: Option<f64>,
    pub sort: Option<SortOrder>,
}

impl ToolInputConfig {
    /// The `toolInput` global, or `None` if nothing is configured.
    pub fn to_value(&self) -> Option<Value> {
        let mut input = Map::new();
        if let Some(city) = &self.city {
            input.insert("city".into(), Value::from(city.clone()));
        }
        if let Some(min_rating) = self.min_rating {
            input.insert("min_rating".into(), Value::from(min_rating));
        }
        if let Some(sort) = self.sort {
            input.insert("sort".into(), Value::from(sort.as_str()));
        }
        (!input.is_empty()).then_some(Value::Object(input))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with an array of stays. The bundled catalog is used if unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.host.call_tool);
        assert!(config.host.set_widget_state);
        assert_eq!(config.host.latency_ms, 0);
        assert_eq!(config.log.filter, "warn");
        assert!(config.tool_input.to_value().is_none());
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[host]
call_tool = false
theme = "dark"
display_mode = "fullscreen"
latency_ms = 250

[tool_input]
city = "Paris"
sort = "price"

[catalog]
path = "data/stays.json"

[log]
filter = "bridge=debug"
"#;
        let config = Config::parse(toml).unwrap();
        assert!(!config.host.call_tool);
        assert!(config.host.send_follow_up_message);
        assert_eq!(config.host.theme, Some(Theme::Dark));
        assert_eq!(config.host.display_mode, Some(DisplayMode::Fullscreen));
        assert_eq!(config.host.latency_ms, 250);
        assert_eq!(
            config.tool_input.to_value(),
            Some(json!({"city": "Paris", "sort": "price"}))
        );
        assert_eq!(config.catalog.path, Some(PathBuf::from("data/stays.json")));
        assert_eq!(config.log.filter, "bridge=debug");
    }

    #[test]
    fn invalid_theme_is_an_error() {
        let err = Config::parse("[host]\ntheme = \"sepia\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
