// SPDX-License-Identifier: PMPL-1.0-or-later

//! Service configuration.
//!
//! One document configures every service. All fields have defaults, so a
//! partial file (or none at all) is valid:
//!
//! ```yaml
//! log:
//!   log_path: logs
//!   write_source_file_and_line: true
//! messages:
//!   debug_mode: true
//! localization:
//!   localization_path: localization
//!   use_fallback_language: en
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub messages: MessageConfig,
    pub localization: LocalizationConfig,
    /// Responses are HTML; fallback trace output gets escaped.
    pub web: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for `trace.log`, `debug.log` and `profile.log`. The trace
    /// also accepts `stdout`.
    pub log_path: String,
    pub write_source_file_and_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Enables programming warnings, debug messages and technical info.
    pub debug_mode: bool,
    /// In debug mode, keep the source file and line on messages.
    pub show_source_location: bool,
    /// Seconds after which auto-closing messages disappear.
    pub auto_hide_time: u32,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            show_source_location: false,
            auto_hide_time: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Directory holding `config.json`, `languages.json`, `countries.json`
    /// and `texts.json`.
    pub localization_path: String,
    /// Extra text files merged over `texts.json`, in order.
    pub additional_files: Vec<String>,
    /// Mirror the loaded dictionary in the shared cache.
    pub use_cache: bool,
    /// Remember the chosen language in a cookie.
    pub use_cookie: bool,
    pub cookie_path: String,
    /// Consulted when a text has no translation in the requested language.
    pub use_fallback_language: String,
    /// Log a warning for every missing translation.
    pub warn_missing: bool,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            localization_path: String::new(),
            additional_files: Vec::new(),
            use_cache: false,
            use_cookie: false,
            cookie_path: "/".to_string(),
            use_fallback_language: String::new(),
            warn_missing: true,
        }
    }
}

impl Config {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::io(format!("Configuration file '{}' cannot be read!", path.display()), err)
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            serde_yaml::from_str(&raw).map_err(|err| {
                Error::Configuration(format!(
                    "Configuration file '{}' is invalid!\n\n{}",
                    path.display(),
                    err
                ))
            })
        } else {
            serde_json::from_str(&raw).map_err(|source| Error::Format {
                message: format!("Configuration file '{}' is invalid!", path.display()),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("smart-factory.yaml");
        fs::write(&path, "messages:\n  debug_mode: true\nlocalization:\n  use_fallback_language: en\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.messages.debug_mode);
        assert_eq!(config.messages.auto_hide_time, 3);
        assert_eq!(config.localization.use_fallback_language, "en");
        assert_eq!(config.localization.cookie_path, "/");
        assert!(config.localization.warn_missing);
    }

    #[test]
    fn json_config_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"log": {"log_path": "logs"}, "web": true}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.log.log_path, "logs");
        assert!(config.web);
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Format { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::load(Path::new("/no/such/config.yaml")),
            Err(Error::Io { .. })
        ));
    }
}
