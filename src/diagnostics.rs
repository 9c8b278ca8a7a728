// SPDX-License-Identifier: PMPL-1.0-or-later

//! Installation self-check: log directory, trace file, translation files.

use crate::config::Config;
use crate::error_handler::TRACE_FILE;
use crate::i18n::LanguageManager;
use crate::logfile;
use crate::profiler::{DEBUG_FILE, PROFILE_FILE};
use anyhow::{anyhow, Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

const TRANSLATION_FILES: [&str; 4] = ["config.json", "languages.json", "countries.json", "texts.json"];

pub fn run_self_check(config: &Config) -> Result<()> {
    println!("smart-factory self-check");

    let checks = collect_checks(config);

    println!();
    for entry in &checks {
        entry.print();
    }

    if checks.iter().any(|entry| entry.level == Level::Error) {
        Err(anyhow!("self-check reported issues"))
    } else {
        Ok(())
    }
}

fn collect_checks(config: &Config) -> Vec<Diagnostic> {
    let mut checks = vec![
        Diagnostic::ok("version", format!("smart-factory {}", env!("CARGO_PKG_VERSION"))),
        Diagnostic::ok(
            "messages",
            format!(
                "debug mode {}, auto-hide after {}s",
                if config.messages.debug_mode { "on" } else { "off" },
                config.messages.auto_hide_time
            ),
        ),
    ];

    checks.extend(check_log_path(&config.log.log_path));
    checks.extend(check_localization(config));
    checks
}

fn check_log_path(log_path: &str) -> Vec<Diagnostic> {
    if log_path.is_empty() {
        return vec![Diagnostic::warning(
            "log directory",
            "not configured (traces go to standard output)".to_string(),
        )];
    }
    if log_path == "stdout" {
        return vec![Diagnostic::ok(
            "log directory",
            "traces go to standard output".to_string(),
        )];
    }

    let dir = logfile::normalize_dir(log_path);
    let directory = check_directory("log directory", &dir);
    if directory.level == Level::Error {
        return vec![directory];
    }

    let mut checks = vec![directory];
    for (label, file) in [
        ("trace file", TRACE_FILE),
        ("debug file", DEBUG_FILE),
        ("profile file", PROFILE_FILE),
    ] {
        let path = dir.join(file);
        checks.push(if logfile::can_write(&dir, &path) {
            Diagnostic::ok(label, format!("{} writable", path.display()))
        } else {
            Diagnostic::error(label, format!("{} is not writable", path.display()))
        });
    }
    checks
}

fn check_localization(config: &Config) -> Vec<Diagnostic> {
    let localization = &config.localization;
    if localization.localization_path.is_empty() {
        return vec![Diagnostic::warning(
            "localization",
            "not configured (set localization.localization_path)".to_string(),
        )];
    }

    let dir = Path::new(&localization.localization_path);
    let directory = check_directory("localization", dir);
    if directory.level == Level::Error {
        return vec![directory];
    }

    let mut checks = vec![directory];
    for file in TRANSLATION_FILES {
        checks.push(check_translation_file(file, &dir.join(file)));
    }
    for file in &localization.additional_files {
        checks.push(check_translation_file("extension file", Path::new(file)));
    }

    if checks.iter().all(|entry| entry.level != Level::Error) {
        let mut manager = LanguageManager::new(localization.clone());
        checks.push(match manager.load_dictionary() {
            Ok(()) if manager.supported_languages().is_empty() => Diagnostic::warning(
                "dictionary",
                "no interface languages configured".to_string(),
            ),
            Ok(()) => Diagnostic::ok(
                "dictionary",
                format!(
                    "interface languages: {}",
                    manager
                        .supported_languages()
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
            Err(err) => Diagnostic::error("dictionary", err.to_string()),
        });
    }
    checks
}

#[derive(Debug, PartialEq, Eq)]
enum Level {
    Ok,
    Warn,
    Error,
}

#[derive(Debug)]
struct Diagnostic {
    label: &'static str,
    level: Level,
    detail: String,
}

impl Diagnostic {
    fn new(label: &'static str, level: Level, detail: String) -> Self {
        Self {
            label,
            level,
            detail,
        }
    }

    fn ok(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Ok, detail)
    }

    fn warning(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Warn, detail)
    }

    fn error(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Error, detail)
    }

    fn print(&self) {
        println!("  [{}] {:16} {}", self.level.tag(), self.label, self.detail);
    }
}

impl Level {
    fn tag(&self) -> ColoredString {
        match self {
            Level::Ok => "OK".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERR".red().bold(),
        }
    }
}

fn check_directory(label: &'static str, path: &Path) -> Diagnostic {
    if path.is_dir() {
        Diagnostic::ok(label, format!("{} exists", path.display()))
    } else if path.exists() {
        Diagnostic::error(label, format!("{} exists but is not a directory", path.display()))
    } else {
        Diagnostic::error(label, format!("{} missing", path.display()))
    }
}

fn check_translation_file(label: &'static str, path: &Path) -> Diagnostic {
    let parsed = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .and_then(|raw| {
            serde_json::from_str::<serde_json::Value>(&raw)
                .with_context(|| format!("parsing {}", path.display()))
        });

    match parsed {
        Ok(serde_json::Value::Object(entries)) => {
            Diagnostic::ok(label, format!("{} ({} entries)", path.display(), entries.len()))
        }
        Ok(_) => Diagnostic::error(label, format!("{} is not a JSON object", path.display())),
        Err(err) => Diagnostic::error(label, format!("{:#}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn levels(checks: &[Diagnostic]) -> Vec<(&'static str, &Level)> {
        checks.iter().map(|c| (c.label, &c.level)).collect()
    }

    #[test]
    fn unconfigured_paths_only_warn() {
        let checks = collect_checks(&Config::default());
        assert!(checks.iter().all(|c| c.level != Level::Error));
        assert!(levels(&checks).contains(&("localization", &Level::Warn)));
    }

    #[test]
    fn missing_log_directory_is_an_error() {
        let checks = check_log_path("/no/such/smart-factory/logs");
        assert_eq!(levels(&checks), vec![("log directory", &Level::Error)]);
    }

    #[test]
    fn complete_installation_passes() {
        let logs = TempDir::new().unwrap();
        let localization = TempDir::new().unwrap();
        fs::write(
            localization.path().join("config.json"),
            r#"{"interface_languages": ["en"]}"#,
        )
        .unwrap();
        for file in ["languages.json", "countries.json", "texts.json"] {
            fs::write(localization.path().join(file), "{}").unwrap();
        }

        let mut config = Config::default();
        config.log.log_path = logs.path().display().to_string();
        config.localization.localization_path = localization.path().display().to_string();

        let checks = collect_checks(&config);
        assert!(checks.iter().all(|c| c.level == Level::Ok), "{:?}", checks);
    }

    #[test]
    fn invalid_translation_file_is_reported() {
        let localization = TempDir::new().unwrap();
        for file in TRANSLATION_FILES {
            fs::write(localization.path().join(file), "{}").unwrap();
        }
        fs::write(localization.path().join("texts.json"), "{ broken").unwrap();

        let mut config = Config::default();
        config.localization.localization_path = localization.path().display().to_string();

        let checks = check_localization(&config);
        assert!(levels(&checks).contains(&("texts.json", &Level::Error)));
        assert!(!checks.iter().any(|c| c.label == "dictionary"));
    }
}
