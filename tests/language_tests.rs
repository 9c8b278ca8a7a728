// SPDX-License-Identifier: PMPL-1.0-or-later

//! Dictionary loading, language detection and lookups

use smart_factory::config::LocalizationConfig;
use smart_factory::error_handler::{ErrorLevel, ErrorSink};
use smart_factory::i18n::{DictionaryCache, LanguageManager, MemoryCache, Translations};
use smart_factory::request::RequestContext;
use smart_factory::trace::{SourceLocation, StackFrame};
use smart_factory::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn write_dictionary(dir: &Path) {
    fs::write(
        dir.join("config.json"),
        r#"{"interface_languages": ["en", "de", "fr"]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("languages.json"),
        r#"{
            "en": {"en": "English", "de": "Englisch"},
            "de": {"en": "German", "de": "Deutsch"},
            "fr": {"en": "French", "de": "Französisch"}
        }"#,
    )
    .unwrap();
    fs::write(
        dir.join("countries.json"),
        r#"{
            "DE": {"en": "Germany", "de": "Deutschland"},
            "FR": {"en": "France", "de": "Frankreich"},
            "AT": {"en": "Austria", "de": "Österreich"}
        }"#,
    )
    .unwrap();
    fs::write(
        dir.join("texts.json"),
        r#"{
            "greeting": {"en": "Hello", "de": "Hallo", "fr": "Bonjour"},
            "farewell": {"en": "Goodbye"}
        }"#,
    )
    .unwrap();
}

fn config_for(dir: &Path) -> LocalizationConfig {
    LocalizationConfig {
        localization_path: dir.display().to_string(),
        use_fallback_language: "en".to_string(),
        ..LocalizationConfig::default()
    }
}

fn loaded_manager(dir: &Path) -> LanguageManager {
    let mut manager = LanguageManager::new(config_for(dir));
    manager.load_dictionary().expect("dictionary should load");
    manager
}

#[test]
fn test_request_parameter_wins() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let mut manager = loaded_manager(dir.path());

    let request = RequestContext::new()
        .with_param("language", "de")
        .with_header("Content-Language", "fr")
        .with_header("Accept-Language", "fr-CA");
    assert_eq!(manager.detect_language(&request), "de");
    assert_eq!(manager.current_language(), "de");
    assert_eq!(manager.text("greeting", None, None), "Hallo");
}

#[test]
fn test_detection_priority_chain() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let mut manager = loaded_manager(dir.path());

    let header = RequestContext::new()
        .with_param("language", "xx")
        .with_header("Content-Language", "fr")
        .with_cookie("default_language", "de");
    assert_eq!(manager.detect_language(&header), "fr");

    let cookie = RequestContext::new()
        .with_cookie("default_language", "de")
        .with_header("Accept-Language", "fr");
    assert_eq!(manager.detect_language(&cookie), "de");

    let browser = RequestContext::new().with_header("Accept-Language", "es-ES, fr-CA;q=0.8, en;q=0.5");
    assert_eq!(manager.detect_language(&browser), "fr");

    assert_eq!(manager.detect_language(&RequestContext::new()), "en");
}

#[test]
fn test_unsupported_accept_language_falls_through() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let mut manager = loaded_manager(dir.path());

    let request = RequestContext::new().with_header("Accept-Language", "ja-JP,en;q=0.8");
    assert_eq!(manager.detect_language(&request), "en");
}

#[test]
fn test_context_cookie_and_language() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let mut manager = LanguageManager::new(LocalizationConfig {
        use_cookie: true,
        cookie_path: "/shop".to_string(),
        ..config_for(dir.path())
    });
    manager.load_dictionary().unwrap();

    manager.set_context("admin");
    let request = RequestContext::new().with_cookie("admin_language", "fr");
    assert_eq!(manager.detect_language(&request), "fr");

    let cookies = manager.take_cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "admin_language");
    assert_eq!(cookies[0].value, "fr");
    assert_eq!(cookies[0].path, "/shop");
    assert!(manager.take_cookies().is_empty());

    manager.set_context("default");
    assert_eq!(manager.current_language(), "en");
}

#[test]
fn test_missing_translation_uses_fallback_language() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let manager = loaded_manager(dir.path());

    assert_eq!(manager.text("farewell", Some("de"), None), "Goodbye");
    assert_eq!(manager.text("unknown", Some("de"), Some("Fallback")), "Fallback");
    assert_eq!(manager.text("unknown", Some("de"), None), "unknown");
    assert!(!manager.has_translation("farewell", Some("de")));
}

#[test]
fn test_missing_translation_is_reported_to_sink() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<(i32, String)>>);

    impl ErrorSink for Recorder {
        fn report_error(
            &self,
            code: i32,
            text: &str,
            _file: &str,
            _line: u32,
            _frames: &[StackFrame],
        ) -> smart_factory::Result<()> {
            self.0.lock().unwrap().push((code, text.to_string()));
            Ok(())
        }

        fn report_exception(
            &self,
            _error: &(dyn std::error::Error + 'static),
            _code: i32,
            _location: &SourceLocation,
            _frames: &[StackFrame],
        ) -> smart_factory::Result<()> {
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let recorder = Arc::new(Recorder::default());
    let mut manager = LanguageManager::new(config_for(dir.path())).with_error_sink(recorder.clone());
    manager.load_dictionary().unwrap();

    manager.text("farewell", Some("fr"), None);
    manager.text("greeting", Some("fr"), None);

    let reports = recorder.0.lock().unwrap();
    assert_eq!(
        *reports,
        vec![(
            ErrorLevel::UserWarning.code(),
            "No translation for the text 'farewell' in the language [fr]!".to_string()
        )]
    );
}

#[test]
fn test_extension_files_and_runtime_extension() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let extra = dir.path().join("shop.json");
    fs::write(&extra, r#"{"cart": {"en": "Cart", "de": "Warenkorb"}}"#).unwrap();

    let mut manager = LanguageManager::new(config_for(dir.path()));
    manager.add_localization_file(&extra);

    let additions: Translations =
        serde_json::from_str(r#"{"checkout": {"de": "Kasse"}}"#).unwrap();
    manager.extend_dictionary(additions).unwrap();

    assert!(manager.is_loaded());
    assert_eq!(manager.text("cart", Some("de"), None), "Warenkorb");
    assert_eq!(manager.text("checkout", Some("de"), None), "Kasse");
    assert_eq!(manager.text("greeting", Some("de"), None), "Hallo");
}

#[test]
fn test_dictionary_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let cache = MemoryCache::new();

    let mut first = LanguageManager::new(config_for(dir.path())).with_cache(Arc::new(cache.clone()));
    first.load_dictionary().unwrap();
    assert!(cache.fetch("dictionary_texts").is_some());

    // The files are gone; the second manager must not need them.
    fs::remove_file(dir.path().join("texts.json")).unwrap();

    let mut second = LanguageManager::new(config_for(dir.path())).with_cache(Arc::new(cache.clone()));
    second.load_dictionary().unwrap();
    assert_eq!(second.text("greeting", Some("fr"), None), "Bonjour");

    let mut uncached = LanguageManager::new(config_for(dir.path()));
    assert!(matches!(uncached.load_dictionary(), Err(Error::Io { .. })));
}

#[test]
fn test_names_codes_and_lists() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    let manager = loaded_manager(dir.path());

    assert_eq!(manager.language_name("de", Some("de")), "Deutsch");
    assert_eq!(manager.language_name("it", Some("de")), "it");
    assert_eq!(manager.language_code("französisch").as_deref(), Some("fr"));
    assert!(manager.validate_language_code("fr", Some("en")));
    assert!(!manager.validate_language_code("it", Some("en")));

    assert_eq!(manager.country_name("AT", Some("de")), "Österreich");
    assert_eq!(manager.country_code("frankreich").as_deref(), Some("FR"));

    let countries = manager.country_list(Some("en"), &["FR"]).unwrap();
    let codes: Vec<&str> = countries.keys().map(String::as_str).collect();
    assert_eq!(codes, vec!["FR", "AT", "DE"]);

    let languages = manager.language_list(Some("en"), &[]).unwrap();
    let names: Vec<&str> = languages.values().map(String::as_str).collect();
    assert_eq!(names, vec!["English", "French", "German"]);

    assert!(manager.language_list(Some("ja"), &[]).is_none());
}

#[test]
fn test_invalid_dictionary_file_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    write_dictionary(dir.path());
    fs::write(dir.path().join("languages.json"), "{\"en\": ").unwrap();

    let mut manager = LanguageManager::new(config_for(dir.path()));
    let err = manager.load_dictionary().unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
    assert!(err.to_string().contains("languages.json' is invalid!"));
}
