// SPDX-License-Identifier: PMPL-1.0-or-later

//! Translations, language detection and language/country name lookups.
//!
//! The dictionary is read from JSON files in the localization directory:
//!
//! | File             | Content                                          |
//! |------------------|--------------------------------------------------|
//! | `config.json`    | `interface_languages`: the supported UI codes    |
//! | `languages.json` | language names, keyed by code then by language   |
//! | `countries.json` | country names, keyed by code then by language    |
//! | `texts.json`     | free texts, keyed by text id then by language    |
//!
//! Extension files registered with
//! [`LanguageManager::add_localization_file`] use the `texts.json` shape
//! and are merged over it in order.
//!
//! ## Lookup
//!
//! Missing translations never fail. [`LanguageManager::text`] warns (unless
//! `warn_missing` is off) and falls back to the fallback language, then to
//! the caller's default, then to the text id itself.
//!
//! ## Contexts
//!
//! The current language is remembered per context, so that e.g. an admin
//! area and a public site can be in different languages for the same
//! visitor. The default context is `default`.

mod cache;
mod dictionary;

pub use cache::{DictionaryCache, MemoryCache};
pub use dictionary::{Dictionary, LanguageTable, Translations};

use crate::config::LocalizationConfig;
use crate::error::Result;
use crate::error_handler::{ErrorLevel, ErrorSink};
use crate::request::RequestContext;
use crate::trace::SourceLocation;
use chrono::{DateTime, Duration, Utc};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_CONTEXT: &str = "default";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const REQUEST_PARAMETER: &str = "language";
pub const LANGUAGE_HEADER: &str = "Content-Language";

/// How long the language cookie is kept.
pub const COOKIE_LIFETIME_DAYS: i64 = 365;

/// A `Set-Cookie` the host should send to remember the chosen language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: DateTime<Utc>,
}

impl LanguageCookie {
    fn new(context: &str, language: &str, path: &str) -> Self {
        Self {
            name: format!("{context}_language"),
            value: language.to_string(),
            path: path.to_string(),
            expires: Utc::now() + Duration::days(COOKIE_LIFETIME_DAYS),
        }
    }

    /// Value for a `Set-Cookie` header.
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Expires={}; Max-Age={}; Path={}; SameSite=Strict",
            self.name,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            Duration::days(COOKIE_LIFETIME_DAYS).num_seconds(),
            self.path
        )
    }
}

pub struct LanguageManager {
    config: LocalizationConfig,
    additional_files: Vec<PathBuf>,
    cache: Option<Arc<dyn DictionaryCache>>,
    error_sink: Option<Arc<dyn ErrorSink>>,
    dictionary: Dictionary,
    loaded: bool,
    context: String,
    current_language: HashMap<String, String>,
    cookies: Vec<LanguageCookie>,
}

impl LanguageManager {
    /// With `use_cache` set, the dictionary is mirrored in the
    /// process-wide [`MemoryCache`].
    pub fn new(config: LocalizationConfig) -> Self {
        let cache: Option<Arc<dyn DictionaryCache>> = if config.use_cache {
            Some(Arc::new(MemoryCache::shared()))
        } else {
            None
        };

        Self {
            additional_files: config.additional_files.iter().map(PathBuf::from).collect(),
            config,
            cache,
            error_sink: None,
            dictionary: Dictionary::default(),
            loaded: false,
            context: DEFAULT_CONTEXT.to_string(),
            current_language: HashMap::new(),
            cookies: Vec::new(),
        }
    }

    /// Mirror the dictionary in `cache` instead.
    pub fn with_cache(mut self, cache: Arc<dyn DictionaryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report missing translations to `sink` as user warnings, in addition
    /// to the log.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn add_localization_file(&mut self, path: impl Into<PathBuf>) {
        self.additional_files.push(path.into());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Load the dictionary once; later calls do nothing.
    pub fn load_dictionary(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        if let Some(cache) = &self.cache {
            if let Some(dictionary) = Dictionary::from_cache(cache.as_ref()) {
                tracing::debug!("dictionary restored from cache");
                self.dictionary = dictionary;
                self.loaded = true;
                return Ok(());
            }
        }

        let dir = PathBuf::from(&self.config.localization_path);
        let dictionary = Dictionary::load(&dir, &self.additional_files)?;
        if let Some(cache) = &self.cache {
            dictionary.store_in_cache(cache.as_ref())?;
        }

        self.dictionary = dictionary;
        self.loaded = true;
        Ok(())
    }

    /// Add texts on top of the loaded dictionary.
    pub fn extend_dictionary(&mut self, translations: Translations) -> Result<()> {
        self.load_dictionary()?;
        self.dictionary.extend_texts(translations);
        Ok(())
    }

    /// Pick the language for `request` and make it current.
    ///
    /// Candidates, first supported one wins: the `language` parameter, the
    /// `Content-Language` header, the context's cookie, the
    /// `Accept-Language` entries, the first supported language, `en`.
    pub fn detect_language(&mut self, request: &RequestContext) -> String {
        let cookie_name = format!("{}_language", self.context);
        let supported = &self.dictionary.supported_languages;
        let is_supported = |code: &&str| !code.is_empty() && supported.contains(*code);

        let language = request
            .param(REQUEST_PARAMETER)
            .filter(is_supported)
            .or_else(|| request.header(LANGUAGE_HEADER).filter(is_supported))
            .or_else(|| request.cookie(&cookie_name).filter(is_supported))
            .map(str::to_string)
            .or_else(|| {
                request
                    .accepted_languages()
                    .into_iter()
                    .find(|code| supported.contains(code.as_str()))
            })
            .or_else(|| supported.first().cloned())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        tracing::debug!(context = %self.context, language = %language, "language detected");
        self.set_current_language(&language);
        language
    }

    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn supported_languages(&self) -> &IndexSet<String> {
        &self.dictionary.supported_languages
    }

    /// Unsupported codes are ignored.
    pub fn set_current_language(&mut self, language: &str) {
        if !self.dictionary.supported_languages.contains(language) {
            return;
        }

        self.current_language
            .insert(self.context.clone(), language.to_string());

        if self.config.use_cookie {
            self.cookies.push(LanguageCookie::new(
                &self.context,
                language,
                &self.config.cookie_path,
            ));
        }
    }

    /// Cookies queued by [`set_current_language`](Self::set_current_language)
    /// since the last call.
    pub fn take_cookies(&mut self) -> Vec<LanguageCookie> {
        std::mem::take(&mut self.cookies)
    }

    /// The context's language, else the first supported one, else empty.
    pub fn current_language(&self) -> String {
        self.current_language
            .get(&self.context)
            .filter(|lang| !lang.is_empty())
            .cloned()
            .or_else(|| self.dictionary.supported_languages.first().cloned())
            .unwrap_or_default()
    }

    pub fn fallback_language(&self) -> &str {
        &self.config.use_fallback_language
    }

    /// Translate `text_id` into `lang` (the current language if `None`).
    #[track_caller]
    pub fn text(&self, text_id: &str, lang: Option<&str>, default_text: Option<&str>) -> String {
        let lang = self.resolve(lang);
        if let Some(text) = lookup(&self.dictionary.texts, &lang, text_id) {
            return text.to_string();
        }

        self.report_missing(
            format!("No translation for the text '{text_id}' in the language [{lang}]!"),
            SourceLocation::caller(),
        );

        let fallback = self.fallback_language();
        if !fallback.is_empty() {
            if let Some(text) = lookup(&self.dictionary.texts, fallback, text_id) {
                return text.to_string();
            }
        }

        match default_text {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => text_id.to_string(),
        }
    }

    /// Like [`text`](Self::text) without the warning and default.
    pub fn try_text(&self, text_id: &str, lang: Option<&str>) -> String {
        let lang = self.resolve(lang);
        lookup(&self.dictionary.texts, &lang, text_id)
            .or_else(|| lookup(&self.dictionary.texts, self.fallback_language(), text_id))
            .unwrap_or(text_id)
            .to_string()
    }

    pub fn has_translation(&self, text_id: &str, lang: Option<&str>) -> bool {
        lookup(&self.dictionary.texts, &self.resolve(lang), text_id).is_some()
    }

    #[track_caller]
    pub fn language_name(&self, code: &str, lang: Option<&str>) -> String {
        let lang = self.resolve(lang);
        match lookup(&self.dictionary.languages, &lang, code) {
            Some(name) => name.to_string(),
            None => {
                self.report_missing(
                    format!("No translation for the language name [{code}] in the language [{lang}]!"),
                    SourceLocation::caller(),
                );
                code.to_string()
            }
        }
    }

    /// Reverse lookup, case-insensitive, over all supported languages.
    pub fn language_code(&self, name: &str) -> Option<String> {
        self.reverse_lookup(&self.dictionary.languages, name)
    }

    pub fn validate_language_code(&self, code: &str, lang: Option<&str>) -> bool {
        lookup(&self.dictionary.languages, &self.resolve(lang), code).is_some()
    }

    /// Language names in `lang`, sorted by name, with `display_first`
    /// codes pinned at the top in the given order.
    pub fn language_list(
        &self,
        lang: Option<&str>,
        display_first: &[&str],
    ) -> Option<IndexMap<String, String>> {
        sorted_list(&self.dictionary.languages, &self.resolve(lang), display_first)
    }

    #[track_caller]
    pub fn country_name(&self, code: &str, lang: Option<&str>) -> String {
        let lang = self.resolve(lang);
        match lookup(&self.dictionary.countries, &lang, code) {
            Some(name) => name.to_string(),
            None => {
                self.report_missing(
                    format!("No translation for the country name [{code}] in the language [{lang}]!"),
                    SourceLocation::caller(),
                );
                code.to_string()
            }
        }
    }

    pub fn country_code(&self, name: &str) -> Option<String> {
        self.reverse_lookup(&self.dictionary.countries, name)
    }

    pub fn validate_country_code(&self, code: &str, lang: Option<&str>) -> bool {
        lookup(&self.dictionary.countries, &self.resolve(lang), code).is_some()
    }

    pub fn country_list(
        &self,
        lang: Option<&str>,
        display_first: &[&str],
    ) -> Option<IndexMap<String, String>> {
        sorted_list(&self.dictionary.countries, &self.resolve(lang), display_first)
    }

    fn resolve(&self, lang: Option<&str>) -> String {
        match lang {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => self.current_language(),
        }
    }

    fn reverse_lookup(&self, table: &LanguageTable, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        self.dictionary
            .supported_languages
            .iter()
            .filter_map(|lang| table.get(lang))
            .flat_map(|entries| entries.iter())
            .find(|(_, translation)| translation.to_lowercase() == needle)
            .map(|(code, _)| code.clone())
    }

    fn report_missing(&self, message: String, location: SourceLocation) {
        if !self.config.warn_missing {
            return;
        }

        tracing::warn!(file = %location.file, line = location.line, "{}", message);

        if let Some(sink) = &self.error_sink {
            if let Err(err) = sink.report_error(
                ErrorLevel::UserWarning.code(),
                &message,
                &location.file,
                location.line,
                &[],
            ) {
                tracing::error!(error = %err, "missing translation could not be reported");
            }
        }
    }
}

fn lookup<'a>(table: &'a LanguageTable, lang: &str, id: &str) -> Option<&'a str> {
    table
        .get(lang)
        .and_then(|entries| entries.get(id))
        .map(String::as_str)
        .filter(|text| !text.is_empty())
}

fn sorted_list(
    table: &LanguageTable,
    lang: &str,
    display_first: &[&str],
) -> Option<IndexMap<String, String>> {
    let entries = table.get(lang).filter(|entries| !entries.is_empty())?;

    let mut sorted: Vec<(&String, &String)> = entries.iter().collect();
    sorted.sort_by_cached_key(|(code, name)| (sort_key(name), (*code).clone()));

    let mut list = IndexMap::with_capacity(entries.len());
    for code in display_first {
        if let Some(name) = entries.get(*code).filter(|name| !name.is_empty()) {
            list.insert(code.to_string(), name.clone());
        }
    }
    for (code, name) in sorted {
        if !list.contains_key(code) {
            list.insert(code.clone(), name.clone());
        }
    }
    Some(list)
}

/// Lowercased name with Latin diacritics folded to their base letters, so
/// that "Österreich" sorts next to "Oman" rather than after "Zypern".
fn sort_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        match ch {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => key.push('a'),
            'æ' => key.push_str("ae"),
            'ç' | 'ć' | 'č' => key.push('c'),
            'ď' | 'đ' => key.push('d'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => key.push('e'),
            'ğ' => key.push('g'),
            'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => key.push('i'),
            'ł' | 'ľ' => key.push('l'),
            'ñ' | 'ń' | 'ň' => key.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => key.push('o'),
            'œ' => key.push_str("oe"),
            'ř' => key.push('r'),
            'ś' | 'š' | 'ş' | 'ș' => key.push('s'),
            'ß' => key.push_str("ss"),
            'ť' | 'ţ' | 'ț' => key.push('t'),
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => key.push('u'),
            'ý' | 'ÿ' => key.push('y'),
            'ź' | 'ż' | 'ž' => key.push('z'),
            _ => key.push(ch),
        }
    }
    key
}
