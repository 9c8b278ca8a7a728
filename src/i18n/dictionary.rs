// SPDX-License-Identifier: PMPL-1.0-or-later

//! Translation files and the in-memory dictionary built from them.
//!
//! The files are keyed by text id first (`{"greeting": {"en": "Hello"}}`),
//! the dictionary by language first, so a lookup is two hash probes.

use super::cache::{
    DictionaryCache, COUNTRIES_KEY, LANGUAGES_KEY, SUPPORTED_LANGUAGES_KEY, TEXTS_KEY,
};
use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const LANGUAGES_FILE: &str = "languages.json";
pub const COUNTRIES_FILE: &str = "countries.json";
pub const TEXTS_FILE: &str = "texts.json";

/// Text id -> language code -> translation, the shape of the files.
pub type Translations = IndexMap<String, IndexMap<String, String>>;

/// Language code -> text id -> translation.
pub type LanguageTable = IndexMap<String, IndexMap<String, String>>;

#[derive(Debug, Default, Deserialize)]
struct LocalizationSettings {
    #[serde(default)]
    interface_languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub supported_languages: IndexSet<String>,
    pub languages: LanguageTable,
    pub countries: LanguageTable,
    pub texts: LanguageTable,
}

impl Dictionary {
    /// Read the four base files from `dir`, then merge `additional` text
    /// files over `texts.json` in order.
    pub fn load(dir: &Path, additional: &[PathBuf]) -> Result<Self> {
        let settings: LocalizationSettings = read_translation_file(&dir.join(CONFIG_FILE))?;
        let languages: Translations = read_translation_file(&dir.join(LANGUAGES_FILE))?;
        let countries: Translations = read_translation_file(&dir.join(COUNTRIES_FILE))?;
        let mut texts: Translations = read_translation_file(&dir.join(TEXTS_FILE))?;

        for file in additional {
            let extra: Translations = read_translation_file(file)?;
            // A text id from a later file replaces the earlier entry entirely.
            texts.extend(extra);
        }

        tracing::debug!(
            path = %dir.display(),
            languages = settings.interface_languages.len(),
            texts = texts.len(),
            "translation files loaded"
        );

        Ok(Self {
            supported_languages: settings.interface_languages.into_iter().collect(),
            languages: pivot(languages),
            countries: pivot(countries),
            texts: pivot(texts),
        })
    }

    /// Add translations over the loaded texts, one language at a time.
    pub fn extend_texts(&mut self, translations: Translations) {
        for (text_id, by_language) in translations {
            for (lang, text) in by_language {
                self.texts.entry(lang).or_default().insert(text_id.clone(), text);
            }
        }
    }

    /// Restore from the cache. Any missing or empty entry is a miss.
    pub fn from_cache(cache: &dyn DictionaryCache) -> Option<Self> {
        Some(Self {
            supported_languages: fetch_non_empty(cache, SUPPORTED_LANGUAGES_KEY)?,
            languages: fetch_non_empty(cache, LANGUAGES_KEY)?,
            countries: fetch_non_empty(cache, COUNTRIES_KEY)?,
            texts: fetch_non_empty(cache, TEXTS_KEY)?,
        })
    }

    pub fn store_in_cache(&self, cache: &dyn DictionaryCache) -> Result<()> {
        cache.store(SUPPORTED_LANGUAGES_KEY, to_value(&self.supported_languages)?);
        cache.store(LANGUAGES_KEY, to_value(&self.languages)?);
        cache.store(COUNTRIES_KEY, to_value(&self.countries)?);
        cache.store(TEXTS_KEY, to_value(&self.texts)?);
        Ok(())
    }
}

fn pivot(translations: Translations) -> LanguageTable {
    let mut table = LanguageTable::new();
    for (text_id, by_language) in translations {
        for (lang, text) in by_language {
            table.entry(lang).or_default().insert(text_id.clone(), text);
        }
    }
    table
}

fn read_translation_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|err| {
        Error::io(
            format!("Translation file '{}' cannot be loaded or does not exist!", path.display()),
            err,
        )
    })?;

    serde_json::from_str(&raw).map_err(|source| Error::Format {
        message: format!("Translation file '{}' is invalid!", path.display()),
        source,
    })
}

fn fetch_non_empty<T>(cache: &dyn DictionaryCache, key: &str) -> Option<T>
where
    T: DeserializeOwned + IsEmpty,
{
    let value = cache.fetch(key)?;
    let decoded: T = serde_json::from_value(value).ok()?;
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|source| Error::Format {
        message: "The dictionary cannot be stored in the cache!".to_string(),
        source,
    })
}

trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl IsEmpty for IndexSet<String> {
    fn is_empty(&self) -> bool {
        IndexSet::is_empty(self)
    }
}

impl IsEmpty for LanguageTable {
    fn is_empty(&self) -> bool {
        IndexMap::is_empty(self)
    }
}
