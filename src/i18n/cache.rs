// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared dictionary cache.
//!
//! A loaded dictionary can be mirrored into a cache shared by every
//! language manager of the process, so that only the first one reads the
//! JSON files. Concurrent writers race benignly: the last one wins and
//! every stored value is a complete table.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

pub const SUPPORTED_LANGUAGES_KEY: &str = "dictionary_supported_languages";
pub const LANGUAGES_KEY: &str = "dictionary_languages";
pub const COUNTRIES_KEY: &str = "dictionary_countries";
pub const TEXTS_KEY: &str = "dictionary_texts";

pub trait DictionaryCache: Send + Sync {
    fn fetch(&self, key: &str) -> Option<Value>;
    fn store(&self, key: &str, value: Value);
}

/// In-memory cache; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn shared() -> Self {
        static SHARED: OnceLock<MemoryCache> = OnceLock::new();
        SHARED.get_or_init(MemoryCache::new).clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DictionaryCache for MemoryCache {
    fn fetch(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn store(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }
}
