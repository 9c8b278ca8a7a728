// SPDX-License-Identifier: PMPL-1.0-or-later

//! The parts of an incoming request the services look at

use std::collections::HashMap;

/// Request parameters, headers and cookies.
///
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    uri: Option<String>,
    params: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Base language codes from `Accept-Language`, in header order.
    ///
    /// Quality values are ignored and region subtags dropped, so
    /// `fr-CA,en;q=0.8` yields `fr`, `en`.
    pub fn accepted_languages(&self) -> Vec<String> {
        let Some(header) = self.header("Accept-Language") else {
            return Vec::new();
        };

        header
            .split(',')
            .filter_map(|entry| {
                let tag = entry.split(';').next().unwrap_or("").trim();
                let base = tag.split(['-', '_']).next().unwrap_or("").trim();
                if base.is_empty() {
                    None
                } else {
                    Some(base.to_ascii_lowercase())
                }
            })
            .collect()
    }
}
