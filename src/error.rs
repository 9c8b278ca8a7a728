// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy shared by every service in the crate.
//!
//! All fatal conditions surface as [`Error`] at the point of detection.
//! Missing translations are not errors: they are logged as warnings and
//! resolved through the fallback chain of the language manager.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unusable log/localization path, rejected at construction.
    #[error("{0}")]
    Configuration(String),

    /// A log or dictionary file could not be written or read.
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A dictionary or configuration document is not valid structured data.
    #[error("{message}\n\n{source}")]
    Format {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid argument, e.g. an empty event name.
    #[error("{0}")]
    Validation(String),

    /// An event handler failed; the remaining handlers were not invoked.
    #[error("handler for event '{event}' failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn io_message(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_carries_parse_failure() {
        let parse = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err = Error::Format {
            message: "Translation file 'texts.json' is invalid!".to_string(),
            source: parse,
        };
        let text = err.to_string();
        assert!(text.starts_with("Translation file 'texts.json' is invalid!\n\n"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn handler_error_names_event() {
        let err = Error::Handler {
            event: "php_error".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "handler for event 'php_error' failed: boom");
    }
}
