// SPDX-License-Identifier: PMPL-1.0-or-later

//! Message records and the error entry builder

use crate::trace::SourceLocation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A user-facing message as stored and returned by the message manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub related_element: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub technical_info: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_close: bool,
}

impl MessageRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// An error to be recorded, built up field by field.
///
/// ```
/// use smart_factory::messages::ErrorEntry;
///
/// let entry = ErrorEntry::new("Name is required")
///     .related_element("user_name")
///     .code("E_REQUIRED");
/// assert_eq!(entry.record().related_element, "user_name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    record: MessageRecord,
}

impl ErrorEntry {
    /// A new entry attributed to the calling code.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = SourceLocation::caller();
        Self {
            record: MessageRecord {
                message: message.into(),
                file: location.file,
                line: Some(location.line),
                ..MessageRecord::default()
            },
        }
    }

    /// Values a client substitutes into a translated message.
    pub fn details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.details = details.into_iter().map(Into::into).collect();
        self
    }

    /// Id of the form element the error belongs to.
    pub fn related_element(mut self, element: impl Into<String>) -> Self {
        self.record.related_element = element.into();
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.record.code = code.into();
        self
    }

    pub fn technical_info(mut self, info: impl Into<String>) -> Self {
        self.record.technical_info = info.into();
        self
    }

    /// Override the location captured by [`ErrorEntry::new`].
    pub fn location(mut self, location: SourceLocation) -> Self {
        self.record.file = location.file;
        self.record.line = Some(location.line);
        self
    }

    pub fn record(&self) -> &MessageRecord {
        &self.record
    }

    pub fn into_record(self) -> MessageRecord {
        self.record
    }
}

/// Storage key of a message: digest of the text and its `#`-joined details.
pub fn content_key(message: &str, details: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(details.join("#").as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_depends_on_details() {
        let plain = content_key("Saved", &[]);
        let detailed = content_key("Saved", &["3".to_string()]);
        assert_ne!(plain, detailed);
        assert_eq!(plain, content_key("Saved", &[]));
        assert_eq!(plain.len(), 64);
    }

    #[test]
    fn entry_captures_caller_location() {
        let entry = ErrorEntry::new("boom");
        assert!(entry.record().file.ends_with("record.rs"));
        assert!(entry.record().line.is_some());
    }

    #[test]
    fn empty_fields_are_not_serialized() {
        let json = serde_json::to_value(MessageRecord::new("Hello")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Hello" }));
    }
}
