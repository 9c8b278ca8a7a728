// SPDX-License-Identifier: PMPL-1.0-or-later

//! Batched validation errors.
//!
//! An [`ErrorCollection`] gathers several errors (typically one per invalid
//! form field) and is returned as a single error at the end of the check.

use super::record::{content_key, ErrorEntry, MessageRecord};
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCollection {
    errors: IndexMap<String, MessageRecord>,
}

impl ErrorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. Empty messages are ignored and identical
    /// message/details pairs are stored once.
    pub fn add_error(&mut self, entry: ErrorEntry) {
        let record = entry.into_record();
        if record.message.is_empty() {
            return;
        }
        let key = content_key(&record.message, &record.details);
        self.errors.insert(key, record);
    }

    pub fn errors(&self) -> impl Iterator<Item = &MessageRecord> {
        self.errors.values()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Hand the accumulated errors back as an `Err` if there are any.
    ///
    /// ```
    /// use smart_factory::messages::{ErrorCollection, ErrorEntry};
    ///
    /// fn validate(name: &str) -> Result<(), ErrorCollection> {
    ///     let mut errors = ErrorCollection::new();
    ///     if name.is_empty() {
    ///         errors.add_error(ErrorEntry::new("Name is required").related_element("name"));
    ///     }
    ///     errors.throw_if_errors()
    /// }
    ///
    /// assert!(validate("Ada").is_ok());
    /// assert_eq!(validate("").unwrap_err().len(), 1);
    /// ```
    pub fn throw_if_errors(&mut self) -> Result<(), ErrorCollection> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(self))
        }
    }
}

impl fmt::Display for ErrorCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.values().map(|r| r.message.as_str()).collect();
        write!(f, "{}", messages.join("\n"))
    }
}

impl std::error::Error for ErrorCollection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection_does_not_throw() {
        let mut errors = ErrorCollection::new();
        errors.add_error(ErrorEntry::new(""));
        assert!(errors.throw_if_errors().is_ok());
    }

    #[test]
    fn duplicates_collapse_and_throw_drains() {
        let mut errors = ErrorCollection::new();
        errors.add_error(ErrorEntry::new("Too short").details(["name"]));
        errors.add_error(ErrorEntry::new("Too short").details(["name"]));
        errors.add_error(ErrorEntry::new("Too short").details(["city"]));

        let thrown = errors.throw_if_errors().unwrap_err();
        assert_eq!(thrown.len(), 2);
        assert_eq!(thrown.to_string(), "Too short\nToo short");
        assert!(errors.is_empty());
    }
}
