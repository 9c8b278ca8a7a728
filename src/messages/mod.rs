// SPDX-License-Identifier: PMPL-1.0-or-later

//! User-facing message aggregation.
//!
//! The [`MessageManager`] collects messages of six categories while a
//! request is processed: errors, warnings, programming warnings, debug
//! messages, info messages and bubble messages. Reading a category with
//! `get_*` returns its messages and empties it, since whatever was read is
//! considered shown to the user.
//!
//! Identical messages collapse into one entry. Errors, warnings and info
//! messages are keyed by their text together with their details; programming
//! warnings, debug messages and bubble messages by their text alone.
//!
//! Programming warnings, debug messages and technical error details are
//! only kept in debug mode, so that internals never reach end users.

mod collection;
mod record;

pub use collection::ErrorCollection;
pub use record::{content_key, ErrorEntry, MessageRecord};

use crate::config::MessageConfig;
use crate::error::{Error, Result};
use crate::trace::SourceLocation;
use indexmap::IndexMap;
use serde_json::{Map, Value};

type Bucket = IndexMap<String, MessageRecord>;

#[derive(Debug, Default)]
pub struct MessageManager {
    config: MessageConfig,
    errors: Bucket,
    warnings: Bucket,
    prog_warnings: Bucket,
    debug_messages: Bucket,
    info_messages: Bucket,
    bubble_messages: Bucket,
    details_disabled: bool,
    prog_warnings_disabled: bool,
    debug_messages_disabled: bool,
    focus_element: Option<String>,
    active_tab: Option<String>,
    error_element: Option<String>,
}

impl MessageManager {
    pub fn new(config: MessageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn debug_mode(&self) -> bool {
        self.config.debug_mode
    }

    pub fn auto_hide_time(&self) -> u32 {
        self.config.auto_hide_time
    }

    fn keep_location(&self) -> bool {
        self.config.debug_mode && self.config.show_source_location
    }

    fn drain(&self, bucket: Bucket) -> Vec<MessageRecord> {
        let details_active = self.details_active();
        bucket
            .into_values()
            .map(|mut record| {
                if !details_active {
                    record.details.clear();
                }
                record
            })
            .collect()
    }

    fn located(&self, mut record: MessageRecord, location: &SourceLocation) -> MessageRecord {
        if self.keep_location() {
            record.file = location.file.clone();
            record.line = Some(location.line);
        }
        record
    }

    // ─── Errors ─────────────────────────────────────────────────────────

    pub fn add_error(&mut self, entry: ErrorEntry) {
        let mut record = entry.into_record();
        if record.message.is_empty() {
            return;
        }
        if !self.config.debug_mode {
            record.technical_info.clear();
        }
        if !self.keep_location() {
            record.file.clear();
            record.line = None;
        }
        let key = content_key(&record.message, &record.details);
        self.errors.insert(key, record);
    }

    /// Record every error of a collection.
    pub fn add_errors_from_collection(&mut self, collection: &ErrorCollection) {
        for record in collection.errors() {
            let mut entry = ErrorEntry::new(record.message.clone())
                .details(record.details.clone())
                .related_element(record.related_element.clone())
                .code(record.code.clone())
                .technical_info(record.technical_info.clone());
            if let Some(line) = record.line {
                entry = entry.location(SourceLocation::new(record.file.clone(), line));
            }
            self.add_error(entry);
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get_errors(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.errors);
        self.drain(bucket)
    }

    // ─── Warnings ───────────────────────────────────────────────────────

    pub fn add_warning<I, S>(&mut self, message: &str, details: I, related_element: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if message.is_empty() {
            return;
        }
        let record = MessageRecord {
            details: details.into_iter().map(Into::into).collect(),
            related_element: related_element.to_string(),
            ..MessageRecord::new(message)
        };
        let key = content_key(&record.message, &record.details);
        self.warnings.insert(key, record);
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn get_warnings(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.warnings);
        self.drain(bucket)
    }

    // ─── Programming warnings ───────────────────────────────────────────

    pub fn prog_warnings_active(&self) -> bool {
        !self.prog_warnings_disabled
    }

    pub fn enable_prog_warnings(&mut self) {
        self.prog_warnings_disabled = false;
    }

    pub fn disable_prog_warnings(&mut self) {
        self.prog_warnings_disabled = true;
    }

    /// Record a warning meant for developers, attributed to the caller.
    /// Ignored outside debug mode.
    #[track_caller]
    pub fn add_prog_warning<I, S>(&mut self, message: &str, details: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_prog_warning_at(message, details, &SourceLocation::caller());
    }

    pub fn add_prog_warning_at<I, S>(&mut self, message: &str, details: I, location: &SourceLocation)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if message.is_empty() || !self.config.debug_mode || !self.prog_warnings_active() {
            return;
        }
        let record = MessageRecord {
            details: details.into_iter().map(Into::into).collect(),
            ..MessageRecord::new(message)
        };
        let record = self.located(record, location);
        self.prog_warnings.insert(message.to_string(), record);
    }

    pub fn clear_prog_warnings(&mut self) {
        self.prog_warnings.clear();
    }

    pub fn has_prog_warnings(&self) -> bool {
        !self.prog_warnings.is_empty()
    }

    pub fn get_prog_warnings(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.prog_warnings);
        self.drain(bucket)
    }

    // ─── Debug messages ─────────────────────────────────────────────────

    pub fn debug_messages_active(&self) -> bool {
        !self.debug_messages_disabled
    }

    pub fn enable_debug_messages(&mut self) {
        self.debug_messages_disabled = false;
    }

    pub fn disable_debug_messages(&mut self) {
        self.debug_messages_disabled = true;
    }

    /// Ignored outside debug mode.
    #[track_caller]
    pub fn add_debug_message<I, S>(&mut self, message: &str, details: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_debug_message_at(message, details, &SourceLocation::caller());
    }

    pub fn add_debug_message_at<I, S>(&mut self, message: &str, details: I, location: &SourceLocation)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if message.is_empty() || !self.config.debug_mode || !self.debug_messages_active() {
            return;
        }
        let record = MessageRecord {
            details: details.into_iter().map(Into::into).collect(),
            ..MessageRecord::new(message)
        };
        let record = self.located(record, location);
        self.debug_messages.insert(message.to_string(), record);
    }

    pub fn clear_debug_messages(&mut self) {
        self.debug_messages.clear();
    }

    pub fn has_debug_messages(&self) -> bool {
        !self.debug_messages.is_empty()
    }

    pub fn get_debug_messages(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.debug_messages);
        self.drain(bucket)
    }

    // ─── Info messages ──────────────────────────────────────────────────

    pub fn add_info_message<I, S>(&mut self, message: &str, details: I, auto_close: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if message.is_empty() {
            return;
        }
        let record = MessageRecord {
            details: details.into_iter().map(Into::into).collect(),
            auto_close,
            ..MessageRecord::new(message)
        };
        let key = content_key(&record.message, &record.details);
        self.info_messages.insert(key, record);
    }

    pub fn clear_info_messages(&mut self) {
        self.info_messages.clear();
    }

    pub fn has_info_messages(&self) -> bool {
        !self.info_messages.is_empty()
    }

    pub fn get_info_messages(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.info_messages);
        self.drain(bucket)
    }

    // ─── Bubble messages ────────────────────────────────────────────────

    /// Short notice shown near the pointer; usually closes on its own.
    pub fn add_bubble_message<I, S>(&mut self, message: &str, details: I, auto_close: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if message.is_empty() {
            return;
        }
        let record = MessageRecord {
            details: details.into_iter().map(Into::into).collect(),
            auto_close,
            ..MessageRecord::new(message)
        };
        self.bubble_messages.insert(message.to_string(), record);
    }

    pub fn clear_bubble_messages(&mut self) {
        self.bubble_messages.clear();
    }

    pub fn has_bubble_messages(&self) -> bool {
        !self.bubble_messages.is_empty()
    }

    pub fn get_bubble_messages(&mut self) -> Vec<MessageRecord> {
        let bucket = std::mem::take(&mut self.bubble_messages);
        self.drain(bucket)
    }

    // ─── Details ────────────────────────────────────────────────────────

    pub fn details_active(&self) -> bool {
        !self.details_disabled
    }

    pub fn enable_details(&mut self) {
        self.details_disabled = false;
    }

    /// Returned messages omit their details until re-enabled.
    pub fn disable_details(&mut self) {
        self.details_disabled = true;
    }

    // ─── Focus / tab / error element ────────────────────────────────────

    pub fn set_focus_element(&mut self, element: &str) {
        self.focus_element = Some(element.to_string());
    }

    pub fn get_focus_element(&mut self) -> String {
        self.focus_element.take().unwrap_or_default()
    }

    pub fn set_active_tab(&mut self, tab: &str) {
        self.active_tab = Some(tab.to_string());
    }

    pub fn get_active_tab(&mut self) -> String {
        self.active_tab.take().unwrap_or_default()
    }

    /// Highlight `element` as erroneous; it also receives the focus.
    pub fn set_error_element(&mut self, element: &str) {
        self.focus_element = Some(element.to_string());
        self.error_element = Some(element.to_string());
    }

    pub fn get_error_element(&mut self) -> String {
        self.error_element.take().unwrap_or_default()
    }

    pub fn clear_all(&mut self) {
        self.clear_errors();
        self.clear_warnings();
        self.clear_prog_warnings();
        self.clear_debug_messages();
        self.clear_info_messages();
        self.clear_bubble_messages();

        self.focus_element = None;
        self.active_tab = None;
        self.error_element = None;
    }

    /// Move every pending message and the focus state into a response
    /// object. Categories without messages are left out.
    pub fn add_messages_to_response(&mut self, response: &mut Map<String, Value>) -> Result<()> {
        let categories = [
            ("INFO_MESSAGES", self.get_info_messages()),
            ("WARNING_MESSAGES", self.get_warnings()),
            ("ERROR_MESSAGES", self.get_errors()),
            ("PROG_WARNINGS", self.get_prog_warnings()),
            ("DEBUG_MESSAGES", self.get_debug_messages()),
            ("BUBBLE_MESSAGES", self.get_bubble_messages()),
        ];

        for (name, records) in categories {
            if records.is_empty() {
                continue;
            }
            let value = serde_json::to_value(&records).map_err(|source| Error::Format {
                message: format!("Messages '{}' cannot be serialized!", name),
                source,
            })?;
            response.insert(name.to_string(), value);
        }

        response.insert("AUTO_HIDE_TIME".to_string(), self.auto_hide_time().into());
        response.insert("FOCUS_ELEMENT".to_string(), self.get_focus_element().into());
        response.insert("ACTIVE_TAB".to_string(), self.get_active_tab().into());
        response.insert("ERROR_ELEMENT".to_string(), self.get_error_element().into());
        Ok(())
    }
}
