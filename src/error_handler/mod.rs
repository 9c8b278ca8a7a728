// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error tracing.
//!
//! The [`ErrorHandler`] receives error reports from the host (see
//! [`ErrorSink`] and [`install_panic_hook`]), records the most recent error
//! text, appends a formatted entry with source location and call stack to
//! `trace.log`, and announces the error on the [`EventManager`] as
//! [`ERROR_EVENT`] so that display code can react without being coupled to
//! the tracing.
//!
//! When the trace file is not configured or not writable, entries go to the
//! fallback writer (stdout unless replaced) instead of being lost.

mod hook;

pub use hook::{install_panic_hook, ErrorSink};

use crate::error::{Error, Result};
use crate::events::{EventManager, EventParams};
use crate::logfile;
use crate::trace::{extract_call_stack, trim_path, SourceLocation, StackFrame};
use std::borrow::Cow;
use std::cell::Cell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Event fired for every traced error except [`ErrorLevel::UserError`].
pub const ERROR_EVENT: &str = "php_error";

pub const TRACE_FILE: &str = "trace.log";

const SEPARATOR: &str = "------------------------------------";

/// Severity levels with their numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorLevel {
    Error,
    Warning,
    Parse,
    Notice,
    CoreError,
    CoreWarning,
    CompileError,
    CompileWarning,
    UserError,
    UserWarning,
    UserNotice,
    Deprecated,
}

impl ErrorLevel {
    pub fn code(self) -> i32 {
        match self {
            ErrorLevel::Error => 1,
            ErrorLevel::Warning => 2,
            ErrorLevel::Parse => 4,
            ErrorLevel::Notice => 8,
            ErrorLevel::CoreError => 16,
            ErrorLevel::CoreWarning => 32,
            ErrorLevel::CompileError => 64,
            ErrorLevel::CompileWarning => 128,
            ErrorLevel::UserError => 256,
            ErrorLevel::UserWarning => 512,
            ErrorLevel::UserNotice => 1024,
            ErrorLevel::Deprecated => 8192,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => ErrorLevel::Error,
            2 => ErrorLevel::Warning,
            4 => ErrorLevel::Parse,
            8 => ErrorLevel::Notice,
            16 => ErrorLevel::CoreError,
            32 => ErrorLevel::CoreWarning,
            64 => ErrorLevel::CompileError,
            128 => ErrorLevel::CompileWarning,
            256 => ErrorLevel::UserError,
            512 => ErrorLevel::UserWarning,
            1024 => ErrorLevel::UserNotice,
            8192 => ErrorLevel::Deprecated,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorLevel::Error => "Error",
            ErrorLevel::Warning => "Warning",
            ErrorLevel::Parse => "Parsing Error",
            ErrorLevel::Notice => "Notice",
            ErrorLevel::CoreError => "Core Error",
            ErrorLevel::CoreWarning => "Core Warning",
            ErrorLevel::CompileError => "Compile Error",
            ErrorLevel::CompileWarning => "Compile Warning",
            ErrorLevel::UserError => "User Error",
            ErrorLevel::UserWarning => "User Warning",
            ErrorLevel::UserNotice => "User Notice",
            ErrorLevel::Deprecated => "Deprecated Notice",
        }
    }
}

/// Human label for a numeric code; unknown codes label as their number.
pub fn level_label(code: i32) -> Cow<'static, str> {
    match ErrorLevel::from_code(code) {
        Some(level) => Cow::Borrowed(level.label()),
        None => Cow::Owned(code.to_string()),
    }
}

/// Where trace entries are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceTarget {
    /// No trace path configured.
    Unset,
    /// Configured as `stdout`.
    Stdout,
    /// `trace.log` inside this directory.
    Directory(PathBuf),
}

pub struct ErrorHandler {
    target: TraceTarget,
    events: Option<Arc<EventManager>>,
    last_error: Mutex<String>,
    trace_disabled: AtomicBool,
    web: bool,
    source_root: Option<PathBuf>,
    request_uri: Mutex<Option<String>>,
    fallback: Mutex<Box<dyn Write + Send>>,
}

impl ErrorHandler {
    /// Create a handler tracing into `log_path`.
    ///
    /// `log_path` is a directory that must exist and be writable (as must
    /// `trace.log` inside it, if present), or the literal `stdout`.
    pub fn new(log_path: &str, events: Option<Arc<EventManager>>) -> Result<Self> {
        if log_path.is_empty() {
            return Err(Error::Configuration("Log path is not specified!".to_string()));
        }

        let target = if log_path == "stdout" {
            TraceTarget::Stdout
        } else {
            let dir = logfile::normalize_dir(log_path);
            let file = dir.join(TRACE_FILE);
            if !dir.is_dir() || !logfile::is_writable(&dir) || !logfile::can_write(&dir, &file) {
                return Err(Error::Configuration(format!(
                    "The trace file '{}' is not writable!",
                    file.display()
                )));
            }
            TraceTarget::Directory(dir)
        };

        Ok(Self::with_target(target, events))
    }

    /// A handler without a trace path; every entry goes to the fallback writer.
    pub fn unconfigured(events: Option<Arc<EventManager>>) -> Self {
        Self::with_target(TraceTarget::Unset, events)
    }

    fn with_target(target: TraceTarget, events: Option<Arc<EventManager>>) -> Self {
        Self {
            target,
            events,
            last_error: Mutex::new(String::new()),
            trace_disabled: AtomicBool::new(false),
            web: false,
            source_root: None,
            request_uri: Mutex::new(None),
            fallback: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// HTML-escape fallback output and wrap it in `<pre>`.
    pub fn with_web_output(mut self, web: bool) -> Self {
        self.web = web;
        self
    }

    /// Paths in traces are shown relative to this directory.
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    /// Replace stdout as the fallback destination.
    pub fn with_fallback_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.fallback = Mutex::new(writer);
        self
    }

    pub fn target(&self) -> &TraceTarget {
        &self.target
    }

    /// URI of the request being served, shown in trace entries.
    pub fn set_request_uri(&self, uri: Option<String>) {
        *lock(&self.request_uri) = uri;
    }

    pub fn last_error(&self) -> String {
        lock(&self.last_error).clone()
    }

    pub fn set_last_error(&self, error: &str) {
        *lock(&self.last_error) = error.to_string();
    }

    pub fn trace_active(&self) -> bool {
        !self.trace_disabled.load(Ordering::Relaxed)
    }

    pub fn enable_trace(&self) {
        self.trace_disabled.store(false, Ordering::Relaxed);
    }

    /// Suppress tracing temporarily, e.g. around a check that is expected
    /// to raise a controlled notice.
    pub fn disable_trace(&self) {
        self.trace_disabled.store(true, Ordering::Relaxed);
    }

    /// Trace an error reported by the host and announce it as [`ERROR_EVENT`].
    ///
    /// The event is not fired for [`ErrorLevel::UserError`]: such errors were
    /// raised on purpose and are already shown as program errors.
    pub fn handle_error(
        &self,
        code: i32,
        text: &str,
        file: &str,
        line: u32,
        frames: &[StackFrame],
    ) -> Result<()> {
        self.set_last_error(text);

        let label = level_label(code);
        let body = self.format_report(text, file, line, frames);
        if let Err(err) = self.trace_message(&label, &body) {
            tracing::error!(error = %err, "trace entry not written");
        }

        if code != ErrorLevel::UserError.code() {
            if let Some(events) = &self.events {
                let mut params = EventParams::new();
                params.insert("etype".to_string(), label.as_ref().into());
                params.insert("errstr".to_string(), text.into());
                params.insert("errfile".to_string(), file.into());
                params.insert("errline".to_string(), line.into());
                events.fire_event(ERROR_EVENT, &params)?;
            }
        }

        Ok(())
    }

    /// Trace a caught error.
    ///
    /// The error's own message and location head the entry, followed by
    /// `frames` as the call stack. No event is fired.
    pub fn handle_exception(
        &self,
        error: &(dyn std::error::Error + 'static),
        code: i32,
        location: &SourceLocation,
        frames: &[StackFrame],
    ) -> Result<()> {
        let mut text = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str("\r\nCaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }

        self.set_last_error(&error.to_string());

        let label = level_label(code);
        let body = self.format_report(&text, &location.file, location.line, frames);
        self.trace_message(&label, &body)
    }

    /// Report body: message, request URI, source location and call stack.
    pub fn format_report(&self, text: &str, file: &str, line: u32, frames: &[StackFrame]) -> String {
        let root = self.source_root.as_deref();
        let uri = lock(&self.request_uri).clone().unwrap_or_default();

        let mut body = format!(
            "{}\r\n\r\n#URI: {}\r\n#Source: {}, {}\r\n",
            text,
            uri,
            trim_path(file, root),
            line
        );

        let stack = extract_call_stack(frames, true, root);
        if !stack.is_empty() {
            body.push_str("#Callstack:\r\n");
            body.push_str(&stack);
            body.push_str("\r\n");
        }
        body
    }

    fn trace_message(&self, label: &str, body: &str) -> Result<()> {
        if !self.trace_active() {
            return Ok(());
        }

        let entry = format!(
            "{}\r\n{}\r\n### {} ###\r\n\r\n{}\r\n{}\r\n\r\n\r\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            SEPARATOR,
            label,
            body,
            SEPARATOR
        );

        match &self.target {
            TraceTarget::Directory(dir) => {
                let file = dir.join(TRACE_FILE);
                if logfile::can_write(dir, &file) {
                    match logfile::append(&file, &entry) {
                        Ok(()) => return Ok(()),
                        Err(err) => {
                            tracing::warn!(file = %file.display(), error = %err, "trace append failed, tracing to stdout");
                        }
                    }
                } else {
                    tracing::warn!(file = %file.display(), "trace file not writable, tracing to stdout");
                }
                self.write_fallback(&format!(
                    "The trace file '{}' is not writable!\nTracing to the stdout.\n\n{}",
                    file.display(),
                    entry
                ))
            }
            TraceTarget::Unset => {
                tracing::warn!("trace file not specified, tracing to stdout");
                self.write_fallback(&format!(
                    "The trace file is not specified!\nTracing to the stdout.\n\n{}",
                    entry
                ))
            }
            TraceTarget::Stdout => self.write_fallback(&entry),
        }
    }

    fn write_fallback(&self, message: &str) -> Result<()> {
        let output = if self.web {
            format!("<pre>{}</pre>", escape_html(message))
        } else {
            message.to_string()
        };

        // A report raised while the writer runs (a panic inside it, or a
        // writer that reports errors itself) must not wait on our own lock.
        if WRITING_FALLBACK.with(Cell::get) {
            let mut stdout = io::stdout().lock();
            return stdout
                .write_all(output.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|err| Error::io("Error by writing the trace to the output stream!", err));
        }

        let _guard = FallbackGuard::enter();
        let mut writer = lock(&self.fallback);
        writer
            .write_all(output.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|err| Error::io("Error by writing the trace to the output stream!", err))
    }

    /// Directory holding `trace.log`, if tracing to a file.
    pub fn trace_dir(&self) -> Option<&Path> {
        match &self.target {
            TraceTarget::Directory(dir) => Some(dir),
            _ => None,
        }
    }
}

thread_local! {
    static WRITING_FALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside the fallback writer until dropped,
/// including when the writer unwinds.
struct FallbackGuard;

impl FallbackGuard {
    fn enter() -> Self {
        WRITING_FALLBACK.with(|flag| flag.set(true));
        FallbackGuard
    }
}

impl Drop for FallbackGuard {
    fn drop(&mut self) {
        WRITING_FALLBACK.with(|flag| flag.set(false));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
