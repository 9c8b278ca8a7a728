// SPDX-License-Identifier: PMPL-1.0-or-later

//! Wiring between a host's error dispatch and the error handler.

use super::{ErrorHandler, ErrorLevel};
use crate::error::Result;
use crate::trace::{capture_frames, SourceLocation, StackFrame};
use std::sync::Arc;

/// Callback interface a host invokes to report errors.
pub trait ErrorSink: Send + Sync {
    fn report_error(
        &self,
        code: i32,
        text: &str,
        file: &str,
        line: u32,
        frames: &[StackFrame],
    ) -> Result<()>;

    fn report_exception(
        &self,
        error: &(dyn std::error::Error + 'static),
        code: i32,
        location: &SourceLocation,
        frames: &[StackFrame],
    ) -> Result<()>;

    /// Report `text` at `level` from the caller's location, with the
    /// current call stack.
    #[track_caller]
    fn trigger(&self, level: ErrorLevel, text: &str) -> Result<()> {
        let location = SourceLocation::caller();
        self.report_error(
            level.code(),
            text,
            &location.file,
            location.line,
            &capture_frames(),
        )
    }
}

impl ErrorSink for ErrorHandler {
    fn report_error(
        &self,
        code: i32,
        text: &str,
        file: &str,
        line: u32,
        frames: &[StackFrame],
    ) -> Result<()> {
        self.handle_error(code, text, file, line, frames)
    }

    fn report_exception(
        &self,
        error: &(dyn std::error::Error + 'static),
        code: i32,
        location: &SourceLocation,
        frames: &[StackFrame],
    ) -> Result<()> {
        self.handle_exception(error, code, location, frames)
    }
}

/// Route panics through `sink` as [`ErrorLevel::Error`] reports.
///
/// The previously installed hook still runs afterwards.
pub fn install_panic_hook(sink: Arc<dyn ErrorSink>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        let location = info
            .location()
            .map(SourceLocation::from)
            .unwrap_or_default();

        if let Err(err) = sink.report_error(
            ErrorLevel::Error.code(),
            &text,
            &location.file,
            location.line,
            &capture_frames(),
        ) {
            tracing::error!(error = %err, "failed to trace panic");
        }

        previous(info);
    }));
}
