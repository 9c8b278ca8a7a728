// SPDX-License-Identifier: PMPL-1.0-or-later

//! Debug and profiling logs.
//!
//! Messages are appended to named files in the log directory
//! (`debug.log` by default, `profile.log` for profile points). Each entry
//! may be headed by the request URI, the source location of the call and
//! the call stack, and ends with a `-------` separator.

use crate::error::{Error, Result};
use crate::logfile;
use crate::trace::{capture_frames, extract_call_stack, trim_path, SourceLocation};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEBUG_FILE: &str = "debug.log";
pub const PROFILE_FILE: &str = "profile.log";

pub struct DebugProfiler {
    log_path: PathBuf,
    write_source_file_and_line: bool,
    source_root: Option<PathBuf>,
    request_uri: Option<String>,
    profile_time: Option<Instant>,
}

impl DebugProfiler {
    /// The log directory must exist and be writable.
    pub fn new(log_path: &str, write_source_file_and_line: bool) -> Result<Self> {
        if log_path.is_empty() {
            return Err(Error::Configuration("Log path is not specified!".to_string()));
        }

        let log_path = logfile::normalize_dir(log_path);
        if !log_path.is_dir() || !logfile::is_writable(&log_path) {
            return Err(Error::Configuration(format!(
                "The log path '{}' is not writable!",
                log_path.display()
            )));
        }

        Ok(Self {
            log_path,
            write_source_file_and_line,
            source_root: None,
            request_uri: None,
            profile_time: None,
        })
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Toggle the `#URI:`/`#Source:` header on debug entries.
    pub fn enable_file_and_line_details(&mut self, state: bool) {
        self.write_source_file_and_line = state;
    }

    pub fn set_request_uri(&mut self, uri: Option<String>) {
        self.request_uri = uri;
    }

    /// Append `message` to `file_name`, attributed to the calling code.
    #[track_caller]
    pub fn debug_message(&self, message: &str, write_call_stack: bool, file_name: &str) -> Result<()> {
        self.debug_message_at(message, &SourceLocation::caller(), write_call_stack, file_name)
    }

    /// Append `message` to `file_name`, attributed to `location`.
    pub fn debug_message_at(
        &self,
        message: &str,
        location: &SourceLocation,
        write_call_stack: bool,
        file_name: &str,
    ) -> Result<()> {
        let logfile_path = self.log_path.join(file_name);
        let root = self.source_root.as_deref();

        let mut entry = String::new();
        if self.write_source_file_and_line && !location.file.is_empty() && location.line > 0 {
            entry.push_str(&format!(
                "#URI: {}\r\n#Source: {}, {}",
                self.request_uri.as_deref().unwrap_or(""),
                trim_path(&location.file, root),
                location.line
            ));
        }
        if write_call_stack {
            entry.push_str("\r\n#Callstack:\r\n");
            entry.push_str(&extract_call_stack(&capture_frames(), false, root));
        }
        entry.push_str("\r\n\r\n");
        entry.push_str(message.trim());
        entry.push_str("\r\n-------\r\n");

        if !logfile::can_write(&self.log_path, &logfile_path) {
            return Err(Error::io_message(format!(
                "The log file '{}' is not writable!",
                logfile_path.display()
            )));
        }

        logfile::append(&logfile_path, &entry).map_err(|err| {
            Error::io(
                format!("Error by writing the log file '{}'!", logfile_path.display()),
                err,
            )
        })
    }

    /// Log `message` to `profile.log` and start timing.
    #[track_caller]
    pub fn start_profile_point(&mut self, message: &str) -> Result<()> {
        self.debug_message(message, false, PROFILE_FILE)?;
        self.profile_time = Some(Instant::now());
        tracing::debug!(message, "profile point started");
        Ok(())
    }

    /// Log `message` with the seconds elapsed since the previous start or
    /// fix point, then restart timing.
    ///
    /// Returns the elapsed seconds, or `None` when no point was started.
    #[track_caller]
    pub fn fix_profile_point(&mut self, message: &str) -> Result<Option<f64>> {
        let elapsed = self.profile_time.map(|start| start.elapsed().as_secs_f64());
        let line = match elapsed {
            Some(seconds) => format!("{}: {:.3} seconds", message, seconds),
            None => message.to_string(),
        };

        self.debug_message(&line, false, PROFILE_FILE)?;
        self.profile_time = Some(Instant::now());
        Ok(elapsed)
    }

    /// Delete one log file. Failures are ignored.
    pub fn clear_log_file(&self, file_name: &str) {
        let path = self.log_path.join(file_name);
        if logfile::can_write(&self.log_path, &path) {
            if let Err(err) = fs::remove_file(&path) {
                tracing::debug!(file = %path.display(), error = %err, "log file not removed");
            }
        }
    }

    /// Delete every `*.log` file in the log directory.
    pub fn clear_log_files(&self) {
        let Ok(entries) = fs::read_dir(&self.log_path) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let is_log = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("log"))
                .unwrap_or(false);
            if !is_log {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                self.clear_log_file(name);
            }
        }
    }
}
