// SPDX-License-Identifier: PMPL-1.0-or-later

//! Conversion of captured `std` backtraces into [`StackFrame`]s.

use super::StackFrame;
use regex::Regex;
use std::backtrace::Backtrace;
use std::sync::OnceLock;

fn frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+:\s+(.+?)\s*$").expect("static regex"))
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*at\s+(.+?):(\d+)(?::\d+)?\s*$").expect("static regex"))
}

fn hash_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"::h[0-9a-f]{16}$").expect("static regex"))
}

/// Capture the current call stack, innermost frame first.
///
/// Captures unconditionally, independent of `RUST_BACKTRACE`.
pub fn capture_frames() -> Vec<StackFrame> {
    let backtrace = Backtrace::force_capture();
    parse_backtrace(&backtrace.to_string())
}

/// Parse the textual form of a backtrace.
///
/// Symbols without an `at file:line` line keep `file` unset and are later
/// left out of rendered call stacks.
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = location_pattern().captures(line) {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    frame.file = Some(caps[1].to_string());
                    frame.line = caps[2].parse().ok();
                }
            }
        } else if let Some(caps) = frame_pattern().captures(line) {
            let symbol = hash_suffix().replace(&caps[1], "").into_owned();
            frames.push(StackFrame {
                function: Some(symbol),
                ..StackFrame::default()
            });
        }
    }

    frames
}
