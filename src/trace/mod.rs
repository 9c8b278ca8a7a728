// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stack-frame model and the text formatting shared by the error handler
//! and the debug profiler.
//!
//! Frames are supplied by the caller (or captured from a
//! [`std::backtrace::Backtrace`] via [`capture_frames`]); nothing here
//! inspects the running stack on its own.

mod backtrace;

pub use backtrace::{capture_frames, parse_backtrace};

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Scalars longer than this are cut and suffixed with `...`.
pub const MAX_ARGUMENT_LENGTH: usize = 15;
/// Entries shown per list argument before `...`.
pub const MAX_LIST_ENTRIES: usize = 3;
/// List arguments nested deeper than this collapse to `[...]`.
pub const MAX_ARGUMENT_DEPTH: usize = 3;

const CRATE_PREFIX: &str = "smart_factory::";

/// Frames belonging to the reporting machinery itself.
const SKIPPED_FUNCTIONS: &[&str] = &[
    "handle_error",
    "handle_exception",
    "trigger_error",
    "{closure}",
    "std::panicking",
    "core::panicking",
    "std::panic::",
    "rust_begin_unwind",
    "std::backtrace",
    "trace::capture_frames",
];

/// An argument value as it appears in a stack frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Scalar(String),
    /// Named entries, e.g. the elements of an array argument.
    List(Vec<(String, ArgValue)>),
    /// An opaque object, shown by its type name.
    Object(String),
}

impl ArgValue {
    pub fn scalar(value: impl ToString) -> Self {
        ArgValue::Scalar(value.to_string())
    }

    /// Positional list, keyed `0`, `1`, ...
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator<Item = ArgValue>,
    {
        ArgValue::List(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        )
    }
}

/// One entry of a call stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackFrame {
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub args: Vec<ArgValue>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: Some(function.into()),
            file: Some(file.into()),
            line: Some(line),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<ArgValue>) -> Self {
        self.args = args;
        self
    }
}

/// File and line a report refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the code calling this function (or the outermost
    /// `#[track_caller]` function above it).
    #[track_caller]
    pub fn caller() -> Self {
        std::panic::Location::caller().into()
    }
}

impl From<&std::panic::Location<'_>> for SourceLocation {
    fn from(location: &std::panic::Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

fn closure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{closure:([^}{]+)\}").expect("static regex"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\r\n\t]+").expect("static regex"))
}

fn is_skipped(function: &str) -> bool {
    SKIPPED_FUNCTIONS
        .iter()
        .any(|marker| function.contains(marker))
}

/// Longest common leading part of two strings, on char boundaries.
pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map_or(0, |((i, ca), _)| i + ca.len_utf8());
    &a[..end]
}

/// Normalize separators and cut the part shared with `root`.
pub fn trim_path(path: &str, root: Option<&Path>) -> String {
    let normalized = path.replace('\\', "/");
    match root {
        Some(root) => {
            let root = root.to_string_lossy().replace('\\', "/");
            let prefix = common_prefix(&root, &normalized);
            normalized[prefix.len()..].trim_start_matches('/').to_string()
        }
        None => normalized,
    }
}

/// Collapse line breaks and cut `value` to `limit` characters.
pub fn truncate_argument(value: &str, limit: usize) -> String {
    if value.is_empty() {
        return String::new();
    }
    let value = whitespace_pattern().replace_all(value, " ");
    if value.chars().count() > limit {
        let cut: String = value.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        value.into_owned()
    }
}

fn strip_crate_prefix(name: &str) -> String {
    name.replace(CRATE_PREFIX, "")
}

fn deep_implode(entries: &[(String, ArgValue)], depth: usize) -> String {
    if depth > MAX_ARGUMENT_DEPTH {
        return "[...]".to_string();
    }

    let mut parts = Vec::new();
    let mut truncated = false;
    for (index, (name, value)) in entries.iter().enumerate() {
        if index >= MAX_LIST_ENTRIES {
            truncated = true;
            break;
        }
        parts.push(match value {
            ArgValue::List(inner) => deep_implode(inner, depth + 1),
            ArgValue::Object(type_name) => strip_crate_prefix(type_name),
            ArgValue::Scalar(s) => format!("{}={}", name, truncate_argument(s, MAX_ARGUMENT_LENGTH)),
            ArgValue::Null => format!("{}=", name),
        });
    }

    let mut list = parts.join(", ");
    if truncated {
        if !list.is_empty() {
            list.push_str(", ");
        }
        list.push_str("...");
    }
    format!("[{}]", list)
}

/// Render the arguments of one frame.
pub fn make_arg_list(args: &[ArgValue]) -> String {
    args.iter()
        .map(|arg| match arg {
            ArgValue::List(entries) => deep_implode(entries, 1),
            ArgValue::Object(type_name) => strip_crate_prefix(type_name),
            ArgValue::Scalar(s) => truncate_argument(s, MAX_ARGUMENT_LENGTH),
            ArgValue::Null => String::new(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a call stack, one frame per line, each indented one step deeper.
///
/// Frames of the reporting machinery and frames without a source file are
/// left out.
pub fn extract_call_stack(frames: &[StackFrame], with_args: bool, root: Option<&Path>) -> String {
    let mut trace = String::new();
    let mut indent = String::new();

    for frame in frames {
        if frame.function.as_deref().is_some_and(is_skipped) {
            continue;
        }
        let Some(file) = frame.file.as_deref().filter(|f| !f.is_empty()) else {
            continue;
        };

        if let Some(function) = frame.function.as_deref().filter(|f| !f.is_empty()) {
            trace.push_str(&indent);
            match closure_pattern().captures(function) {
                Some(caps) => {
                    trace.push_str("{closure:");
                    trace.push_str(&trim_path(&caps[1], root));
                    trace.push('}');
                }
                None => trace.push_str(&strip_crate_prefix(function)),
            }
            trace.push('(');
            if with_args {
                trace.push_str(&make_arg_list(&frame.args));
            }
            trace.push(')');
        }

        trace.push_str(" [");
        trace.push_str(&trim_path(file, root));
        trace.push_str(", ");
        match frame.line {
            Some(line) if line > 0 => trace.push_str(&line.to_string()),
            _ => trace.push_str("line number undefined"),
        }
        trace.push_str("]\r\n");

        indent.push_str("  ");
    }

    trace.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_cut_after_fifteen_chars() {
        assert_eq!(truncate_argument("short", 15), "short");
        assert_eq!(
            truncate_argument("abcdefghijklmnopqrstuvwxyz", 15),
            "abcdefghijklmno..."
        );
        assert_eq!(truncate_argument("a\r\n\tb", 15), "a b");
        assert_eq!(truncate_argument("", 15), "");
    }

    #[test]
    fn lists_show_three_entries() {
        let arg = ArgValue::list((1..=5).map(ArgValue::scalar));
        assert_eq!(make_arg_list(&[arg]), "[0=1, 1=2, 2=3, ...]");
    }

    #[test]
    fn nesting_beyond_three_levels_collapses() {
        let deep = ArgValue::list([ArgValue::list([ArgValue::list([ArgValue::list([
            ArgValue::scalar("x"),
        ])])])]);
        assert_eq!(make_arg_list(&[deep]), "[[[[...]]]]");
    }

    #[test]
    fn objects_render_as_type_names() {
        let args = vec![
            ArgValue::Object("smart_factory::messages::MessageManager".to_string()),
            ArgValue::scalar(42),
        ];
        assert_eq!(make_arg_list(&args), "messages::MessageManager, 42");
    }

    #[test]
    fn call_stack_skips_machinery_and_indents() {
        let frames = vec![
            StackFrame::new("smart_factory::error_handler::ErrorHandler::handle_error", "/app/src/error_handler/mod.rs", 10),
            StackFrame::new("app::save", "/app/src/save.rs", 12)
                .with_args(vec![ArgValue::scalar("draft")]),
            StackFrame {
                function: Some("app::no_file".to_string()),
                ..StackFrame::default()
            },
            StackFrame::new("app::main", "/app/src/main.rs", 3),
            StackFrame {
                function: None,
                file: Some("/app/src/lib.rs".to_string()),
                line: None,
                args: Vec::new(),
            },
        ];
        let stack = extract_call_stack(&frames, true, Some(Path::new("/app/src")));
        assert_eq!(
            stack,
            "app::save(draft) [save.rs, 12]\r\n  app::main() [main.rs, 3]\r\n [lib.rs, line number undefined]"
        );
    }

    #[test]
    fn closure_frames_get_trimmed_paths() {
        let frames = vec![StackFrame::new("{closure:/app/src/routes.rs:14}", "/app/src/routes.rs", 15)];
        let stack = extract_call_stack(&frames, false, Some(Path::new("/app/src")));
        assert_eq!(stack, "{closure:routes.rs:14}() [routes.rs, 15]");
    }

    #[test]
    fn common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix("/srv/app/src", "/srv/app/tests"), "/srv/app/");
        assert_eq!(common_prefix("äb", "äc"), "ä");
        assert_eq!(common_prefix("x", "y"), "");
    }
}
