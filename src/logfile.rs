// SPDX-License-Identifier: PMPL-1.0-or-later

//! Append-only log file helpers shared by the trace and debug writers

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Whether `path` exists and is not read-only.
pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

/// A file in `dir` can be written if it exists and is writable, or does
/// not exist yet and `dir` is writable.
pub fn can_write(dir: &Path, file: &Path) -> bool {
    if file.exists() {
        is_writable(file)
    } else {
        dir.is_dir() && is_writable(dir)
    }
}

/// Normalize a configured directory: backslashes become `/`, trailing
/// separators are dropped.
pub fn normalize_dir(raw: &str) -> PathBuf {
    let normalized = raw.replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

pub fn append(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())
}
