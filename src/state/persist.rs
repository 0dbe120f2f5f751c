// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Per-domain state file handling.
//!
//! # State File Layout
//!
//! Each domain persists its current selection in a tiny env-style file of its
//! own. The only line Karei cares about looks like this:
//!
//! ```text
//! KAREI_THEME=tokyo-night
//! ```
//!
//! The key is `KAREI_` followed by the upper-cased domain name. On read, the
//! key is matched case-insensitively, and the value may be wrapped in single
//! or double quotes. Every other line is ignored.
//!
//! # Pitfalls
//!
//! Writing a state file always replaces its entire content. Any other line
//! that happened to live in the file is lost on the next write. Never point
//! two domains at the same file.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io,
    path::Path,
};

/// Key/value line format of a domain's state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    key: String,
}

impl StateFile {
    /// Construct state file format for target domain.
    pub fn new(domain: impl AsRef<str>) -> Self {
        Self {
            key: format!("KAREI_{}", domain.as_ref().to_uppercase()),
        }
    }

    /// Key that prefixes the persisted value, e.g., "KAREI_THEME".
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Extract persisted value from file content.
    ///
    /// First matching line wins. Empty values count as absent.
    pub fn parse(&self, content: &str) -> Option<String> {
        content.lines().find_map(|line| {
            let (key, value) = line.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case(&self.key) {
                return None;
            }

            let value = unquote(value.trim());
            (!value.is_empty()).then(|| value.to_string())
        })
    }

    /// Read persisted value from file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if file cannot be read.
    pub fn read(&self, path: impl AsRef<Path>) -> io::Result<Option<String>> {
        read_to_string(path.as_ref()).map(|content| self.parse(&content))
    }

    /// Render file content holding target value.
    pub fn entry(&self, value: impl AsRef<str>) -> StateEntry<'_> {
        StateEntry {
            key: self.key.as_str(),
            value: value.as_ref().to_string(),
        }
    }

    /// Replace entire file content at target path with target value.
    ///
    /// Creates missing parent directories first.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if directories cannot be created or file cannot
    ///   be written.
    pub fn write(&self, path: impl AsRef<Path>, value: impl AsRef<str>) -> io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            mkdirp::mkdirp(parent)?;
        }

        write(path.as_ref(), self.entry(value).to_string().as_bytes())
    }
}

/// Single persisted `KEY=value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry<'key> {
    key: &'key str,
    value: String,
}

impl Display for StateEntry<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{}={}", self.key, self.value)
    }
}

// INVARIANT: Strip one layer of matching quotes only.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }

    value
}
