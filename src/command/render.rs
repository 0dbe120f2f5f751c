// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Output rendering.
//!
//! Results are rendered in exactly one of three modes, see [`OutputMode`].
//! JSON emits a single object per result, plain emits `key:value` lines meant
//! for scripts, and human emits decorated text marking the current selection
//! with `▶`.

use crate::{config::OutputMode, state::Status};

use serde::Serialize;
use std::{
    io::{self, Write},
    path::Path,
};

const CURRENT_MARKER: &str = "▶";

/// Result that can be rendered in every output mode.
pub trait Render: Serialize {
    /// Key/value pairs for plain mode, in display order.
    fn plain(&self) -> Vec<(&'static str, String)>;

    /// Decorated text for human mode.
    fn human(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Sink for rendered results.
pub struct Console {
    out: Box<dyn Write + Send>,
}

impl Console {
    /// Construct console writing to given sink.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Construct console writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Render result in target mode.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError::Json`] if result cannot be serialized.
    /// - Return [`RenderError::Io`] if sink cannot be written to.
    pub fn render(&mut self, mode: OutputMode, item: &impl Render) -> Result<()> {
        match mode {
            OutputMode::Json => {
                serde_json::to_writer_pretty(&mut self.out, item)?;
                writeln!(self.out)?;
            }
            OutputMode::Plain => {
                for (key, value) in item.plain() {
                    writeln!(self.out, "{key}:{value}")?;
                }
            }
            OutputMode::Human => item.human(&mut self.out)?,
        }

        self.out.flush()?;
        Ok(())
    }

    /// Write a single line of free text.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError::Io`] if sink cannot be written to.
    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        self.out.flush()?;
        Ok(())
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Options of a domain with the current one marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionList {
    #[serde(rename = "type")]
    pub domain: String,
    pub current: String,
    pub options: Vec<OptionEntry>,
}

impl OptionList {
    /// Construct option listing from state snapshot.
    pub fn from_status(status: &Status) -> Self {
        Self {
            domain: status.domain.clone(),
            current: status.current.clone(),
            options: status
                .available
                .iter()
                .map(|name| OptionEntry {
                    name: name.clone(),
                    current: *name == status.current,
                })
                .collect(),
        }
    }
}

/// Single entry of an [`OptionList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub name: String,
    pub current: bool,
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied {
    #[serde(rename = "type")]
    pub domain: String,
    pub target: String,
    pub dry_run: bool,
}

impl Render for Status {
    fn plain(&self) -> Vec<(&'static str, String)> {
        vec![
            ("type", self.domain.clone()),
            ("current", self.current.clone()),
            ("available", self.available.join(",")),
            ("config", display_path(&self.config)),
        ]
    }

    fn human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.domain)?;
        writeln!(out, "  current:   {CURRENT_MARKER} {}", self.current)?;
        writeln!(out, "  available: {}", self.available.join(", "))?;
        writeln!(out, "  config:    {}", display_path(&self.config))
    }
}

impl Render for OptionList {
    fn plain(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("type", self.domain.clone()),
            ("current", self.current.clone()),
        ];
        pairs.extend(
            self.options
                .iter()
                .map(|option| ("option", option.name.clone())),
        );
        pairs
    }

    fn human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Available {} options:", self.domain)?;
        for option in &self.options {
            writeln!(out, "  {}", marked(&option.name, option.current))?;
        }

        Ok(())
    }
}

impl Render for Applied {
    fn plain(&self) -> Vec<(&'static str, String)> {
        vec![
            ("type", self.domain.clone()),
            ("applied", self.target.clone()),
            ("dry_run", self.dry_run.to_string()),
        ]
    }

    fn human(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.dry_run {
            writeln!(out, "✓ {} set to {} (dry-run)", self.domain, self.target)
        } else {
            writeln!(out, "✓ {} set to {}", self.domain, self.target)
        }
    }
}

/// Prefix entry with the current marker, or pad it to line up with marked
/// entries.
pub fn marked(name: &str, current: bool) -> String {
    if current {
        format!("{CURRENT_MARKER} {name}")
    } else {
        format!("  {name}")
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Rendering error types.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Result cannot be serialized to JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Output sink cannot be written to.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
