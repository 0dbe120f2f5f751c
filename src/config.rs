// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of Karei's global settings file to simplify the process
//! of serialization and deserialization. File I/O is left to the caller to
//! figure out.
//!
//! Per-domain selections are __not__ stored here. Each domain keeps its own
//! state file, see [`StateFile`](crate::state::persist::StateFile).

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Global settings layout.
///
/// Every field is optional in the settings file. Missing fields fall back to
/// their defaults, and command line flags override whatever the file says.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory to keep per-domain state files in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Stream output of external processes.
    pub verbose: bool,

    /// Report external processes instead of running them.
    pub dry_run: bool,

    /// Answer yes to every confirmation prompt.
    pub auto_yes: bool,

    /// Output mode for rendered results.
    pub output: OutputMode,

    /// Timeout in seconds for each external process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on state directory field.
        if let Some(state_dir) = settings.state_dir.take() {
            settings.state_dir = Some(PathBuf::from(
                shellexpand::full(state_dir.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Rendering mode for command results.
///
/// The three modes are mutually exclusive. JSON emits one structured object,
/// plain emits `key:value` lines for scripting, and human emits decorated
/// text.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Human,
    Plain,
    Json,
}

impl OutputMode {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

impl Display for OutputMode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Human => fmt.write_str("human"),
            Self::Plain => fmt.write_str("plain"),
            Self::Json => fmt.write_str("json"),
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}
