// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the files Karei reads and writes
//! between runs: the global settings file and the per-domain state files.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to Karei's configuration directory.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/karei`. Does not check if
/// the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("karei"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to global settings file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    default_config_dir().map(|path| path.join("karei.toml"))
}

/// Determine default absolute path to the directory holding per-domain state
/// files.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_state_dir() -> Result<PathBuf> {
    default_config_dir().map(|path| path.join("state"))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
