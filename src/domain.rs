// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feature domains and their registry.
//!
//! A __domain__ is a named feature area with its own fixed option set and its
//! own state file. Karei knows a closed set of them, see [`Domain`]. The
//! [`Registry`] pairs each domain with the handler table that performs its
//! side effects, and hands out fresh state managers and commands for it.

pub mod builtin;

use crate::{
    command::Command,
    state::{HandlerTable, ManagerConfig, StateError, StateManager},
};

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Feature area managed by Karei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Theme,
    Font,
    Security,
    Verify,
    Logs,
    Proxy,
    Ssh,
}

impl Domain {
    /// Every domain in display order.
    pub const ALL: [Domain; 7] = [
        Self::Theme,
        Self::Font,
        Self::Security,
        Self::Verify,
        Self::Logs,
        Self::Proxy,
        Self::Ssh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Font => "font",
            Self::Security => "security",
            Self::Verify => "verify",
            Self::Logs => "logs",
            Self::Proxy => "proxy",
            Self::Ssh => "ssh",
        }
    }

    /// Built-in option set. First option is the default.
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            Self::Theme => &[
                "tokyo-night",
                "catppuccin",
                "nord",
                "everforest",
                "gruvbox",
                "kanagawa",
                "rose-pine",
                "gruvbox-light",
            ],
            Self::Font => &[
                "CaskaydiaMono",
                "FiraMono",
                "JetBrainsMono",
                "MesloLGS",
                "BerkeleyMono",
            ],
            Self::Security => &["status", "firewall", "audit"],
            Self::Verify => &["all", "tools", "path", "xdg"],
            Self::Logs => &["system", "errors", "boot", "kernel"],
            Self::Proxy => &["none", "auto", "manual"],
            Self::Ssh => &["agent", "server"],
        }
    }

    /// Check if invoking domain without arguments should prompt for an option.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Theme | Self::Font)
    }

    /// One line summary for help output.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Theme => "Switch desktop and terminal color theme",
            Self::Font => "Switch monospace font",
            Self::Security => "Run security checks and harden the system",
            Self::Verify => "Verify installed tools and environment layout",
            Self::Logs => "Show system logs",
            Self::Proxy => "Switch system proxy mode",
            Self::Ssh => "Manage SSH agent and server",
        }
    }

    /// Path to this domain's state file inside target state directory.
    pub fn state_file(&self, state_dir: impl AsRef<Path>) -> PathBuf {
        state_dir.as_ref().join(format!("{}.conf", self.as_str()))
    }
}

impl Display for Domain {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = RegistryError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str().eq_ignore_ascii_case(data.trim()))
            .ok_or_else(|| RegistryError::UnknownDomain(data.into()))
    }
}

/// Domain registration.
#[derive(Debug, Clone)]
struct Entry {
    config: ManagerConfig,
    handlers: HandlerTable,
}

/// Registry of domains and their handler tables.
///
/// Built once at startup. Every call to [`Registry::manager`] or
/// [`Registry::command`] yields a fresh instance with no cached state.
#[derive(Debug, Clone)]
pub struct Registry {
    state_dir: PathBuf,
    entries: HashMap<Domain, Entry>,
}

impl Registry {
    /// Construct new empty registry keeping state files in target directory.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            entries: HashMap::new(),
        }
    }

    /// Construct registry with every domain and its built-in handlers.
    pub fn builtin(state_dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(state_dir);
        for domain in Domain::ALL {
            registry.register(
                domain,
                domain.options().iter().copied(),
                builtin::handlers(domain),
            );
        }

        registry
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.as_path()
    }

    /// Register domain with target options and handlers.
    ///
    /// Replaces previous registration of the same domain.
    pub fn register(
        &mut self,
        domain: Domain,
        available: impl IntoIterator<Item = impl Into<String>>,
        handlers: HandlerTable,
    ) {
        let config = ManagerConfig::new(
            domain.as_str(),
            available,
            domain.state_file(&self.state_dir),
        );
        self.entries.insert(domain, Entry { config, handlers });
    }

    /// List registered domains in display order.
    pub fn domains(&self) -> Vec<Domain> {
        let mut domains: Vec<_> = self.entries.keys().copied().collect();
        domains.sort();
        domains
    }

    /// Build fresh state manager for target domain.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError::Unregistered`] if domain was never registered.
    /// - Return [`RegistryError::State`] if registration has no options.
    pub fn manager(&self, domain: Domain) -> Result<StateManager> {
        let entry = self
            .entries
            .get(&domain)
            .ok_or(RegistryError::Unregistered(domain))?;

        Ok(StateManager::new(
            entry.config.clone(),
            entry.handlers.clone(),
        )?)
    }

    /// Build fresh command for target domain.
    ///
    /// # Errors
    ///
    /// - Same as [`Registry::manager`].
    pub fn command(&self, domain: Domain) -> Result<Command> {
        let command = Command::new(domain.as_str(), self.manager(domain)?)
            .with_description(domain.description())
            .interactive(domain.is_interactive());

        Ok(command)
    }
}

/// Domain registry error types.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Name does not match any domain.
    #[error("unknown domain {0:?}")]
    UnknownDomain(String),

    /// Domain has no registration.
    #[error("domain {0} is not registered")]
    Unregistered(Domain),

    /// State manager cannot be built from registration.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Friendly result alias :3
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
