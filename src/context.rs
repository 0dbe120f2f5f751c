// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Invocation context handed to every handler.
//!
//! Carries the executor, the output mode, and the consent setting of the
//! current run. Nothing in here is global; the caller builds one context per
//! process invocation and passes it down explicitly.

use crate::{
    config::{OutputMode, Settings},
    exec::{CommandExecutor, ServiceController},
};

use inquire::{Confirm, InquireError};
use std::time::Duration;
use tracing::debug;

/// Per-invocation context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    executor: CommandExecutor,
    output: OutputMode,
    auto_yes: bool,
}

impl Context {
    /// Construct new context.
    pub fn new(executor: CommandExecutor, output: OutputMode) -> Self {
        Self {
            executor,
            output,
            auto_yes: false,
        }
    }

    /// Construct context from global settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let executor = CommandExecutor::new()
            .verbose(settings.verbose)
            .dry_run(settings.dry_run)
            .timeout(settings.timeout.map(Duration::from_secs));

        Self::new(executor, settings.output).with_auto_yes(settings.auto_yes)
    }

    /// Answer yes to every confirmation.
    pub fn with_auto_yes(mut self, auto_yes: bool) -> Self {
        self.auto_yes = auto_yes;
        self
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn services(&self) -> ServiceController {
        ServiceController::new(self.executor)
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn is_verbose(&self) -> bool {
        self.executor.is_verbose()
    }

    pub fn is_dry_run(&self) -> bool {
        self.executor.is_dry_run()
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Ask user to confirm an action.
    ///
    /// Skips the prompt entirely when auto-yes is set.
    ///
    /// # Errors
    ///
    /// - Return [`InquireError`] if prompt cannot be shown or answered.
    pub fn confirm(&self, message: &str) -> Result<bool, InquireError> {
        if self.auto_yes {
            debug!("auto-yes: {message}");
            return Ok(true);
        }

        Confirm::new(message).with_default(false).prompt()
    }
}
