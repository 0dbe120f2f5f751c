// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Init-system service control.
//!
//! Thin layer over [`CommandExecutor`] for the handful of `systemctl` calls
//! that handlers need. Holds no state of its own.

use crate::exec::{CommandExecutor, Result};

use tracing::debug;

/// Query and manipulate systemd services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceController {
    executor: CommandExecutor,
}

impl ServiceController {
    /// Construct new service controller on top of given executor.
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Check if service is currently active.
    ///
    /// A failing probe means "not active", it is never an error.
    pub async fn is_active(&self, service: &str) -> bool {
        let active = self
            .executor
            .execute_silent("systemctl", ["is-active", "--quiet", service])
            .await
            .is_ok();
        debug!("service {service:?} active: {active}");
        active
    }

    /// Check if service is enabled to start at boot.
    pub async fn is_enabled(&self, service: &str) -> bool {
        self.executor
            .execute_silent("systemctl", ["is-enabled", "--quiet", service])
            .await
            .is_ok()
    }

    /// Enable service through sudo.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn enable(&self, service: &str) -> Result<()> {
        self.executor
            .execute_sudo("systemctl", ["enable", service])
            .await
    }

    /// Start service through sudo.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn start(&self, service: &str) -> Result<()> {
        self.executor
            .execute_sudo("systemctl", ["start", service])
            .await
    }

    /// Stop service through sudo.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn stop(&self, service: &str) -> Result<()> {
        self.executor
            .execute_sudo("systemctl", ["stop", service])
            .await
    }

    /// Restart service through sudo.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn restart(&self, service: &str) -> Result<()> {
        self.executor
            .execute_sudo("systemctl", ["restart", service])
            .await
    }

    /// Get human readable status report of service.
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn status(&self, service: &str) -> Result<String> {
        self.executor
            .execute_with_output("systemctl", ["status", "--no-pager", service])
            .await
    }

    /// Get value of a single unit property, e.g., "ActiveState".
    ///
    /// # Errors
    ///
    /// - Return [`ExecError`](crate::exec::ExecError) if `systemctl` fails.
    pub async fn get_property(&self, service: &str, property: &str) -> Result<String> {
        let property = format!("--property={property}");
        let output = self
            .executor
            .execute_with_output("systemctl", ["show", service, property.as_str(), "--value"])
            .await?;

        Ok(output.trim().to_string())
    }
}
