// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Developer environment bootstrapper core.
//!
//! Karei manages a handful of feature __domains__ (themes, fonts, security
//! checks, and so on). Each domain offers a fixed set of options, and exactly
//! one of them is current at any time. Picking an option runs a __handler__
//! that performs the real work through external tools, and remembers the pick
//! in a per-domain state file for the next run.
//!
//! # Layers
//!
//! 1. [`exec`]: run external processes with dry-run, verbosity, sudo, and
//!    timeout semantics.
//! 2. [`state`]: validate, apply, and persist the current option of a domain.
//! 3. [`command`]: CLI-facing direct, list, interactive, and status modes with
//!    JSON, plain, or human output.
//! 4. [`domain`]: closed set of domains and the registry wiring them to their
//!    handlers.

pub mod command;
pub mod config;
pub mod context;
pub mod domain;
pub mod exec;
pub mod path;
pub mod state;

pub use command::{Command, CommandError, LineReader, PromptReader};
pub use config::{OutputMode, Settings};
pub use context::Context;
pub use domain::{Domain, Registry};
pub use exec::{CommandExecutor, ExecError, ServiceController};
pub use state::{handler, Handler, HandlerTable, ManagerConfig, StateError, StateManager, Status};
