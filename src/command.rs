// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! CLI-facing wrapper around a state manager.
//!
//! A [`Command`] translates an argument list into [`StateManager`] operations,
//! and renders the results through a [`Console`]. There are four ways to invoke
//! it:
//!
//! 1. `<option>`: apply option through the state manager.
//! 2. `list`: list available options, marking the current one.
//! 3. Nothing, on an interactive command: prompt for an option by number.
//! 4. Nothing, on a non-interactive command: show current status.
//!
//! Interactive prompts refuse to run in JSON mode, or when standard input is
//! not a terminal. Bad input is a usage error, and is never retried.

pub mod render;

use crate::{
    command::render::{marked, Applied, Console, OptionList, RenderError},
    context::Context,
    state::{StateError, StateManager},
};

use inquire::{InquireError, Text};
use std::io::{self, IsTerminal};
use tracing::{debug, instrument};

/// Source of interactive input lines.
pub trait LineReader: Send {
    /// Check if input is attached to a terminal.
    fn is_terminal(&self) -> bool;

    /// Read one line of input after showing a prompt.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if input cannot be read.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// Read lines from standard input through an inquire prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptReader;

impl LineReader for PromptReader {
    fn is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        Text::new(prompt).prompt().map_err(|err| match err {
            InquireError::OperationInterrupted => io::Error::from(io::ErrorKind::Interrupted),
            InquireError::IO(err) => err,
            err => io::Error::other(err),
        })
    }
}

/// CLI-facing wrapper around exactly one [`StateManager`].
pub struct Command {
    name: String,
    usage: String,
    description: String,
    manager: StateManager,
    interactive: bool,
    console: Console,
    reader: Box<dyn LineReader>,
}

impl Command {
    /// Construct new non-interactive command writing to stdout.
    pub fn new(name: impl Into<String>, manager: StateManager) -> Self {
        let name = name.into();
        Self {
            usage: format!("karei {name} [<option>|list]"),
            description: String::new(),
            name,
            manager,
            interactive: false,
            console: Console::stdout(),
            reader: Box::new(PromptReader),
        }
    }

    /// Set usage text.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Set description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Prompt for an option when invoked without arguments.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Render results into given console.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Read interactive input from given reader.
    pub fn with_reader(mut self, reader: impl LineReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn usage(&self) -> &str {
        self.usage.as_str()
    }

    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn manager(&self) -> &StateManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut StateManager {
        &mut self.manager
    }

    /// Execute command with target argument list.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::State`] if state manager fails.
    /// - Return [`CommandError::Usage`] if interactive prompt cannot run, or
    ///   input is bad.
    /// - Return [`CommandError::Input`] if input cannot be read.
    /// - Return [`CommandError::Render`] if results cannot be rendered.
    #[instrument(skip(self, ctx), fields(command = %self.name), level = "debug")]
    pub async fn execute(&mut self, ctx: &Context, args: &[String]) -> Result<()> {
        match args.first().map(String::as_str) {
            Some("list") => self.list(ctx),
            Some(target) if !target.is_empty() => self.apply(ctx, target).await,
            _ if self.interactive => self.interactive_select(ctx).await,
            _ => self.show_status(ctx),
        }
    }

    /// Render available options, marking the current one.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Render`] if results cannot be rendered.
    pub fn list(&mut self, ctx: &Context) -> Result<()> {
        let list = OptionList::from_status(&self.manager.status());
        self.console.render(ctx.output(), &list)?;
        Ok(())
    }

    /// Render current status.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Render`] if results cannot be rendered.
    pub fn show_status(&mut self, ctx: &Context) -> Result<()> {
        let status = self.manager.status();
        self.console.render(ctx.output(), &status)?;
        Ok(())
    }

    async fn apply(&mut self, ctx: &Context, target: &str) -> Result<()> {
        self.manager.apply(ctx, target).await?;
        let applied = Applied {
            domain: self.manager.domain().to_string(),
            target: target.to_string(),
            dry_run: ctx.is_dry_run(),
        };
        self.console.render(ctx.output(), &applied)?;

        Ok(())
    }

    async fn interactive_select(&mut self, ctx: &Context) -> Result<()> {
        if ctx.output().is_json() {
            return Err(CommandError::Usage(
                "interactive mode is not available with JSON output".into(),
            ));
        }

        if !self.reader.is_terminal() {
            return Err(CommandError::Usage(format!(
                "interactive mode needs a terminal, use `karei {0} <option>` or `karei {0} list`",
                self.name
            )));
        }

        self.console.line(format!("usage: {}", self.usage))?;
        let current = self.manager.current().to_string();
        let available = self.manager.available().to_vec();
        self.console.line(format!("Current {}: {current}", self.manager.domain()))?;
        for (index, option) in available.iter().enumerate() {
            self.console
                .line(format!("{:>3}. {}", index + 1, marked(option, *option == current)))?;
        }

        let input = self
            .reader
            .read_line(&format!("Select {} [1-{}]:", self.manager.domain(), available.len()))
            .map_err(CommandError::Input)?;
        let choice = parse_choice(&input, available.len())?;
        debug!("selected {choice} of {}", available.len());

        self.apply(ctx, &available[choice - 1]).await
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Command")
            .field("name", &self.name)
            .field("manager", &self.manager)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

fn parse_choice(input: &str, count: usize) -> Result<usize> {
    let input = input.trim();
    let choice = input.parse::<usize>().map_err(|_| {
        CommandError::Usage(format!("invalid selection {input:?}, expected a number"))
    })?;

    if choice == 0 || choice > count {
        return Err(CommandError::Usage(format!(
            "selection {choice} out of range, expected 1-{count}"
        )));
    }

    Ok(choice)
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// State manager operation fails.
    #[error(transparent)]
    State(#[from] StateError),

    /// Command invoked in a way it cannot serve.
    #[error("{0}")]
    Usage(String),

    /// Interactive input cannot be read.
    #[error("failed to read selection")]
    Input(#[source] io::Error),

    /// Results cannot be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl CommandError {
    /// Check if user interrupted an interactive prompt.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Input(err) if err.kind() == io::ErrorKind::Interrupted)
    }
}

/// Friendly result alias :3
pub type Result<T, E = CommandError> = std::result::Result<T, E>;
