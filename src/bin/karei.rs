// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use karei::{
    command::render::{Console, Render},
    path::{default_settings_path, default_state_dir},
    CommandError, Context, Domain, OutputMode, Registry, Settings, StateError, Status,
};

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use fs2::FileExt;
use serde::Serialize;
use std::{
    fs::{read_to_string, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;
const EXIT_THEME_NOT_FOUND: i32 = 4;
const EXIT_FONT_NOT_FOUND: i32 = 5;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "karei [options] <domain> [<option>|list]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let settings = load_settings(&self.global)?;
        let state_dir = match settings.state_dir.clone() {
            Some(state_dir) => state_dir,
            None => default_state_dir()?,
        };
        let _lock = acquire_lock(&state_dir)?;
        let ctx = Context::from_settings(&settings);
        let registry = Registry::builtin(state_dir);

        match self.command {
            Command::Theme(opts) => run_domain(&ctx, &registry, Domain::Theme, opts).await,
            Command::Font(opts) => run_domain(&ctx, &registry, Domain::Font, opts).await,
            Command::Security(opts) => run_domain(&ctx, &registry, Domain::Security, opts).await,
            Command::Verify(opts) => run_domain(&ctx, &registry, Domain::Verify, opts).await,
            Command::Logs(opts) => run_domain(&ctx, &registry, Domain::Logs, opts).await,
            Command::Proxy(opts) => run_domain(&ctx, &registry, Domain::Proxy, opts).await,
            Command::Ssh(opts) => run_domain(&ctx, &registry, Domain::Ssh, opts).await,
            Command::Status => run_status(&ctx, &registry),
        }
    }
}

#[derive(Args, Clone, Debug)]
struct GlobalOptions {
    /// Stream output of external commands and log details.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show commands instead of running them.
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation.
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Emit results as JSON.
    #[arg(long, global = true, conflicts_with = "plain")]
    pub json: bool,

    /// Emit results as key:value lines.
    #[arg(long, global = true)]
    pub plain: bool,

    /// Kill external commands running longer than this.
    #[arg(long, global = true, value_name = "seconds")]
    pub timeout: Option<u64>,

    /// Path to settings file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Switch desktop and terminal color theme.
    #[command(override_usage = "karei theme [options] [<theme>|list]")]
    Theme(SelectOptions),

    /// Switch monospace font.
    #[command(override_usage = "karei font [options] [<font>|list]")]
    Font(SelectOptions),

    /// Run security checks and harden the system.
    #[command(override_usage = "karei security [options] [<check>|list]")]
    Security(SelectOptions),

    /// Verify installed tools and environment layout.
    #[command(override_usage = "karei verify [options] [<check>|list]")]
    Verify(SelectOptions),

    /// Show system logs.
    #[command(override_usage = "karei logs [options] [<view>|list]")]
    Logs(SelectOptions),

    /// Switch system proxy mode.
    #[command(override_usage = "karei proxy [options] [<mode>|list]")]
    Proxy(SelectOptions),

    /// Manage SSH agent and server.
    #[command(override_usage = "karei ssh [options] [<target>|list]")]
    Ssh(SelectOptions),

    /// Show current selection of every domain.
    #[command(override_usage = "karei status [options]")]
    Status,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SelectOptions {
    /// Option to apply, or "list" to show available options.
    #[arg(value_name = "option")]
    pub choice: Option<String>,
}

/// Status of every domain at once.
#[derive(Debug, Serialize)]
struct Overview {
    domains: Vec<Status>,
}

impl Render for Overview {
    fn plain(&self) -> Vec<(&'static str, String)> {
        self.domains.iter().flat_map(Render::plain).collect()
    }

    fn human(&self, out: &mut dyn Write) -> io::Result<()> {
        for status in &self.domains {
            status.human(out)?;
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("interrupted")]
struct Interrupted;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.global.verbose { "debug" } else { "info" };
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run().await {
        error!("{error:?}");
        exit(exit_code(&error));
    }

    exit(0)
}

fn load_settings(opts: &GlobalOptions) -> Result<Settings> {
    let path = match &opts.config {
        Some(path) => path.clone(),
        None => default_settings_path()?,
    };

    let mut settings = if opts.config.is_some() || path.exists() {
        debug!("load settings from {:?}", path.display());
        read_to_string(&path)
            .with_context(|| format!("failed to read settings at {:?}", path.display()))?
            .parse::<Settings>()
            .with_context(|| format!("invalid settings at {:?}", path.display()))?
    } else {
        Settings::default()
    };

    settings.verbose |= opts.verbose;
    settings.dry_run |= opts.dry_run;
    settings.auto_yes |= opts.yes;
    if opts.json {
        settings.output = OutputMode::Json;
    } else if opts.plain {
        settings.output = OutputMode::Plain;
    }
    if opts.timeout.is_some() {
        settings.timeout = opts.timeout;
    }

    Ok(settings)
}

fn acquire_lock(state_dir: &Path) -> Result<File> {
    mkdirp::mkdirp(state_dir)
        .with_context(|| format!("failed to create state directory {:?}", state_dir.display()))?;
    let lock_path = state_dir.join("karei.lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("failed to create lock file {:?}", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        bail!(
            "another karei instance is running, lock held on {:?}",
            lock_path.display()
        );
    }

    Ok(lock_file)
}

async fn run_domain(
    ctx: &Context,
    registry: &Registry,
    domain: Domain,
    opts: SelectOptions,
) -> Result<()> {
    let mut command = registry.command(domain)?;
    let args: Vec<String> = opts.choice.into_iter().collect();

    tokio::select! {
        result = command.execute(ctx, &args) => Ok(result?),
        _ = tokio::signal::ctrl_c() => Err(Interrupted.into()),
    }
}

fn run_status(ctx: &Context, registry: &Registry) -> Result<()> {
    let mut domains = Vec::new();
    for domain in registry.domains() {
        domains.push(registry.manager(domain)?.status());
    }

    Console::stdout().render(ctx.output(), &Overview { domains })?;
    Ok(())
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if error.is::<Interrupted>() {
        return EXIT_INTERRUPTED;
    }

    match error.downcast_ref::<CommandError>() {
        Some(err) if err.is_interrupted() => EXIT_INTERRUPTED,
        Some(CommandError::Usage(_) | CommandError::Input(_)) => EXIT_USAGE,
        Some(CommandError::State(StateError::InvalidTarget { domain, .. })) => {
            match domain.parse::<Domain>() {
                Ok(Domain::Theme) => EXIT_THEME_NOT_FOUND,
                Ok(Domain::Font) => EXIT_FONT_NOT_FOUND,
                _ => EXIT_NOT_FOUND,
            }
        }
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn invalid(domain: &str) -> anyhow::Error {
        CommandError::State(StateError::InvalidTarget {
            domain: domain.into(),
            target: "blah".into(),
            available: vec![],
        })
        .into()
    }

    #[test]
    fn exit_code_maps_errors() {
        assert_eq!(exit_code(&Interrupted.into()), EXIT_INTERRUPTED);
        assert_eq!(exit_code(&CommandError::Usage("bad".into()).into()), EXIT_USAGE);
        assert_eq!(
            exit_code(&CommandError::Input(io::ErrorKind::UnexpectedEof.into()).into()),
            EXIT_USAGE
        );
        assert_eq!(
            exit_code(&CommandError::Input(io::ErrorKind::Interrupted.into()).into()),
            EXIT_INTERRUPTED
        );
        assert_eq!(exit_code(&invalid("theme")), EXIT_THEME_NOT_FOUND);
        assert_eq!(exit_code(&invalid("font")), EXIT_FONT_NOT_FOUND);
        assert_eq!(exit_code(&invalid("proxy")), EXIT_NOT_FOUND);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }
}
