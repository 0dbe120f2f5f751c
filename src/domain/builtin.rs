// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Built-in handler tables.
//!
//! Thin handlers that perform each domain's side effect through the
//! executor carried by the [`Context`]. They check for the external tools
//! they need before calling them, except under dry-run where nothing runs.

use crate::{
    config::OutputMode,
    context::Context,
    domain::Domain,
    path::home_dir,
    state::{handler, HandlerTable},
};

use anyhow::{bail, ensure, Context as _, Result};
use std::{
    env,
    io::{self, Write},
};
use tracing::info;

const GNOME_INTERFACE: &str = "org.gnome.desktop.interface";
const GNOME_PROXY: &str = "org.gnome.system.proxy";

/// Tools every Karei managed environment is expected to have.
const REQUIRED_TOOLS: &[&str] = &["git", "curl", "mise", "gsettings", "fc-list"];

/// Build handler table of target domain.
pub fn handlers(domain: Domain) -> HandlerTable {
    match domain {
        Domain::Theme => HandlerTable::new()
            .with("gruvbox-light", handler(apply_light_theme))
            .with_default(handler(apply_dark_theme)),
        Domain::Font => HandlerTable::new()
            .with(
                "BerkeleyMono",
                handler(|ctx, _| async move { apply_font(&ctx, "Berkeley Mono").await }),
            )
            .with_default(handler(|ctx, target| async move {
                apply_font(&ctx, &format!("{target} Nerd Font")).await
            })),
        Domain::Security => HandlerTable::new()
            .with("status", handler(firewall_status))
            .with("firewall", handler(enable_firewall))
            .with("audit", handler(audit_system)),
        Domain::Verify => HandlerTable::new()
            .with("tools", handler(|ctx, _| async move { verify_tools(&ctx) }))
            .with("path", handler(|_, _| async move { verify_path() }))
            .with("xdg", handler(|_, _| async move { verify_xdg() }))
            .with(
                "all",
                handler(|ctx, _| async move {
                    verify_tools(&ctx)?;
                    verify_path()?;
                    verify_xdg()
                }),
            ),
        Domain::Logs => HandlerTable::new().with_default(handler(show_logs)),
        Domain::Proxy => HandlerTable::new().with_default(handler(set_proxy_mode)),
        Domain::Ssh => HandlerTable::new()
            .with("agent", handler(enable_ssh_agent))
            .with("server", handler(enable_ssh_server)),
    }
}

fn require(ctx: &Context, program: &str) -> Result<()> {
    if ctx.is_dry_run() || ctx.executor().command_exists(program) {
        return Ok(());
    }

    bail!("{program} is not installed")
}

async fn gsettings_set(ctx: &Context, schema: &str, key: &str, value: &str) -> Result<()> {
    require(ctx, "gsettings")?;
    ctx.executor()
        .execute("gsettings", ["set", schema, key, value])
        .await
        .with_context(|| format!("failed to set {schema} {key}"))
}

async fn apply_dark_theme(ctx: Context, theme: String) -> Result<()> {
    gsettings_set(&ctx, GNOME_INTERFACE, "color-scheme", "prefer-dark").await?;
    gsettings_set(&ctx, GNOME_INTERFACE, "gtk-theme", "Adwaita-dark").await?;
    info!("theme {theme} applied");
    Ok(())
}

async fn apply_light_theme(ctx: Context, theme: String) -> Result<()> {
    gsettings_set(&ctx, GNOME_INTERFACE, "color-scheme", "prefer-light").await?;
    gsettings_set(&ctx, GNOME_INTERFACE, "gtk-theme", "Adwaita").await?;
    info!("theme {theme} applied");
    Ok(())
}

async fn apply_font(ctx: &Context, family: &str) -> Result<()> {
    require(ctx, "fc-list")?;
    let installed = ctx
        .executor()
        .execute_with_output("fc-list", [":", "family"])
        .await?;
    if !ctx.is_dry_run() {
        ensure!(
            installed.lines().any(|line| line.contains(family)),
            "font {family:?} is not installed"
        );
    }

    gsettings_set(ctx, GNOME_INTERFACE, "monospace-font-name", &format!("{family} 10")).await
}

async fn firewall_status(ctx: Context, _: String) -> Result<()> {
    let active = ctx.services().is_active("ufw").await;
    info!("firewall (ufw) active: {active}");
    Ok(())
}

async fn enable_firewall(ctx: Context, _: String) -> Result<()> {
    require(&ctx, "ufw")?;
    if !ctx.is_dry_run() && !ctx.confirm("Enable ufw firewall and deny incoming traffic?")? {
        bail!("firewall setup declined");
    }

    let services = ctx.services();
    ctx.executor()
        .execute_sudo("ufw", ["default", "deny", "incoming"])
        .await?;
    ctx.executor().execute_sudo("ufw", ["--force", "enable"]).await?;
    services.enable("ufw").await?;
    if !services.is_active("ufw").await {
        services.start("ufw").await?;
    }

    Ok(())
}

async fn audit_system(ctx: Context, _: String) -> Result<()> {
    require(&ctx, "lynis")?;
    ctx.executor()
        .execute_sudo("lynis", ["audit", "system", "--quick"])
        .await?;
    Ok(())
}

fn verify_tools(ctx: &Context) -> Result<()> {
    let missing: Vec<_> = REQUIRED_TOOLS
        .iter()
        .filter(|tool| !ctx.executor().command_exists(tool))
        .copied()
        .collect();
    ensure!(missing.is_empty(), "missing tools: {}", missing.join(", "));

    info!("all {} tools found", REQUIRED_TOOLS.len());
    Ok(())
}

fn verify_path() -> Result<()> {
    let local_bin = home_dir()?.join(".local").join("bin");
    let path = env::var_os("PATH").unwrap_or_default();
    ensure!(
        env::split_paths(&path).any(|entry| entry == local_bin),
        "{:?} is not in PATH",
        local_bin.display()
    );

    Ok(())
}

fn verify_xdg() -> Result<()> {
    let dirs = [
        ("config", dirs::config_dir()),
        ("data", dirs::data_dir()),
        ("cache", dirs::cache_dir()),
    ];

    for (kind, dir) in dirs {
        let dir = dir.with_context(|| format!("cannot determine XDG {kind} directory"))?;
        ensure!(dir.is_dir(), "XDG {kind} directory {:?} does not exist", dir.display());
    }

    Ok(())
}

async fn show_logs(ctx: Context, view: String) -> Result<()> {
    require(&ctx, "journalctl")?;
    let args: &[&str] = match view.as_str() {
        "errors" => &["-p", "err", "-b", "--no-pager"],
        "boot" => &["-b", "-n", "100", "--no-pager"],
        "kernel" => &["-k", "-n", "50", "--no-pager"],
        _ => &["-n", "50", "--no-pager"],
    };

    let output = ctx.executor().execute_with_output("journalctl", args).await?;
    write_journal(ctx.output(), &output, &mut io::stdout(), &mut io::stderr())?;
    Ok(())
}

// INVARIANT: Stdout only carries the rendered JSON object in JSON mode.
fn write_journal(
    mode: OutputMode,
    journal: &str,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> io::Result<()> {
    let out: &mut dyn Write = if mode.is_json() { stderr } else { stdout };
    out.write_all(journal.as_bytes())?;
    out.flush()
}

async fn set_proxy_mode(ctx: Context, mode: String) -> Result<()> {
    gsettings_set(&ctx, GNOME_PROXY, "mode", &mode).await
}

async fn enable_ssh_agent(ctx: Context, _: String) -> Result<()> {
    ctx.executor()
        .execute("systemctl", ["--user", "enable", "--now", "gcr-ssh-agent.socket"])
        .await?;
    Ok(())
}

async fn enable_ssh_server(ctx: Context, _: String) -> Result<()> {
    let services = ctx.services();
    services.enable("ssh").await?;
    if !services.is_active("ssh").await {
        services.start("ssh").await?;
    }

    Ok(())
}
