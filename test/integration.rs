// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{Buffer, ScriptedReader, StateFixture};

use anyhow::Result;
use indoc::indoc;
use karei::{
    command::render::Console, handler, CommandError, CommandExecutor, Context, Domain,
    HandlerTable, OutputMode, Registry, StateError,
};
use pretty_assertions::assert_eq;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn counting(calls: &Arc<AtomicUsize>) -> karei::Handler {
    let calls = calls.clone();
    handler(move |_, _| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn plain(dry_run: bool) -> Context {
    Context::new(CommandExecutor::new().dry_run(dry_run), OutputMode::Plain)
}

#[tokio::test]
async fn theme_apply_persists_selection() -> Result<()> {
    let fixture = StateFixture::new()?;
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(fixture.dir());
    registry.register(
        Domain::Theme,
        ["tokyo-night", "catppuccin"],
        HandlerTable::new().with_default(counting(&calls)),
    );

    let mut manager = registry.manager(Domain::Theme)?;
    manager.apply(&plain(false), "tokyo-night").await?;
    assert_eq!(manager.current(), "tokyo-night");
    assert_eq!(fixture.read(Domain::Theme).as_deref(), Some("KAREI_THEME=tokyo-night\n"));

    let err = manager
        .apply(&plain(false), "nord")
        .await
        .expect_err("nord is not a registered theme");
    assert!(err.to_string().contains("invalid"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.read(Domain::Theme).as_deref(), Some("KAREI_THEME=tokyo-night\n"));

    Ok(())
}

#[tokio::test]
async fn option_handler_without_default_leaves_gaps() -> Result<()> {
    let fixture = StateFixture::new()?;
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(fixture.dir());
    registry.register(
        Domain::Security,
        ["special", "other-valid-option"],
        HandlerTable::new().with("special", counting(&calls)),
    );

    let mut manager = registry.manager(Domain::Security)?;
    manager.apply(&plain(false), "special").await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let err = manager
        .apply(&plain(false), "other-valid-option")
        .await
        .expect_err("no handler covers other-valid-option");
    assert!(matches!(err, StateError::NoHandler { .. }));
    assert!(err.to_string().contains("no handler available"));
    assert_eq!(fixture.read(Domain::Security).as_deref(), Some("KAREI_SECURITY=special\n"));

    Ok(())
}

#[tokio::test]
async fn selection_survives_fresh_registry() -> Result<()> {
    let fixture = StateFixture::new()?;
    let output = Buffer::default();

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Proxy)?
        .with_console(Console::new(output.clone()));
    command
        .execute(&plain(true), &["manual".to_string()])
        .await?;

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Proxy)?
        .with_console(Console::new(output.clone()));
    command.execute(&plain(true), &["list".to_string()]).await?;

    let expect = indoc! {r#"
        type:proxy
        applied:manual
        dry_run:true
        type:proxy
        current:manual
        option:none
        option:auto
        option:manual
    "#};
    assert_eq!(output.contents(), expect);
    assert_eq!(fixture.read(Domain::Proxy).as_deref(), Some("KAREI_PROXY=manual\n"));

    Ok(())
}

#[tokio::test]
async fn corrupt_state_file_falls_back_to_default() -> Result<()> {
    let fixture = StateFixture::new()?;
    fixture.write(Domain::Font, "KAREI_FONT=ComicSans\n")?;
    let output = Buffer::default();

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Font)?
        .with_console(Console::new(output.clone()))
        .interactive(false);
    command.execute(&plain(true), &[]).await?;

    assert!(output.contents().starts_with("type:font\ncurrent:CaskaydiaMono\n"));
    assert_eq!(fixture.read(Domain::Font).as_deref(), Some("KAREI_FONT=ComicSans\n"));

    Ok(())
}

#[tokio::test]
async fn interactive_theme_selection() -> Result<()> {
    let fixture = StateFixture::new()?;
    let output = Buffer::default();

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Theme)?
        .with_console(Console::new(output.clone()))
        .with_reader(ScriptedReader::terminal(["2"]));
    let ctx = Context::new(CommandExecutor::new().dry_run(true), OutputMode::Human);
    command.execute(&ctx, &[]).await?;

    assert_eq!(fixture.read(Domain::Theme).as_deref(), Some("KAREI_THEME=catppuccin\n"));
    assert!(output.contents().ends_with("✓ theme set to catppuccin (dry-run)\n"));

    Ok(())
}

#[tokio::test]
async fn interactive_refusals_are_usage_errors() -> Result<()> {
    let fixture = StateFixture::new()?;
    let output = Buffer::default();

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Theme)?
        .with_console(Console::new(output.clone()))
        .with_reader(ScriptedReader::terminal(["1"]));
    let json = Context::new(CommandExecutor::new().dry_run(true), OutputMode::Json);
    let result = command.execute(&json, &[]).await;
    assert!(matches!(result, Err(CommandError::Usage(_))));

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Font)?
        .with_console(Console::new(output.clone()))
        .with_reader(ScriptedReader::piped());
    let result = command.execute(&plain(true), &[]).await;
    assert!(matches!(result, Err(CommandError::Usage(_))));

    assert_eq!(output.contents(), "");
    assert_eq!(fixture.read(Domain::Theme), None);
    assert_eq!(fixture.read(Domain::Font), None);

    Ok(())
}

#[tokio::test]
async fn invalid_target_reports_domain() -> Result<()> {
    let fixture = StateFixture::new()?;
    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Font)?
        .with_console(Console::new(Buffer::default()));

    let result = command
        .execute(&plain(true), &["ComicSans".to_string()])
        .await;
    match result {
        Err(CommandError::State(StateError::InvalidTarget { domain, target, .. })) => {
            assert_eq!(domain, "font");
            assert_eq!(target, "ComicSans");
        }
        other => panic!("expected invalid target, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn json_status_is_single_object() -> Result<()> {
    let fixture = StateFixture::new()?;
    fixture.write(Domain::Ssh, "KAREI_SSH='server'\n")?;
    let output = Buffer::default();

    let mut command = Registry::builtin(fixture.dir())
        .command(Domain::Ssh)?
        .with_console(Console::new(output.clone()));
    let json = Context::new(CommandExecutor::new(), OutputMode::Json);
    command.execute(&json, &[]).await?;

    let value: serde_json::Value = serde_json::from_str(&output.contents())?;
    assert_eq!(
        value,
        serde_json::json!({
            "type": "ssh",
            "current": "server",
            "available": ["agent", "server"],
            "config": fixture.state_file(Domain::Ssh),
        })
    );

    Ok(())
}
