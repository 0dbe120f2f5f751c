// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Validated, persisted selection among a fixed set of options.
//!
//! Every feature area of Karei (themes, fonts, security checks, ...) boils
//! down to the same thing: pick one option out of a known list, perform some
//! side effect for it, and remember the pick for the next run. The
//! [`StateManager`] implements that once for all of them.
//!
//! # Handlers
//!
//! The side effect itself is supplied from outside as a [`Handler`]. A
//! [`HandlerTable`] maps option names to handlers, and may carry a default
//! handler for every option without one of its own. Option-specific handlers
//! always take priority over the default, so one option can be special-cased
//! while the rest share a code path.
//!
//! Handlers may be re-run at will, so they must be idempotent enough to not
//! break on a second call. They report failure through their return value and
//! never panic.
//!
//! # Persistence
//!
//! The current selection lives in a per-domain state file, see [`persist`].
//! The selection is only written after a handler succeeds. A failure to write
//! it is logged but never fails the operation, because the side effect already
//! happened.

pub mod persist;

use crate::{context::Context, state::persist::StateFile};

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, error, info, instrument, warn};

/// Function performing the side effect of one option.
pub type Handler =
    Arc<dyn Fn(Context, String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap async closure into a [`Handler`].
pub fn handler<F, Fut>(func: F) -> Handler
where
    F: Fn(Context, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, target| func(ctx, target).boxed())
}

/// Handlers of a single domain.
///
/// # Invariant
///
/// - Lookup checks option handlers first, then the default handler.
#[derive(Default, Clone)]
pub struct HandlerTable {
    options: HashMap<String, Handler>,
    default: Option<Handler>,
}

impl HandlerTable {
    /// Construct new empty handler table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register handler for a specific option.
    pub fn insert(&mut self, option: impl Into<String>, handler: Handler) {
        self.options.insert(option.into(), handler);
    }

    /// Register handler for a specific option, builder style.
    pub fn with(mut self, option: impl Into<String>, handler: Handler) -> Self {
        self.insert(option, handler);
        self
    }

    /// Register fallback handler for options without their own handler.
    pub fn with_default(mut self, handler: Handler) -> Self {
        self.default = Some(handler);
        self
    }

    /// Find handler for target option.
    pub fn resolve(&self, target: &str) -> Option<&Handler> {
        self.options.get(target).or(self.default.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.default.is_none()
    }
}

impl Debug for HandlerTable {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut options: Vec<_> = self.options.keys().collect();
        options.sort();
        fmt.debug_struct("HandlerTable")
            .field("options", &options)
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Static description of a state manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Human readable name.
    pub name: String,

    /// Domain tag, e.g., "theme".
    pub domain: String,

    /// Valid options in order. First one is the default.
    pub available: Vec<String>,

    /// Path to domain's state file.
    pub config_path: PathBuf,
}

impl ManagerConfig {
    /// Construct new manager configuration.
    pub fn new(
        domain: impl Into<String>,
        available: impl IntoIterator<Item = impl Into<String>>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        let domain = domain.into();
        Self {
            name: domain.clone(),
            domain,
            available: available.into_iter().map(Into::into).collect(),
            config_path: config_path.into(),
        }
    }

    /// Set human readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Read-only snapshot of a state manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    #[serde(rename = "type")]
    pub domain: String,
    pub current: String,
    pub available: Vec<String>,
    pub config: PathBuf,
}

/// Validate, apply, and persist selections of a single domain.
///
/// Built fresh for every process invocation. The state file is the only thing
/// that survives between runs.
///
/// # Invariant
///
/// - Current selection, once resolved, is always a member of the available
///   options.
#[derive(Debug)]
pub struct StateManager {
    name: String,
    domain: String,
    available: Vec<String>,
    config_path: PathBuf,
    file: StateFile,
    current: Option<String>,
    handlers: HandlerTable,
}

impl StateManager {
    /// Construct new state manager.
    ///
    /// # Errors
    ///
    /// - Return [`StateError::NoOptions`] if there are no available options.
    pub fn new(config: ManagerConfig, handlers: HandlerTable) -> Result<Self> {
        if config.available.is_empty() {
            return Err(StateError::NoOptions {
                domain: config.domain,
            });
        }

        Ok(Self {
            file: StateFile::new(&config.domain),
            name: config.name,
            domain: config.domain,
            available: config.available,
            config_path: config.config_path,
            current: None,
            handlers,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn domain(&self) -> &str {
        self.domain.as_str()
    }

    pub fn available(&self) -> &[String] {
        self.available.as_slice()
    }

    pub fn config_path(&self) -> &Path {
        self.config_path.as_path()
    }

    /// Default option, i.e., the first available one.
    pub fn default_option(&self) -> &str {
        self.available[0].as_str()
    }

    /// Check if choice is one of the available options.
    pub fn is_valid(&self, choice: &str) -> bool {
        self.available.iter().any(|option| option == choice)
    }

    /// Get current selection.
    ///
    /// Resolved from the state file on first use, and cached afterwards.
    pub fn current(&mut self) -> &str {
        if self.current.is_none() {
            self.current = Some(self.detect_current());
        }

        self.current.as_deref().unwrap_or(self.available[0].as_str())
    }

    /// Set current selection without persisting it.
    ///
    /// # Errors
    ///
    /// - Return [`StateError::InvalidTarget`] if choice is not available.
    pub fn set_current(&mut self, choice: &str) -> Result<()> {
        if !self.is_valid(choice) {
            return Err(self.invalid_target(choice));
        }

        self.current = Some(choice.to_string());
        Ok(())
    }

    /// Set current selection and write it to the state file.
    ///
    /// Replaces the state file entirely.
    ///
    /// # Errors
    ///
    /// - Return [`StateError::InvalidTarget`] if choice is not available.
    /// - Return [`StateError::WriteStateFile`] if state file cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn save_current(&mut self, choice: &str) -> Result<()> {
        self.set_current(choice)?;
        self.file
            .write(&self.config_path, choice)
            .map_err(|err| StateError::WriteStateFile {
                source: err,
                path: self.config_path.clone(),
            })?;
        debug!("saved {}={choice} to {:?}", self.file.key(), self.config_path.display());

        Ok(())
    }

    /// Apply target option through its handler, and persist it on success.
    ///
    /// Nothing runs, and nothing is written, unless the target is valid and a
    /// handler exists for it.
    ///
    /// # Errors
    ///
    /// - Return [`StateError::InvalidTarget`] if target is not available.
    /// - Return [`StateError::NoHandler`] if no handler covers target.
    /// - Return [`StateError::Handler`] if handler fails.
    #[instrument(skip(self, ctx), fields(domain = %self.domain), level = "debug")]
    pub async fn apply(&mut self, ctx: &Context, target: &str) -> Result<()> {
        if !self.is_valid(target) {
            return Err(self.invalid_target(target));
        }

        let apply_fn = self
            .handlers
            .resolve(target)
            .cloned()
            .ok_or_else(|| StateError::NoHandler {
                domain: self.domain.clone(),
                target: target.into(),
            })?;

        info!("apply {} {target:?}", self.domain);
        if let Err(err) = apply_fn(ctx.clone(), target.to_string()).await {
            if ctx.is_verbose() {
                error!("failed to apply {} {target:?}: {err:?}", self.domain);
            } else {
                error!(
                    "failed to apply {} {target:?}, rerun with --verbose for details",
                    self.domain
                );
            }

            return Err(StateError::Handler {
                source: err,
                domain: self.domain.clone(),
                target: target.into(),
            });
        }

        self.current = Some(target.to_string());
        if let Err(err) = self.save_current(target) {
            warn!("{} {target:?} applied, but selection was not saved: {err}", self.domain);
        }

        Ok(())
    }

    /// Take snapshot of current state.
    pub fn status(&mut self) -> Status {
        Status {
            current: self.current().to_string(),
            domain: self.domain.clone(),
            available: self.available.clone(),
            config: self.config_path.clone(),
        }
    }

    fn detect_current(&self) -> String {
        let default = self.default_option().to_string();
        if !self.config_path.exists() {
            debug!("no state file at {:?}", self.config_path.display());
            return default;
        }

        match self.file.read(&self.config_path) {
            Ok(Some(value)) if self.is_valid(&value) => value,
            Ok(Some(value)) => {
                warn!(
                    "discard invalid {} {value:?} from {:?}",
                    self.domain,
                    self.config_path.display()
                );
                default
            }
            Ok(None) => default,
            Err(err) => {
                warn!("cannot read {:?}: {err}", self.config_path.display());
                default
            }
        }
    }

    fn invalid_target(&self, target: &str) -> StateError {
        StateError::InvalidTarget {
            domain: self.domain.clone(),
            target: target.into(),
            available: self.available.clone(),
        }
    }
}

/// State management error types.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Manager was configured without any options.
    #[error("no options available for {domain}")]
    NoOptions { domain: String },

    /// Requested option is not one of the available options.
    #[error("invalid {domain} {target:?}, expected one of: {}", available.join(", "))]
    InvalidTarget {
        domain: String,
        target: String,
        available: Vec<String>,
    },

    /// Neither the option nor the default has a handler.
    #[error("no handler available for {domain} {target:?}")]
    NoHandler { domain: String, target: String },

    /// Handler reported failure.
    #[error("failed to apply {domain} {target:?}")]
    Handler {
        #[source]
        source: anyhow::Error,
        domain: String,
        target: String,
    },

    /// State file cannot be written.
    #[error("failed to write state file at {:?}", path.display())]
    WriteStateFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandExecutor;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::{
        fs::{read_to_string, write},
        io::{self, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    fn counting(counter: Arc<AtomicUsize>) -> Handler {
        handler(move |_, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn theme_manager(path: &Path, handlers: HandlerTable) -> StateManager {
        let config = ManagerConfig::new("theme", ["tokyo-night", "catppuccin"], path);
        StateManager::new(config, handlers).unwrap()
    }

    #[test_case("tokyo-night", true; "first option")]
    #[test_case("catppuccin", true; "second option")]
    #[test_case("nord", false; "unknown option")]
    #[test_case("", false; "empty string")]
    #[test_case("Tokyo-Night", false; "case sensitive")]
    #[test]
    fn is_valid_checks_membership(choice: &str, expect: bool) {
        let manager = theme_manager(Path::new("/nonexistent/theme.conf"), HandlerTable::new());
        pretty_assertions::assert_eq!(manager.is_valid(choice), expect);
    }

    #[test]
    fn new_rejects_empty_options() {
        let config = ManagerConfig::new("theme", Vec::<String>::new(), "/tmp/theme.conf");
        let result = StateManager::new(config, HandlerTable::new());
        assert!(matches!(result, Err(StateError::NoOptions { .. })));
    }

    #[test_case(None; "missing file")]
    #[test_case(Some("KAREI_THEME=nord\n"); "out of range value")]
    #[test_case(Some("\u{0}\u{1}garbage\n=\n"); "corrupt content")]
    #[test_case(Some("KAREI_FONT=catppuccin\n"); "other key")]
    #[test]
    fn current_falls_back_to_default(content: Option<&str>) -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        if let Some(content) = content {
            write(&path, content)?;
        }

        let mut manager = theme_manager(&path, HandlerTable::new());
        pretty_assertions::assert_eq!(manager.current(), "tokyo-night");

        Ok(())
    }

    #[test]
    fn current_falls_back_when_unreadable() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        // Directory in place of file cannot be read as text.
        let mut manager = theme_manager(dir.path(), HandlerTable::new());
        assert_eq!(manager.current(), "tokyo-night");

        Ok(())
    }

    #[test]
    fn current_is_cached() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        write(&path, "KAREI_THEME=catppuccin\n")?;

        let mut manager = theme_manager(&path, HandlerTable::new());
        assert_eq!(manager.current(), "catppuccin");
        write(&path, "KAREI_THEME=tokyo-night\n")?;
        assert_eq!(manager.current(), "catppuccin");

        Ok(())
    }

    #[test]
    fn save_current_round_trips_through_fresh_manager() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state").join("theme.conf");

        theme_manager(&path, HandlerTable::new()).save_current("catppuccin")?;
        let mut fresh = theme_manager(&path, HandlerTable::new());
        assert_eq!(fresh.current(), "catppuccin");

        Ok(())
    }

    #[test]
    fn set_current_rejects_invalid_choice() {
        let mut manager = theme_manager(Path::new("/nonexistent/theme.conf"), HandlerTable::new());
        let result = manager.set_current("nord");
        assert!(matches!(result, Err(StateError::InvalidTarget { .. })));
        assert_eq!(manager.current(), "tokyo-night");
    }

    #[tokio::test]
    async fn apply_with_default_handler_persists() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerTable::new().with_default(counting(calls.clone()));
        let mut manager = theme_manager(&path, handlers);

        manager.apply(&Context::default(), "tokyo-night").await?;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current(), "tokyo-night");
        assert_eq!(read_to_string(&path)?, "KAREI_THEME=tokyo-night\n");

        Ok(())
    }

    #[tokio::test]
    async fn apply_invalid_target_runs_nothing_and_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        write(&path, "KAREI_THEME=catppuccin\n")?;
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerTable::new().with_default(counting(calls.clone()));
        let mut manager = theme_manager(&path, handlers);

        let result = manager.apply(&Context::default(), "nord").await;
        let err = result.expect_err("nord is not available");
        assert!(err.to_string().contains("invalid"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(read_to_string(&path)?, "KAREI_THEME=catppuccin\n");

        Ok(())
    }

    #[tokio::test]
    async fn apply_prefers_option_handler_over_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        let special = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerTable::new()
            .with("catppuccin", counting(special.clone()))
            .with_default(counting(fallback.clone()));
        let mut manager = theme_manager(&path, handlers);

        manager.apply(&Context::default(), "catppuccin").await?;
        assert_eq!((special.load(Ordering::SeqCst), fallback.load(Ordering::SeqCst)), (1, 0));

        manager.apply(&Context::default(), "tokyo-night").await?;
        assert_eq!((special.load(Ordering::SeqCst), fallback.load(Ordering::SeqCst)), (1, 1));

        Ok(())
    }

    #[tokio::test]
    async fn apply_without_handler_fails_and_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerTable::new().with("catppuccin", counting(calls.clone()));
        let mut manager = theme_manager(&path, handlers);

        manager.apply(&Context::default(), "catppuccin").await?;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        std::fs::remove_file(&path)?;

        let result = manager.apply(&Context::default(), "tokyo-night").await;
        let err = result.expect_err("tokyo-night has no handler");
        assert!(matches!(err, StateError::NoHandler { .. }));
        assert!(err.to_string().contains("no handler available"));
        assert!(!path.exists());

        Ok(())
    }

    #[tokio::test]
    async fn failing_handler_leaves_state_untouched() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        write(&path, "KAREI_THEME=tokyo-night\n")?;
        let handlers = HandlerTable::new().with_default(handler(|_, target| async move {
            anyhow::bail!("cannot install {target}")
        }));
        let mut manager = theme_manager(&path, handlers);

        let result = manager.apply(&Context::default(), "catppuccin").await;
        assert!(matches!(result, Err(StateError::Handler { .. })));
        assert_eq!(manager.current(), "tokyo-night");
        assert_eq!(read_to_string(&path)?, "KAREI_THEME=tokyo-night\n");

        Ok(())
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn failure_log(verbose: bool) -> anyhow::Result<String> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        let handlers = HandlerTable::new().with_default(handler(|_, target| async move {
            anyhow::bail!("cannot install {target}")
        }));
        let mut manager = theme_manager(&path, handlers);
        let ctx = Context::new(CommandExecutor::new().verbose(verbose), Default::default());

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::ERROR)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let result = manager.apply(&ctx, "catppuccin").await;
        assert!(matches!(result, Err(StateError::Handler { .. })));

        let contents = logs.0.lock().unwrap().clone();
        Ok(String::from_utf8(contents)?)
    }

    #[tokio::test]
    async fn handler_failure_logs_hint_unless_verbose() -> anyhow::Result<()> {
        let quiet = failure_log(false).await?;
        assert!(quiet.contains("rerun with --verbose"));
        assert!(!quiet.contains("cannot install catppuccin"));

        let verbose = failure_log(true).await?;
        assert!(verbose.contains("cannot install catppuccin"));
        assert!(!verbose.contains("rerun with --verbose"));

        Ok(())
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_apply() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        // Parent of state file is a regular file, so the write must fail.
        let blocker = dir.path().join("blocker");
        write(&blocker, "")?;
        let path = blocker.join("theme.conf");
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerTable::new().with_default(counting(calls.clone()));
        let mut manager = theme_manager(&path, handlers);

        manager.apply(&Context::default(), "catppuccin").await?;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current(), "catppuccin");

        Ok(())
    }

    #[tokio::test]
    async fn handler_receives_context_and_target() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("theme.conf");
        let handlers = HandlerTable::new().with_default(handler(|ctx, target| async move {
            anyhow::ensure!(ctx.is_dry_run(), "expected dry-run context");
            anyhow::ensure!(target == "catppuccin", "unexpected target {target}");
            ctx.executor().execute("karei-no-such-binary", [&target]).await?;
            Ok(())
        }));
        let mut manager = theme_manager(&path, handlers);
        let ctx = Context::new(CommandExecutor::new().dry_run(true), Default::default());

        manager.apply(&ctx, "catppuccin").await?;
        assert_eq!(manager.status().current, "catppuccin");

        Ok(())
    }

    #[test]
    fn status_snapshots_state() {
        let mut manager = theme_manager(Path::new("/nonexistent/theme.conf"), HandlerTable::new());
        let expect = Status {
            domain: "theme".into(),
            current: "tokyo-night".into(),
            available: vec!["tokyo-night".into(), "catppuccin".into()],
            config: PathBuf::from("/nonexistent/theme.conf"),
        };

        assert_eq!(manager.status(), expect);
    }
}
