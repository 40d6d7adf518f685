//! Explicit collection context.
//!
//! A `CollectionContext` bundles everything a collector needs: the platform
//! to dispatch on, configuration, the command runner, the identity of the
//! user being triaged, the collection instant and an optional store handle.
//! Collectors receive it by reference; nothing is global.

use chrono::{Duration, Local, NaiveDateTime};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::collectors::command::{CommandRunner, SystemCommandRunner};
use crate::collectors::platforms::{host_platform, Platform};
use crate::collectors::source_tracker::SourceTracker;
use crate::config::TriageConfig;
use crate::error::Result;
use crate::normalize::format_timestamp;
use crate::store::Store;

/// Shared cancellation signal, checked between sources
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct CollectionContext {
    pub platform: Platform,
    pub config: Arc<TriageConfig>,
    pub runner: Arc<dyn CommandRunner>,
    pub home_dir: PathBuf,
    pub user: String,
    /// Login shell path, e.g. `/bin/zsh`
    pub shell: String,
    /// Collection instant, substituted for unparsable source times
    pub now: NaiveDateTime,
    pub store: Option<Arc<Store>>,
    pub cancel: CancellationFlag,
    pub tracker: SourceTracker,
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

impl CollectionContext {
    /// Context for the current host and user
    pub fn new(config: TriageConfig) -> Self {
        let runner = Arc::new(SystemCommandRunner::new(config.command_timeout()));
        Self {
            platform: host_platform(),
            config: Arc::new(config),
            runner,
            home_dir: env_first(&["HOME", "USERPROFILE"]).map(PathBuf::from).unwrap_or_default(),
            user: env_first(&["USER", "USERNAME"]).unwrap_or_else(|| "unknown".to_string()),
            shell: env_first(&["SHELL"]).unwrap_or_default(),
            now: Local::now().naive_local(),
            store: None,
            cancel: CancellationFlag::new(),
            tracker: SourceTracker::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_identity(mut self, user: &str, home_dir: impl Into<PathBuf>, shell: &str) -> Self {
        self.user = user.to_string();
        self.home_dir = home_dir.into();
        self.shell = shell.to_string();
        self
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Unwrap one source's result; a failure contributes nothing
    pub fn absorb<T>(&self, source: &str, result: Result<Vec<T>>) -> Vec<T> {
        self.tracker.absorb(source, result)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Start of the log query window
    pub fn lookback_start(&self) -> NaiveDateTime {
        let hours = i64::try_from(self.config.lookback_hours).unwrap_or(i64::MAX / 3600);
        self.now - Duration::hours(hours)
    }

    /// `now` in the canonical record format
    pub fn now_string(&self) -> String {
        format_timestamp(&self.now)
    }

    /// Basename of the login shell, e.g. `zsh`
    pub fn shell_name(&self) -> String {
        self.shell
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .trim_end_matches(".exe")
            .to_string()
    }
}

impl std::fmt::Debug for CollectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionContext")
            .field("platform", &self.platform)
            .field("user", &self.user)
            .field("home_dir", &self.home_dir)
            .field("shell", &self.shell)
            .field("now", &self.now)
            .field("store", &self.store.is_some())
            .finish()
    }
}
