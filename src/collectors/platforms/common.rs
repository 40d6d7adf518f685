//! Sources shared by every platform strategy.

use log::debug;
use std::path::Path;

use crate::collectors::files::{describe_file, read_source, OwnerNames};
use crate::collectors::host::HostView;
use crate::collectors::parsers::shell_history::{
    current_shell_first, parse_bash_history, parse_fish_history, parse_zsh_history, to_commands,
    HistoryEntry,
};
use crate::collectors::process::build_snapshots;
use crate::config::sources::WatchedFile;
use crate::context::CollectionContext;
use crate::error::Result;
use crate::models::{ProcessSnapshot, SensitiveFile, ShellCommand, SystemSnapshot};
use crate::normalize::{dedup_by_key, merge_by_time};

/// Accumulates the contributions of several sources for one artifact kind.
///
/// Failed sources contribute nothing; once the context is cancelled the
/// remaining sources are skipped.
pub struct Sources<'a, T> {
    ctx: &'a CollectionContext,
    batches: Vec<Vec<T>>,
    succeeded: usize,
}

impl<'a, T> Sources<'a, T> {
    pub fn new(ctx: &'a CollectionContext) -> Self {
        Self {
            ctx,
            batches: Vec::new(),
            succeeded: 0,
        }
    }

    pub fn add(&mut self, source: &str, read: impl FnOnce() -> Result<Vec<T>>) -> &mut Self {
        if self.ctx.is_cancelled() {
            debug!("Collection cancelled, skipping {}", source);
            return self;
        }
        let result = read();
        if result.is_ok() {
            self.succeeded += 1;
        }
        self.batches.push(self.ctx.absorb(source, result));
        self
    }

    /// Number of sources that answered, even with nothing
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Source order
    pub fn concat(self) -> Vec<T> {
        self.batches.into_iter().flatten().collect()
    }

    /// Ascending time when every time is canonical, else source order
    pub fn merged(self, time: impl Fn(&T) -> &str) -> Vec<T> {
        merge_by_time(self.batches, time)
    }
}

/// Read a source file and parse its content
pub fn parse_file<T>(path: impl AsRef<Path>, parse: impl FnOnce(&str) -> Vec<T>) -> Result<Vec<T>> {
    let content = read_source(path.as_ref())?;
    Ok(parse(&content))
}

pub fn processes(ctx: &CollectionContext, signer: &dyn Fn(&Path) -> String) -> Vec<ProcessSnapshot> {
    let host = HostView::new();
    build_snapshots(ctx, host.processes(), host.total_memory(), signer)
}

pub fn system_snapshot(ctx: &CollectionContext) -> Vec<SystemSnapshot> {
    vec![HostView::new().system_snapshot(&ctx.now_string())]
}

/// One history file parsed with the given format
pub fn history_file(
    ctx: &CollectionContext,
    path: &Path,
    shell: &str,
    parse: fn(&str) -> Vec<HistoryEntry>,
) -> Result<Vec<ShellCommand>> {
    let content = read_source(path)?;
    Ok(to_commands(parse(&content), &ctx.user, shell, ctx.now))
}

/// zsh, bash and fish histories under the home directory
pub fn unix_shell_history(ctx: &CollectionContext) -> Vec<ShellCommand> {
    let home = &ctx.home_dir;
    let files: [(&str, std::path::PathBuf, fn(&str) -> Vec<HistoryEntry>); 3] = [
        ("zsh", home.join(".zsh_history"), parse_zsh_history),
        ("bash", home.join(".bash_history"), parse_bash_history),
        ("fish", home.join(".local/share/fish/fish_history"), parse_fish_history),
    ];

    let mut sources = Sources::new(ctx);
    for (shell, path, parse) in files {
        sources.add(&path.display().to_string(), || history_file(ctx, &path, shell, parse));
    }
    let commands = dedup_by_key(sources.concat(), |c| (c.command.clone(), c.user.clone(), c.shell.clone()));
    current_shell_first(commands, &ctx.shell_name())
}

/// Watched files from the config override or the platform table
pub fn sensitive_files(
    ctx: &CollectionContext,
    defaults: Vec<WatchedFile>,
    names: &OwnerNames,
) -> Vec<SensitiveFile> {
    let watched = ctx.config.sensitive_files.clone().unwrap_or(defaults);
    let captured_at = ctx.now_string();
    watched
        .iter()
        .take_while(|_| !ctx.is_cancelled())
        .map(|file| describe_file(file, names, &captured_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::constants::test::{TEST_NOW, TEST_USER};
    use crate::constants::TIMESTAMP_FORMAT;
    use crate::error::TriageError;
    use chrono::NaiveDateTime;
    use std::fs;

    fn ctx_in(home: &Path, shell: &str) -> CollectionContext {
        CollectionContext::new(TriageConfig::default())
            .with_identity(TEST_USER, home, shell)
            .with_now(NaiveDateTime::parse_from_str(TEST_NOW, TIMESTAMP_FORMAT).unwrap())
    }

    #[test]
    fn test_sources_absorb_failures_and_merge() {
        let home = tempfile::tempdir().unwrap();
        let ctx = ctx_in(home.path(), "/bin/bash");
        let mut sources = Sources::new(&ctx);
        sources
            .add("late", || Ok(vec!["2024-10-14 10:00:00".to_string()]))
            .add("broken", || Err(TriageError::NotFound("broken".into())))
            .add("early", || Ok(vec!["2024-10-14 09:00:00".to_string()]));
        assert_eq!(sources.succeeded(), 2);
        let merged = sources.merged(|s| s.as_str());
        assert_eq!(merged, vec!["2024-10-14 09:00:00", "2024-10-14 10:00:00"]);
        assert_eq!(ctx.tracker.failed_sources(), vec!["broken"]);
    }

    #[test]
    fn test_cancelled_sources_are_skipped() {
        let home = tempfile::tempdir().unwrap();
        let ctx = ctx_in(home.path(), "/bin/bash");
        ctx.cancel.cancel();
        let mut sources = Sources::new(&ctx);
        sources.add("never", || -> Result<Vec<u8>> { panic!("source ran after cancel") });
        assert!(sources.concat().is_empty());
    }

    #[test]
    fn test_unix_history_current_shell_first() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".bash_history"), "ls\nid\n").unwrap();
        fs::write(home.path().join(".zsh_history"), ": 1700000000:0;whoami\n").unwrap();

        let ctx = ctx_in(home.path(), "/bin/bash");
        let commands = unix_shell_history(&ctx);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].shell, "bash");
        assert_eq!(commands[0].command, "id");
        assert_eq!(commands[2].shell, "zsh");
        assert!(commands.iter().all(|c| c.user == TEST_USER));
        // fish history is absent and contributes nothing
        assert_eq!(ctx.tracker.failure_count(), 1);
    }

    #[test]
    fn test_sensitive_file_override() {
        let home = tempfile::tempdir().unwrap();
        let watched = home.path().join("hosts");
        fs::write(&watched, "127.0.0.1 localhost\n").unwrap();
        let config = TriageConfig {
            sensitive_files: Some(vec![WatchedFile::new(&watched.to_string_lossy(), "Hosts")]),
            ..TriageConfig::default()
        };
        let ctx = CollectionContext::new(config);
        let files = sensitive_files(&ctx, vec![WatchedFile::new("/etc/shadow", "ignored")], &OwnerNames::default());
        assert_eq!(files.len(), 1);
        assert!(files[0].exists);
        assert_eq!(files[0].description, "Hosts");
    }
}
