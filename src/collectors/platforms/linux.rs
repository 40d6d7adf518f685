//! Linux strategy: syslog-style auth logs with a journald fallback, `ip`
//! for addressing, XDG autostart and systemd units for persistence.

use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::collectors::command::run_checked;
use crate::collectors::files::{list_dir, startup_dir, OwnerNames};
use crate::collectors::host::HostView;
use crate::collectors::parsers::accounts::parse_passwd;
use crate::collectors::parsers::auth_log::{parse_auth_failures, parse_auth_successes, parse_rdp_lines};
use crate::collectors::parsers::cron::parse_crontab;
use crate::collectors::parsers::network::{merge_interfaces, parse_default_gateway, parse_ip_interfaces};
use crate::collectors::parsers::patch::{parse_apt_history, parse_dnf_log};
use crate::collectors::parsers::sockets::{parse_proc_net, socket_inode};
use crate::collectors::parsers::startup::{desktop_description, desktop_enabled, systemd_description};
use crate::collectors::platforms::common::{parse_file, Sources};
use crate::collectors::platforms::{Platform, PlatformStrategy};
use crate::config::{linux_sensitive_files, WatchedFile};
use crate::context::CollectionContext;
use crate::error::Result;
use crate::models::{
    CronEntry, LoginEvent, NetworkConnection, NetworkSnapshot, PatchRecord, RdpSession, StartupItem,
    UserAccount,
};
use crate::normalize::{dedup_by_key, format_timestamp};

const JOURNAL_SOURCE: &str = "journald";
const PROC_NET_TABLES: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

#[derive(Debug, Default)]
pub struct LinuxStrategy;

/// Auth and authpriv facility messages since the lookback start
fn journal_auth(ctx: &CollectionContext) -> Result<String> {
    let since = format_timestamp(&ctx.lookback_start());
    run_checked(
        ctx.runner.as_ref(),
        "journalctl",
        &[
            "--no-pager",
            "-o",
            "short-iso",
            "--since",
            &since,
            "SYSLOG_FACILITY=4",
            "SYSLOG_FACILITY=10",
        ],
    )
}

/// Auth logs first; journald only when none of them could be read
fn auth_events(
    ctx: &CollectionContext,
    parse: fn(&str, &str, chrono::NaiveDateTime) -> Vec<LoginEvent>,
) -> Vec<LoginEvent> {
    let linux = &ctx.config.sources.linux;
    let mut sources = Sources::new(ctx);
    for log in &linux.auth_logs {
        sources.add(log, || parse_file(log, |content| parse(content, log, ctx.now)));
    }
    if sources.succeeded() == 0 && linux.journal_fallback {
        debug!("No auth log readable, querying the journal");
        sources.add(JOURNAL_SOURCE, || {
            journal_auth(ctx).map(|out| parse(&out, JOURNAL_SOURCE, ctx.now))
        });
    }
    sources.merged(|e| e.time.as_str())
}

/// Socket inode to owning pid, from the `<proc>/<pid>/fd` links
///
/// Other users' descriptors are unreadable without root; their sockets keep pid 0.
fn socket_owners(proc_dir: &Path) -> HashMap<u64, u32> {
    let mut owners = HashMap::new();
    let entries = match fs::read_dir(proc_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", proc_dir.display(), e);
            return owners;
        }
    };
    for entry in entries.flatten() {
        let pid: u32 = match entry.file_name().to_str().and_then(|name| name.parse().ok()) {
            Some(pid) => pid,
            None => continue,
        };
        let fds = match fs::read_dir(entry.path().join("fd")) {
            Ok(fds) => fds,
            Err(_) => continue,
        };
        for fd in fds.flatten() {
            let inode = fs::read_link(fd.path())
                .ok()
                .and_then(|target| target.to_str().and_then(socket_inode));
            if let Some(inode) = inode {
                owners.entry(inode).or_insert(pid);
            }
        }
    }
    owners
}

impl PlatformStrategy for LinuxStrategy {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn login_failures(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        dedup_by_key(auth_events(ctx, parse_auth_failures), |e| {
            (e.time.clone(), e.username.clone())
        })
    }

    fn login_successes(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        auth_events(ctx, parse_auth_successes)
    }

    fn network_info(&self, ctx: &CollectionContext) -> Vec<NetworkSnapshot> {
        let runner = ctx.runner.as_ref();
        let addrs = ctx.absorb(
            "ip addr",
            run_checked(runner, "ip", &["-o", "link", "show"]).and_then(|link| {
                let addr = run_checked(runner, "ip", &["-o", "addr", "show"])?;
                Ok(parse_ip_interfaces(&link, &addr))
            }),
        );
        let gateway: String = ctx
            .absorb(
                "ip route",
                run_checked(runner, "ip", &["route", "show", "default"])
                    .map(|out| parse_default_gateway(&out).into_iter().collect()),
            )
            .into_iter()
            .next()
            .unwrap_or_default();

        let host = HostView::network_only();
        vec![NetworkSnapshot {
            hostname: host.hostname(),
            gateway,
            interfaces: merge_interfaces(addrs, &host.interface_counters()),
            captured_at: ctx.now_string(),
        }]
    }

    fn network_connections(&self, ctx: &CollectionContext) -> Vec<NetworkConnection> {
        let proc_dir = Path::new(&ctx.config.sources.linux.proc_dir);
        let owners = socket_owners(proc_dir);
        let captured_at = ctx.now_string();
        let mut sources = Sources::new(ctx);
        for proto in PROC_NET_TABLES {
            let table = proc_dir.join("net").join(proto);
            sources.add(&table.display().to_string(), || {
                parse_file(&table, |content| parse_proc_net(content, proto, &owners, &captured_at))
            });
        }
        sources.concat()
    }

    fn startup_items(&self, ctx: &CollectionContext) -> Vec<StartupItem> {
        let linux = &ctx.config.sources.linux;
        let captured_at = ctx.now_string();
        let desktop = |content: &str| (desktop_description(content), desktop_enabled(content));
        let unit = |content: &str| (systemd_description(content), true);

        let mut sources = Sources::new(ctx);
        for dir in &linux.autostart_dirs {
            sources.add(dir, || {
                startup_dir(Path::new(dir), Some("desktop"), "SystemAutostart", &captured_at, &desktop)
            });
        }
        let user_dir = ctx.home_dir.join(".config/autostart");
        sources.add(&user_dir.display().to_string(), || {
            startup_dir(&user_dir, Some("desktop"), "UserAutostart", &captured_at, &desktop)
        });
        for dir in &linux.systemd_unit_dirs {
            sources.add(dir, || {
                startup_dir(Path::new(dir), Some("service"), "SystemdService", &captured_at, &unit)
            });
        }
        sources.concat()
    }

    fn patches(&self, ctx: &CollectionContext) -> Vec<PatchRecord> {
        let linux = &ctx.config.sources.linux;
        let mut sources = Sources::new(ctx);
        sources
            .add(&linux.apt_history, || {
                parse_file(&linux.apt_history, |content| parse_apt_history(content, ctx.now))
            })
            .add(&linux.dnf_history, || {
                parse_file(&linux.dnf_history, |content| parse_dnf_log(content, ctx.now))
            });
        sources.merged(|p| p.time.as_str())
    }

    fn scheduled_tasks(&self, ctx: &CollectionContext) -> Vec<CronEntry> {
        let linux = &ctx.config.sources.linux;
        let captured_at = ctx.now_string();
        let mut sources = Sources::new(ctx);

        sources.add("crontab -l", || {
            run_checked(ctx.runner.as_ref(), "crontab", &["-l"])
                .map(|out| parse_crontab(&out, "crontab -l", &captured_at))
        });
        for path in &linux.crontabs {
            sources.add(path, || parse_file(path, |content| parse_crontab(content, path, &captured_at)));
        }
        for dir in &linux.cron_dirs {
            sources.add(dir, || {
                let mut entries = Vec::new();
                for file in list_dir(Path::new(dir), None)? {
                    let source = file.display().to_string();
                    match parse_file(&file, |content| parse_crontab(content, &source, &captured_at)) {
                        Ok(found) => entries.extend(found),
                        Err(e) => ctx.tracker.record_failure(&source, &e),
                    }
                }
                Ok(entries)
            });
        }
        dedup_by_key(sources.concat(), |c| c.line.clone())
    }

    fn rdp_sessions(&self, ctx: &CollectionContext) -> Vec<RdpSession> {
        let mut sources = Sources::new(ctx);
        for log in &ctx.config.sources.linux.auth_logs {
            sources.add(log, || parse_file(log, |content| parse_rdp_lines(content, ctx.now)));
        }
        sources.merged(|s| s.time.as_str())
    }

    fn user_accounts(&self, ctx: &CollectionContext) -> Vec<UserAccount> {
        let passwd = &ctx.config.sources.linux.passwd;
        let captured_at = ctx.now_string();
        ctx.absorb(passwd, parse_file(passwd, |content| parse_passwd(content, &captured_at)))
    }

    fn default_sensitive_files(&self) -> Vec<WatchedFile> {
        linux_sensitive_files()
    }

    fn owner_names(&self, ctx: &CollectionContext) -> OwnerNames {
        OwnerNames::load(Path::new(&ctx.config.sources.linux.passwd), Path::new("/etc/group"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::command::{CommandOutput, MockCommandRunner};
    use crate::config::TriageConfig;
    use crate::constants::test::{TEST_NOW, TEST_USER};
    use crate::constants::TIMESTAMP_FORMAT;
    use crate::error::TriageError;
    use chrono::NaiveDateTime;
    use std::fs;
    use std::sync::Arc;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str(TEST_NOW, TIMESTAMP_FORMAT).unwrap()
    }

    fn ctx_with(config: TriageConfig, runner: MockCommandRunner, home: &Path) -> CollectionContext {
        CollectionContext::new(config)
            .with_platform(Platform::Linux)
            .with_runner(Arc::new(runner))
            .with_identity(TEST_USER, home, "/bin/bash")
            .with_now(now())
    }

    fn config_in(dir: &Path) -> TriageConfig {
        let mut config = TriageConfig::default();
        let path = |name: &str| dir.join(name).to_string_lossy().to_string();
        let linux = &mut config.sources.linux;
        linux.auth_logs = vec![path("auth.log"), path("secure")];
        linux.apt_history = path("history.log");
        linux.dnf_history = path("dnf.rpm.log");
        linux.passwd = path("passwd");
        linux.crontabs = vec![path("crontab")];
        linux.cron_dirs = vec![path("cron.d")];
        linux.autostart_dirs = vec![path("autostart")];
        linux.systemd_unit_dirs = vec![path("system")];
        linux.proc_dir = path("proc");
        config
    }

    #[test]
    fn test_failures_read_auth_log_without_journal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("auth.log"),
            "2024-10-14T09:15:01+00:00 host sshd[1]: Failed password for root from 10.0.0.5 port 22 ssh2\n\
             2024-10-14T09:15:01+00:00 host sshd[1]: Failed password for root from 10.0.0.5 port 22 ssh2\n",
        )
        .unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();

        let ctx = ctx_with(config_in(dir.path()), runner, dir.path());
        let events = LinuxStrategy.login_failures(&ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].username, "root");
        assert_eq!(events[0].ip_address, "10.0.0.5");
        // the missing secure log is a soft failure
        assert_eq!(ctx.tracker.failure_count(), 1);
    }

    #[test]
    fn test_journal_fallback_when_no_auth_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|program, args| {
                assert_eq!(program, "journalctl");
                assert!(args.contains(&"--since"));
                Ok(CommandOutput::ok(
                    "2024-10-14T08:00:00+0000 host sshd[9]: Accepted publickey for alice from 192.168.1.9 port 5000 ssh2\n",
                ))
            });

        let ctx = ctx_with(config_in(dir.path()), runner, dir.path());
        let events = LinuxStrategy.login_successes(&ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].username, "alice");
        assert_eq!(events[0].source, JOURNAL_SOURCE);
    }

    #[test]
    fn test_cron_sources_combined_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("crontab"), "SHELL=/bin/sh\n*/5 * * * * root /usr/bin/backup\n").unwrap();
        fs::create_dir(dir.path().join("cron.d")).unwrap();
        fs::write(dir.path().join("cron.d/logrotate"), "0 3 * * * root logrotate\n").unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(CommandOutput::ok("*/5 * * * * root /usr/bin/backup\n@reboot /home/analyst/agent\n"))
        });

        let ctx = ctx_with(config_in(dir.path()), runner, dir.path());
        let entries = LinuxStrategy.scheduled_tasks(&ctx);
        let lines: Vec<&str> = entries.iter().map(|e| e.line.as_str()).collect();
        assert_eq!(
            lines,
            vec!["*/5 * * * * root /usr/bin/backup", "@reboot /home/analyst/agent", "0 3 * * * root logrotate"]
        );
        assert_eq!(entries[0].source, "crontab -l");
    }

    #[test]
    fn test_missing_crontab_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "no crontab for analyst".to_string(),
            })
        });
        let ctx = ctx_with(config_in(dir.path()), runner, dir.path());
        assert!(LinuxStrategy.scheduled_tasks(&ctx).is_empty());
        assert!(ctx.tracker.failure_count() >= 1);
    }

    #[test]
    fn test_startup_and_patches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("autostart")).unwrap();
        fs::write(dir.path().join("autostart/updater.desktop"), "Name=Updater\n").unwrap();
        fs::create_dir(dir.path().join("system")).unwrap();
        fs::write(dir.path().join("system/miner.service"), "[Unit]\nDescription=Miner\n").unwrap();
        fs::write(
            dir.path().join("history.log"),
            "Start-Date: 2024-10-01  10:00:00\nUpgrade: openssl:amd64 (3.0.2, 3.0.13)\nEnd-Date: 2024-10-01  10:00:05\n",
        )
        .unwrap();

        let ctx = ctx_with(config_in(dir.path()), MockCommandRunner::new(), dir.path());
        let items = LinuxStrategy.startup_items(&ctx);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_type, "SystemAutostart");
        assert_eq!(items[1].item_type, "SystemdService");
        assert_eq!(items[1].description, "Miner");

        let patches = LinuxStrategy.patches(&ctx);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].title, "openssl:amd64");
        assert_eq!(patches[0].status, "Upgraded");
    }

    #[test]
    fn test_accounts_from_passwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("passwd"),
            "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000:Alice Smith,,,:/home/alice:/bin/zsh\n",
        )
        .unwrap();
        let ctx = ctx_with(config_in(dir.path()), MockCommandRunner::new(), dir.path());
        let accounts = LinuxStrategy.user_accounts(&ctx);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].full_name, "Alice Smith");
        assert_eq!(accounts[1].captured_at, TEST_NOW);
    }

    #[test]
    fn test_network_survives_missing_ip_tool() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|program, _| Err(TriageError::NotFound(program.to_string())));
        let ctx = ctx_with(config_in(dir.path()), runner, dir.path());
        let snapshots = LinuxStrategy.network_info(&ctx);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].gateway, "");
        assert_eq!(ctx.tracker.failure_count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_connections_from_proc_tables() {
        let dir = tempfile::tempdir().unwrap();
        let proc_dir = dir.path().join("proc");
        fs::create_dir_all(proc_dir.join("net")).unwrap();
        fs::write(
            proc_dir.join("net/tcp"),
            "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n\
             0: 0F02000A:0016 0502000A:C350 01 00000000:00000000 02:0008B4C8 00000000     0        0 31337 4 0 20 4 0 10 -1\n",
        )
        .unwrap();
        fs::create_dir_all(proc_dir.join("4242/fd")).unwrap();
        std::os::unix::fs::symlink("socket:[31337]", proc_dir.join("4242/fd/3")).unwrap();
        std::os::unix::fs::symlink("/dev/null", proc_dir.join("4242/fd/0")).unwrap();

        let ctx = ctx_with(config_in(dir.path()), MockCommandRunner::new(), dir.path());
        let sockets = LinuxStrategy.network_connections(&ctx);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].local_addr, "10.0.2.15:22");
        assert_eq!(sockets[0].status, "ESTABLISHED");
        assert_eq!(sockets[0].pid, 4242);
        // tcp6, udp and udp6 are absent
        assert_eq!(ctx.tracker.failure_count(), 3);
    }
}
