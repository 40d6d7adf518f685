//! macOS strategy: unified log predicates, `last`, launchd property lists
//! and `codesign` for process signers.

use std::path::Path;

use crate::collectors::command::run_checked;
use crate::collectors::files::{startup_dir, OwnerNames};
use crate::collectors::host::HostView;
use crate::collectors::parsers::accounts::parse_passwd;
use crate::collectors::parsers::auth_log::parse_rdp_lines;
use crate::collectors::parsers::cron::parse_crontab;
use crate::collectors::parsers::network::{merge_interfaces, parse_default_gateway, parse_ifconfig};
use crate::collectors::parsers::patch::parse_softwareupdate_history;
use crate::collectors::parsers::sockets::parse_lsof;
use crate::collectors::parsers::startup::{plist_description, plist_enabled};
use crate::collectors::parsers::unified_log::{parse_last_output, parse_unified_failures};
use crate::collectors::platforms::common::{parse_file, Sources};
use crate::collectors::platforms::{Platform, PlatformStrategy};
use crate::config::{macos_sensitive_files, WatchedFile};
use crate::constants::MACOS_LOGIN_FAILURE_PREDICATES;
use crate::context::CollectionContext;
use crate::models::{
    CronEntry, LoginEvent, NetworkConnection, NetworkSnapshot, PatchRecord, RdpSession, StartupItem,
    UserAccount,
};
use crate::normalize::dedup_by_key;

const AUTHORITY: &str = "Authority=";

#[derive(Debug, Default)]
pub struct MacStrategy;

/// Launchd item type from the directory holding the plist
fn launch_item_type(dir: &str) -> &'static str {
    if dir.ends_with("LaunchDaemons") {
        "LaunchDaemon"
    } else {
        "LaunchAgent"
    }
}

/// First signing authority in `codesign -dv` output
fn signing_authority(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix(AUTHORITY))
        .map(|a| a.trim().to_string())
        .unwrap_or_default()
}

impl PlatformStrategy for MacStrategy {
    fn platform(&self) -> Platform {
        Platform::MacOS
    }

    fn login_failures(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        let last = format!("{}h", ctx.config.lookback_hours);
        let mut sources = Sources::new(ctx);
        for predicate in MACOS_LOGIN_FAILURE_PREDICATES {
            sources.add(predicate, || {
                let out = run_checked(
                    ctx.runner.as_ref(),
                    "log",
                    &["show", "--style", "json", "--last", &last, "--predicate", predicate],
                )?;
                parse_unified_failures(&out, ctx.now)
            });
        }
        dedup_by_key(sources.merged(|e| e.time.as_str()), |e| {
            (e.time.clone(), e.username.clone())
        })
    }

    fn login_successes(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        ctx.absorb(
            "last",
            run_checked(ctx.runner.as_ref(), "last", &[]).map(|out| parse_last_output(&out, ctx.now)),
        )
    }

    /// The signer is written to stderr; unsigned binaries exit non-zero
    fn process_signature(&self, ctx: &CollectionContext, exe: &Path) -> String {
        let exe = exe.to_string_lossy();
        match ctx.runner.run("codesign", &["-dv", "--verbose=4", &exe]) {
            Ok(output) if output.success() => signing_authority(&output.stderr),
            _ => String::new(),
        }
    }

    fn network_info(&self, ctx: &CollectionContext) -> Vec<NetworkSnapshot> {
        let runner = ctx.runner.as_ref();
        let addrs = ctx.absorb(
            "ifconfig",
            run_checked(runner, "ifconfig", &["-a"]).map(|out| parse_ifconfig(&out)),
        );
        let gateway: String = ctx
            .absorb(
                "route",
                run_checked(runner, "route", &["-n", "get", "default"])
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
        let captured_at = ctx.now_string();
        ctx.absorb(
            "lsof -i",
            run_checked(ctx.runner.as_ref(), "lsof", &["-nP", "-iTCP", "-iUDP"])
                .map(|out| parse_lsof(&out, &captured_at)),
        )
    }

    fn startup_items(&self, ctx: &CollectionContext) -> Vec<StartupItem> {
        let captured_at = ctx.now_string();
        let plist = |content: &str| (plist_description(content), plist_enabled(content));

        let mut sources = Sources::new(ctx);
        for dir in &ctx.config.sources.macos.launch_dirs {
            sources.add(dir, || {
                startup_dir(Path::new(dir), Some("plist"), launch_item_type(dir), &captured_at, &plist)
            });
        }
        let user_dir = ctx.home_dir.join("Library/LaunchAgents");
        sources.add(&user_dir.display().to_string(), || {
            startup_dir(&user_dir, Some("plist"), "UserLaunchAgent", &captured_at, &plist)
        });
        sources.concat()
    }

    fn patches(&self, ctx: &CollectionContext) -> Vec<PatchRecord> {
        ctx.absorb(
            "softwareupdate",
            run_checked(ctx.runner.as_ref(), "softwareupdate", &["--history"])
                .map(|out| parse_softwareupdate_history(&out, ctx.now)),
        )
    }

    fn scheduled_tasks(&self, ctx: &CollectionContext) -> Vec<CronEntry> {
        let captured_at = ctx.now_string();
        let mut sources = Sources::new(ctx);
        sources.add("crontab -l", || {
            run_checked(ctx.runner.as_ref(), "crontab", &["-l"])
                .map(|out| parse_crontab(&out, "crontab -l", &captured_at))
        });
        for path in &ctx.config.sources.macos.crontabs {
            sources.add(path, || parse_file(path, |content| parse_crontab(content, path, &captured_at)));
        }
        dedup_by_key(sources.concat(), |c| c.line.clone())
    }

    fn rdp_sessions(&self, ctx: &CollectionContext) -> Vec<RdpSession> {
        let mut sources = Sources::new(ctx);
        for log in &ctx.config.sources.macos.rdp_logs {
            sources.add(log, || parse_file(log, |content| parse_rdp_lines(content, ctx.now)));
        }
        sources.merged(|s| s.time.as_str())
    }

    fn user_accounts(&self, ctx: &CollectionContext) -> Vec<UserAccount> {
        let passwd = &ctx.config.sources.macos.passwd;
        let captured_at = ctx.now_string();
        ctx.absorb(passwd, parse_file(passwd, |content| parse_passwd(content, &captured_at)))
    }

    fn default_sensitive_files(&self) -> Vec<WatchedFile> {
        macos_sensitive_files()
    }

    fn owner_names(&self, ctx: &CollectionContext) -> OwnerNames {
        OwnerNames::load(Path::new(&ctx.config.sources.macos.passwd), Path::new("/etc/group"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::command::{CommandOutput, MockCommandRunner};
    use crate::config::TriageConfig;
    use crate::constants::test::{TEST_NOW, TEST_USER};
    use crate::constants::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use std::fs;
    use std::sync::Arc;

    fn ctx_with(config: TriageConfig, runner: MockCommandRunner, home: &Path) -> CollectionContext {
        CollectionContext::new(config)
            .with_platform(Platform::MacOS)
            .with_runner(Arc::new(runner))
            .with_identity(TEST_USER, home, "/bin/zsh")
            .with_now(NaiveDateTime::parse_from_str(TEST_NOW, TIMESTAMP_FORMAT).unwrap())
    }

    #[test]
    fn test_signing_authority() {
        let stderr = "Executable=/Applications/Tool.app/Contents/MacOS/Tool\n\
                      Authority=Developer ID Application: Example Corp (ABCDE12345)\n\
                      Authority=Developer ID Certification Authority\n";
        assert_eq!(signing_authority(stderr), "Developer ID Application: Example Corp (ABCDE12345)");
        assert_eq!(signing_authority("code object is not signed at all"), "");
    }

    #[test]
    fn test_failures_merged_across_predicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|program, args| {
            assert_eq!(program, "log");
            assert!(args.contains(&"24h"));
            let predicate = args.last().copied().unwrap_or_default();
            if predicate.contains("sshd") {
                Ok(CommandOutput::ok(
                    r#"[{"timestamp": "2024-10-14 09:00:00.000000+0000", "eventMessage": "Failed password for user alice", "processImagePath": "/usr/sbin/sshd"}]"#,
                ))
            } else if predicate.contains("loginwindow") {
                Ok(CommandOutput::ok(
                    r#"[{"timestamp": "2024-10-14 08:00:00.000000+0000", "eventMessage": "login failed for user bob", "processImagePath": "/System/loginwindow"}]"#,
                ))
            } else {
                Ok(CommandOutput::ok("[]"))
            }
        });

        let ctx = ctx_with(TriageConfig::default(), runner, dir.path());
        let events = MacStrategy.login_failures(&ctx);
        assert_eq!(events.len(), 2);
        assert!(events[0].time < events[1].time);
        assert_eq!(events[0].username, "bob");
        assert_eq!(events[1].username, "alice");
        assert_eq!(ctx.tracker.failure_count(), 0);
    }

    #[test]
    fn test_unsigned_process_has_no_signature() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "code object is not signed at all".to_string(),
            })
        });
        let ctx = ctx_with(TriageConfig::default(), runner, dir.path());
        assert_eq!(MacStrategy.process_signature(&ctx, Path::new("/tmp/tool")), "");
    }

    #[test]
    fn test_launch_items_typed_by_directory() {
        let dir = tempfile::tempdir().unwrap();
        let daemons = dir.path().join("LaunchDaemons");
        fs::create_dir(&daemons).unwrap();
        fs::write(
            daemons.join("com.example.helper.plist"),
            "<dict><key>Label</key><string>com.example.helper</string><key>Disabled</key><true/></dict>",
        )
        .unwrap();
        let agents = dir.path().join("Library/LaunchAgents");
        fs::create_dir_all(&agents).unwrap();
        fs::write(agents.join("com.example.agent.plist"), "<dict><key>Label</key><string>com.example.agent</string></dict>").unwrap();

        let mut config = TriageConfig::default();
        config.sources.macos.launch_dirs = vec![daemons.to_string_lossy().to_string()];
        let ctx = ctx_with(config, MockCommandRunner::new(), dir.path());

        let items = MacStrategy.startup_items(&ctx);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_type, "LaunchDaemon");
        assert_eq!(items[0].description, "com.example.helper");
        assert!(!items[0].enabled);
        assert_eq!(items[1].item_type, "UserLaunchAgent");
        assert!(items[1].enabled);
    }

    #[test]
    fn test_successes_from_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|program, _| {
            assert_eq!(program, "last");
            Ok(CommandOutput::ok(
                "analyst   ttys000                   Mon Oct 14 09:12   still logged in\n\nwtmp begins Mon Oct  7 08:00\n",
            ))
        });
        let ctx = ctx_with(TriageConfig::default(), runner, dir.path());
        let events = MacStrategy.login_successes(&ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].username, "analyst");
        assert_eq!(events[0].event_type, "Active session");
    }

    #[test]
    fn test_connections_from_lsof() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|program, args| {
            assert_eq!(program, "lsof");
            assert_eq!(args, ["-nP", "-iTCP", "-iUDP"]);
            Ok(CommandOutput::ok(
                "COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME\n\
                 sshd 412 root 3u IPv4 0x1f2e 0t0 TCP *:22 (LISTEN)\n",
            ))
        });
        let ctx = ctx_with(TriageConfig::default(), runner, dir.path());
        let sockets = MacStrategy.network_connections(&ctx);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].pid, 412);
        assert_eq!(sockets[0].captured_at, TEST_NOW);
    }
}
