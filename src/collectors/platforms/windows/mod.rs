//! Windows strategy: WMI for logins, patches, accounts and adapters, the
//! registry and startup folders for persistence, `schtasks` for scheduled
//! tasks and the LocalSessionManager channel for RDP sessions.

pub mod wmi;

use std::path::Path;

use crate::collectors::command::run_checked;
use crate::collectors::files::startup_dir;
use crate::collectors::host::HostView;
use crate::collectors::parsers::cron::parse_schtasks_csv;
use crate::collectors::parsers::network::merge_interfaces;
use crate::collectors::parsers::shell_history::parse_powershell_history;
use crate::collectors::parsers::sockets::parse_netstat_ano;
use crate::collectors::parsers::wmi_rows::{
    account_from_wmi, cim_datetime, gateway_from_adapters, interface_from_adapter, login_from_nt_event,
    patch_from_quick_fix, rdp_session_from_event, NetworkAdapterConfig, NtLogEvent, QuickFix,
    WmiUserAccount,
};
use crate::collectors::platforms::common::{history_file, Sources};
use crate::collectors::platforms::{Platform, PlatformStrategy};
use crate::config::{windows_sensitive_files, WatchedFile};
use crate::constants::{EVENT_LOGON_FAILURE, EVENT_LOGON_SUCCESS, WINDOWS_RDP_EVTX, WINDOWS_RUN_KEY};
use crate::context::CollectionContext;
use crate::error::Result;
use crate::evtx;
use crate::models::{
    CronEntry, LoginEvent, LoginOutcome, NetworkConnection, NetworkSnapshot, PatchRecord, RdpSession,
    ShellCommand, StartupItem, UserAccount,
};
use crate::normalize::dedup_by_key;

const PSREADLINE_HISTORY: &str =
    r"AppData\Roaming\Microsoft\Windows\PowerShell\PSReadLine\ConsoleHost_history.txt";
const USER_STARTUP_DIR: &str = r"AppData\Roaming\Microsoft\Windows\Start Menu\Programs\Startup";

#[derive(Debug, Default)]
pub struct WindowsStrategy;

/// Security log events with one id inside the lookback window
fn security_events(ctx: &CollectionContext, event_code: u32, outcome: LoginOutcome) -> Result<Vec<LoginEvent>> {
    let wql = format!(
        "SELECT EventCode, TimeGenerated, Message, RecordNumber FROM Win32_NTLogEvent \
         WHERE Logfile = 'Security' AND EventCode = {} AND TimeGenerated >= '{}'",
        event_code,
        cim_datetime(ctx.lookback_start())
    );
    let rows: Vec<NtLogEvent> = wmi::query(&wql)?;
    Ok(rows
        .iter()
        .map(|row| login_from_nt_event(row, outcome, ctx.now))
        .collect())
}

/// (value name, command) pairs under a Run key
#[cfg(windows)]
fn run_key_values(machine: bool) -> Result<Vec<(String, String)>> {
    use crate::error::TriageError;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    let root = RegKey::predef(if machine { HKEY_LOCAL_MACHINE } else { HKEY_CURRENT_USER });
    let key = root
        .open_subkey_with_flags(WINDOWS_RUN_KEY, KEY_READ)
        .map_err(|e| TriageError::from_io(WINDOWS_RUN_KEY, e))?;
    let mut values = Vec::new();
    for (name, _) in key.enum_values().flatten() {
        if let Ok(command) = key.get_value::<String, _>(&name) {
            values.push((name, command));
        }
    }
    Ok(values)
}

#[cfg(not(windows))]
fn run_key_values(_machine: bool) -> Result<Vec<(String, String)>> {
    Err(crate::error::TriageError::PlatformUnsupported(
        "registry requires Windows".to_string(),
    ))
}

fn run_key_items(machine: bool, captured_at: &str) -> Result<Vec<StartupItem>> {
    let hive = if machine { "HKLM" } else { "HKCU" };
    Ok(run_key_values(machine)?
        .into_iter()
        .map(|(name, command)| StartupItem {
            name,
            path: command,
            item_type: format!("RegistryRun ({})", hive),
            enabled: true,
            last_mod_time: String::new(),
            size: 0,
            description: format!(r"{}\{}", hive, WINDOWS_RUN_KEY),
            captured_at: captured_at.to_string(),
        })
        .collect())
}

impl PlatformStrategy for WindowsStrategy {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn login_failures(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        let mut sources = Sources::new(ctx);
        sources.add("Security 4625", || security_events(ctx, EVENT_LOGON_FAILURE, LoginOutcome::Failure));
        dedup_by_key(sources.merged(|e| e.time.as_str()), |e| {
            (e.time.clone(), e.username.clone())
        })
    }

    fn login_successes(&self, ctx: &CollectionContext) -> Vec<LoginEvent> {
        let mut sources = Sources::new(ctx);
        sources.add("Security 4624", || security_events(ctx, EVENT_LOGON_SUCCESS, LoginOutcome::Success));
        sources.merged(|e| e.time.as_str())
    }

    fn network_info(&self, ctx: &CollectionContext) -> Vec<NetworkSnapshot> {
        let adapters: Vec<NetworkAdapterConfig> = ctx.absorb(
            "Win32_NetworkAdapterConfiguration",
            wmi::query(
                "SELECT Description, MACAddress, IPAddress, DefaultIPGateway, IPEnabled \
                 FROM Win32_NetworkAdapterConfiguration",
            ),
        );
        let addrs = adapters.iter().filter_map(interface_from_adapter).collect();
        let host = HostView::network_only();
        vec![NetworkSnapshot {
            hostname: host.hostname(),
            gateway: gateway_from_adapters(&adapters),
            interfaces: merge_interfaces(addrs, &host.interface_counters()),
            captured_at: ctx.now_string(),
        }]
    }

    fn network_connections(&self, ctx: &CollectionContext) -> Vec<NetworkConnection> {
        let captured_at = ctx.now_string();
        ctx.absorb(
            "netstat -ano",
            run_checked(ctx.runner.as_ref(), "netstat", &["-ano"]).map(|out| parse_netstat_ano(&out, &captured_at)),
        )
    }

    fn startup_items(&self, ctx: &CollectionContext) -> Vec<StartupItem> {
        let captured_at = ctx.now_string();
        let opaque = |_: &str| (String::new(), true);

        let mut sources = Sources::new(ctx);
        for dir in &ctx.config.sources.windows.startup_dirs {
            sources.add(dir, || startup_dir(Path::new(dir), None, "StartupFolder", &captured_at, &opaque));
        }
        let user_dir = ctx.home_dir.join(USER_STARTUP_DIR);
        sources.add(&user_dir.display().to_string(), || {
            startup_dir(&user_dir, None, "UserStartupFolder", &captured_at, &opaque)
        });
        sources
            .add(r"HKLM\Run", || run_key_items(true, &captured_at))
            .add(r"HKCU\Run", || run_key_items(false, &captured_at));
        sources.concat()
    }

    fn shell_history(&self, ctx: &CollectionContext) -> Vec<ShellCommand> {
        let path = ctx.home_dir.join(PSREADLINE_HISTORY);
        ctx.absorb(
            "PSReadLine",
            history_file(ctx, &path, "powershell", parse_powershell_history),
        )
    }

    fn patches(&self, ctx: &CollectionContext) -> Vec<PatchRecord> {
        let fixes: Vec<QuickFix> = ctx.absorb(
            "Win32_QuickFixEngineering",
            wmi::query("SELECT HotFixID, Description, InstalledOn, InstalledBy FROM Win32_QuickFixEngineering"),
        );
        fixes.iter().map(|fix| patch_from_quick_fix(fix, ctx.now)).collect()
    }

    fn scheduled_tasks(&self, ctx: &CollectionContext) -> Vec<CronEntry> {
        let captured_at = ctx.now_string();
        ctx.absorb(
            "schtasks",
            run_checked(ctx.runner.as_ref(), "schtasks", &["/query", "/fo", "CSV", "/v", "/nh"])
                .map(|out| parse_schtasks_csv(&out, &captured_at)),
        )
    }

    fn rdp_sessions(&self, ctx: &CollectionContext) -> Vec<RdpSession> {
        let path = Path::new(&ctx.config.sources.windows.event_log_dir).join(WINDOWS_RDP_EVTX);
        let events = ctx.absorb(WINDOWS_RDP_EVTX, evtx::parse_file(&path));
        let mut sessions: Vec<RdpSession> = events.iter().filter_map(rdp_session_from_event).collect();
        sessions.sort_by(|a, b| a.time.cmp(&b.time));
        sessions
    }

    fn user_accounts(&self, ctx: &CollectionContext) -> Vec<UserAccount> {
        let captured_at = ctx.now_string();
        let accounts: Vec<WmiUserAccount> = ctx.absorb(
            "Win32_UserAccount",
            wmi::query("SELECT Name, SID, FullName, Domain FROM Win32_UserAccount WHERE LocalAccount = TRUE"),
        );
        accounts
            .iter()
            .map(|account| account_from_wmi(account, &captured_at))
            .collect()
    }

    fn default_sensitive_files(&self) -> Vec<WatchedFile> {
        windows_sensitive_files()
    }
}
