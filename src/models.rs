//! Normalized artifact records.
//!
//! Every record is an immutable snapshot taken at collection time. Times are
//! stored as text in [`crate::constants::TIMESTAMP_FORMAT`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Artifact kinds a collector can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    LoginFailed,
    LoginSuccess,
    Process,
    NetworkInfo,
    NetworkConnection,
    Startup,
    ShellHistory,
    Patch,
    ScheduledTask,
    Rdp,
    SystemInfo,
    UserAccount,
    FileMonitor,
}

impl ArtifactKind {
    /// Every kind, in the order a full collection runs them
    pub const ALL: [ArtifactKind; 13] = [
        ArtifactKind::SystemInfo,
        ArtifactKind::UserAccount,
        ArtifactKind::LoginFailed,
        ArtifactKind::LoginSuccess,
        ArtifactKind::Rdp,
        ArtifactKind::Process,
        ArtifactKind::NetworkInfo,
        ArtifactKind::NetworkConnection,
        ArtifactKind::Startup,
        ArtifactKind::ScheduledTask,
        ArtifactKind::ShellHistory,
        ArtifactKind::Patch,
        ArtifactKind::FileMonitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::LoginFailed => "login-failed",
            ArtifactKind::LoginSuccess => "login-success",
            ArtifactKind::Process => "process",
            ArtifactKind::NetworkInfo => "network",
            ArtifactKind::NetworkConnection => "connections",
            ArtifactKind::Startup => "startup",
            ArtifactKind::ShellHistory => "shell-history",
            ArtifactKind::Patch => "patch",
            ArtifactKind::ScheduledTask => "cron",
            ArtifactKind::Rdp => "rdp",
            ArtifactKind::SystemInfo => "system",
            ArtifactKind::UserAccount => "users",
            ArtifactKind::FileMonitor => "files",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ArtifactKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown artifact kind '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Whether a login attempt succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginOutcome {
    Success,
    Failure,
}

/// A single login attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginEvent {
    pub time: String,
    pub event_id: String,
    pub outcome: LoginOutcome,
    /// Login type or category, e.g. "ssh password" or "Remote interactive (RDP)"
    pub event_type: String,
    pub source: String,
    pub username: String,
    /// Source address, "local" when the attempt had none
    pub ip_address: String,
    pub reason: Option<String>,
}

/// A running process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub ppid: u32,
    pub parent_name: String,
    /// Process start, seconds since the epoch
    pub create_time: i64,
    pub exe: String,
    pub cmdline: String,
    pub file_mtime: String,
    pub sha256: String,
    pub signature: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub captured_at: String,
}

/// Per-interface address and traffic counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStat {
    pub name: String,
    pub ip: String,
    pub mac: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// Host network state; owns its interfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub hostname: String,
    pub gateway: String,
    pub interfaces: Vec<InterfaceStat>,
    pub captured_at: String,
}

/// An open socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub proto: String,
    pub local_addr: String,
    pub remote_addr: String,
    pub status: String,
    pub pid: u32,
    pub captured_at: String,
}

/// A persistence entry that runs at boot or login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupItem {
    pub name: String,
    pub path: String,
    pub item_type: String,
    pub enabled: bool,
    pub last_mod_time: String,
    pub size: u64,
    pub description: String,
    pub captured_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCommand {
    pub time: String,
    pub command: String,
    pub user: String,
    pub shell: String,
}

/// An installed update or package upgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub time: String,
    pub title: String,
    pub kb: String,
    pub description: String,
    pub status: String,
}

/// A scheduled task line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronEntry {
    pub line: String,
    pub source: String,
    pub captured_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdpSession {
    pub time: String,
    pub username: String,
    pub ip: String,
    pub status: String,
    pub description: String,
}

/// Event severity as recorded in the System/Level field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
    Unknown,
}

impl SeverityLevel {
    /// Total mapping from the raw level value
    pub fn from_level(level: i64) -> Self {
        match level {
            1 => SeverityLevel::Critical,
            2 => SeverityLevel::Error,
            3 => SeverityLevel::Warning,
            4 => SeverityLevel::Information,
            5 => SeverityLevel::Verbose,
            _ => SeverityLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Critical => "Critical",
            SeverityLevel::Error => "Error",
            SeverityLevel::Warning => "Warning",
            SeverityLevel::Information => "Information",
            SeverityLevel::Verbose => "Verbose",
            SeverityLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Critical" => SeverityLevel::Critical,
            "Error" => SeverityLevel::Error,
            "Warning" => SeverityLevel::Warning,
            "Information" => SeverityLevel::Information,
            "Verbose" => SeverityLevel::Verbose,
            _ => SeverityLevel::Unknown,
        })
    }
}

/// One Windows Event Log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvtxEvent {
    pub time: String,
    pub event_id: u32,
    pub event_record_id: u64,
    pub provider: String,
    pub level: SeverityLevel,
    pub channel: String,
    pub computer: String,
    pub user_id: String,
    pub version: i64,
    pub qualifiers: i64,
    pub task: i64,
    pub opcode: i64,
    pub keywords: String,
    pub process_id: u32,
    pub thread_id: u32,
    pub message: String,
    pub description: String,
    pub system: Map<String, Value>,
    pub event_data: Map<String, Value>,
    pub user_data: Map<String, Value>,
}

/// Usage of one mounted volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_size: u64,
    pub used_size: u64,
    pub free_size: u64,
    pub usage: f64,
}

/// Host summary; owns its disks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub cpu_cores: u32,
    pub kernel_version: String,
    pub cpu_usage: f64,
    pub total_memory: u64,
    pub memory_usage: f64,
    pub disks: Vec<DiskUsage>,
    pub captured_at: String,
}

/// A local account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub uid: String,
    pub gid: String,
    pub full_name: String,
    pub home_dir: String,
    pub shell: String,
    pub captured_at: String,
}

/// Metadata of a watched system file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitiveFile {
    pub path: String,
    pub description: String,
    pub exists: bool,
    pub size: u64,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub mod_time: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub captured_at: String,
}

/// Tagged union over every record kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ArtifactRecord {
    Login(LoginEvent),
    Process(ProcessSnapshot),
    Network(NetworkSnapshot),
    Connection(NetworkConnection),
    Startup(StartupItem),
    Shell(ShellCommand),
    Patch(PatchRecord),
    Cron(CronEntry),
    Rdp(RdpSession),
    Evtx(EvtxEvent),
    System(SystemSnapshot),
    User(UserAccount),
    File(SensitiveFile),
}

impl ArtifactRecord {
    /// Timestamp carried by the record
    pub fn timestamp(&self) -> &str {
        match self {
            ArtifactRecord::Login(r) => &r.time,
            ArtifactRecord::Process(r) => &r.captured_at,
            ArtifactRecord::Network(r) => &r.captured_at,
            ArtifactRecord::Connection(r) => &r.captured_at,
            ArtifactRecord::Startup(r) => &r.captured_at,
            ArtifactRecord::Shell(r) => &r.time,
            ArtifactRecord::Patch(r) => &r.time,
            ArtifactRecord::Cron(r) => &r.captured_at,
            ArtifactRecord::Rdp(r) => &r.time,
            ArtifactRecord::Evtx(r) => &r.time,
            ArtifactRecord::System(r) => &r.captured_at,
            ArtifactRecord::User(r) => &r.captured_at,
            ArtifactRecord::File(r) => &r.captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.as_str().parse::<ArtifactKind>(), Ok(kind));
        }
        assert!("registry".parse::<ArtifactKind>().is_err());
        assert_eq!(" Login-Failed ".parse::<ArtifactKind>(), Ok(ArtifactKind::LoginFailed));
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(SeverityLevel::from_level(1), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::from_level(4), SeverityLevel::Information);
        assert_eq!(SeverityLevel::from_level(0), SeverityLevel::Unknown);
        assert_eq!(SeverityLevel::from_level(-3), SeverityLevel::Unknown);
        assert_eq!("Verbose".parse::<SeverityLevel>().ok(), Some(SeverityLevel::Verbose));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = ArtifactRecord::Cron(CronEntry {
            line: "0 * * * * /bin/true".to_string(),
            source: "crontab".to_string(),
            captured_at: "2024-01-01 00:00:00".to_string(),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "cron");
        assert_eq!(json["data"]["line"], "0 * * * * /bin/true");
        assert_eq!(record.timestamp(), "2024-01-01 00:00:00");
    }
}
