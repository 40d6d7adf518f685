//! Column mappings between records and their table rows.
//!
//! Every table starts with `id, created_at`; record columns follow at offset
//! [`FIRST_COLUMN`]. Unsigned counters are stored as SQLite integers and
//! saturate at `i64::MAX`.

use rusqlite::types::{Type, Value};
use rusqlite::Row as SqlRow;
use serde_json::{Map, Value as JsonValue};

use crate::models::{
    CronEntry, DiskUsage, EvtxEvent, InterfaceStat, LoginEvent, LoginOutcome, NetworkConnection,
    PatchRecord, ProcessSnapshot, RdpSession, SensitiveFile, SeverityLevel, ShellCommand,
    StartupItem, UserAccount,
};

/// Index of the first record column in a `SELECT id, created_at, ...`
pub const FIRST_COLUMN: usize = 2;

/// A record stored as one row
pub trait Row: Sized {
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self>;
}

/// A row type that always lives in the same table
pub trait Table: Row {
    const TABLE: &'static str;
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn int(v: i64) -> Value {
    Value::Integer(v)
}

pub fn uint(v: u64) -> Value {
    Value::Integer(i64::try_from(v).unwrap_or(i64::MAX))
}

pub fn real(v: f64) -> Value {
    Value::Real(v)
}

pub fn flag(v: bool) -> Value {
    Value::Integer(i64::from(v))
}

fn col(i: usize) -> usize {
    FIRST_COLUMN + i
}

fn get_u64(row: &SqlRow<'_>, i: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(col(i))?.max(0) as u64)
}

fn get_u32(row: &SqlRow<'_>, i: usize) -> rusqlite::Result<u32> {
    let v: i64 = row.get(col(i))?;
    Ok(u32::try_from(v).unwrap_or(0))
}

fn get_map(row: &SqlRow<'_>, i: usize) -> rusqlite::Result<Map<String, JsonValue>> {
    let raw: String = row.get(col(i))?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col(i), Type::Text, Box::new(e)))
}

fn json_text(map: &Map<String, JsonValue>) -> Value {
    Value::Text(JsonValue::Object(map.clone()).to_string())
}

/// Login rows carry no outcome column; the table they live in is the outcome
impl Row for LoginEvent {
    const COLUMNS: &'static [&'static str] =
        &["time", "event_id", "event_type", "source", "username", "ip_address", "reason"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.time),
            text(&self.event_id),
            text(&self.event_type),
            text(&self.source),
            text(&self.username),
            text(&self.ip_address),
            self.reason.as_deref().map(text).unwrap_or(Value::Null),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(LoginEvent {
            time: row.get(col(0))?,
            event_id: row.get(col(1))?,
            outcome: LoginOutcome::Failure,
            event_type: row.get(col(2))?,
            source: row.get(col(3))?,
            username: row.get(col(4))?,
            ip_address: row.get(col(5))?,
            reason: row.get(col(6))?,
        })
    }
}

impl Row for ProcessSnapshot {
    const COLUMNS: &'static [&'static str] = &[
        "pid", "name", "ppid", "parent_name", "create_time", "exe", "cmdline", "file_mtime",
        "sha256", "signature", "cpu_percent", "mem_percent", "captured_at",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            int(i64::from(self.pid)),
            text(&self.name),
            int(i64::from(self.ppid)),
            text(&self.parent_name),
            int(self.create_time),
            text(&self.exe),
            text(&self.cmdline),
            text(&self.file_mtime),
            text(&self.sha256),
            text(&self.signature),
            real(self.cpu_percent),
            real(self.mem_percent),
            text(&self.captured_at),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(ProcessSnapshot {
            pid: get_u32(row, 0)?,
            name: row.get(col(1))?,
            ppid: get_u32(row, 2)?,
            parent_name: row.get(col(3))?,
            create_time: row.get(col(4))?,
            exe: row.get(col(5))?,
            cmdline: row.get(col(6))?,
            file_mtime: row.get(col(7))?,
            sha256: row.get(col(8))?,
            signature: row.get(col(9))?,
            cpu_percent: row.get(col(10))?,
            mem_percent: row.get(col(11))?,
            captured_at: row.get(col(12))?,
        })
    }
}

impl Table for ProcessSnapshot {
    const TABLE: &'static str = "process_info";
}

impl Row for InterfaceStat {
    const COLUMNS: &'static [&'static str] = &[
        "name", "ip", "mac", "bytes_sent", "bytes_recv", "packets_sent", "packets_recv",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            text(&self.ip),
            text(&self.mac),
            uint(self.bytes_sent),
            uint(self.bytes_recv),
            uint(self.packets_sent),
            uint(self.packets_recv),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(InterfaceStat {
            name: row.get(col(0))?,
            ip: row.get(col(1))?,
            mac: row.get(col(2))?,
            bytes_sent: get_u64(row, 3)?,
            bytes_recv: get_u64(row, 4)?,
            packets_sent: get_u64(row, 5)?,
            packets_recv: get_u64(row, 6)?,
        })
    }
}

impl Table for InterfaceStat {
    const TABLE: &'static str = "network_interface";
}

impl Row for NetworkConnection {
    const COLUMNS: &'static [&'static str] =
        &["proto", "local_addr", "remote_addr", "status", "pid", "captured_at"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.proto),
            text(&self.local_addr),
            text(&self.remote_addr),
            text(&self.status),
            int(i64::from(self.pid)),
            text(&self.captured_at),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(NetworkConnection {
            proto: row.get(col(0))?,
            local_addr: row.get(col(1))?,
            remote_addr: row.get(col(2))?,
            status: row.get(col(3))?,
            pid: get_u32(row, 4)?,
            captured_at: row.get(col(5))?,
        })
    }
}

impl Table for NetworkConnection {
    const TABLE: &'static str = "network_connection";
}

impl Row for StartupItem {
    const COLUMNS: &'static [&'static str] = &[
        "name", "path", "item_type", "enabled", "last_mod_time", "size", "description", "captured_at",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            text(&self.path),
            text(&self.item_type),
            flag(self.enabled),
            text(&self.last_mod_time),
            uint(self.size),
            text(&self.description),
            text(&self.captured_at),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(StartupItem {
            name: row.get(col(0))?,
            path: row.get(col(1))?,
            item_type: row.get(col(2))?,
            enabled: row.get(col(3))?,
            last_mod_time: row.get(col(4))?,
            size: get_u64(row, 5)?,
            description: row.get(col(6))?,
            captured_at: row.get(col(7))?,
        })
    }
}

impl Table for StartupItem {
    const TABLE: &'static str = "startup_item";
}

impl Row for ShellCommand {
    const COLUMNS: &'static [&'static str] = &["time", "command", "username", "shell"];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.time), text(&self.command), text(&self.user), text(&self.shell)]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(ShellCommand {
            time: row.get(col(0))?,
            command: row.get(col(1))?,
            user: row.get(col(2))?,
            shell: row.get(col(3))?,
        })
    }
}

impl Table for ShellCommand {
    const TABLE: &'static str = "shell_history";
}

impl Row for PatchRecord {
    const COLUMNS: &'static [&'static str] = &["time", "title", "kb", "description", "status"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.time),
            text(&self.title),
            text(&self.kb),
            text(&self.description),
            text(&self.status),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(PatchRecord {
            time: row.get(col(0))?,
            title: row.get(col(1))?,
            kb: row.get(col(2))?,
            description: row.get(col(3))?,
            status: row.get(col(4))?,
        })
    }
}

impl Table for PatchRecord {
    const TABLE: &'static str = "patch_info";
}

impl Row for CronEntry {
    const COLUMNS: &'static [&'static str] = &["line", "source", "captured_at"];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.line), text(&self.source), text(&self.captured_at)]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(CronEntry {
            line: row.get(col(0))?,
            source: row.get(col(1))?,
            captured_at: row.get(col(2))?,
        })
    }
}

impl Table for CronEntry {
    const TABLE: &'static str = "cron_task";
}

impl Row for RdpSession {
    const COLUMNS: &'static [&'static str] = &["time", "username", "ip", "status", "description"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.time),
            text(&self.username),
            text(&self.ip),
            text(&self.status),
            text(&self.description),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(RdpSession {
            time: row.get(col(0))?,
            username: row.get(col(1))?,
            ip: row.get(col(2))?,
            status: row.get(col(3))?,
            description: row.get(col(4))?,
        })
    }
}

impl Table for RdpSession {
    const TABLE: &'static str = "rdp_login";
}

impl Row for EvtxEvent {
    const COLUMNS: &'static [&'static str] = &[
        "time", "event_id", "event_record_id", "provider", "level", "channel", "computer",
        "user_id", "version", "qualifiers", "task", "opcode", "keywords", "process_id",
        "thread_id", "message", "description", "system_data", "event_data", "user_data",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.time),
            int(i64::from(self.event_id)),
            uint(self.event_record_id),
            text(&self.provider),
            text(self.level.as_str()),
            text(&self.channel),
            text(&self.computer),
            text(&self.user_id),
            int(self.version),
            int(self.qualifiers),
            int(self.task),
            int(self.opcode),
            text(&self.keywords),
            int(i64::from(self.process_id)),
            int(i64::from(self.thread_id)),
            text(&self.message),
            text(&self.description),
            json_text(&self.system),
            json_text(&self.event_data),
            json_text(&self.user_data),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        let level: String = row.get(col(4))?;
        Ok(EvtxEvent {
            time: row.get(col(0))?,
            event_id: get_u32(row, 1)?,
            event_record_id: get_u64(row, 2)?,
            provider: row.get(col(3))?,
            level: level.parse().unwrap_or(SeverityLevel::Unknown),
            channel: row.get(col(5))?,
            computer: row.get(col(6))?,
            user_id: row.get(col(7))?,
            version: row.get(col(8))?,
            qualifiers: row.get(col(9))?,
            task: row.get(col(10))?,
            opcode: row.get(col(11))?,
            keywords: row.get(col(12))?,
            process_id: get_u32(row, 13)?,
            thread_id: get_u32(row, 14)?,
            message: row.get(col(15))?,
            description: row.get(col(16))?,
            system: get_map(row, 17)?,
            event_data: get_map(row, 18)?,
            user_data: get_map(row, 19)?,
        })
    }
}

impl Table for EvtxEvent {
    const TABLE: &'static str = "evtx_event";
}

impl Row for DiskUsage {
    const COLUMNS: &'static [&'static str] =
        &["mount_point", "total_size", "used_size", "free_size", "usage"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.mount_point),
            uint(self.total_size),
            uint(self.used_size),
            uint(self.free_size),
            real(self.usage),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(DiskUsage {
            mount_point: row.get(col(0))?,
            total_size: get_u64(row, 1)?,
            used_size: get_u64(row, 2)?,
            free_size: get_u64(row, 3)?,
            usage: row.get(col(4))?,
        })
    }
}

impl Table for DiskUsage {
    const TABLE: &'static str = "disk_info";
}

impl Row for UserAccount {
    const COLUMNS: &'static [&'static str] =
        &["username", "uid", "gid", "full_name", "home_dir", "shell", "captured_at"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.username),
            text(&self.uid),
            text(&self.gid),
            text(&self.full_name),
            text(&self.home_dir),
            text(&self.shell),
            text(&self.captured_at),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(UserAccount {
            username: row.get(col(0))?,
            uid: row.get(col(1))?,
            gid: row.get(col(2))?,
            full_name: row.get(col(3))?,
            home_dir: row.get(col(4))?,
            shell: row.get(col(5))?,
            captured_at: row.get(col(6))?,
        })
    }
}

impl Table for UserAccount {
    const TABLE: &'static str = "user_info";
}

impl Row for SensitiveFile {
    const COLUMNS: &'static [&'static str] = &[
        "path", "description", "file_exists", "size", "permissions", "owner", "group_name",
        "mod_time", "is_dir", "is_symlink", "captured_at",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.path),
            text(&self.description),
            flag(self.exists),
            uint(self.size),
            text(&self.permissions),
            text(&self.owner),
            text(&self.group),
            text(&self.mod_time),
            flag(self.is_dir),
            flag(self.is_symlink),
            text(&self.captured_at),
        ]
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(SensitiveFile {
            path: row.get(col(0))?,
            description: row.get(col(1))?,
            exists: row.get(col(2))?,
            size: get_u64(row, 3)?,
            permissions: row.get(col(4))?,
            owner: row.get(col(5))?,
            group: row.get(col(6))?,
            mod_time: row.get(col(7))?,
            is_dir: row.get(col(8))?,
            is_symlink: row.get(col(9))?,
            captured_at: row.get(col(10))?,
        })
    }
}

impl Table for SensitiveFile {
    const TABLE: &'static str = "file_monitor";
}

/// Columns of the `system_info` parent row
pub const SYSTEM_COLUMNS: &[&str] = &[
    "hostname", "os", "arch", "cpu_cores", "kernel_version", "cpu_usage", "total_memory",
    "memory_usage", "captured_at",
];

/// Columns of the `network_info` parent row
pub const NETWORK_COLUMNS: &[&str] = &["hostname", "gateway", "captured_at"];
