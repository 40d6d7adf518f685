//! Embedded SQLite persistence for collected records.
//!
//! Each `save_*` call writes its whole batch inside one transaction. Any failed
//! insert aborts the call and the transaction is rolled back when dropped, so a
//! batch is either stored completely or not at all. The connection sits behind
//! a mutex, which keeps at most one transaction open at a time.
//!
//! Rows are append-only: there are no update or delete operations.

/// Table definitions
pub mod schema;

/// Record to row mappings
pub mod rows;

use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, TriageError};
use crate::models::{
    ArtifactRecord, CronEntry, DiskUsage, EvtxEvent, InterfaceStat, LoginEvent, LoginOutcome,
    NetworkConnection, NetworkSnapshot, PatchRecord, ProcessSnapshot, RdpSession, SensitiveFile,
    ShellCommand, StartupItem, SystemSnapshot, UserAccount,
};
use rows::{int, real, text, uint, Row, Table, NETWORK_COLUMNS, SYSTEM_COLUMNS};

/// Every table the schema creates
pub const TABLES: [&str; 16] = [
    "user_info",
    "system_info",
    "disk_info",
    "cron_task",
    "file_monitor",
    "login_failed",
    "login_success",
    "network_info",
    "network_interface",
    "network_connection",
    "process_info",
    "rdp_login",
    "shell_history",
    "startup_item",
    "patch_info",
    "evtx_event",
];

/// A persisted record with its generated id and insert time
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: i64,
    pub created_at: String,
    pub record: T,
}

/// Handle on the triage database
pub struct Store {
    conn: Mutex<Connection>,
}

fn login_table(outcome: LoginOutcome) -> &'static str {
    match outcome {
        LoginOutcome::Failure => "login_failed",
        LoginOutcome::Success => "login_success",
    }
}

fn insert_values(tx: &Transaction<'_>, table: &str, columns: &[&str], values: Vec<Value>) -> Result<i64> {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders);
    tx.prepare_cached(&sql)?.execute(params_from_iter(values))?;
    Ok(tx.last_insert_rowid())
}

fn insert_row<T: Row>(tx: &Transaction<'_>, table: &str, record: &T) -> Result<i64> {
    insert_values(tx, table, T::COLUMNS, record.values())
}

fn insert_child<T: Row>(
    tx: &Transaction<'_>,
    table: &str,
    parent_column: &str,
    parent_id: i64,
    record: &T,
) -> Result<i64> {
    let columns: Vec<&str> = std::iter::once(parent_column).chain(T::COLUMNS.iter().copied()).collect();
    let values: Vec<Value> = std::iter::once(int(parent_id)).chain(record.values()).collect();
    insert_values(tx, table, &columns, values)
}

fn insert_login(tx: &Transaction<'_>, event: &LoginEvent) -> Result<usize> {
    insert_row(tx, login_table(event.outcome), event)?;
    Ok(1)
}

fn insert_system(tx: &Transaction<'_>, snapshot: &SystemSnapshot) -> Result<usize> {
    let parent = insert_values(
        tx,
        "system_info",
        SYSTEM_COLUMNS,
        vec![
            text(&snapshot.hostname),
            text(&snapshot.os),
            text(&snapshot.arch),
            int(i64::from(snapshot.cpu_cores)),
            text(&snapshot.kernel_version),
            real(snapshot.cpu_usage),
            uint(snapshot.total_memory),
            real(snapshot.memory_usage),
            text(&snapshot.captured_at),
        ],
    )?;
    for disk in &snapshot.disks {
        insert_child(tx, DiskUsage::TABLE, "system_info_id", parent, disk)?;
    }
    Ok(1 + snapshot.disks.len())
}

fn insert_network(tx: &Transaction<'_>, snapshot: &NetworkSnapshot) -> Result<usize> {
    let parent = insert_values(
        tx,
        "network_info",
        NETWORK_COLUMNS,
        vec![
            text(&snapshot.hostname),
            text(&snapshot.gateway),
            text(&snapshot.captured_at),
        ],
    )?;
    for iface in &snapshot.interfaces {
        insert_child(tx, InterfaceStat::TABLE, "network_info_id", parent, iface)?;
    }
    Ok(1 + snapshot.interfaces.len())
}

fn insert_all<T: Table>(tx: &Transaction<'_>, records: &[T]) -> Result<usize> {
    for record in records {
        insert_row(tx, T::TABLE, record)?;
    }
    Ok(records.len())
}

fn insert_record(tx: &Transaction<'_>, record: &ArtifactRecord) -> Result<usize> {
    match record {
        ArtifactRecord::Login(r) => insert_login(tx, r),
        ArtifactRecord::Process(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Network(r) => insert_network(tx, r),
        ArtifactRecord::Connection(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Startup(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Shell(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Patch(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Cron(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Rdp(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::Evtx(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::System(r) => insert_system(tx, r),
        ArtifactRecord::User(r) => insert_all(tx, std::slice::from_ref(r)),
        ArtifactRecord::File(r) => insert_all(tx, std::slice::from_ref(r)),
    }
}

fn select_sql(table: &str, columns: &[&str], filter: Option<&str>) -> String {
    let filter = filter.map(|f| format!(" WHERE {}", f)).unwrap_or_default();
    format!(
        "SELECT id, created_at, {} FROM {}{} ORDER BY id",
        columns.join(", "),
        table,
        filter
    )
}

fn select_rows<T: Row>(conn: &Connection, table: &str) -> Result<Vec<Stored<T>>> {
    let mut stmt = conn.prepare(&select_sql(table, T::COLUMNS, None))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Stored {
                id: row.get(0)?,
                created_at: row.get(1)?,
                record: T::from_row(row)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn select_children<T: Row>(conn: &Connection, table: &str, parent_column: &str, parent_id: i64) -> Result<Vec<T>> {
    let filter = format!("{} = ?1", parent_column);
    let mut stmt = conn.prepare(&select_sql(table, T::COLUMNS, Some(&filter)))?;
    let rows = stmt
        .query_map([parent_id], |row| T::from_row(row))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl Store {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        debug!("Opening database {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` in one transaction; committed only when `f` succeeds
    fn write<F>(&self, f: F) -> Result<usize>
    where
        F: FnOnce(&Transaction<'_>) -> Result<usize>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let written = f(&tx)?;
        tx.commit()?;
        Ok(written)
    }

    /// Save login events, routed to `login_failed` or `login_success` by outcome
    pub fn save_login_events(&self, events: &[LoginEvent]) -> Result<usize> {
        self.write(|tx| {
            for event in events {
                insert_login(tx, event)?;
            }
            Ok(events.len())
        })
    }

    pub fn save_processes(&self, processes: &[ProcessSnapshot]) -> Result<usize> {
        self.write(|tx| insert_all(tx, processes))
    }

    /// Save a network snapshot and its interfaces; returns rows written
    pub fn save_network_snapshot(&self, snapshot: &NetworkSnapshot) -> Result<usize> {
        self.write(|tx| insert_network(tx, snapshot))
    }

    pub fn save_network_connections(&self, connections: &[NetworkConnection]) -> Result<usize> {
        self.write(|tx| insert_all(tx, connections))
    }

    pub fn save_startup_items(&self, items: &[StartupItem]) -> Result<usize> {
        self.write(|tx| insert_all(tx, items))
    }

    pub fn save_shell_history(&self, commands: &[ShellCommand]) -> Result<usize> {
        self.write(|tx| insert_all(tx, commands))
    }

    pub fn save_patches(&self, patches: &[PatchRecord]) -> Result<usize> {
        self.write(|tx| insert_all(tx, patches))
    }

    pub fn save_cron_entries(&self, entries: &[CronEntry]) -> Result<usize> {
        self.write(|tx| insert_all(tx, entries))
    }

    pub fn save_rdp_sessions(&self, sessions: &[RdpSession]) -> Result<usize> {
        self.write(|tx| insert_all(tx, sessions))
    }

    pub fn save_evtx_events(&self, events: &[EvtxEvent]) -> Result<usize> {
        self.write(|tx| insert_all(tx, events))
    }

    /// Save a system snapshot and its disks; returns rows written
    pub fn save_system_snapshot(&self, snapshot: &SystemSnapshot) -> Result<usize> {
        self.write(|tx| insert_system(tx, snapshot))
    }

    pub fn save_user_accounts(&self, accounts: &[UserAccount]) -> Result<usize> {
        self.write(|tx| insert_all(tx, accounts))
    }

    pub fn save_sensitive_files(&self, files: &[SensitiveFile]) -> Result<usize> {
        self.write(|tx| insert_all(tx, files))
    }

    /// Save a mixed batch in one transaction; returns rows written
    pub fn save_records(&self, records: &[ArtifactRecord]) -> Result<usize> {
        self.write(|tx| {
            records
                .iter()
                .try_fold(0usize, |written, record| -> Result<usize> {
                    Ok(written + insert_record(tx, record)?)
                })
        })
    }

    pub fn load_login_events(&self, outcome: LoginOutcome) -> Result<Vec<Stored<LoginEvent>>> {
        let mut rows: Vec<Stored<LoginEvent>> = select_rows(&self.conn(), login_table(outcome))?;
        for row in &mut rows {
            row.record.outcome = outcome;
        }
        Ok(rows)
    }

    pub fn load_processes(&self) -> Result<Vec<Stored<ProcessSnapshot>>> {
        select_rows(&self.conn(), ProcessSnapshot::TABLE)
    }

    pub fn load_network_snapshots(&self) -> Result<Vec<Stored<NetworkSnapshot>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&select_sql("network_info", NETWORK_COLUMNS, None))?;
        let parents = stmt
            .query_map([], |row| {
                Ok(Stored {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    record: NetworkSnapshot {
                        hostname: row.get(2)?,
                        gateway: row.get(3)?,
                        interfaces: Vec::new(),
                        captured_at: row.get(4)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        parents
            .into_iter()
            .map(|mut parent| {
                parent.record.interfaces =
                    select_children(&conn, InterfaceStat::TABLE, "network_info_id", parent.id)?;
                Ok(parent)
            })
            .collect()
    }

    pub fn load_network_connections(&self) -> Result<Vec<Stored<NetworkConnection>>> {
        select_rows(&self.conn(), NetworkConnection::TABLE)
    }

    pub fn load_startup_items(&self) -> Result<Vec<Stored<StartupItem>>> {
        select_rows(&self.conn(), StartupItem::TABLE)
    }

    pub fn load_shell_history(&self) -> Result<Vec<Stored<ShellCommand>>> {
        select_rows(&self.conn(), ShellCommand::TABLE)
    }

    pub fn load_patches(&self) -> Result<Vec<Stored<PatchRecord>>> {
        select_rows(&self.conn(), PatchRecord::TABLE)
    }

    pub fn load_cron_entries(&self) -> Result<Vec<Stored<CronEntry>>> {
        select_rows(&self.conn(), CronEntry::TABLE)
    }

    pub fn load_rdp_sessions(&self) -> Result<Vec<Stored<RdpSession>>> {
        select_rows(&self.conn(), RdpSession::TABLE)
    }

    pub fn load_evtx_events(&self) -> Result<Vec<Stored<EvtxEvent>>> {
        select_rows(&self.conn(), EvtxEvent::TABLE)
    }

    pub fn load_system_snapshots(&self) -> Result<Vec<Stored<SystemSnapshot>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&select_sql("system_info", SYSTEM_COLUMNS, None))?;
        let parents = stmt
            .query_map([], |row| {
                let cpu_cores: i64 = row.get(5)?;
                let total_memory: i64 = row.get(8)?;
                Ok(Stored {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    record: SystemSnapshot {
                        hostname: row.get(2)?,
                        os: row.get(3)?,
                        arch: row.get(4)?,
                        cpu_cores: u32::try_from(cpu_cores).unwrap_or(0),
                        kernel_version: row.get(6)?,
                        cpu_usage: row.get(7)?,
                        total_memory: total_memory.max(0) as u64,
                        memory_usage: row.get(9)?,
                        disks: Vec::new(),
                        captured_at: row.get(10)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        parents
            .into_iter()
            .map(|mut parent| {
                parent.record.disks = select_children(&conn, DiskUsage::TABLE, "system_info_id", parent.id)?;
                Ok(parent)
            })
            .collect()
    }

    pub fn load_user_accounts(&self) -> Result<Vec<Stored<UserAccount>>> {
        select_rows(&self.conn(), UserAccount::TABLE)
    }

    pub fn load_sensitive_files(&self) -> Result<Vec<Stored<SensitiveFile>>> {
        select_rows(&self.conn(), SensitiveFile::TABLE)
    }

    /// Number of rows in one of the [`TABLES`]
    pub fn row_count(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            return Err(TriageError::NotFound(format!("table {}", table)));
        }
        let count = self
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn().execute_batch(sql)?;
        Ok(())
    }
}
