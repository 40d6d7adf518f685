use rusqlite::Connection;

use crate::error::Result;

/// Idempotent schema, one table per artifact kind.
///
/// Snapshot tables own their children through a foreign key on the parent id.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS user_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    uid TEXT NOT NULL,
    gid TEXT NOT NULL,
    full_name TEXT NOT NULL,
    home_dir TEXT NOT NULL,
    shell TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS system_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL,
    os TEXT NOT NULL,
    arch TEXT NOT NULL,
    cpu_cores INTEGER NOT NULL,
    kernel_version TEXT NOT NULL,
    cpu_usage REAL NOT NULL,
    total_memory INTEGER NOT NULL,
    memory_usage REAL NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS disk_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    system_info_id INTEGER NOT NULL REFERENCES system_info(id),
    mount_point TEXT NOT NULL,
    total_size INTEGER NOT NULL,
    used_size INTEGER NOT NULL,
    free_size INTEGER NOT NULL,
    usage REAL NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS cron_task (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    line TEXT NOT NULL,
    source TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS file_monitor (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    description TEXT NOT NULL,
    file_exists INTEGER NOT NULL,
    size INTEGER NOT NULL,
    permissions TEXT NOT NULL,
    owner TEXT NOT NULL,
    group_name TEXT NOT NULL,
    mod_time TEXT NOT NULL,
    is_dir INTEGER NOT NULL,
    is_symlink INTEGER NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS login_failed (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    event_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    source TEXT NOT NULL,
    username TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    reason TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS login_success (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    event_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    source TEXT NOT NULL,
    username TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    reason TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS network_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL,
    gateway TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS network_interface (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    network_info_id INTEGER NOT NULL REFERENCES network_info(id),
    name TEXT NOT NULL,
    ip TEXT NOT NULL,
    mac TEXT NOT NULL,
    bytes_sent INTEGER NOT NULL,
    bytes_recv INTEGER NOT NULL,
    packets_sent INTEGER NOT NULL,
    packets_recv INTEGER NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS network_connection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proto TEXT NOT NULL,
    local_addr TEXT NOT NULL,
    remote_addr TEXT NOT NULL,
    status TEXT NOT NULL,
    pid INTEGER NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS process_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pid INTEGER NOT NULL,
    name TEXT NOT NULL,
    ppid INTEGER NOT NULL,
    parent_name TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    exe TEXT NOT NULL,
    cmdline TEXT NOT NULL,
    file_mtime TEXT NOT NULL,
    sha256 TEXT NOT NULL,
    signature TEXT NOT NULL,
    cpu_percent REAL NOT NULL,
    mem_percent REAL NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS rdp_login (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    username TEXT NOT NULL,
    ip TEXT NOT NULL,
    status TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS shell_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    command TEXT NOT NULL,
    username TEXT NOT NULL,
    shell TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS startup_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    item_type TEXT NOT NULL,
    enabled INTEGER NOT NULL,
    last_mod_time TEXT NOT NULL,
    size INTEGER NOT NULL,
    description TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS patch_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    title TEXT NOT NULL,
    kb TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS evtx_event (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL,
    event_id INTEGER NOT NULL,
    event_record_id INTEGER NOT NULL,
    provider TEXT NOT NULL,
    level TEXT NOT NULL,
    channel TEXT NOT NULL,
    computer TEXT NOT NULL,
    user_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    qualifiers INTEGER NOT NULL,
    task INTEGER NOT NULL,
    opcode INTEGER NOT NULL,
    keywords TEXT NOT NULL,
    process_id INTEGER NOT NULL,
    thread_id INTEGER NOT NULL,
    message TEXT NOT NULL,
    description TEXT NOT NULL,
    system_data TEXT NOT NULL,
    event_data TEXT NOT NULL,
    user_data TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_disk_info_parent ON disk_info(system_info_id);
CREATE INDEX IF NOT EXISTS idx_network_interface_parent ON network_interface(network_info_id);
CREATE INDEX IF NOT EXISTS idx_evtx_event_id ON evtx_event(event_id);
"#;

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
