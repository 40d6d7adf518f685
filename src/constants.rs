//! Global constants for the rust_triage application.
//!
//! This module centralizes hardcoded values: record formats, default source
//! locations and the markers used to scrape free-text logs.

/// Application directory name used for temp staging and default paths
pub const APP_NAME: &str = "rust_triage";

/// Canonical textual timestamp for every record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Execution bounds
/// Default time budget for one external command
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Poll interval while waiting on a child process
pub const COMMAND_POLL_INTERVAL_MS: u64 = 25;

/// Default log query window in hours
pub const DEFAULT_LOOKBACK_HOURS: u64 = 24;

/// Executables above this size are not hashed
pub const DEFAULT_MAX_HASH_SIZE_MB: u64 = 64;

/// Interval between the two CPU samples of a usage reading
pub const CPU_SAMPLE_INTERVAL_MS: u64 = 250;

/// Buffer size for hashing (1MB)
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

// Free-text markers
pub const MARKER_FOR_USER: &str = "for user";
pub const MARKER_USER_COLON: &str = "user:";
pub const MARKER_REASON: &str = "reason:";
pub const MARKER_SOURCE_ADDRESS: &str = "Source Network Address:";
pub const MARKER_ACCOUNT_NAME: &str = "Account Name:";
pub const MARKER_FAILURE_REASON: &str = "Failure Reason:";
pub const MARKER_LOGON_TYPE: &str = "Logon Type:";

/// Placeholder address for attempts with no remote origin
pub const LOCAL_ADDRESS: &str = "local";

/// Placeholder for fields that could not be resolved
pub const UNKNOWN: &str = "Unknown";

// Windows event ids
pub const EVENT_LOGON_SUCCESS: u32 = 4624;
pub const EVENT_LOGON_FAILURE: u32 = 4625;
pub const EVENT_LOGOFF_INITIATED: u32 = 4647;
pub const EVENT_EXPLICIT_CREDENTIALS: u32 = 4648;

/// EVTX file header magic
pub const EVTX_MAGIC: &[u8; 8] = b"ElfFile\0";

/// Expected EVTX file extension
pub const EVTX_EXTENSION: &str = "evtx";

/// Event data keys left out of derived descriptions
pub const EVTX_SUBJECT_FIELDS: [&str; 3] = ["SubjectUserSid", "SubjectUserName", "SubjectDomainName"];

/// Unified log predicates consulted for failed logins on macOS
pub const MACOS_LOGIN_FAILURE_PREDICATES: [&str; 7] = [
    "process == \"loginwindow\" AND eventMessage CONTAINS[c] \"failed\"",
    "process == \"authd\" AND eventMessage CONTAINS[c] \"failed\"",
    "process == \"sshd\" AND eventMessage CONTAINS[c] \"failed\"",
    "process == \"sudo\" AND eventMessage CONTAINS[c] \"incorrect password\"",
    "process == \"screensharingd\" AND eventMessage CONTAINS[c] \"authentication\"",
    "subsystem == \"com.apple.opendirectoryd\" AND eventMessage CONTAINS[c] \"authentication failed\"",
    "process == \"SecurityAgent\" AND eventMessage CONTAINS[c] \"failed\"",
];

/// Registry locations of per-machine and per-user Run entries
pub const WINDOWS_RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Channel file holding RDP session events
pub const WINDOWS_RDP_EVTX: &str = "Microsoft-Windows-TerminalServices-LocalSessionManager%4Operational.evtx";

#[cfg(test)]
pub mod test {
    //! Constants used only in tests

    /// Fixed collection instant used by collector tests
    pub const TEST_NOW: &str = "2024-10-14 12:00:00";

    pub const TEST_USER: &str = "analyst";

    pub const TEST_HOST: &str = "triage-host";
}
