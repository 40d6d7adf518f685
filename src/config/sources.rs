//! Default source locations per platform.
//!
//! Home-relative locations (shell history, per-user autostart) are resolved
//! against the collection context and are not listed here.

use serde::{Deserialize, Serialize};

/// A file watched by the sensitive file monitor
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WatchedFile {
    pub path: String,
    pub description: String,
}

impl WatchedFile {
    pub fn new(path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            description: description.to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LinuxSources {
    /// Authentication logs scanned for logins and RDP lines
    pub auth_logs: Vec<String>,
    /// Query journald when none of the auth logs is readable
    pub journal_fallback: bool,
    pub apt_history: String,
    pub dnf_history: String,
    pub passwd: String,
    pub crontabs: Vec<String>,
    pub cron_dirs: Vec<String>,
    pub autostart_dirs: Vec<String>,
    pub systemd_unit_dirs: Vec<String>,
    /// procfs mount, read for socket tables and their owners
    pub proc_dir: String,
}

impl Default for LinuxSources {
    fn default() -> Self {
        Self {
            auth_logs: strings(&["/var/log/auth.log", "/var/log/secure"]),
            journal_fallback: true,
            apt_history: "/var/log/apt/history.log".to_string(),
            dnf_history: "/var/log/dnf.rpm.log".to_string(),
            passwd: "/etc/passwd".to_string(),
            crontabs: strings(&["/etc/crontab"]),
            cron_dirs: strings(&["/etc/cron.d"]),
            autostart_dirs: strings(&["/etc/xdg/autostart"]),
            systemd_unit_dirs: strings(&["/etc/systemd/system"]),
            proc_dir: "/proc".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MacSources {
    pub rdp_logs: Vec<String>,
    pub passwd: String,
    pub crontabs: Vec<String>,
    pub launch_dirs: Vec<String>,
}

impl Default for MacSources {
    fn default() -> Self {
        Self {
            rdp_logs: strings(&["/var/log/system.log", "/var/log/asl.log"]),
            passwd: "/etc/passwd".to_string(),
            crontabs: strings(&["/etc/crontab"]),
            launch_dirs: strings(&["/Library/LaunchAgents", "/Library/LaunchDaemons"]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowsSources {
    /// Directory holding the live .evtx channel files
    pub event_log_dir: String,
    /// All-users startup folders
    pub startup_dirs: Vec<String>,
}

impl Default for WindowsSources {
    fn default() -> Self {
        Self {
            event_log_dir: r"%SystemRoot%\System32\winevt\Logs".to_string(),
            startup_dirs: strings(&[r"%ProgramData%\Microsoft\Windows\Start Menu\Programs\StartUp"]),
        }
    }
}

/// Built-in sensitive file table for Linux
pub fn linux_sensitive_files() -> Vec<WatchedFile> {
    vec![
        WatchedFile::new("/etc/passwd", "Local user accounts"),
        WatchedFile::new("/etc/shadow", "Password hashes"),
        WatchedFile::new("/etc/group", "Group definitions"),
        WatchedFile::new("/etc/sudoers", "Sudo privileges"),
        WatchedFile::new("/etc/hosts", "Static host resolution"),
        WatchedFile::new("/etc/resolv.conf", "DNS resolvers"),
        WatchedFile::new("/etc/ssh/sshd_config", "SSH daemon configuration"),
        WatchedFile::new("/etc/crontab", "System crontab"),
        WatchedFile::new("/etc/ld.so.preload", "Preloaded shared libraries"),
        WatchedFile::new("/etc/rc.local", "Boot-time script"),
        WatchedFile::new("/root/.ssh/authorized_keys", "Root SSH authorized keys"),
        WatchedFile::new("/root/.bashrc", "Root shell startup script"),
    ]
}

/// Built-in sensitive file table for macOS
pub fn macos_sensitive_files() -> Vec<WatchedFile> {
    vec![
        WatchedFile::new("/etc/passwd", "Local user accounts"),
        WatchedFile::new("/etc/sudoers", "Sudo privileges"),
        WatchedFile::new("/etc/hosts", "Static host resolution"),
        WatchedFile::new("/etc/ssh/sshd_config", "SSH daemon configuration"),
        WatchedFile::new("/etc/pam.d/sudo", "PAM policy for sudo"),
        WatchedFile::new("/etc/periodic", "Periodic maintenance scripts"),
        WatchedFile::new("/Library/Preferences/com.apple.loginwindow.plist", "Login window settings and hooks"),
        WatchedFile::new("/var/root/.ssh/authorized_keys", "Root SSH authorized keys"),
        WatchedFile::new("/private/var/db/dslocal/nodes/Default/users", "Local directory service users"),
    ]
}

/// Built-in sensitive file table for Windows
pub fn windows_sensitive_files() -> Vec<WatchedFile> {
    vec![
        WatchedFile::new(r"C:\Windows\System32\drivers\etc\hosts", "Static host resolution"),
        WatchedFile::new(r"C:\Windows\System32\config\SAM", "Security Account Manager hive"),
        WatchedFile::new(r"C:\Windows\System32\config\SYSTEM", "System registry hive"),
        WatchedFile::new(r"C:\Windows\System32\config\SECURITY", "Security registry hive"),
        WatchedFile::new(r"C:\Windows\System32\config\SOFTWARE", "Software registry hive"),
        WatchedFile::new(r"C:\Windows\System32\GroupPolicy", "Local group policy"),
        WatchedFile::new(r"C:\Windows\System32\Tasks", "Scheduled task definitions"),
        WatchedFile::new(r"C:\Windows\System32\winevt\Logs\Security.evtx", "Security event log"),
    ]
}
