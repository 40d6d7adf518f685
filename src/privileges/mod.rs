//! Elevation checks.
//!
//! Several sources (security logs, `/etc/shadow` metadata, other users'
//! histories) need elevated privileges. Collection still runs without them;
//! the affected sources are reported by the source tracker.

#[cfg(windows)]
mod windows;

#[cfg(unix)]
mod unix;

use log::{info, warn};

/// Check if the process is running with elevated privileges
pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        windows::is_admin()
    }
    #[cfg(unix)]
    {
        unix::is_root()
    }
    #[cfg(not(any(windows, unix)))]
    {
        false
    }
}

/// Get instructions for elevating privileges on the current platform
pub fn get_elevation_instructions() -> &'static str {
    #[cfg(windows)]
    {
        "Run as Administrator by right-clicking the terminal and selecting 'Run as administrator', then start rs-triage"
    }
    #[cfg(unix)]
    {
        "Run with sudo: 'sudo rs-triage collect'"
    }
    #[cfg(not(any(windows, unix)))]
    {
        "Run with elevated privileges appropriate for your operating system"
    }
}

/// Log the elevation state; false when collection should not start
pub fn check_elevation(force: bool) -> bool {
    if is_elevated() {
        info!("Running with elevated privileges");
        return true;
    }
    warn!("Not running with elevated privileges; protected sources will report no data");
    warn!("{}", get_elevation_instructions());
    if force {
        warn!("Continuing without elevation (--force)");
    }
    force
}
