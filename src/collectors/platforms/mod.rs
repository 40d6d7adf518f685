//! Platform strategies.
//!
//! Every supported OS implements [`PlatformStrategy`]; the registry maps a
//! [`Platform`] to its strategy. Strategies compile on every host so a
//! context can simulate any platform, but OS-only facilities (WMI, the
//! registry) report `PlatformUnsupported` off their home platform.

pub mod common;
pub mod linux;
pub mod macos;
pub mod windows;

use lazy_static::lazy_static;
use log::info;
use std::fmt;
use std::path::Path;

use crate::collectors::files::OwnerNames;
use crate::config::sources::WatchedFile;
use crate::context::CollectionContext;
use crate::models::{
    CronEntry, LoginEvent, NetworkConnection, NetworkSnapshot, PatchRecord, ProcessSnapshot, RdpSession,
    SensitiveFile, ShellCommand, StartupItem, SystemSnapshot, UserAccount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    Unsupported,
}

impl Platform {
    /// Platform named by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => Platform::Unsupported,
        }
    }

    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "Linux",
            Platform::MacOS => "macOS",
            Platform::Windows => "Windows",
            Platform::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

lazy_static! {
    static ref HOST_PLATFORM: Platform = Platform::detect();
}

/// Host platform, resolved once per process
pub fn host_platform() -> Platform {
    *HOST_PLATFORM
}

/// One method per artifact kind; each returns what every consulted source
/// contributed. Shared sources come as default methods.
pub trait PlatformStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    fn login_failures(&self, ctx: &CollectionContext) -> Vec<LoginEvent>;

    fn login_successes(&self, ctx: &CollectionContext) -> Vec<LoginEvent>;

    /// Signer of an executable, empty when unknown
    fn process_signature(&self, _ctx: &CollectionContext, _exe: &Path) -> String {
        String::new()
    }

    fn processes(&self, ctx: &CollectionContext) -> Vec<ProcessSnapshot> {
        common::processes(ctx, &|exe| self.process_signature(ctx, exe))
    }

    fn network_info(&self, ctx: &CollectionContext) -> Vec<NetworkSnapshot>;

    fn network_connections(&self, ctx: &CollectionContext) -> Vec<NetworkConnection>;

    fn startup_items(&self, ctx: &CollectionContext) -> Vec<StartupItem>;

    fn shell_history(&self, ctx: &CollectionContext) -> Vec<ShellCommand> {
        common::unix_shell_history(ctx)
    }

    fn patches(&self, ctx: &CollectionContext) -> Vec<PatchRecord>;

    fn scheduled_tasks(&self, ctx: &CollectionContext) -> Vec<CronEntry>;

    fn rdp_sessions(&self, ctx: &CollectionContext) -> Vec<RdpSession>;

    fn system_info(&self, ctx: &CollectionContext) -> Vec<SystemSnapshot> {
        common::system_snapshot(ctx)
    }

    fn user_accounts(&self, ctx: &CollectionContext) -> Vec<UserAccount>;

    /// Built-in watched file table
    fn default_sensitive_files(&self) -> Vec<WatchedFile>;

    fn owner_names(&self, _ctx: &CollectionContext) -> OwnerNames {
        OwnerNames::default()
    }

    fn sensitive_files(&self, ctx: &CollectionContext) -> Vec<SensitiveFile> {
        common::sensitive_files(ctx, self.default_sensitive_files(), &self.owner_names(ctx))
    }
}

static LINUX: linux::LinuxStrategy = linux::LinuxStrategy;
static MACOS: macos::MacStrategy = macos::MacStrategy;
static WINDOWS: windows::WindowsStrategy = windows::WindowsStrategy;

/// Strategy for a platform; `None` for unsupported ones
pub fn strategy_for(platform: Platform) -> Option<&'static dyn PlatformStrategy> {
    let strategy: &'static dyn PlatformStrategy = match platform {
        Platform::Linux => &LINUX,
        Platform::MacOS => &MACOS,
        Platform::Windows => &WINDOWS,
        Platform::Unsupported => {
            info!("No collection strategy for this platform");
            return None;
        }
    };
    Some(strategy)
}
