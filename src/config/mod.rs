// Re-export all items from the submodules
mod env_vars;
pub mod sources;
mod triage_config;

pub use triage_config::{load_or_default, SourcePaths, TriageConfig};

pub use sources::{
    linux_sensitive_files, macos_sensitive_files, windows_sensitive_files, LinuxSources, MacSources,
    WatchedFile, WindowsSources,
};

pub use env_vars::{expand_env_vars, expand_with};
