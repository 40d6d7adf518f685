//! Per-source failure tracking and reporting
//!
//! Collectors never abort on a failing source. The failure is recorded here,
//! logged as "no data available" and collection moves on to the next source.
//! Permission failures are summarized at the end with elevation guidance.

use log::warn;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TriageError};

#[derive(Debug, Default)]
struct TrackerState {
    failures: BTreeMap<String, String>,
    permission_denied: BTreeMap<String, String>,
}

/// Tracks sources that contributed nothing because they failed
#[derive(Debug, Clone, Default)]
pub struct SourceTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl SourceTracker {
    /// Create a new source tracker
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Unwrap a source's result, turning a failure into an empty contribution
    pub fn absorb<T>(&self, source: &str, result: Result<Vec<T>>) -> Vec<T> {
        match result {
            Ok(records) => records,
            Err(err) => {
                self.record_failure(source, &err);
                Vec::new()
            }
        }
    }

    /// Record a failed source
    pub fn record_failure(&self, source: &str, err: &TriageError) {
        warn!("No data available for source {}: {}", source, err);
        let mut state = self.state();
        state.failures.insert(source.to_string(), err.to_string());
        if err.is_permission() || Self::is_permission_error(&err.to_string()) {
            state
                .permission_denied
                .insert(source.to_string(), err.to_string());
        }
    }

    /// Check if an error message indicates a permission problem
    pub fn is_permission_error(error_msg: &str) -> bool {
        error_msg.contains("Permission denied")
            || error_msg.contains("permission denied")
            || error_msg.contains("PermissionDenied")
            || error_msg.contains("Access is denied")
            || error_msg.contains("elevated privileges")
    }

    /// Number of sources that failed for any reason
    pub fn failure_count(&self) -> usize {
        self.state().failures.len()
    }

    /// Number of sources that failed for lack of privileges
    pub fn permission_failure_count(&self) -> usize {
        self.state().permission_denied.len()
    }

    /// Names of the failed sources, sorted
    pub fn failed_sources(&self) -> Vec<String> {
        self.state().failures.keys().cloned().collect()
    }

    /// Report permission failures and provide guidance
    pub fn report_failures(&self) {
        let state = self.state();

        if state.permission_denied.is_empty() {
            return;
        }

        warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        warn!("Permission Issues Summary");
        warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        warn!(
            "The following {} source(s) could not be read due to insufficient permissions:",
            state.permission_denied.len()
        );

        for (source, reason) in state.permission_denied.iter() {
            warn!("  • {} ({})", source, reason);
        }

        warn!("");
        warn!("To collect these sources: {}", crate::privileges::get_elevation_instructions());

        #[cfg(target_os = "linux")]
        warn!("  Alternatively add your user to the 'adm' group for log access: sudo usermod -a -G adm $USER");

        #[cfg(target_os = "macos")]
        warn!("  Unified log and protected files also need Full Disk Access in System Settings > Privacy & Security");

        warn!("Note: Collection continued for accessible sources.");
    }
}
