//! Artifact collection.
//!
//! [`collect`] dispatches one artifact kind to the strategy of the context's
//! platform and wraps what it gathered into [`ArtifactRecord`]s. Collection
//! never fails as a whole: a source that cannot be read contributes nothing
//! and is remembered by the context's [`source_tracker::SourceTracker`].
//!
//! ```text
//! CollectionContext ──► collect(kind) ──► PlatformStrategy ──► sources
//!                                              │                 ├─ files
//!                                              │                 ├─ commands
//!                                              │                 └─ sysinfo / procfs / WMI
//!                                              ▼
//!                                     Vec<ArtifactRecord> ──► Store / JSON sink
//! ```

/// External command adapter
pub mod command;

/// File and directory backed sources
pub mod files;

/// sysinfo host view
pub mod host;

/// Pure parsers for every text source format
pub mod parsers;

/// Platform strategies and their registry
pub mod platforms;

/// Process snapshot enrichment
pub mod process;

/// Per-source failure tracking
pub mod source_tracker;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::context::CollectionContext;
use crate::error::{Result, TriageError};
use crate::models::{ArtifactKind, ArtifactRecord};
use crate::store::Store;
use platforms::{strategy_for, PlatformStrategy};

fn wrap<T>(records: Vec<T>, variant: fn(T) -> ArtifactRecord) -> Vec<ArtifactRecord> {
    records.into_iter().map(variant).collect()
}

fn collect_with(strategy: &dyn PlatformStrategy, kind: ArtifactKind, ctx: &CollectionContext) -> Vec<ArtifactRecord> {
    match kind {
        ArtifactKind::LoginFailed => wrap(strategy.login_failures(ctx), ArtifactRecord::Login),
        ArtifactKind::LoginSuccess => wrap(strategy.login_successes(ctx), ArtifactRecord::Login),
        ArtifactKind::Process => wrap(strategy.processes(ctx), ArtifactRecord::Process),
        ArtifactKind::NetworkInfo => wrap(strategy.network_info(ctx), ArtifactRecord::Network),
        ArtifactKind::NetworkConnection => wrap(strategy.network_connections(ctx), ArtifactRecord::Connection),
        ArtifactKind::Startup => wrap(strategy.startup_items(ctx), ArtifactRecord::Startup),
        ArtifactKind::ShellHistory => wrap(strategy.shell_history(ctx), ArtifactRecord::Shell),
        ArtifactKind::Patch => wrap(strategy.patches(ctx), ArtifactRecord::Patch),
        ArtifactKind::ScheduledTask => wrap(strategy.scheduled_tasks(ctx), ArtifactRecord::Cron),
        ArtifactKind::Rdp => wrap(strategy.rdp_sessions(ctx), ArtifactRecord::Rdp),
        ArtifactKind::SystemInfo => wrap(strategy.system_info(ctx), ArtifactRecord::System),
        ArtifactKind::UserAccount => wrap(strategy.user_accounts(ctx), ArtifactRecord::User),
        ArtifactKind::FileMonitor => wrap(strategy.sensitive_files(ctx), ArtifactRecord::File),
    }
}

/// Collect one artifact kind on the context's platform.
///
/// Unsupported platforms and cancelled contexts give an empty batch.
pub fn collect(kind: ArtifactKind, ctx: &CollectionContext) -> Vec<ArtifactRecord> {
    if ctx.is_cancelled() {
        debug!("Collection cancelled before {}", kind);
        return Vec::new();
    }
    let records = match strategy_for(ctx.platform) {
        Some(strategy) => collect_with(strategy, kind, ctx),
        None => Vec::new(),
    };
    if records.is_empty() {
        info!("No {} records collected", kind);
    } else {
        info!("Collected {} {} records", records.len(), kind);
    }
    records
}

/// Collect several kinds concurrently; batches keep the order of `kinds`
pub fn collect_kinds(kinds: &[ArtifactKind], ctx: &CollectionContext) -> Vec<(ArtifactKind, Vec<ArtifactRecord>)> {
    kinds.par_iter().map(|&kind| (kind, collect(kind, ctx))).collect()
}

/// Persist collected batches in order, one transaction per batch.
///
/// Stops at the first failing batch; the batches saved before it stay
/// committed. Returns the total number of rows written.
pub fn store_batches(store: &Store, batches: &[(ArtifactKind, Vec<ArtifactRecord>)]) -> Result<usize> {
    let mut total = 0;
    for (index, (kind, records)) in batches.iter().enumerate() {
        match store.save_records(records) {
            Ok(rows) => {
                debug!("Stored {} rows for {}", rows, kind);
                total += rows;
            }
            Err(e) => {
                let pending: usize = batches[index..].iter().map(|(_, r)| r.len()).sum();
                warn!(
                    "Storing {} records failed after {} of {} batches ({} rows saved, {} records not saved): {}",
                    kind,
                    index,
                    batches.len(),
                    total,
                    pending,
                    e
                );
                return Err(e);
            }
        }
    }
    Ok(total)
}

/// Collect and persist each kind's batch through the context's store
pub fn collect_and_store(
    kinds: &[ArtifactKind],
    ctx: &CollectionContext,
) -> Result<Vec<(ArtifactKind, Vec<ArtifactRecord>)>> {
    let store = ctx
        .store
        .as_ref()
        .ok_or_else(|| TriageError::Config("no store attached to the collection context".to_string()))?;

    let batches = collect_kinds(kinds, ctx);
    store_batches(store, &batches)?;
    Ok(batches)
}
