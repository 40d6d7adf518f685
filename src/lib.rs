//! # rs-triage
//!
//! A cross-platform incident-response triage engine written in Rust.
//!
//! ## Overview
//!
//! rs-triage gathers security-relevant artifacts from Windows, macOS and
//! Linux hosts (login attempts, processes, network state, persistence
//! entries, shell history, patches, scheduled tasks, RDP sessions, local
//! accounts and sensitive file metadata), normalizes them into one record
//! model and persists them in a local SQLite database. Windows event log
//! files (.evtx) can be parsed on any platform.
//!
//! ## Usage
//!
//! ### Collecting artifacts
//!
//! ```no_run
//! use rust_triage::collectors::collect;
//! use rust_triage::config::TriageConfig;
//! use rust_triage::context::CollectionContext;
//! use rust_triage::models::ArtifactKind;
//!
//! let ctx = CollectionContext::new(TriageConfig::default());
//! let failures = collect(ArtifactKind::LoginFailed, &ctx);
//! println!("Collected {} failed logins", failures.len());
//! ```
//!
//! ### Parsing an event log
//!
//! ```no_run
//! use rust_triage::evtx::parse_file;
//! use rust_triage::store::Store;
//! use std::path::Path;
//!
//! # fn main() -> rust_triage::error::Result<()> {
//! let events = parse_file(Path::new("Security.evtx"))?;
//! let store = Store::open(Path::new("triage.db"))?;
//! store.save_evtx_events(&events)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Normalized artifact records
//! - [`collectors`]: Platform strategies and collection dispatch
//! - [`evtx`]: Windows event log extraction
//! - [`normalize`]: Timestamp normalization, marker extraction and deduplication
//! - [`store`]: SQLite persistence
//! - [`export`]: JSON export of record batches
//! - [`config`]: YAML configuration and per-platform source paths
//! - [`privileges`]: Elevation checks
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Normalized records shared by collectors, the store and the export sink
pub mod models;

/// Artifact collectors for every supported platform
pub mod collectors;

/// Explicit collection context
pub mod context;

/// Error taxonomy
pub mod error;

/// Windows event log (.evtx) extraction
pub mod evtx;

/// Export sinks for collected records
pub mod export;

/// Normalization helpers
pub mod normalize;

/// SQLite persistence store
pub mod store;

/// Utility functions for hashing
pub mod utils;

/// Configuration management and source locations
pub mod config;

/// Platform-specific privilege checks
pub mod privileges;

/// Application constants and configuration values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
