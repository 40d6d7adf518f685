//! Windows Event Log (.evtx) extraction.
//!
//! Opens an event log file read-only and turns every record into an
//! [`EvtxEvent`]. Records that fail to decode are skipped with a warning so one
//! damaged chunk does not hide the rest of the log.
//!
//! Each header field is resolved on its own through [`fields::resolve_system`]:
//! a canonical path first, then the tolerant lookup in the `System` map. A field
//! that resolves nowhere gets its default ("Unknown" or 0) and never fails the
//! record.

/// Field resolution with fallbacks
pub mod fields;

/// Description derivation and logon type annotation
pub mod description;

/// Copying inputs to a private staging area
pub mod staging;

/// Input path selection
pub mod provider;

use chrono::{DateTime, Local, Utc};
use evtx::EvtxParser;
use log::{debug, info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::{EVTX_EXTENSION, EVTX_MAGIC};
use crate::error::{Result, TriageError};
use crate::models::{EvtxEvent, SeverityLevel};
use crate::normalize::{format_timestamp, normalize_timestamp};

pub use description::{build_description, is_logon_event, logon_type_annotation};
pub use provider::{parse_selected, validate_selection, EvtxPathProvider, StaticPathProvider};
pub use staging::{stage_file, stage_file_in};

const CORRUPTED: &str = "invalid or corrupted event log file";

pub(crate) fn has_evtx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(EVTX_EXTENSION))
        .unwrap_or(false)
}

fn check_magic(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| TriageError::from_io(path.display().to_string(), e))?;
    let mut magic = [0u8; 8];
    if file.read_exact(&mut magic).is_err() || &magic != EVTX_MAGIC {
        return Err(TriageError::Format(CORRUPTED.to_string()));
    }
    Ok(())
}

/// Parse every record of an event log file
pub fn parse_file(path: &Path) -> Result<Vec<EvtxEvent>> {
    if !path.exists() {
        return Err(TriageError::NotFound(path.display().to_string()));
    }
    if !has_evtx_extension(path) {
        return Err(TriageError::Format(format!(
            "{} is not an .{} file",
            path.display(),
            EVTX_EXTENSION
        )));
    }

    check_magic(path)?;
    let mut parser = EvtxParser::from_path(path).map_err(|e| {
        let msg = e.to_string();
        if msg.to_lowercase().contains("header") {
            TriageError::Format(CORRUPTED.to_string())
        } else {
            TriageError::Format(format!("failed to open event log: {}", msg))
        }
    })?;

    info!("Parsing event log {}", path.display());
    let mut events = Vec::new();
    let mut skipped = 0usize;
    for record in parser.records_json_value() {
        match record {
            Ok(record) => events.push(normalize_record(
                record.event_record_id,
                Some(record.timestamp),
                &record.data,
            )),
            Err(e) => {
                skipped += 1;
                warn!("Skipping undecodable record in {}: {}", path.display(), e);
            }
        }
    }

    if skipped > 0 {
        warn!("{} record(s) skipped in {}", skipped, path.display());
    }
    debug!("Parsed {} records from {}", events.len(), path.display());
    Ok(events)
}

/// Build an event from one decoded record
pub fn normalize_record(record_id: u64, timestamp: Option<DateTime<Utc>>, data: &Value) -> EvtxEvent {
    let system = fields::resolve_system(data);
    let event_data = fields::event_data(data);
    let message = fields::message(data);

    let now = Local::now().naive_local();
    let time = match (timestamp, &system.time_created) {
        (Some(ts), _) => format_timestamp(&ts.with_timezone(&Local).naive_local()),
        (None, Some(raw)) => normalize_timestamp(raw, now),
        (None, None) => format_timestamp(&now),
    };

    let description = build_description(system.event_id, &system.provider, &event_data, &message);

    EvtxEvent {
        time,
        event_id: system.event_id,
        event_record_id: record_id,
        level: system
            .level
            .map(SeverityLevel::from_level)
            .unwrap_or(SeverityLevel::Unknown),
        provider: system.provider,
        channel: system.channel,
        computer: system.computer,
        user_id: system.user_id,
        version: system.version,
        qualifiers: system.qualifiers,
        task: system.task,
        opcode: system.opcode,
        keywords: system.keywords,
        process_id: system.process_id,
        thread_id: system.thread_id,
        message,
        description,
        system: fields::system_data(data),
        event_data,
        user_data: fields::user_data(data),
    }
}
