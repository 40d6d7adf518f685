//! macOS `log show --style json` entries and `last` output.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::constants::{
    EVENT_LOGON_FAILURE, LOCAL_ADDRESS, MARKER_FOR_USER, MARKER_REASON, MARKER_USER_COLON,
};
use crate::error::Result;
use crate::models::{LoginEvent, LoginOutcome};
use crate::normalize::{extract_after, extract_token_after, normalize_timestamp};

lazy_static! {
    static ref LAST_LINE: Regex = Regex::new(
        r"^(?P<user>\S+)\s+(?P<tty>\S+)\s+(?:(?P<host>\S+)\s+)?(?P<ts>(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2})(?P<rest>.*)$"
    )
    .unwrap();
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    event_message: String,
    #[serde(default)]
    process_image_path: String,
}

/// Failed login attempts in the JSON array printed by `log show`
pub fn parse_unified_failures(json: &str, now: NaiveDateTime) -> Result<Vec<LoginEvent>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<LogEntry> = serde_json::from_str(trimmed)?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let message = entry.event_message;
            let username = extract_token_after(&message, MARKER_FOR_USER)
                .or_else(|| extract_token_after(&message, MARKER_USER_COLON))
                .unwrap_or_else(|| "unknown".to_string());
            let reason = extract_after(&message, MARKER_REASON).unwrap_or_else(|| message.clone());
            let process = entry
                .process_image_path
                .rsplit('/')
                .next()
                .filter(|p| !p.is_empty())
                .unwrap_or("unified-log")
                .to_string();
            LoginEvent {
                time: normalize_timestamp(&entry.timestamp, now),
                event_id: EVENT_LOGON_FAILURE.to_string(),
                outcome: LoginOutcome::Failure,
                event_type: process,
                source: "unified-log".to_string(),
                username,
                ip_address: LOCAL_ADDRESS.to_string(),
                reason: Some(reason),
            }
        })
        .collect())
}

/// Login sessions listed by `last`
pub fn parse_last_output(output: &str, now: NaiveDateTime) -> Vec<LoginEvent> {
    output
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !(line.is_empty()
                || line.starts_with("wtmp")
                || line.starts_with("reboot")
                || line.starts_with("shutdown"))
        })
        .filter_map(|line| {
            let caps = LAST_LINE.captures(line)?;
            let status = if caps["rest"].contains("still logged in") {
                "Active session"
            } else {
                "Logged out"
            };
            let ip = caps
                .name("host")
                .map(|h| h.as_str())
                .filter(|h| !h.is_empty() && *h != ":0")
                .unwrap_or(LOCAL_ADDRESS);
            Some(LoginEvent {
                time: normalize_timestamp(&caps["ts"], now),
                event_id: "4624".to_string(),
                outcome: LoginOutcome::Success,
                event_type: status.to_string(),
                source: format!("/dev/{}", &caps["tty"]),
                username: caps["user"].to_string(),
                ip_address: ip.to_string(),
                reason: None,
            })
        })
        .collect()
}
