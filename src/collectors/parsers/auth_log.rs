//! sshd / PAM / login(1) lines from syslog-style authentication logs.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::constants::{LOCAL_ADDRESS, EVENT_LOGON_FAILURE, EVENT_LOGON_SUCCESS};
use crate::models::{LoginEvent, LoginOutcome, RdpSession};
use crate::normalize::{
    dedup_by_key, extract_token_after, format_timestamp, normalize_timestamp, parse_timestamp,
};

lazy_static! {
    static ref SYSLOG_LINE: Regex = Regex::new(
        r"^(?P<ts>[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}|\d{4}-\d{2}-\d{2}T\S+)\s+(?P<host>\S+)\s+(?P<tag>[^\s:]+):\s?(?P<msg>.*)$"
    )
    .unwrap();
    static ref FAILED_AUTH: Regex = Regex::new(
        r"Failed (?P<method>\S+) for (?:invalid user )?(?P<user>\S+) from (?P<ip>[0-9A-Fa-f.:]+)"
    )
    .unwrap();
    static ref INVALID_USER: Regex =
        Regex::new(r"Invalid user (?P<user>\S*) from (?P<ip>[0-9A-Fa-f.:]+)").unwrap();
    static ref FAILED_LOGIN: Regex = Regex::new(r"FAILED LOGIN .*FOR '(?P<user>[^']*)'").unwrap();
    static ref ACCEPTED: Regex =
        Regex::new(r"Accepted (?P<method>\S+) for (?P<user>\S+) from (?P<ip>[0-9A-Fa-f.:]+)").unwrap();
    static ref RDP_LINE: Regex = Regex::new(r"(?i)(xrdp|rdp|RemoteDesktop)").unwrap();
    static ref RDP_TIME: Regex = Regex::new(r"(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})").unwrap();
    static ref RDP_USER: Regex = Regex::new(r"user\s+(\w+)").unwrap();
    static ref RDP_IP: Regex = Regex::new(r"from\s+([\d\.]+)").unwrap();
}

/// One syslog record split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct SyslogLine<'a> {
    pub timestamp: &'a str,
    pub host: &'a str,
    /// Program tag without the pid, e.g. `sshd`
    pub program: &'a str,
    pub message: &'a str,
}

pub fn parse_syslog_line(line: &str) -> Option<SyslogLine<'_>> {
    let caps = SYSLOG_LINE.captures(line)?;
    let tag = caps.name("tag")?.as_str();
    Some(SyslogLine {
        timestamp: caps.name("ts")?.as_str(),
        host: caps.name("host")?.as_str(),
        program: tag.split('[').next().unwrap_or(tag),
        message: caps.name("msg")?.as_str(),
    })
}

fn address_or_local(ip: Option<&str>) -> String {
    match ip.map(str::trim) {
        Some(ip) if !ip.is_empty() && ip != "-" => ip.to_string(),
        _ => LOCAL_ADDRESS.to_string(),
    }
}

fn failure(time: String, event_type: &str, source: &str, user: &str, ip: Option<&str>, reason: &str) -> LoginEvent {
    LoginEvent {
        time,
        event_id: EVENT_LOGON_FAILURE.to_string(),
        outcome: LoginOutcome::Failure,
        event_type: event_type.to_string(),
        source: source.to_string(),
        username: user.to_string(),
        ip_address: address_or_local(ip),
        reason: Some(reason.to_string()),
    }
}

fn classify_failure(time: String, line: &SyslogLine<'_>, source: &str) -> Option<LoginEvent> {
    let msg = line.message;
    if let Some(caps) = FAILED_AUTH.captures(msg) {
        let method = &caps["method"];
        return Some(failure(
            time,
            &format!("{} {}", line.program, method),
            source,
            &caps["user"],
            Some(&caps["ip"]),
            &format!("Failed {}", method),
        ));
    }
    if let Some(caps) = INVALID_USER.captures(msg) {
        return Some(failure(time, "invalid user", source, &caps["user"], Some(&caps["ip"]), "Invalid user"));
    }
    if let Some(caps) = FAILED_LOGIN.captures(msg) {
        return Some(failure(time, "console login", source, &caps["user"], None, "FAILED LOGIN"));
    }
    if msg.contains("authentication failure") {
        let user = extract_token_after(msg, " user=").unwrap_or_default();
        let ip = extract_token_after(msg, "rhost=");
        return Some(failure(
            time,
            &format!("{} pam", line.program),
            source,
            &user,
            ip.as_deref(),
            "authentication failure",
        ));
    }
    None
}

/// Failed logins in an authentication log, deduplicated on (time, user)
pub fn parse_auth_failures(content: &str, source: &str, now: NaiveDateTime) -> Vec<LoginEvent> {
    let events = content.lines().filter_map(|raw| {
        let line = parse_syslog_line(raw)?;
        classify_failure(normalize_timestamp(line.timestamp, now), &line, source)
    });
    dedup_by_key(events, |e| (e.time.clone(), e.username.clone()))
}

/// Accepted logins in an authentication log
pub fn parse_auth_successes(content: &str, source: &str, now: NaiveDateTime) -> Vec<LoginEvent> {
    content
        .lines()
        .filter_map(|raw| {
            let line = parse_syslog_line(raw)?;
            let caps = ACCEPTED.captures(line.message)?;
            Some(LoginEvent {
                time: normalize_timestamp(line.timestamp, now),
                event_id: EVENT_LOGON_SUCCESS.to_string(),
                outcome: LoginOutcome::Success,
                event_type: format!("{} {}", line.program, &caps["method"]),
                source: source.to_string(),
                username: caps["user"].to_string(),
                ip_address: address_or_local(Some(&caps["ip"])),
                reason: None,
            })
        })
        .collect()
}

/// Time of an RDP text line: the syslog prefix, else any embedded
/// `Mon dd HH:MM:SS` stamp, else `now`
fn rdp_line_time(line: &str, now: NaiveDateTime) -> String {
    let raw = parse_syslog_line(line)
        .map(|l| l.timestamp)
        .or_else(|| RDP_TIME.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str()));
    let parsed = raw.and_then(|raw| parse_timestamp(raw, now)).unwrap_or(now);
    format_timestamp(&parsed)
}

/// RDP-related lines of a text log
pub fn parse_rdp_lines(content: &str, now: NaiveDateTime) -> Vec<RdpSession> {
    content
        .lines()
        .filter(|line| RDP_LINE.is_match(line))
        .map(|line| {
            let time = rdp_line_time(line, now);
            let username = RDP_USER
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let ip = RDP_IP
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let lowered = line.to_lowercase();
            let status = if ["successful", "accepted", "connected"]
                .iter()
                .any(|word| lowered.contains(word))
            {
                "Success"
            } else {
                "Failure"
            };
            RdpSession {
                description: format!("User {} attempted login from {}", username, ip),
                time,
                username,
                ip,
                status: status.to_string(),
            }
        })
        .collect()
}
