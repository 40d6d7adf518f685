//! WMI result rows and their conversion into records.
//!
//! The row types deserialize with the `wmi` crate on Windows; conversions are
//! plain functions so they are exercised on every platform.

use chrono::{Local, NaiveDateTime, Offset, TimeZone};
use serde::Deserialize;

use crate::constants::{
    LOCAL_ADDRESS, MARKER_ACCOUNT_NAME, MARKER_FAILURE_REASON, MARKER_LOGON_TYPE, MARKER_SOURCE_ADDRESS,
};
use crate::collectors::parsers::network::InterfaceAddr;
use crate::evtx::description::logon_type_annotation;
use crate::evtx::fields::display_value;
use crate::models::{EvtxEvent, LoginEvent, LoginOutcome, PatchRecord, RdpSession, UserAccount};
use crate::normalize::{extract_after, extract_last_after, extract_token_after, normalize_timestamp};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename = "Win32_NTLogEvent")]
#[serde(rename_all = "PascalCase")]
pub struct NtLogEvent {
    pub event_code: u16,
    #[serde(default)]
    pub time_generated: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub record_number: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename = "Win32_QuickFixEngineering")]
#[serde(rename_all = "PascalCase")]
pub struct QuickFix {
    #[serde(rename = "HotFixID", default)]
    pub hot_fix_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub installed_on: Option<String>,
    #[serde(default)]
    pub installed_by: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename = "Win32_UserAccount")]
#[serde(rename_all = "PascalCase")]
pub struct WmiUserAccount {
    pub name: String,
    #[serde(rename = "SID", default)]
    pub sid: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename = "Win32_NetworkAdapterConfiguration")]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAdapterConfig {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "MACAddress", default)]
    pub mac_address: Option<String>,
    #[serde(rename = "IPAddress", default)]
    pub ip_address: Option<Vec<String>>,
    #[serde(rename = "DefaultIPGateway", default)]
    pub default_ip_gateway: Option<Vec<String>>,
    #[serde(rename = "IPEnabled", default)]
    pub ip_enabled: bool,
}

/// CIM datetime for a local wall-clock time, for `TimeGenerated` filters
pub fn cim_datetime(local: NaiveDateTime) -> String {
    let minutes = Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.offset().fix().local_minus_utc() / 60)
        .unwrap_or(0);
    format!("{}.000000{:+04}", local.format("%Y%m%d%H%M%S"), minutes)
}

/// Security log logon record from an `NtLogEvent`
pub fn login_from_nt_event(event: &NtLogEvent, outcome: LoginOutcome, now: NaiveDateTime) -> LoginEvent {
    let message = event.message.as_deref().unwrap_or_default();
    let ip_address = match extract_after(message, MARKER_SOURCE_ADDRESS) {
        Some(ip) if ip != "-" => ip,
        _ => LOCAL_ADDRESS.to_string(),
    };
    let event_type = extract_token_after(message, MARKER_LOGON_TYPE)
        .map(|raw| logon_type_annotation(&raw))
        .unwrap_or_else(|| "Security".to_string());
    let reason = match outcome {
        LoginOutcome::Failure => extract_after(message, MARKER_FAILURE_REASON),
        LoginOutcome::Success => None,
    };
    LoginEvent {
        time: normalize_timestamp(&event.time_generated, now),
        event_id: event.event_code.to_string(),
        outcome,
        event_type,
        source: "Security".to_string(),
        username: extract_last_after(message, MARKER_ACCOUNT_NAME).unwrap_or_else(|| "unknown".to_string()),
        ip_address,
        reason,
    }
}

pub fn patch_from_quick_fix(fix: &QuickFix, now: NaiveDateTime) -> PatchRecord {
    PatchRecord {
        time: normalize_timestamp(fix.installed_on.as_deref().unwrap_or_default(), now),
        title: fix.description.clone().unwrap_or_default(),
        kb: fix.hot_fix_id.trim_start_matches("KB").to_string(),
        description: format!("Installed by: {}", fix.installed_by.as_deref().unwrap_or_default()),
        status: "Installed".to_string(),
    }
}

pub fn account_from_wmi(account: &WmiUserAccount, captured_at: &str) -> UserAccount {
    let full_name = account.full_name.clone().unwrap_or_default();
    UserAccount {
        username: match account.domain.as_deref() {
            Some(domain) if !domain.is_empty() => format!(r"{}\{}", domain, account.name),
            _ => account.name.clone(),
        },
        uid: account.sid.clone(),
        gid: "0".to_string(),
        full_name,
        home_dir: String::new(),
        shell: String::new(),
        captured_at: captured_at.to_string(),
    }
}

/// Address information of an IP-enabled adapter
pub fn interface_from_adapter(adapter: &NetworkAdapterConfig) -> Option<InterfaceAddr> {
    if !adapter.ip_enabled {
        return None;
    }
    let addresses = adapter.ip_address.as_deref().unwrap_or_default();
    let ip = addresses
        .iter()
        .find(|a| a.contains('.'))
        .or_else(|| addresses.first())
        .cloned()
        .unwrap_or_default();
    Some(InterfaceAddr {
        name: adapter.description.clone(),
        ip,
        mac: adapter.mac_address.clone().unwrap_or_default(),
    })
}

/// First default gateway configured on any adapter
pub fn gateway_from_adapters(adapters: &[NetworkAdapterConfig]) -> String {
    adapters
        .iter()
        .filter_map(|a| a.default_ip_gateway.as_ref())
        .flatten()
        .find(|g| !g.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// RDP session record from a LocalSessionManager event
pub fn rdp_session_from_event(event: &EvtxEvent) -> Option<RdpSession> {
    let (status, action) = match event.event_id {
        21 => ("Success", "Session logon succeeded"),
        23 => ("Logoff", "Session logoff succeeded"),
        24 => ("Disconnected", "Session has been disconnected"),
        25 => ("Success", "Session reconnection succeeded"),
        _ => return None,
    };
    let xml = event
        .user_data
        .get("EventXML")
        .and_then(|v| v.as_object())
        .unwrap_or(&event.user_data);
    let field = |name: &str| xml.get(name).map(display_value).filter(|v| !v.is_empty());

    let username = field("User").unwrap_or_else(|| "unknown".to_string());
    let ip = match field("Address") {
        Some(addr) if !addr.eq_ignore_ascii_case("LOCAL") => addr,
        _ => LOCAL_ADDRESS.to_string(),
    };
    let description = match field("SessionID") {
        Some(session) => format!("{} (session {})", action, session),
        None => action.to_string(),
    };
    Some(RdpSession {
        time: event.time.clone(),
        username,
        ip,
        status: status.to_string(),
        description,
    })
}
