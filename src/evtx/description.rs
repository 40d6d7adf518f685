use serde_json::{Map, Value};

use crate::constants::{
    EVENT_EXPLICIT_CREDENTIALS, EVENT_LOGOFF_INITIATED, EVENT_LOGON_FAILURE, EVENT_LOGON_SUCCESS,
    EVTX_SUBJECT_FIELDS,
};
use crate::evtx::fields::display_value;

/// True for the interactive-logon success and failure families
pub fn is_logon_event(event_id: u32) -> bool {
    matches!(
        event_id,
        EVENT_LOGON_SUCCESS | EVENT_EXPLICIT_CREDENTIALS | EVENT_LOGON_FAILURE | EVENT_LOGOFF_INITIATED
    )
}

/// Human-readable name of a Windows logon type
pub fn logon_type_annotation(raw: &str) -> String {
    let name = match raw.trim() {
        "2" => "Local interactive",
        "3" => "Network",
        "4" => "Batch",
        "5" => "Service",
        "7" => "Workstation unlock",
        "8" => "Network cleartext",
        "9" => "New-credentials",
        "10" => "Remote interactive (RDP)",
        "11" => "Cached interactive",
        other => return format!("Unknown({})", other),
    };
    name.to_string()
}

/// Derive the description line block of an event.
///
/// Layout: id and provider, the logon type for logon events, every event
/// data pair except the subject identity fields, then the message.
pub fn build_description(
    event_id: u32,
    provider: &str,
    event_data: &Map<String, Value>,
    message: &str,
) -> String {
    let mut lines = vec![format!("Event ID: {}, Provider: {}", event_id, provider)];

    if is_logon_event(event_id) {
        if let Some(logon_type) = event_data.get("LogonType") {
            lines.push(format!(
                "Logon type: {}",
                logon_type_annotation(&display_value(logon_type))
            ));
        }
    }

    for (key, value) in event_data {
        if EVTX_SUBJECT_FIELDS.contains(&key.as_str()) || key == "Message" {
            continue;
        }
        lines.push(format!("{}: {}", key, display_value(value)));
    }

    if !message.is_empty() {
        lines.push(format!("Message: {}", message));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn data(pairs: Value) -> Map<String, Value> {
        pairs.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_rdp_failure_description() {
        let event_data = data(json!({
            "SubjectUserSid": "S-1-0-0",
            "SubjectUserName": "-",
            "SubjectDomainName": "-",
            "TargetUserName": "bob",
            "LogonType": 10,
            "IpAddress": "203.0.113.9"
        }));
        let description = build_description(4625, "Microsoft-Windows-Security-Auditing", &event_data, "");

        assert!(description.starts_with("Event ID: 4625, Provider: Microsoft-Windows-Security-Auditing"));
        assert!(description.contains("Logon type: Remote interactive (RDP)"));
        assert!(description.contains("TargetUserName: bob"));
        assert!(description.contains("IpAddress: 203.0.113.9"));
        assert!(!description.contains("SubjectUserSid"));
        assert!(!description.contains("SubjectDomainName"));
        assert!(!description.contains("Message:"));
    }

    #[test]
    fn test_non_logon_event_has_no_logon_line() {
        let event_data = data(json!({"LogonType": "3", "ServiceName": "evil"}));
        let description = build_description(7045, "Service Control Manager", &event_data, "A service was installed");
        assert!(!description.contains("Logon type:"));
        assert!(description.contains("ServiceName: evil"));
        assert!(description.ends_with("Message: A service was installed"));
    }

    #[test]
    fn test_unknown_logon_type() {
        assert_eq!(logon_type_annotation("13"), "Unknown(13)");
        assert_eq!(logon_type_annotation(""), "Unknown()");
    }

    proptest! {
        #[test]
        fn prop_known_logon_types_annotated(
            event_id in prop_oneof![Just(4624u32), Just(4648u32)],
            logon_type in prop_oneof![
                Just(2u32), Just(3u32), Just(4u32), Just(5u32), Just(7u32),
                Just(8u32), Just(9u32), Just(10u32), Just(11u32)
            ],
        ) {
            let expected = match logon_type {
                2 => "Local interactive",
                3 => "Network",
                4 => "Batch",
                5 => "Service",
                7 => "Workstation unlock",
                8 => "Network cleartext",
                9 => "New-credentials",
                10 => "Remote interactive (RDP)",
                _ => "Cached interactive",
            };
            let event_data = data(json!({"LogonType": logon_type}));
            let description = build_description(event_id, "p", &event_data, "");
            let expected_line = format!("Logon type: {}", expected);
            prop_assert!(description.contains(&expected_line));
        }
    }
}
