//! Field resolution over the JSON form of an event record.
//!
//! Every field is looked up at its canonical path first. When that fails the
//! same field is searched for in the record's `System` map, tolerating the
//! attribute spellings different exporters produce (`#attributes`, `@Name`,
//! `<Field>_attributes`, `#text` wrapped values, numbers stored as text).

use serde_json::{Map, Value};

use crate::constants::UNKNOWN;

/// System header fields of one record
#[derive(Debug, Clone, PartialEq)]
pub struct SystemFields {
    pub event_id: u32,
    pub provider: String,
    pub level: Option<i64>,
    pub computer: String,
    pub user_id: String,
    pub version: i64,
    pub qualifiers: i64,
    pub task: i64,
    pub opcode: i64,
    pub keywords: String,
    pub process_id: u32,
    pub thread_id: u32,
    pub channel: String,
    pub time_created: Option<String>,
}

/// The `Event` node, or the value itself when it is not wrapped
pub fn event_root(record: &Value) -> &Value {
    record.get("Event").unwrap_or(record)
}

fn system_map(root: &Value) -> Option<&Map<String, Value>> {
    root.get("System").and_then(Value::as_object)
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

/// Unwrap `{"#text": v}` to `v`
fn text_of(value: &Value) -> &Value {
    value.get("#text").unwrap_or(value)
}

fn as_i64(value: &Value) -> Option<i64> {
    match text_of(value) {
        Value::Number(n) => n.as_i64().or_else(|| n.as_u64().map(|u| u as i64)),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match text_of(value) {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Attribute `name` of the `field` element within the system map
fn system_attribute<'a>(system: &'a Map<String, Value>, field: &str, name: &str) -> Option<&'a Value> {
    let from_node = system.get(field).and_then(|node| {
        node.get("#attributes")
            .and_then(|attrs| attrs.get(name))
            .or_else(|| node.get(format!("@{}", name).as_str()))
            .or_else(|| node.get(name))
    });
    from_node.or_else(|| {
        system
            .get(format!("{}_attributes", field).as_str())
            .and_then(|attrs| attrs.get(name))
    })
}

/// Value of the `field` element within the system map
fn system_value<'a>(system: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    system.get(field).filter(|v| !v.is_null())
}

fn resolve_string(root: &Value, direct: &[&str], fallback: impl FnOnce() -> Option<String>) -> String {
    lookup(root, direct)
        .and_then(as_string)
        .or_else(fallback)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn resolve_int(root: &Value, direct: &[&str], fallback: impl FnOnce() -> Option<i64>) -> Option<i64> {
    lookup(root, direct).and_then(as_i64).or_else(fallback)
}

/// Resolve the system header of a record
pub fn resolve_system(record: &Value) -> SystemFields {
    let root = event_root(record);
    let empty = Map::new();
    let system = system_map(root).unwrap_or(&empty);

    let attr_str = |field: &str, name: &str| system_attribute(system, field, name).and_then(as_string);
    let attr_int = |field: &str, name: &str| system_attribute(system, field, name).and_then(as_i64);
    let value_str = |field: &str| system_value(system, field).and_then(as_string);
    let value_int = |field: &str| system_value(system, field).and_then(as_i64);

    let event_id = resolve_int(root, &["System", "EventID"], || value_int("EventID"))
        .and_then(|id| u32::try_from(id).ok())
        .unwrap_or(0);

    SystemFields {
        event_id,
        provider: resolve_string(root, &["System", "Provider", "#attributes", "Name"], || {
            attr_str("Provider", "Name").or_else(|| attr_str("Provider", "EventSourceName"))
        }),
        level: resolve_int(root, &["System", "Level"], || value_int("Level")),
        computer: resolve_string(root, &["System", "Computer"], || value_str("Computer")),
        user_id: resolve_string(root, &["System", "Security", "#attributes", "UserID"], || {
            attr_str("Security", "UserID")
        }),
        version: resolve_int(root, &["System", "Version"], || value_int("Version")).unwrap_or(0),
        qualifiers: resolve_int(root, &["System", "EventID", "#attributes", "Qualifiers"], || {
            attr_int("EventID", "Qualifiers").or_else(|| value_int("Qualifiers"))
        })
        .unwrap_or(0),
        task: resolve_int(root, &["System", "Task"], || value_int("Task")).unwrap_or(0),
        opcode: resolve_int(root, &["System", "Opcode"], || value_int("Opcode")).unwrap_or(0),
        keywords: resolve_string(root, &["System", "Keywords"], || value_str("Keywords")),
        process_id: resolve_int(root, &["System", "Execution", "#attributes", "ProcessID"], || {
            attr_int("Execution", "ProcessID")
        })
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0),
        thread_id: resolve_int(root, &["System", "Execution", "#attributes", "ThreadID"], || {
            attr_int("Execution", "ThreadID")
        })
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0),
        channel: resolve_string(root, &["System", "Channel"], || value_str("Channel")),
        time_created: lookup(root, &["System", "TimeCreated", "#attributes", "SystemTime"])
            .and_then(as_string)
            .or_else(|| attr_str("TimeCreated", "SystemTime")),
    }
}

fn object_of(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(k, _)| k.as_str() != "#attributes")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("Data".to_string(), other.clone());
            map
        }
    }
}

/// Raw `System` map
pub fn system_data(record: &Value) -> Map<String, Value> {
    object_of(event_root(record).get("System"))
}

/// Raw `EventData` map
pub fn event_data(record: &Value) -> Map<String, Value> {
    object_of(event_root(record).get("EventData"))
}

/// Raw `UserData` map
pub fn user_data(record: &Value) -> Map<String, Value> {
    object_of(event_root(record).get("UserData"))
}

/// Embedded message text, empty when the record carries none
pub fn message(record: &Value) -> String {
    let root = event_root(record);
    lookup(root, &["RenderingInfo", "Message"])
        .or_else(|| lookup(root, &["EventData", "Message"]))
        .and_then(as_string)
        .unwrap_or_default()
}

/// Display form of a raw data value
pub fn display_value(value: &Value) -> String {
    match text_of(value) {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> Value {
        json!({
            "Event": {
                "#attributes": {"xmlns": "http://schemas.microsoft.com/win/2004/08/events/event"},
                "System": {
                    "Provider": {"#attributes": {"Name": "Microsoft-Windows-Security-Auditing", "Guid": "{54849625}"}},
                    "EventID": 4625,
                    "Version": 0,
                    "Level": 0,
                    "Task": 12544,
                    "Opcode": 0,
                    "Keywords": "0x8010000000000000",
                    "TimeCreated": {"#attributes": {"SystemTime": "2024-10-14T09:47:01.123456Z"}},
                    "EventRecordID": 77,
                    "Execution": {"#attributes": {"ProcessID": 668, "ThreadID": 4120}},
                    "Channel": "Security",
                    "Computer": "WS01.corp.local",
                    "Security": null
                },
                "EventData": {"TargetUserName": "bob", "LogonType": 10}
            }
        })
    }

    #[test]
    fn test_direct_paths() {
        let fields = resolve_system(&canonical());
        assert_eq!(fields.event_id, 4625);
        assert_eq!(fields.provider, "Microsoft-Windows-Security-Auditing");
        assert_eq!(fields.level, Some(0));
        assert_eq!(fields.computer, "WS01.corp.local");
        assert_eq!(fields.user_id, UNKNOWN);
        assert_eq!(fields.task, 12544);
        assert_eq!(fields.keywords, "0x8010000000000000");
        assert_eq!(fields.process_id, 668);
        assert_eq!(fields.thread_id, 4120);
        assert_eq!(fields.channel, "Security");
        assert_eq!(fields.time_created.as_deref(), Some("2024-10-14T09:47:01.123456Z"));
    }

    #[test]
    fn test_fallback_to_system_map_variants() {
        let record = json!({
            "System": {
                "Provider": {"@Name": "Service Control Manager"},
                "EventID": {"#attributes": {"Qualifiers": 16384}, "#text": 7045},
                "Level": "4",
                "Version": "1",
                "Execution_attributes": {"ProcessID": "812", "ThreadID": "0x10"},
                "Security_attributes": {"UserID": "S-1-5-18"},
                "Computer": {"#text": "SRV02"}
            }
        });
        let fields = resolve_system(&record);
        assert_eq!(fields.event_id, 7045);
        assert_eq!(fields.provider, "Service Control Manager");
        assert_eq!(fields.qualifiers, 16384);
        assert_eq!(fields.level, Some(4));
        assert_eq!(fields.version, 1);
        assert_eq!(fields.process_id, 812);
        assert_eq!(fields.thread_id, 16);
        assert_eq!(fields.user_id, "S-1-5-18");
        assert_eq!(fields.computer, "SRV02");
    }

    #[test]
    fn test_missing_fields_default() {
        let fields = resolve_system(&json!({"Event": {"EventData": {}}}));
        assert_eq!(fields.event_id, 0);
        assert_eq!(fields.provider, UNKNOWN);
        assert_eq!(fields.level, None);
        assert_eq!(fields.channel, UNKNOWN);
        assert_eq!(fields.process_id, 0);
        assert_eq!(fields.time_created, None);
    }

    #[test]
    fn test_raw_maps() {
        let record = canonical();
        let data = event_data(&record);
        assert_eq!(data.get("TargetUserName"), Some(&json!("bob")));
        assert!(user_data(&record).is_empty());
        assert!(system_data(&record).contains_key("Provider"));
        assert_eq!(message(&record), "");

        let scalar = event_data(&json!({"Event": {"EventData": "raw text"}}));
        assert_eq!(scalar.get("Data"), Some(&json!("raw text")));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("x")), "x");
        assert_eq!(display_value(&json!(10)), "10");
        assert_eq!(display_value(&json!({"#text": "wrapped"})), "wrapped");
        assert_eq!(display_value(&json!(null)), "");
    }
}
