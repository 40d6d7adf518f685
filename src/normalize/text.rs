/// Rest of the line after the first occurrence of `marker`, trimmed.
///
/// Returns `None` when the marker is absent or nothing follows it.
pub fn extract_after(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let line = rest.lines().next().unwrap_or("");
    let value = line.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// First whitespace-delimited token after `marker`
pub fn extract_token_after(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    message[start..]
        .split_whitespace()
        .next()
        .map(|t| t.trim_matches(|c| c == ',' || c == ';' || c == '\'' || c == '"').to_string())
        .filter(|t| !t.is_empty())
}

/// Last meaningful value following `marker`.
///
/// Security audit messages repeat `Account Name:` for the subject and the
/// target account; the target comes last. Values of `-` are skipped.
pub fn extract_last_after(message: &str, marker: &str) -> Option<String> {
    message
        .match_indices(marker)
        .filter_map(|(idx, _)| extract_after(&message[idx..], marker))
        .filter(|v| v != "-")
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_extract_after_marker() {
        let msg = "authentication error for user alice reason: bad password";
        assert_eq!(
            extract_after(msg, MARKER_REASON),
            Some("bad password".to_string())
        );
        assert_eq!(
            extract_after(msg, MARKER_FOR_USER),
            Some("alice reason: bad password".to_string())
        );
        assert_eq!(extract_after(msg, "missing:"), None);
        assert_eq!(extract_after("reason:   ", MARKER_REASON), None);
    }

    #[test]
    fn test_extract_after_stops_at_line_end() {
        let msg = "Source Network Address:\t10.1.2.3\r\n\tSource Port:\t0";
        assert_eq!(
            extract_after(msg, MARKER_SOURCE_ADDRESS),
            Some("10.1.2.3".to_string())
        );
    }

    #[test]
    fn test_extract_token_after() {
        let msg = "Failed password for invalid user admin from 10.0.0.5 port 22 ssh2";
        assert_eq!(extract_token_after(msg, "invalid user "), Some("admin".to_string()));
        assert_eq!(extract_token_after(msg, "from "), Some("10.0.0.5".to_string()));
        assert_eq!(extract_token_after(msg, "ssh2"), None);
    }

    #[test]
    fn test_extract_last_account_name() {
        let msg = "Subject:\n\tAccount Name:\t\t-\n\tAccount Domain:\t\t-\nAccount For Which Logon Failed:\n\tAccount Name:\t\tbob\n";
        assert_eq!(extract_last_after(msg, MARKER_ACCOUNT_NAME), Some("bob".to_string()));

        let both = "Account Name: SYSTEM\nAccount Name: carol";
        assert_eq!(extract_last_after(both, MARKER_ACCOUNT_NAME), Some("carol".to_string()));
        assert_eq!(extract_last_after("none here", MARKER_ACCOUNT_NAME), None);
    }
}
