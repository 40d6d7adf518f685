//! Descriptions and enabled state of autostart entries.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLIST_LABEL: Regex =
        Regex::new(r"<key>\s*Label\s*</key>\s*<string>\s*([^<]*?)\s*</string>").unwrap();
    static ref PLIST_DISABLED: Regex = Regex::new(r"<key>\s*Disabled\s*</key>\s*<true\s*/>").unwrap();
    static ref PLIST_PROGRAM: Regex =
        Regex::new(r"<key>\s*Program\s*</key>\s*<string>\s*([^<]*?)\s*</string>").unwrap();
}

/// Value of `key=` in an INI-style file, first occurrence
fn ini_value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::trim)
    })
}

/// `Comment=` of a .desktop entry, falling back to `Name=`
pub fn desktop_description(content: &str) -> String {
    ini_value(content, "Comment")
        .or_else(|| ini_value(content, "Name"))
        .unwrap_or_default()
        .to_string()
}

/// A .desktop entry is disabled by `Hidden=true` or `X-GNOME-Autostart-enabled=false`
pub fn desktop_enabled(content: &str) -> bool {
    let hidden = ini_value(content, "Hidden").map_or(false, |v| v.eq_ignore_ascii_case("true"));
    let gnome_off = ini_value(content, "X-GNOME-Autostart-enabled")
        .map_or(false, |v| v.eq_ignore_ascii_case("false"));
    !(hidden || gnome_off)
}

/// `Description=` of a systemd unit
pub fn systemd_description(content: &str) -> String {
    ini_value(content, "Description").unwrap_or_default().to_string()
}

/// launchd `Label`, or `Program` when the label is missing.
///
/// Binary plists yield an empty description.
pub fn plist_description(content: &str) -> String {
    PLIST_LABEL
        .captures(content)
        .or_else(|| PLIST_PROGRAM.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn plist_enabled(content: &str) -> bool {
    !PLIST_DISABLED.is_match(content)
}
