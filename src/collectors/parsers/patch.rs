//! Package/update history: apt, dnf and softwareupdate.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::PatchRecord;
use crate::normalize::normalize_timestamp;

lazy_static! {
    static ref APT_PACKAGE: Regex = Regex::new(r"([^\s,]+) \(([^)]*)\)").unwrap();
    static ref DNF_LINE: Regex =
        Regex::new(r"^(?P<ts>\S+)\s+\S+\s+(?P<action>Upgrade|Upgraded|Install|Installed):\s+(?P<pkg>\S+)").unwrap();
    static ref COLUMN_GAP: Regex = Regex::new(r"\s{2,}").unwrap();
}

fn apt_block(block: &[&str], now: NaiveDateTime) -> Vec<PatchRecord> {
    let field = |name: &str| {
        block
            .iter()
            .find_map(|line| line.strip_prefix(name))
            .map(|v| v.trim().to_string())
    };
    let time = normalize_timestamp(&field("Start-Date:").unwrap_or_default(), now);
    let command = field("Commandline:").unwrap_or_default();

    let mut records = Vec::new();
    for (key, status) in [("Upgrade:", "Upgraded"), ("Install:", "Installed")] {
        let Some(packages) = field(key) else {
            continue;
        };
        for caps in APT_PACKAGE.captures_iter(&packages) {
            records.push(PatchRecord {
                time: time.clone(),
                title: caps[1].to_string(),
                kb: caps[2].to_string(),
                description: command.clone(),
                status: status.to_string(),
            });
        }
    }
    records
}

/// `/var/log/apt/history.log`, one record per upgraded or installed package
pub fn parse_apt_history(content: &str, now: NaiveDateTime) -> Vec<PatchRecord> {
    let lines: Vec<&str> = content.lines().collect();
    lines
        .split(|line| line.trim().is_empty())
        .filter(|block| !block.is_empty())
        .flat_map(|block| apt_block(block, now))
        .collect()
}

/// `/var/log/dnf.rpm.log` upgrade and install lines
pub fn parse_dnf_log(content: &str, now: NaiveDateTime) -> Vec<PatchRecord> {
    content
        .lines()
        .filter_map(|line| {
            let caps = DNF_LINE.captures(line)?;
            let status = if caps["action"].starts_with("Upgrade") {
                "Upgraded"
            } else {
                "Installed"
            };
            Some(PatchRecord {
                time: normalize_timestamp(&caps["ts"], now),
                title: caps["pkg"].to_string(),
                kb: String::new(),
                description: format!("dnf {}", caps["action"].to_lowercase()),
                status: status.to_string(),
            })
        })
        .collect()
}

/// `softwareupdate --history` table: name, version, install date
pub fn parse_softwareupdate_history(output: &str, now: NaiveDateTime) -> Vec<PatchRecord> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Display Name") && !line.starts_with('-'))
        .filter_map(|line| {
            let columns: Vec<&str> = COLUMN_GAP.split(line).collect();
            if columns.len() < 3 {
                return None;
            }
            Some(PatchRecord {
                time: normalize_timestamp(columns[2], now),
                title: columns[0].to_string(),
                kb: columns[1].to_string(),
                description: "softwareupdate".to_string(),
                status: "Installed".to_string(),
            })
        })
        .collect()
}
