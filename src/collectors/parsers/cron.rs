//! crontab files and `schtasks /query /fo CSV /v /nh` output.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::CronEntry;
use crate::normalize::dedup_by_key;

lazy_static! {
    static ref ENV_ASSIGNMENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*=").unwrap();
}

// schtasks verbose CSV columns
const COL_TASK_NAME: usize = 1;
const COL_NEXT_RUN: usize = 2;
const COL_STATUS: usize = 3;
const COL_LAST_RUN: usize = 5;
const COL_TASK_TO_RUN: usize = 8;

/// Job lines of a crontab; comments, blanks and variable assignments are skipped
pub fn parse_crontab(content: &str, source: &str, captured_at: &str) -> Vec<CronEntry> {
    let entries = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !ENV_ASSIGNMENT.is_match(line))
        .map(|line| CronEntry {
            line: line.to_string(),
            source: source.to_string(),
            captured_at: captured_at.to_string(),
        });
    dedup_by_key(entries, |e| e.line.clone())
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Scheduled tasks from schtasks verbose CSV.
///
/// Tasks with several triggers are listed once per trigger; the formatted
/// line is the dedup key so each task appears once.
pub fn parse_schtasks_csv(output: &str, captured_at: &str) -> Vec<CronEntry> {
    let entries = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let fields = split_csv_line(line.trim_end_matches('\r'));
            if fields.len() <= COL_TASK_TO_RUN || fields[COL_TASK_NAME] == "TaskName" {
                return None;
            }
            let mut formatted = format!(
                "TaskName: {}; State: {}; LastRunTime: {}; NextRunTime: {}",
                fields[COL_TASK_NAME], fields[COL_STATUS], fields[COL_LAST_RUN], fields[COL_NEXT_RUN]
            );
            let action = fields[COL_TASK_TO_RUN].trim();
            if !action.is_empty() {
                formatted.push_str("; Action: ");
                formatted.push_str(action);
            }
            Some(CronEntry {
                line: formatted,
                source: "schtasks".to_string(),
                captured_at: captured_at.to_string(),
            })
        });
    dedup_by_key(entries, |e| e.line.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test::TEST_NOW;

    #[test]
    fn test_crontab_lines() {
        let content = "\
# m h dom mon dow command
SHELL=/bin/sh
PATH=/usr/local/sbin:/usr/local/bin

17 *\t* * *\troot    cd / && run-parts --report /etc/cron.hourly
@reboot /tmp/.x/agent
@reboot /tmp/.x/agent
";
        let entries = parse_crontab(content, "/etc/crontab", TEST_NOW);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].line.starts_with("17 *"));
        assert_eq!(entries[1].line, "@reboot /tmp/.x/agent");
        assert!(entries.iter().all(|e| e.source == "/etc/crontab" && e.captured_at == TEST_NOW));
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(
            split_csv_line(r#""a","b, c","say ""hi""",d"#),
            vec!["a", "b, c", r#"say "hi""#, "d"]
        );
    }

    #[test]
    fn test_schtasks_rows_deduplicated() {
        let row = r#""HOST01","\Updater","10/15/2024 3:00:00 AM","Ready","Interactive/Background","10/14/2024 3:00:00 AM","0","SYSTEM","C:\ProgramData\upd.exe -q","N/A""#;
        let other = r#""HOST01","\Microsoft\Windows\Defrag\ScheduledDefrag","N/A","Disabled","Interactive/Background","N/A","1","Microsoft","%windir%\system32\defrag.exe -c","N/A""#;
        let output = format!("{}\r\n{}\r\n{}\r\n", row, row, other);

        let entries = parse_schtasks_csv(&output, TEST_NOW);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].line,
            r"TaskName: \Updater; State: Ready; LastRunTime: 10/14/2024 3:00:00 AM; NextRunTime: 10/15/2024 3:00:00 AM; Action: C:\ProgramData\upd.exe -q"
        );
        assert!(entries[1].line.contains("State: Disabled"));
        assert_eq!(entries[0].source, "schtasks");
    }

    #[test]
    fn test_schtasks_header_and_short_rows_skipped() {
        let output = "\"HostName\",\"TaskName\",\"Next Run Time\",\"Status\",\"Logon Mode\",\"Last Run Time\",\"Last Result\",\"Author\",\"Task To Run\"\nINFO: no tasks\n";
        assert!(parse_schtasks_csv(output, TEST_NOW).is_empty());
    }
}
