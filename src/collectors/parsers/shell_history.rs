//! zsh, bash, fish and PSReadLine history files.

use chrono::NaiveDateTime;

use crate::models::ShellCommand;
use crate::normalize::dedup_by_key;
use crate::normalize::time::{format_timestamp, from_epoch};

/// One command as stored in a history file, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub epoch: Option<i64>,
    pub command: String,
}

impl HistoryEntry {
    fn new(epoch: Option<i64>, command: &str) -> Option<Self> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }
        Some(Self {
            epoch,
            command: command.to_string(),
        })
    }
}

/// Join lines ending with `marker` onto the following line
fn join_continuations(content: &str, marker: char) -> Vec<String> {
    let mut logical = Vec::new();
    let mut pending = String::new();
    for line in content.lines() {
        match line.strip_suffix(marker) {
            Some(head) => {
                pending.push_str(head);
                pending.push('\n');
            }
            None => {
                pending.push_str(line);
                logical.push(std::mem::take(&mut pending));
            }
        }
    }
    if !pending.is_empty() {
        logical.push(pending);
    }
    logical
}

/// zsh history, both `: <epoch>:<duration>;<command>` and plain lines
pub fn parse_zsh_history(content: &str) -> Vec<HistoryEntry> {
    join_continuations(content, '\\')
        .iter()
        .filter_map(|line| {
            if let Some(rest) = line.strip_prefix(": ") {
                if let Some((meta, command)) = rest.split_once(';') {
                    let epoch = meta.split(':').next().and_then(|e| e.trim().parse().ok());
                    return HistoryEntry::new(epoch, command);
                }
            }
            HistoryEntry::new(None, line)
        })
        .collect()
}

/// bash history; `#<epoch>` lines timestamp the command that follows
pub fn parse_bash_history(content: &str) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let mut epoch = None;
    for line in content.lines() {
        if let Some(digits) = line.strip_prefix('#') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                epoch = digits.parse().ok();
                continue;
            }
        }
        if let Some(entry) = HistoryEntry::new(epoch.take(), line) {
            entries.push(entry);
        }
    }
    entries
}

/// fish history: `- cmd: ` entries followed by `  when: <epoch>`
pub fn parse_fish_history(content: &str) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();
    for line in content.lines() {
        if let Some(command) = line.strip_prefix("- cmd: ") {
            if let Some(entry) = HistoryEntry::new(None, &command.replace("\\n", "\n")) {
                entries.push(entry);
            }
        } else if let Some(when) = line.trim_start().strip_prefix("when:") {
            if let Some(last) = entries.last_mut() {
                last.epoch = when.trim().parse().ok();
            }
        }
    }
    entries
}

/// PSReadLine `ConsoleHost_history.txt`; a trailing backtick continues a line
pub fn parse_powershell_history(content: &str) -> Vec<HistoryEntry> {
    join_continuations(content, '`')
        .iter()
        .filter_map(|line| HistoryEntry::new(None, line))
        .collect()
}

/// Turn one file's entries into records, newest first, one per distinct command
pub fn to_commands(entries: Vec<HistoryEntry>, user: &str, shell: &str, now: NaiveDateTime) -> Vec<ShellCommand> {
    let records = entries.into_iter().rev().map(|entry| ShellCommand {
        time: format_timestamp(&entry.epoch.and_then(from_epoch).unwrap_or(now)),
        command: entry.command,
        user: user.to_string(),
        shell: shell.to_string(),
    });
    dedup_by_key(records, |r| (r.command.clone(), r.user.clone(), r.shell.clone()))
}

/// Stable reorder placing the current shell's records first
pub fn current_shell_first(records: Vec<ShellCommand>, current: &str) -> Vec<ShellCommand> {
    let (mut first, rest): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.shell == current);
    first.extend(rest);
    first
}
