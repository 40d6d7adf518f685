//! File-backed sources: reading logs, listing autostart directories and
//! describing watched files.

use log::debug;
use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::collectors::parsers::accounts::parse_passwd;
use crate::config::sources::WatchedFile;
use crate::error::{Result, TriageError};
use crate::models::{SensitiveFile, StartupItem};
use crate::normalize::time::format_system_time;

/// Whole file as text; invalid UTF-8 is replaced
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| TriageError::from_io(path.display().to_string(), e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Regular files directly inside `dir`, sorted, optionally filtered by extension
pub fn list_dir(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TriageError::NotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => TriageError::from_io(dir.display().to_string(), io),
            None => TriageError::Format(format!("cannot list {}", dir.display())),
        })?;
        if !entry.file_type().is_file() && !entry.path_is_symlink() {
            continue;
        }
        let matches = extension.map_or(true, |ext| {
            entry
                .path()
                .extension()
                .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        });
        if matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn modified_string(metadata: &Metadata) -> String {
    metadata.modified().map(format_system_time).unwrap_or_default()
}

/// Startup record for an autostart file
pub fn startup_item(
    path: &Path,
    item_type: &str,
    description: String,
    enabled: bool,
    captured_at: &str,
) -> Result<StartupItem> {
    let metadata = fs::metadata(path).map_err(|e| TriageError::from_io(path.display().to_string(), e))?;
    Ok(StartupItem {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.display().to_string(),
        item_type: item_type.to_string(),
        enabled,
        last_mod_time: modified_string(&metadata),
        size: metadata.len(),
        description,
        captured_at: captured_at.to_string(),
    })
}

/// Startup records for every matching file in `dir`.
///
/// `inspect` turns file content into (description, enabled).
pub fn startup_dir(
    dir: &Path,
    extension: Option<&str>,
    item_type: &str,
    captured_at: &str,
    inspect: &dyn Fn(&str) -> (String, bool),
) -> Result<Vec<StartupItem>> {
    let mut items = Vec::new();
    for path in list_dir(dir, extension)? {
        let (description, enabled) = match read_source(&path) {
            Ok(content) => inspect(&content),
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                (String::new(), true)
            }
        };
        match startup_item(&path, item_type, description, enabled, captured_at) {
            Ok(item) => items.push(item),
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

/// uid/gid to name tables from passwd(5) and group(5)
#[derive(Debug, Default)]
pub struct OwnerNames {
    users: HashMap<String, String>,
    groups: HashMap<String, String>,
}

impl OwnerNames {
    pub fn load(passwd: &Path, group: &Path) -> Self {
        let users = read_source(passwd)
            .map(|content| {
                parse_passwd(&content, "")
                    .into_iter()
                    .map(|a| (a.uid, a.username))
                    .collect()
            })
            .unwrap_or_default();
        let groups = read_source(group)
            .map(|content| parse_group(&content))
            .unwrap_or_default();
        Self { users, groups }
    }

    pub fn user(&self, id: &str) -> String {
        self.users.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn group(&self, id: &str) -> String {
        self.groups.get(id).cloned().unwrap_or_else(|| id.to_string())
    }
}

/// gid -> name from group(5)
fn parse_group(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let _password = fields.next()?;
            let gid = fields.next()?;
            Some((gid.to_string(), name.to_string()))
        })
        .collect()
}

/// `ls -l` style mode string, e.g. `-rw-r-----`
#[cfg_attr(not(unix), allow(dead_code))]
fn mode_string(mode: u32, is_dir: bool, is_symlink: bool) -> String {
    let kind = if is_symlink {
        'l'
    } else if is_dir {
        'd'
    } else {
        '-'
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for (shift, special, special_char) in [(6, 0o4000, 's'), (3, 0o2000, 's'), (0, 0o1000, 't')] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let exec = bits & 0o1 != 0;
        out.push(match (mode & special != 0, exec) {
            (true, true) => special_char,
            (true, false) => special_char.to_ascii_uppercase(),
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    out
}

#[cfg(unix)]
fn ownership(metadata: &Metadata, names: &OwnerNames) -> (String, String, String) {
    use std::os::unix::fs::MetadataExt;
    (
        mode_string(metadata.mode(), metadata.is_dir(), metadata.file_type().is_symlink()),
        names.user(&metadata.uid().to_string()),
        names.group(&metadata.gid().to_string()),
    )
}

#[cfg(not(unix))]
fn ownership(metadata: &Metadata, _names: &OwnerNames) -> (String, String, String) {
    let permissions = if metadata.permissions().readonly() { "readonly" } else { "read-write" };
    (permissions.to_string(), String::new(), String::new())
}

/// Metadata of one watched path; the link itself is described for symlinks
pub fn describe_file(watched: &WatchedFile, names: &OwnerNames, captured_at: &str) -> SensitiveFile {
    let path = Path::new(&watched.path);
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            let (permissions, owner, group) = ownership(&metadata, names);
            SensitiveFile {
                path: watched.path.clone(),
                description: watched.description.clone(),
                exists: true,
                size: metadata.len(),
                permissions,
                owner,
                group,
                mod_time: modified_string(&metadata),
                is_dir: metadata.is_dir(),
                is_symlink: metadata.file_type().is_symlink(),
                captured_at: captured_at.to_string(),
            }
        }
        Err(e) => {
            debug!("Watched file {} not readable: {}", watched.path, e);
            SensitiveFile {
                path: watched.path.clone(),
                description: watched.description.clone(),
                exists: false,
                size: 0,
                permissions: String::new(),
                owner: String::new(),
                group: String::new(),
                mod_time: String::new(),
                is_dir: false,
                is_symlink: false,
                captured_at: captured_at.to_string(),
            }
        }
    }
}
