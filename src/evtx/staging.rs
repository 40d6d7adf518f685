use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::constants::{APP_NAME, EVTX_EXTENSION};
use crate::error::Result;

/// Copy `src` into the staging area under the system temp directory
pub fn stage_file(src: &Path) -> Result<PathBuf> {
    stage_file_in(src, &std::env::temp_dir())
}

/// Copy `src` to `<root>/rust_triage/evtx/evtx_<unix_ts>_<uuid8>.evtx`
pub fn stage_file_in(src: &Path, root: &Path) -> Result<PathBuf> {
    let dir = root.join(APP_NAME).join("evtx");
    fs::create_dir_all(&dir)?;

    let unix_ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let uuid = Uuid::new_v4().simple().to_string();
    let target = dir.join(format!("evtx_{}_{}.{}", unix_ts, &uuid[..8], EVTX_EXTENSION));

    fs::copy(src, &target)?;
    debug!("Staged {} as {}", src.display(), target.display());
    Ok(target)
}
