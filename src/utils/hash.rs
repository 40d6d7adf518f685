use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::constants::HASH_BUFFER_SIZE;
use crate::error::{Result, TriageError};

/// SHA-256 of a file as lowercase hex.
///
/// `Ok(None)` when the path is not a regular file or exceeds `max_size_mb`.
pub fn sha256_file(path: &Path, max_size_mb: u64) -> Result<Option<String>> {
    let context = path.display().to_string();
    let metadata = std::fs::metadata(path).map_err(|e| TriageError::from_io(&context, e))?;

    if !metadata.is_file() || metadata.len() > max_size_mb.saturating_mul(1024 * 1024) {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| TriageError::from_io(&context, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(format!("{:x}", hasher.finalize())))
}
