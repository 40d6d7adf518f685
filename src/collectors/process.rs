//! Process snapshots: sysinfo facts enriched with parent name, executable
//! hash, modification time and code signature.

use log::debug;
use std::collections::HashMap;
use std::path::Path;

use crate::collectors::host::{memory_percent, ProcessFacts};
use crate::context::CollectionContext;
use crate::models::ProcessSnapshot;
use crate::normalize::time::format_system_time;
use crate::utils::hash::sha256_file;

/// Memoizes per-executable work; many processes share one binary
#[derive(Debug, Default)]
pub struct ExecutableCache {
    entries: HashMap<String, (String, String, String)>,
}

impl ExecutableCache {
    fn lookup(
        &mut self,
        exe: &str,
        hash: bool,
        max_hash_size_mb: u64,
        signature: &dyn Fn(&Path) -> String,
    ) -> (String, String, String) {
        if exe.is_empty() {
            return Default::default();
        }
        self.entries
            .entry(exe.to_string())
            .or_insert_with(|| {
                let path = Path::new(exe);
                let mtime = std::fs::metadata(path)
                    .and_then(|m| m.modified())
                    .map(format_system_time)
                    .unwrap_or_default();
                let sha256 = if hash {
                    match sha256_file(path, max_hash_size_mb) {
                        Ok(digest) => digest.unwrap_or_default(),
                        Err(e) => {
                            debug!("Cannot hash {}: {}", exe, e);
                            String::new()
                        }
                    }
                } else {
                    String::new()
                };
                (mtime, sha256, signature(path))
            })
            .clone()
    }
}

/// Enrich raw facts into snapshots.
///
/// `signer` resolves the signer of an executable; platforms without a
/// lookup pass a function returning an empty string.
pub fn build_snapshots(
    ctx: &CollectionContext,
    facts: Vec<ProcessFacts>,
    total_memory: u64,
    signer: &dyn Fn(&Path) -> String,
) -> Vec<ProcessSnapshot> {
    let names: HashMap<u32, String> = facts.iter().map(|p| (p.pid, p.name.clone())).collect();
    let mut cache = ExecutableCache::default();
    let captured_at = ctx.now_string();

    let mut snapshots = Vec::with_capacity(facts.len());
    for process in facts {
        if ctx.is_cancelled() {
            break;
        }
        let (file_mtime, sha256, signature) = cache.lookup(
            &process.exe,
            ctx.config.hash_executables,
            ctx.config.max_hash_size_mb,
            signer,
        );
        snapshots.push(ProcessSnapshot {
            parent_name: names.get(&process.ppid).cloned().unwrap_or_default(),
            create_time: i64::try_from(process.start_time).unwrap_or(i64::MAX),
            cpu_percent: f64::from(process.cpu_percent),
            mem_percent: memory_percent(process.memory, total_memory),
            pid: process.pid,
            ppid: process.ppid,
            name: process.name,
            exe: process.exe,
            cmdline: process.cmdline,
            file_mtime,
            sha256,
            signature,
            captured_at: captured_at.clone(),
        });
    }
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use std::cell::Cell;
    use std::io::Write;

    fn facts(pid: u32, ppid: u32, name: &str, exe: &str) -> ProcessFacts {
        ProcessFacts {
            pid,
            ppid,
            name: name.to_string(),
            exe: exe.to_string(),
            cmdline: format!("{} --flag", name),
            start_time: 1_700_000_000,
            cpu_percent: 1.5,
            memory: 256,
        }
    }

    #[test]
    fn test_enrichment_and_parent_names() {
        let mut exe = tempfile::NamedTempFile::new().unwrap();
        exe.write_all(b"abc").unwrap();
        exe.flush().unwrap();
        let exe_path = exe.path().to_string_lossy().to_string();

        let ctx = CollectionContext::new(TriageConfig::default());
        let calls = Cell::new(0);
        let signer = |_: &Path| {
            calls.set(calls.get() + 1);
            "Developer ID Application: Example".to_string()
        };

        let snapshots = build_snapshots(
            &ctx,
            vec![
                facts(1, 0, "init", ""),
                facts(200, 1, "agent", &exe_path),
                facts(201, 200, "agent", &exe_path),
            ],
            1024,
            &signer,
        );

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].parent_name, "");
        assert_eq!(snapshots[0].sha256, "");
        assert_eq!(snapshots[1].parent_name, "init");
        assert_eq!(snapshots[2].parent_name, "agent");
        assert_eq!(
            snapshots[1].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(!snapshots[1].file_mtime.is_empty());
        assert_eq!(snapshots[2].signature, "Developer ID Application: Example");
        assert_eq!(snapshots[1].mem_percent, 25.0);
        assert_eq!(snapshots[1].create_time, 1_700_000_000);
        // both agent processes share one executable lookup
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_hashing_disabled() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let config = TriageConfig {
            hash_executables: false,
            ..TriageConfig::default()
        };
        let ctx = CollectionContext::new(config);
        let snapshots = build_snapshots(
            &ctx,
            vec![facts(5, 1, "x", &exe.path().to_string_lossy())],
            0,
            &|_| String::new(),
        );
        assert_eq!(snapshots[0].sha256, "");
        assert_eq!(snapshots[0].mem_percent, 0.0);
    }
}
