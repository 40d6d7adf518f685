//! Host view over `sysinfo`.
//!
//! One view is a point-in-time snapshot of processes, CPUs, memory, disks and
//! per-interface counters. CPU usage needs two samples, so construction
//! refreshes twice with [`CPU_SAMPLE_INTERVAL_MS`] in between.

use log::debug;
use std::thread;
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, PidExt, ProcessExt, System, SystemExt};

use crate::constants::{CPU_SAMPLE_INTERVAL_MS, UNKNOWN};
use crate::models::{DiskUsage, SystemSnapshot};

/// Cumulative traffic counters of one interface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// Raw per-process facts, before enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessFacts {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub exe: String,
    pub cmdline: String,
    /// Seconds since the epoch
    pub start_time: u64,
    pub cpu_percent: f32,
    /// Resident memory in bytes
    pub memory: u64,
}

pub struct HostView {
    system: System,
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl HostView {
    pub fn new() -> Self {
        debug!("Sampling host state");
        let mut system = System::new_all();
        system.refresh_all();
        thread::sleep(Duration::from_millis(CPU_SAMPLE_INTERVAL_MS));
        system.refresh_cpu();
        system.refresh_processes();
        Self { system }
    }

    /// View refreshing only interface counters
    pub fn network_only() -> Self {
        let mut system = System::new();
        system.refresh_networks_list();
        system.refresh_networks();
        Self { system }
    }

    /// Running processes ordered by pid
    pub fn processes(&self) -> Vec<ProcessFacts> {
        let mut facts: Vec<ProcessFacts> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessFacts {
                pid: pid.as_u32(),
                ppid: process.parent().map(|p| p.as_u32()).unwrap_or(0),
                name: process.name().to_string(),
                exe: process.exe().to_string_lossy().to_string(),
                cmdline: process.cmd().join(" "),
                start_time: process.start_time(),
                cpu_percent: process.cpu_usage(),
                memory: process.memory(),
            })
            .collect();
        facts.sort_by_key(|p| p.pid);
        facts
    }

    pub fn total_memory(&self) -> u64 {
        self.system.total_memory()
    }

    /// Counters per interface ordered by name
    pub fn interface_counters(&self) -> Vec<InterfaceCounters> {
        let mut counters: Vec<InterfaceCounters> = self
            .system
            .networks()
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
            })
            .collect();
        counters.sort_by(|a, b| a.name.cmp(&b.name));
        counters
    }

    pub fn hostname(&self) -> String {
        self.system
            .host_name()
            .or_else(|| hostname::get().ok().map(|h| h.to_string_lossy().into_owned()))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn disks(&self) -> Vec<DiskUsage> {
        self.system
            .disks()
            .iter()
            .map(|disk| {
                let total = disk.total_space();
                let free = disk.available_space().min(total);
                let used = total - free;
                DiskUsage {
                    mount_point: disk.mount_point().to_string_lossy().to_string(),
                    total_size: total,
                    used_size: used,
                    free_size: free,
                    usage: percent(used, total),
                }
            })
            .collect()
    }

    pub fn system_snapshot(&self, captured_at: &str) -> SystemSnapshot {
        let os = match (self.system.name(), self.system.os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => std::env::consts::OS.to_string(),
        };
        SystemSnapshot {
            hostname: self.hostname(),
            os,
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores: u32::try_from(self.system.cpus().len()).unwrap_or(u32::MAX),
            kernel_version: self.system.kernel_version().unwrap_or_else(|| UNKNOWN.to_string()),
            cpu_usage: f64::from(self.system.global_cpu_info().cpu_usage()),
            total_memory: self.system.total_memory(),
            memory_usage: percent(self.system.used_memory(), self.system.total_memory()),
            disks: self.disks(),
            captured_at: captured_at.to_string(),
        }
    }
}

impl Default for HostView {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory share of one process in percent
pub fn memory_percent(memory: u64, total_memory: u64) -> f64 {
    percent(memory, total_memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_handles_zero_total() {
        assert_eq!(memory_percent(10, 0), 0.0);
        assert_eq!(memory_percent(25, 100), 25.0);
    }

    #[test]
    fn test_view_sees_current_process() {
        let host = HostView::new();
        let me = std::process::id();
        assert!(host.processes().iter().any(|p| p.pid == me));
        assert!(host.total_memory() > 0);
        assert!(!host.hostname().is_empty());
    }

    #[test]
    fn test_snapshot_fields() {
        let host = HostView::new();
        let snapshot = host.system_snapshot("2024-10-14 12:00:00");
        assert!(snapshot.cpu_cores >= 1);
        assert_eq!(snapshot.arch, std::env::consts::ARCH);
        assert!(snapshot.memory_usage >= 0.0 && snapshot.memory_usage <= 100.0);
        for disk in &snapshot.disks {
            assert_eq!(disk.used_size + disk.free_size, disk.total_size);
        }
    }
}
