//! Socket tables: `/proc/net/{tcp,udp}[6]`, `netstat -ano` and `lsof -i`.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::models::NetworkConnection;

const UDP_REMOTE_ANY: &str = "*:*";
const NO_STATE: &str = "NONE";

/// Kernel `TCP_*` state codes as printed in `/proc/net/tcp`
fn proc_tcp_state(code: &str) -> &'static str {
    match code {
        "01" => "ESTABLISHED",
        "02" => "SYN_SENT",
        "03" => "SYN_RECV",
        "04" => "FIN_WAIT1",
        "05" => "FIN_WAIT2",
        "06" => "TIME_WAIT",
        "07" => "CLOSE",
        "08" => "CLOSE_WAIT",
        "09" => "LAST_ACK",
        "0A" => "LISTEN",
        "0B" => "CLOSING",
        _ => "UNKNOWN",
    }
}

/// `0100007F:0277` -> `127.0.0.1:631`
///
/// The kernel prints each 32-bit word of the address in host byte order.
fn proc_address(raw: &str) -> Option<SocketAddr> {
    let (addr, port) = raw.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    let words = (0..addr.len() / 8)
        .map(|i| u32::from_str_radix(addr.get(i * 8..i * 8 + 8)?, 16).ok())
        .collect::<Option<Vec<u32>>>()?;
    let ip = match words.as_slice() {
        [v4] => IpAddr::V4(Ipv4Addr::from(v4.to_le_bytes())),
        [a, b, c, d] => {
            let mut octets = [0u8; 16];
            for (chunk, word) in octets.chunks_mut(4).zip([a, b, c, d]) {
                chunk.copy_from_slice(&word.to_le_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

/// One `/proc/net` table; `owners` maps socket inodes to pids
pub fn parse_proc_net(
    content: &str,
    proto: &str,
    owners: &HashMap<u64, u32>,
    captured_at: &str,
) -> Vec<NetworkConnection> {
    let is_udp = proto.starts_with("udp");
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let local = proc_address(fields[1])?;
            let remote = proc_address(fields[2])?;
            let inode: u64 = fields[9].parse().ok()?;
            let (remote_addr, status) = if is_udp {
                (UDP_REMOTE_ANY.to_string(), NO_STATE)
            } else {
                (remote.to_string(), proc_tcp_state(fields[3]))
            };
            Some(NetworkConnection {
                proto: proto.to_string(),
                local_addr: local.to_string(),
                remote_addr,
                status: status.to_string(),
                pid: owners.get(&inode).copied().unwrap_or(0),
                captured_at: captured_at.to_string(),
            })
        })
        .collect()
}

/// `socket:[12345]` link target of a `/proc/<pid>/fd` entry
pub fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

/// `netstat -ano` on Windows
///
/// ```text
///   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       948
///   UDP    [::]:123               *:*                                    1432
/// ```
pub fn parse_netstat_ano(output: &str, captured_at: &str) -> Vec<NetworkConnection> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let proto = fields.first()?.to_ascii_lowercase();
            let (remote, status, pid) = match (proto.as_str(), fields.len()) {
                ("tcp", 5) => (fields[2], fields[3], fields[4]),
                ("udp", 4) => (fields[2], NO_STATE, fields[3]),
                _ => return None,
            };
            Some(NetworkConnection {
                proto,
                local_addr: fields[1].to_string(),
                remote_addr: remote.to_string(),
                status: status.to_string(),
                pid: pid.parse().ok()?,
                captured_at: captured_at.to_string(),
            })
        })
        .collect()
}

/// `lsof -nP -iTCP -iUDP` on macOS
///
/// ```text
/// COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
/// sshd      412 root    3u  IPv4 0x1234      0t0  TCP *:22 (LISTEN)
/// ```
pub fn parse_lsof(output: &str, captured_at: &str) -> Vec<NetworkConnection> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 9 {
                return None;
            }
            let pid: u32 = fields[1].parse().ok()?;
            let proto = fields[7].to_ascii_lowercase();
            if proto != "tcp" && proto != "udp" {
                return None;
            }
            let (local, remote) = match fields[8].split_once("->") {
                Some((local, remote)) => (local, remote.to_string()),
                None if proto == "udp" => (fields[8], UDP_REMOTE_ANY.to_string()),
                None => (fields[8], String::new()),
            };
            let status = fields
                .get(9)
                .map(|s| s.trim_matches(|c| c == '(' || c == ')'))
                .unwrap_or(NO_STATE);
            Some(NetworkConnection {
                proto,
                local_addr: local.to_string(),
                remote_addr: remote,
                status: status.to_string(),
                pid,
                captured_at: captured_at.to_string(),
            })
        })
        .collect()
}
