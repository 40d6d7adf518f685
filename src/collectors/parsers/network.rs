//! Interface listings from `ip`, `ifconfig` and the default route.

use std::collections::HashMap;
use std::net::IpAddr;

use crate::collectors::host::InterfaceCounters;
use crate::models::InterfaceStat;
use crate::normalize::extract_token_after;

/// Address information for one interface, before counters are attached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceAddr {
    pub name: String,
    pub ip: String,
    pub mac: String,
}

/// Strip prefix length and zone suffix: `fe80::1%en0/64` -> `fe80::1`
fn bare_address(raw: &str) -> &str {
    let raw = raw.split('/').next().unwrap_or(raw);
    raw.split('%').next().unwrap_or(raw)
}

/// First non-loopback address, IPv4 preferred
fn pick_address(candidates: &[String]) -> String {
    let parsed: Vec<(IpAddr, &String)> = candidates
        .iter()
        .filter_map(|raw| bare_address(raw).parse::<IpAddr>().ok().map(|ip| (ip, raw)))
        .filter(|(ip, _)| !ip.is_loopback())
        .collect();
    parsed
        .iter()
        .find(|(ip, _)| ip.is_ipv4())
        .or_else(|| parsed.first())
        .map(|(ip, _)| ip.to_string())
        .unwrap_or_default()
}

/// `ip -o link`: interface names in order with their MAC addresses
pub fn parse_ip_link(output: &str) -> Vec<InterfaceAddr> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ": ");
            let _index = parts.next()?;
            let name = parts.next()?.split('@').next()?.trim();
            if name.is_empty() {
                return None;
            }
            let rest = parts.next().unwrap_or_default();
            let mac = extract_token_after(rest, "link/ether ").unwrap_or_default();
            Some(InterfaceAddr {
                name: name.to_string(),
                ip: String::new(),
                mac,
            })
        })
        .collect()
}

/// `ip -o addr`: chosen address per interface name
pub fn parse_ip_addr(output: &str) -> HashMap<String, String> {
    let mut candidates: HashMap<String, Vec<String>> = HashMap::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || !(fields[2] == "inet" || fields[2] == "inet6") {
            continue;
        }
        let name = fields[1].trim_end_matches(':').split('@').next().unwrap_or(fields[1]);
        candidates
            .entry(name.to_string())
            .or_default()
            .push(fields[3].to_string());
    }
    candidates
        .into_iter()
        .map(|(name, addrs)| (name, pick_address(&addrs)))
        .collect()
}

/// Combine `ip -o link` and `ip -o addr` output
pub fn parse_ip_interfaces(link_output: &str, addr_output: &str) -> Vec<InterfaceAddr> {
    let addresses = parse_ip_addr(addr_output);
    parse_ip_link(link_output)
        .into_iter()
        .map(|mut iface| {
            if let Some(ip) = addresses.get(&iface.name) {
                iface.ip = ip.clone();
            }
            iface
        })
        .collect()
}

/// `ifconfig -a` blocks, one per interface
pub fn parse_ifconfig(output: &str) -> Vec<InterfaceAddr> {
    let mut interfaces = Vec::new();
    let mut current: Option<(InterfaceAddr, Vec<String>)> = None;

    let finish = |entry: Option<(InterfaceAddr, Vec<String>)>, out: &mut Vec<InterfaceAddr>| {
        if let Some((mut iface, addrs)) = entry {
            iface.ip = pick_address(&addrs);
            out.push(iface);
        }
    };

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            finish(current.take(), &mut interfaces);
            let name = line.split(':').next().unwrap_or_default().trim();
            let name = name.split_whitespace().next().unwrap_or(name);
            current = Some((
                InterfaceAddr {
                    name: name.to_string(),
                    ..Default::default()
                },
                Vec::new(),
            ));
            continue;
        }
        let Some((iface, addrs)) = current.as_mut() else {
            continue;
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["ether", mac, ..] => iface.mac = mac.to_string(),
            ["inet", addr, ..] | ["inet6", addr, ..] => {
                addrs.push(addr.trim_start_matches("addr:").to_string())
            }
            _ => {}
        }
    }
    finish(current.take(), &mut interfaces);
    interfaces
}

/// Default gateway from `ip route show default` or `route -n get default`
pub fn parse_default_gateway(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        extract_token_after(line, "default via ").or_else(|| extract_token_after(line, "gateway:"))
    })
}

/// Attach traffic counters by interface name.
///
/// Interfaces without counters keep zeroes; counters without a listed
/// interface are appended after the listed ones.
pub fn merge_interfaces(addrs: Vec<InterfaceAddr>, counters: &[InterfaceCounters]) -> Vec<InterfaceStat> {
    let by_name: HashMap<&str, &InterfaceCounters> =
        counters.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut listed: Vec<InterfaceStat> = addrs
        .into_iter()
        .map(|addr| {
            let c = by_name.get(addr.name.as_str());
            InterfaceStat {
                bytes_sent: c.map_or(0, |c| c.bytes_sent),
                bytes_recv: c.map_or(0, |c| c.bytes_recv),
                packets_sent: c.map_or(0, |c| c.packets_sent),
                packets_recv: c.map_or(0, |c| c.packets_recv),
                name: addr.name,
                ip: addr.ip,
                mac: addr.mac,
            }
        })
        .collect();

    let unlisted: Vec<InterfaceStat> = counters
        .iter()
        .filter(|c| !listed.iter().any(|s| s.name == c.name))
        .map(|c| InterfaceStat {
            name: c.name.clone(),
            ip: String::new(),
            mac: String::new(),
            bytes_sent: c.bytes_sent,
            bytes_recv: c.bytes_recv,
            packets_sent: c.packets_sent,
            packets_recv: c.packets_recv,
        })
        .collect();
    listed.extend(unlisted);
    listed
}
