//! Benchmarks for the normalization helpers on the log parsing hot path.

use chrono::NaiveDateTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_triage::collectors::parsers::auth_log::parse_auth_failures;
use rust_triage::normalize::{dedup_by_key, extract_after, normalize_timestamp};

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-10-14 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Timestamp forms seen across auth logs, journald, WMI and the unified log
fn bench_normalize_timestamp(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_timestamp");
    let inputs = [
        ("canonical", "2024-10-14 09:15:01"),
        ("syslog", "Oct 14 09:15:01"),
        ("iso_offset", "2024-10-14T09:15:01+02:00"),
        ("unified_log", "2024-10-14 09:15:01.123456-0700"),
        ("cim", "20241014091501.000000-000"),
        ("garbage", "not a time"),
    ];

    for (name, raw) in inputs {
        group.bench_with_input(BenchmarkId::new("form", name), &raw, |b, raw| {
            b.iter(|| normalize_timestamp(black_box(raw), now()));
        });
    }
    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_by_key");
    for size in [100usize, 1_000, 10_000] {
        // every record appears twice
        let items: Vec<(String, String)> = (0..size)
            .map(|i| (format!("2024-10-14 09:{:02}:00", (i / 2) % 60), format!("user{}", i / 2)))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| dedup_by_key(black_box(items.clone()), |(time, user)| (time.clone(), user.clone())));
        });
    }
    group.finish();
}

fn bench_extract_after(c: &mut Criterion) {
    let message = "An account failed to log on.\n\nLogon Type: 10\n\nAccount For Which Logon Failed:\n\tAccount Name: svc_backup\n\nFailure Information:\n\tFailure Reason: Unknown user name or bad password.\n\nNetwork Information:\n\tSource Network Address: 198.51.100.7";
    c.bench_function("extract_after", |b| {
        b.iter(|| {
            (
                extract_after(black_box(message), "Source Network Address:"),
                extract_after(black_box(message), "Failure Reason:"),
            )
        })
    });
}

fn bench_auth_log(c: &mut Criterion) {
    let lines = [
        "Oct 14 09:15:07 web01 sshd[2214]: Failed password for root from 198.51.100.4 port 40222 ssh2",
        "Oct 14 09:15:01 web01 sshd[2211]: Failed password for invalid user admin from 203.0.113.9 port 50122 ssh2",
        "Oct 14 09:20:44 web01 sshd[2301]: Accepted publickey for alice from 192.0.2.55 port 51000 ssh2",
        "Oct 14 09:21:00 web01 CRON[2400]: pam_unix(cron:session): session opened for user root by (uid=0)",
    ];
    let mut content = String::new();
    for i in 0..2_500 {
        content.push_str(lines[i % lines.len()]);
        content.push('\n');
    }

    let mut group = c.benchmark_group("auth_log");
    group.throughput(Throughput::Bytes(content.len() as u64));
    group.bench_function("parse_failures", |b| {
        b.iter(|| parse_auth_failures(black_box(&content), "/var/log/auth.log", now()))
    });
    group.finish();
}

criterion_group!(benches, bench_normalize_timestamp, bench_dedup, bench_extract_after, bench_auth_log);
criterion_main!(benches);
