//! Shared test utilities for core module tests
//!
//! Provides rule builders, proptest strategies, a structural re-parser for
//! emitted xdpfw text and a store with injectable faults.
//! This module is only compiled in test mode.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::core::filter::{Action, Filter};
use crate::core::rule::Rule;
use crate::store::{MemoryStore, RuleStore, StoreError};

/// The canonical filter used throughout the xdpfw examples
pub const REFERENCE_SPEC: &str =
    r#"{"pps": 10, "bps": 100, "blocktime": 1, "tos": 0, "srcip": "192.0.2.1"}"#;

pub fn reference_filter() -> Filter {
    Filter {
        packets_per_second: Some(10),
        bytes_per_second: Some(100),
        block_time: Some(1),
        type_of_service: Some(0),
        src_ip: Some("192.0.2.1".to_string()),
        ..Filter::default()
    }
}

/// Creates a rule with the reference filter and a fixed creation time.
pub fn rule_created_at(name: &str, expire: Duration, created_at: DateTime<Utc>) -> Rule {
    Rule {
        id: Uuid::new_v4(),
        name: name.to_string(),
        filter: REFERENCE_SPEC.to_string(),
        expire,
        created_at,
    }
}

/// Creates a one-hour rule carrying an arbitrary (possibly invalid) raw spec.
pub fn rule_with_filter(name: &str, spec: &str) -> Rule {
    Rule {
        filter: spec.to_string(),
        ..rule_created_at(name, Duration::from_secs(3600), Utc::now())
    }
}

/// Parses the body of one emitted filter block into `(key, raw value)` pairs.
///
/// Enforces the comma discipline: every line but the last ends in `,`.
pub fn parse_block(block: &str) -> Result<Vec<(String, String)>, String> {
    let lines: Vec<&str> = block.lines().map(str::trim).collect();
    if lines.first() != Some(&"{") || lines.last() != Some(&"}") {
        return Err(format!("not a block: {block:?}"));
    }
    parse_entries(&lines[1..lines.len() - 1])
}

fn parse_entries(lines: &[&str]) -> Result<Vec<(String, String)>, String> {
    let mut entries = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let last = i + 1 == lines.len();
        let entry = match (last, line.strip_suffix(',')) {
            (false, Some(entry)) => entry,
            (true, None) => line,
            _ => return Err(format!("bad comma on line {line:?}")),
        };
        let (key, value) = entry
            .split_once(" = ")
            .ok_or_else(|| format!("not a key/value line: {line:?}"))?;
        entries.push((key.to_string(), value.to_string()));
    }
    Ok(entries)
}

/// Parses the `filters = ( ... );` section of a full document.
pub fn parse_document(document: &str) -> Result<Vec<Vec<(String, String)>>, String> {
    let (_, rest) = document
        .split_once("filters = (\n")
        .ok_or("missing filters list")?;
    let body = rest.strip_suffix(");\n").ok_or("missing list terminator")?;

    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in body.lines() {
        match line {
            "  {" => current = Some(Vec::new()),
            "  }" | "  }," => {
                let lines = current.take().ok_or("unbalanced braces")?;
                blocks.push(parse_entries(&lines)?);
            }
            inner => {
                let lines = current.as_mut().ok_or("line outside block")?;
                let stripped = inner
                    .strip_prefix("    ")
                    .ok_or_else(|| format!("bad indentation: {inner:?}"))?;
                lines.push(stripped);
            }
        }
    }
    Ok(blocks)
}

fn arb_ipv4() -> impl Strategy<Value = String> {
    any::<[u8; 4]>().prop_map(|octets| Ipv4Addr::from(octets).to_string())
}

fn arb_ipv6() -> impl Strategy<Value = String> {
    any::<[u16; 8]>().prop_map(|segments| Ipv6Addr::from(segments).to_string())
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Deny), Just(Action::Allow)]
}

type HeaderFields = (
    Option<bool>,
    Option<Action>,
    Option<u16>,
    Option<u16>,
    Option<u64>,
    Option<u64>,
    Option<u32>,
    Option<u8>,
);

type IpFields = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<u8>,
    Option<u8>,
);

type TcpFields = (
    Option<bool>,
    Option<u16>,
    Option<u16>,
    Option<bool>,
    Option<bool>,
    Option<bool>,
    Option<bool>,
    Option<bool>,
    Option<bool>,
);

type UdpIcmpFields = (
    Option<bool>,
    Option<u16>,
    Option<u16>,
    Option<bool>,
    Option<u8>,
    Option<u8>,
);

prop_compose! {
    fn arb_header_fields()(
        enabled in any::<Option<bool>>(),
        action in proptest::option::of(arb_action()),
        min_len in any::<Option<u16>>(),
        max_len in any::<Option<u16>>(),
        pps in any::<Option<u64>>(),
        bps in any::<Option<u64>>(),
        block_time in any::<Option<u32>>(),
        tos in any::<Option<u8>>(),
    ) -> HeaderFields {
        (enabled, action, min_len, max_len, pps, bps, block_time, tos)
    }
}

prop_compose! {
    fn arb_ip_fields()(
        src_ip in proptest::option::of(arb_ipv4()),
        dst_ip in proptest::option::of(arb_ipv4()),
        src_ip6 in proptest::option::of(arb_ipv6()),
        dst_ip6 in proptest::option::of(arb_ipv6()),
        min_ttl in any::<Option<u8>>(),
        max_ttl in any::<Option<u8>>(),
    ) -> IpFields {
        (src_ip, dst_ip, src_ip6, dst_ip6, min_ttl, max_ttl)
    }
}

prop_compose! {
    fn arb_tcp_fields()(
        enabled in any::<Option<bool>>(),
        sport in any::<Option<u16>>(),
        dport in any::<Option<u16>>(),
        urg in any::<Option<bool>>(),
        ack in any::<Option<bool>>(),
        rst in any::<Option<bool>>(),
        psh in any::<Option<bool>>(),
        syn in any::<Option<bool>>(),
        fin in any::<Option<bool>>(),
    ) -> TcpFields {
        (enabled, sport, dport, urg, ack, rst, psh, syn, fin)
    }
}

prop_compose! {
    fn arb_udp_icmp_fields()(
        udp_enabled in any::<Option<bool>>(),
        udp_sport in any::<Option<u16>>(),
        udp_dport in any::<Option<u16>>(),
        icmp_enabled in any::<Option<bool>>(),
        icmp_code in any::<Option<u8>>(),
        icmp_type in any::<Option<u8>>(),
    ) -> UdpIcmpFields {
        (udp_enabled, udp_sport, udp_dport, icmp_enabled, icmp_code, icmp_type)
    }
}

prop_compose! {
    /// Valid filters with an arbitrary subset of fields present
    pub fn arb_filter()(
        header in arb_header_fields(),
        ip in arb_ip_fields(),
        tcp in arb_tcp_fields(),
        rest in arb_udp_icmp_fields(),
    ) -> Filter {
        let (enabled, action, min_len, max_len, packets_per_second, bytes_per_second, block_time, type_of_service) = header;
        let (src_ip, dst_ip, src_ip6, dst_ip6, min_ttl, max_ttl) = ip;
        let (tcp_enabled, tcp_src_port, tcp_dst_port, tcp_urg, tcp_ack, tcp_rst, tcp_psh, tcp_syn, tcp_fin) = tcp;
        let (udp_enabled, udp_src_port, udp_dst_port, icmp_enabled, icmp_code, icmp_type) = rest;

        Filter {
            enabled,
            action,
            min_len,
            max_len,
            packets_per_second,
            bytes_per_second,
            block_time,
            type_of_service,
            src_ip,
            dst_ip,
            src_ip6,
            dst_ip6,
            min_ttl,
            max_ttl,
            tcp_enabled,
            tcp_src_port,
            tcp_dst_port,
            tcp_urg,
            tcp_ack,
            tcp_rst,
            tcp_psh,
            tcp_syn,
            tcp_fin,
            udp_enabled,
            udp_src_port,
            udp_dst_port,
            icmp_enabled,
            icmp_code,
            icmp_type,
        }
    }
}

/// Memory store with switchable faults for exercising partial-failure paths
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_deletes: Mutex<HashSet<Uuid>>,
    vanishing: Mutex<HashSet<Uuid>>,
    list_fails: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            inner: MemoryStore::from_rules(rules),
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_delete_of(&self, id: Uuid) {
        self.failing_deletes.lock().unwrap().insert(id);
    }

    pub fn clear_failures(&self) {
        self.failing_deletes.lock().unwrap().clear();
        *self.list_fails.lock().unwrap() = false;
    }

    pub fn fail_list(&self, fail: bool) {
        *self.list_fails.lock().unwrap() = fail;
    }

    /// Makes `id` disappear right before the next delete of it, as if a
    /// concurrent caller had removed it first.
    pub fn vanish_before_delete(&self, id: Uuid) {
        self.vanishing.lock().unwrap().insert(id);
    }

    fn injected(message: &str) -> StoreError {
        StoreError::Io(std::io::Error::other(message.to_string()))
    }
}

impl RuleStore for FlakyStore {
    async fn insert(&self, rule: Rule) -> Result<(), StoreError> {
        self.inner.insert(rule).await
    }

    async fn list(&self) -> Result<Vec<Rule>, StoreError> {
        if *self.list_fails.lock().unwrap() {
            return Err(Self::injected("injected list failure"));
        }
        self.inner.list().await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        if self.failing_deletes.lock().unwrap().contains(&id) {
            return Err(Self::injected("injected delete failure"));
        }
        let vanished = self.vanishing.lock().unwrap().remove(&id);
        if vanished {
            self.inner.delete(id).await?;
        }
        self.inner.delete(id).await
    }
}
