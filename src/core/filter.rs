//! xdpfw filter model, validation and block serialization
//!
//! A [`Filter`] is one packet-matching criterion set. Every field is optional:
//! an absent field means "do not constrain on this criterion", which is
//! distinct from a present zero value.
//!
//! # Block Format
//!
//! [`Filter`] implements [`Display`](fmt::Display) in the xdpfw grammar. Present
//! fields are emitted one per line in declaration order (see [`FilterField`]),
//! each terminated by a comma except the last:
//!
//! ```
//! use vertex::core::filter::Filter;
//!
//! let filter = Filter::from_spec(r#"{"pps": 10, "srcip": "192.0.2.1"}"#).unwrap();
//! assert_eq!(filter.to_string(), "{\n  pps = 10,\n  srcip = \"192.0.2.1\"\n}");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{AddressFamily, Error, Result};
use crate::validators::{parse_ipv4, parse_ipv6};

/// Number of fields in the filter schema
pub const FIELD_COUNT: usize = 29;

/// Filter action, encoded as an integer in both raw specs and compiled output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Action {
    /// Block the packet (and the source for `blocktime` seconds)
    #[default]
    Deny,
    /// Let the packet through
    Allow,
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Deny),
            1 => Ok(Action::Allow),
            other => Err(format!("action must be 0 (deny) or 1 (allow), got {other}")),
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        match action {
            Action::Deny => 0,
            Action::Allow => 1,
        }
    }
}

/// Keys of the filter schema, in the order the engine expects them.
///
/// The `strum` names are both the raw spec keys and the compiled block keys.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
pub enum FilterField {
    #[strum(serialize = "enabled")]
    Enabled,
    #[strum(serialize = "action")]
    Action,
    #[strum(serialize = "min_len")]
    MinLen,
    #[strum(serialize = "max_len")]
    MaxLen,
    #[strum(serialize = "pps")]
    PacketsPerSecond,
    #[strum(serialize = "bps")]
    BytesPerSecond,
    #[strum(serialize = "blocktime")]
    BlockTime,
    #[strum(serialize = "tos")]
    TypeOfService,
    #[strum(serialize = "srcip")]
    SrcIp,
    #[strum(serialize = "dstip")]
    DstIp,
    #[strum(serialize = "srcip6")]
    SrcIp6,
    #[strum(serialize = "dstip6")]
    DstIp6,
    #[strum(serialize = "min_ttl")]
    MinTtl,
    #[strum(serialize = "max_ttl")]
    MaxTtl,
    #[strum(serialize = "tcp_enabled")]
    TcpEnabled,
    #[strum(serialize = "tcp_sport")]
    TcpSrcPort,
    #[strum(serialize = "tcp_dport")]
    TcpDstPort,
    #[strum(serialize = "tcp_urg")]
    TcpUrg,
    #[strum(serialize = "tcp_ack")]
    TcpAck,
    #[strum(serialize = "tcp_rst")]
    TcpRst,
    #[strum(serialize = "tcp_psh")]
    TcpPsh,
    #[strum(serialize = "tcp_syn")]
    TcpSyn,
    #[strum(serialize = "tcp_fin")]
    TcpFin,
    #[strum(serialize = "udp_enabled")]
    UdpEnabled,
    #[strum(serialize = "udp_sport")]
    UdpSrcPort,
    #[strum(serialize = "udp_dport")]
    UdpDstPort,
    #[strum(serialize = "icmp_enabled")]
    IcmpEnabled,
    #[strum(serialize = "icmp_code")]
    IcmpCode,
    #[strum(serialize = "icmp_type")]
    IcmpType,
}

/// A present field value as it appears in a compiled block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Bool(bool),
    Int(u64),
    Text(&'a str),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// An xdpfw filter policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Should this rule be enabled?
    #[serde(rename = "enabled", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Deny or allow traffic that matches this rule
    #[serde(rename = "action", skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Minimum frame length (ethernet header, IP header, L4 header, and data)
    #[serde(rename = "min_len", skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u16>,
    /// Maximum frame length (ethernet header, IP header, L4 header, and data)
    #[serde(rename = "max_len", skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u16>,
    /// Packets per second a source IP can send before matching
    #[serde(rename = "pps", skip_serializing_if = "Option::is_none")]
    pub packets_per_second: Option<u64>,
    /// Bytes per second a source IP can send before matching
    #[serde(rename = "bps", skip_serializing_if = "Option::is_none")]
    pub bytes_per_second: Option<u64>,
    /// Seconds to block the source when a deny rule matches (engine default: 1)
    #[serde(rename = "blocktime", skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u32>,

    // IP options
    #[serde(rename = "tos", skip_serializing_if = "Option::is_none")]
    pub type_of_service: Option<u8>,
    #[serde(rename = "srcip", skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(rename = "dstip", skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    #[serde(rename = "srcip6", skip_serializing_if = "Option::is_none")]
    pub src_ip6: Option<String>,
    #[serde(rename = "dstip6", skip_serializing_if = "Option::is_none")]
    pub dst_ip6: Option<String>,
    #[serde(rename = "min_ttl", skip_serializing_if = "Option::is_none")]
    pub min_ttl: Option<u8>,
    #[serde(rename = "max_ttl", skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<u8>,

    // TCP options
    #[serde(rename = "tcp_enabled", skip_serializing_if = "Option::is_none")]
    pub tcp_enabled: Option<bool>,
    #[serde(rename = "tcp_sport", skip_serializing_if = "Option::is_none")]
    pub tcp_src_port: Option<u16>,
    #[serde(rename = "tcp_dport", skip_serializing_if = "Option::is_none")]
    pub tcp_dst_port: Option<u16>,
    #[serde(rename = "tcp_urg", skip_serializing_if = "Option::is_none")]
    pub tcp_urg: Option<bool>,
    #[serde(rename = "tcp_ack", skip_serializing_if = "Option::is_none")]
    pub tcp_ack: Option<bool>,
    #[serde(rename = "tcp_rst", skip_serializing_if = "Option::is_none")]
    pub tcp_rst: Option<bool>,
    #[serde(rename = "tcp_psh", skip_serializing_if = "Option::is_none")]
    pub tcp_psh: Option<bool>,
    #[serde(rename = "tcp_syn", skip_serializing_if = "Option::is_none")]
    pub tcp_syn: Option<bool>,
    #[serde(rename = "tcp_fin", skip_serializing_if = "Option::is_none")]
    pub tcp_fin: Option<bool>,

    // UDP options
    #[serde(rename = "udp_enabled", skip_serializing_if = "Option::is_none")]
    pub udp_enabled: Option<bool>,
    #[serde(rename = "udp_sport", skip_serializing_if = "Option::is_none")]
    pub udp_src_port: Option<u16>,
    #[serde(rename = "udp_dport", skip_serializing_if = "Option::is_none")]
    pub udp_dst_port: Option<u16>,

    // ICMP options
    #[serde(rename = "icmp_enabled", skip_serializing_if = "Option::is_none")]
    pub icmp_enabled: Option<bool>,
    #[serde(rename = "icmp_code", skip_serializing_if = "Option::is_none")]
    pub icmp_code: Option<u8>,
    #[serde(rename = "icmp_type", skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<u8>,
}

fn flag(v: Option<bool>) -> Option<FieldValue<'static>> {
    v.map(FieldValue::Bool)
}

fn int(v: Option<impl Into<u64>>) -> Option<FieldValue<'static>> {
    v.map(|n| FieldValue::Int(n.into()))
}

fn text(v: Option<&String>) -> Option<FieldValue<'_>> {
    v.map(|s| FieldValue::Text(s.as_str()))
}

impl Filter {
    /// Decodes a raw JSON filter spec.
    ///
    /// The spec must be a JSON object; the positional array form serde would
    /// otherwise accept for a struct is rejected. Unknown keys are ignored.
    /// Wrong types, out-of-range numbers and action codes other than 0/1 fail
    /// the whole decode.
    pub fn from_spec(raw: &str) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(raw).map_err(Error::MalformedSpec)?;
        serde_json::from_value(serde_json::Value::Object(object)).map_err(Error::MalformedSpec)
    }

    /// Every schema field paired with its value, in declaration order.
    ///
    /// This list is the serialization order contract with the engine.
    pub fn fields(&self) -> [(FilterField, Option<FieldValue<'_>>); FIELD_COUNT] {
        use FilterField as F;
        [
            (F::Enabled, flag(self.enabled)),
            (F::Action, int(self.action.map(u8::from))),
            (F::MinLen, int(self.min_len)),
            (F::MaxLen, int(self.max_len)),
            (F::PacketsPerSecond, int(self.packets_per_second)),
            (F::BytesPerSecond, int(self.bytes_per_second)),
            (F::BlockTime, int(self.block_time)),
            (F::TypeOfService, int(self.type_of_service)),
            (F::SrcIp, text(self.src_ip.as_ref())),
            (F::DstIp, text(self.dst_ip.as_ref())),
            (F::SrcIp6, text(self.src_ip6.as_ref())),
            (F::DstIp6, text(self.dst_ip6.as_ref())),
            (F::MinTtl, int(self.min_ttl)),
            (F::MaxTtl, int(self.max_ttl)),
            (F::TcpEnabled, flag(self.tcp_enabled)),
            (F::TcpSrcPort, int(self.tcp_src_port)),
            (F::TcpDstPort, int(self.tcp_dst_port)),
            (F::TcpUrg, flag(self.tcp_urg)),
            (F::TcpAck, flag(self.tcp_ack)),
            (F::TcpRst, flag(self.tcp_rst)),
            (F::TcpPsh, flag(self.tcp_psh)),
            (F::TcpSyn, flag(self.tcp_syn)),
            (F::TcpFin, flag(self.tcp_fin)),
            (F::UdpEnabled, flag(self.udp_enabled)),
            (F::UdpSrcPort, int(self.udp_src_port)),
            (F::UdpDstPort, int(self.udp_dst_port)),
            (F::IcmpEnabled, flag(self.icmp_enabled)),
            (F::IcmpCode, int(self.icmp_code)),
            (F::IcmpType, int(self.icmp_type)),
        ]
    }

    /// Present fields only, in declaration order
    pub fn present_fields(&self) -> impl Iterator<Item = (FilterField, FieldValue<'_>)> {
        self.fields()
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().next().is_none()
    }

    /// Checks every present address field against its declared family.
    ///
    /// Absent fields never fail.
    pub fn validate(&self) -> Result<()> {
        check_address(FilterField::SrcIp, AddressFamily::V4, self.src_ip.as_deref())?;
        check_address(FilterField::DstIp, AddressFamily::V4, self.dst_ip.as_deref())?;
        check_address(FilterField::SrcIp6, AddressFamily::V6, self.src_ip6.as_deref())?;
        check_address(FilterField::DstIp6, AddressFamily::V6, self.dst_ip6.as_deref())?;
        Ok(())
    }
}

fn check_address(field: FilterField, family: AddressFamily, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };

    let parsed = match family {
        AddressFamily::V4 => parse_ipv4(value).map(|_| ()),
        AddressFamily::V6 => parse_ipv6(value).map(|_| ()),
    };

    parsed.map_err(|_| Error::InvalidAddress {
        field,
        family,
        value: value.to_string(),
    })
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;

        let mut present = self.present_fields().peekable();
        while let Some((field, value)) = present.next() {
            // Last present field carries no trailing comma
            let sep = if present.peek().is_some() { "," } else { "" };
            writeln!(f, "  {field} = {value}{sep}")?;
        }

        write!(f, "}}")
    }
}
