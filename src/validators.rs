//! Input validation helpers for vertex
//!
//! Centralizes the checks applied to user-submitted rule fields and to the
//! global settings that end up in the compiled xdpfw document.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Validates a network interface name for the `interface = "...";` header.
///
/// Linux kernel interface name rules:
/// - Max 15 characters (IFNAMSIZ - 1)
/// - Alphanumeric, dot, dash, underscore only
/// - Cannot be "." or ".."
///
/// The engine needs an interface to attach to, so the empty name is rejected.
///
/// # Errors
///
/// Returns `Err` if the name is empty or violates kernel constraints.
pub fn validate_interface(name: &str) -> Result<&str, String> {
    if name.is_empty() {
        return Err("Interface must be set".to_string());
    }

    if name.len() > 15 {
        return Err("Interface name too long (max 15 characters)".to_string());
    }

    if name == "." || name == ".." {
        return Err("Invalid interface name".to_string());
    }

    // ASCII only; a quote here would break out of the header string
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Interface name contains invalid characters".to_string());
    }

    Ok(name)
}

/// Validates the engine's rule update interval in seconds.
///
/// # Errors
///
/// Returns `Err` if the interval is 0.
pub fn validate_update_time(secs: u32) -> Result<u32, String> {
    if secs < 1 {
        Err("update_time must be greater than 0".to_string())
    } else {
        Ok(secs)
    }
}

/// Parses a literal IPv4 address (no CIDR suffix, no surrounding whitespace).
///
/// # Errors
///
/// Returns `Err` if the input is not a dotted-quad IPv4 literal.
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, String> {
    input
        .parse::<Ipv4Addr>()
        .map_err(|_| format!("{input:?} is not an IPv4 address"))
}

/// Parses a literal IPv6 address (no CIDR suffix, no brackets).
///
/// # Errors
///
/// Returns `Err` if the input is not an IPv6 literal.
pub fn parse_ipv6(input: &str) -> Result<Ipv6Addr, String> {
    input
        .parse::<Ipv6Addr>()
        .map_err(|_| format!("{input:?} is not an IPv6 address"))
}

/// Parses a rule lifetime such as `30s`, `90m`, `1h 30m` or `2days`.
///
/// # Errors
///
/// Returns the underlying `humantime` error for unparseable input.
pub fn parse_expire(input: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(input.trim())
}

/// Parses a sweep period. Unlike a rule lifetime it must be positive.
///
/// # Errors
///
/// Returns `Err` for unparseable or zero durations.
pub fn parse_sweep_interval(input: &str) -> Result<Duration, String> {
    match parse_expire(input) {
        Ok(period) if period.is_zero() => Err("sweep interval must be positive".to_string()),
        Ok(period) => Ok(period),
        Err(e) => Err(format!("invalid sweep interval {input:?}: {e}")),
    }
}

/// Renders a rule lifetime in the same syntax `parse_expire` accepts.
pub fn format_expire(lifetime: Duration) -> String {
    humantime::format_duration(lifetime).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_interface_valid() {
        assert!(validate_interface("eth0").is_ok());
        assert!(validate_interface("br0.100").is_ok());
        assert!(validate_interface("wlan_2").is_ok());
        assert!(validate_interface("enp3s0").is_ok());
    }

    #[test]
    fn test_validate_interface_empty() {
        assert!(validate_interface("").is_err());
    }

    #[test]
    fn test_validate_interface_invalid() {
        assert!(validate_interface(".").is_err());
        assert!(validate_interface("..").is_err());
        assert!(validate_interface("eth0\"; evil").is_err());
        assert!(validate_interface("test|pipe").is_err());
    }

    #[test]
    fn test_validate_interface_too_long() {
        let long_name = "a".repeat(16);
        assert!(validate_interface(&long_name).is_err());
        assert!(validate_interface(&"a".repeat(15)).is_ok());
    }

    #[test]
    fn test_validate_update_time() {
        assert!(validate_update_time(0).is_err());
        assert_eq!(validate_update_time(1).unwrap(), 1);
        assert_eq!(validate_update_time(15).unwrap(), 15);
    }

    #[test]
    fn test_parse_addresses() {
        assert!(parse_ipv4("192.0.2.1").is_ok());
        assert!(parse_ipv4("2001:db8::1").is_err());
        assert!(parse_ipv4("not-an-ip").is_err());
        assert!(parse_ipv6("2001:db8::1").is_ok());
        assert!(parse_ipv6("::ffff:192.0.2.1").is_ok());
        assert!(parse_ipv6("192.0.2.1").is_err());
        assert!(parse_ipv6("[::1]").is_err());
    }

    #[test]
    fn test_parse_expire() {
        assert_eq!(parse_expire("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_expire("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_expire("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_expire(" 2m ").unwrap(), Duration::from_secs(120));
        assert!(parse_expire("").is_err());
        assert!(parse_expire("forever").is_err());
        assert!(parse_expire("10").is_err());
    }

    #[test]
    fn test_parse_sweep_interval() {
        assert_eq!(parse_sweep_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_sweep_interval("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_sweep_interval("0s").is_err());
        assert!(parse_sweep_interval("often").is_err());
    }

    #[test]
    fn test_format_expire() {
        assert_eq!(format_expire(Duration::from_secs(1)), "1s");
        assert_eq!(format_expire(Duration::from_secs(5400)), "1h 30m");
    }
}
