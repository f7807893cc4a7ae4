//! Core rule policy functionality
//!
//! This module contains the types and logic for turning stored rules into an
//! xdpfw configuration document. It provides:
//!
//! - [`filter`]: The per-rule match criteria and their block rendering
//! - [`xdp_config`]: The whole document (interface, update time, filter list)
//! - [`rule`]: Persisted rule records and expiry
//! - [`compiler`]: Rules in, document text out
//! - [`sweeper`]: Background eviction of expired rules
//! - [`service`]: Create/list/delete/generate as called by transports
//! - [`error`]: Error types for all of the above

pub mod compiler;
pub mod error;
pub mod filter;
pub mod rule;
pub mod service;
pub mod sweeper;
pub mod xdp_config;

#[cfg(test)]
pub mod test_helpers;
