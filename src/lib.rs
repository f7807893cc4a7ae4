//! Vertex - XDP firewall rule compiler
//!
//! Stores named, time-limited packet filter rules and compiles them into the
//! configuration document read by the xdpfw engine.
//!
//! # Architecture
//!
//! - [`core`] - Filter model, document rendering, compilation, expiry sweeping
//! - [`store`] - Rule persistence (in-memory and on-disk)
//! - [`validators`] - Input validation for addresses, durations and settings
//! - [`config`] - Application configuration
//! - [`shutdown`] - SIGINT/SIGTERM handling for the daemon
//! - [`utils`] - Utility functions (XDG directories)

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod shutdown;
pub mod store;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::error::{Error, Result};
pub use core::filter::{Action, Filter};
pub use core::rule::Rule;
pub use core::xdp_config::{CompileSettings, Config};
