use thiserror::Error;
use uuid::Uuid;

use crate::core::filter::FilterField;
use crate::store::StoreError;

/// Address family named in an address validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AddressFamily {
    #[strum(serialize = "IPv4")]
    V4,
    #[strum(serialize = "IPv6")]
    V6,
}

/// Core error types for vertex
#[derive(Debug, Error)]
pub enum Error {
    /// Raw filter specification could not be decoded
    #[error("Malformed filter spec: {0}")]
    MalformedSpec(#[source] serde_json::Error),

    /// An address field is present but not a literal of its family
    #[error("Invalid {family} address in {field}: {value:?}")]
    InvalidAddress {
        field: FilterField,
        family: AddressFamily,
        value: String,
    },

    /// A config-level setting failed its validity rule
    #[error("Validation error in {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// Rule lifetime could not be parsed
    #[error("Invalid expire duration {input:?}: {source}")]
    InvalidDuration {
        input: String,
        #[source]
        source: humantime::DurationError,
    },

    /// Compiled config would exceed the engine's filter limit
    #[error("Too many filters: {count} (max {max}, eBPF jump limit)")]
    TooManyFilters { count: usize, max: usize },

    /// A persisted rule no longer parses; specs are checked at submission so
    /// this means the store was modified behind our back
    #[error("Stored rule {id} has an unreadable filter: {source}")]
    CorruptRule {
        id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    /// Persistence collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Error {
    /// Whether the error was caused by caller input rather than an internal fault.
    ///
    /// Transports map client errors to a 4xx-style response and everything
    /// else to an internal error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedSpec(_)
                | Error::InvalidAddress { .. }
                | Error::InvalidField { .. }
                | Error::InvalidDuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
