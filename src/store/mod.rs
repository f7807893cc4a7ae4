//! Rule persistence
//!
//! The core talks to storage only through [`RuleStore`]. Each call is atomic on
//! its own; nothing holds a lock across calls, so a rule may be created or
//! removed by another task between any two operations.
//!
//! - [`memory`]: in-process store, used by tests and embedders
//! - [`file`]: single JSON document on disk with atomic writes

pub mod file;
pub mod memory;

use std::future::Future;
use uuid::Uuid;

use crate::core::rule::Rule;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data directory not available")]
    DataDirUnavailable,
}

pub trait RuleStore: Send + Sync + 'static {
    /// Persists a new rule.
    fn insert(&self, rule: Rule) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All rules, oldest first (ties broken by id).
    fn list(&self) -> impl Future<Output = Result<Vec<Rule>, StoreError>> + Send;

    /// Removes the rule with `id`. Returns `Ok(false)` if it was already gone.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Stable listing order shared by all stores
pub(crate) fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
