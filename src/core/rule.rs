//! Persisted rule records and their expiration semantics
//!
//! A [`Rule`] wraps a raw filter spec with a name and a lifetime. The raw text
//! is stored exactly as submitted and re-parsed at compile time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::validators::format_expire;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    /// Raw filter spec, kept verbatim
    pub filter: String,
    /// Requested lifetime
    pub expire: Duration,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Creates a rule with a fresh id, stamped with the current time.
    ///
    /// Callers are expected to have validated `filter` already.
    pub fn new(name: String, filter: String, expire: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            filter,
            expire,
            created_at: Utc::now(),
        }
    }

    /// Time elapsed since creation, or zero if `created_at` is in the future.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.created_at)
            .max(TimeDelta::zero())
    }

    /// A rule is expired once its age strictly exceeds its lifetime.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match TimeDelta::from_std(self.expire) {
            Ok(lifetime) => self.age(now) > lifetime,
            // Lifetimes beyond chrono's range never elapse
            Err(_) => false,
        }
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            id: self.id,
            name: self.name.clone(),
            filter: self.filter.clone(),
            expire: format_expire(self.expire),
            created_at: self.created_at,
        }
    }
}

/// Listing view of a rule with its lifetime rendered as a duration string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: Uuid,
    pub name: String,
    pub filter: String,
    pub expire: String,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}
