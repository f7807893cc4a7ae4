use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{RuleStore, StoreError, sort_rules};
use crate::core::rule::Rule;

/// In-process rule store. The lock is held only inside a single call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rules: RwLock<HashMap<Uuid, Rule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: RwLock::new(rules.into_iter().map(|rule| (rule.id, rule)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RuleStore for MemoryStore {
    async fn insert(&self, rule: Rule) -> Result<(), StoreError> {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.id, rule);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Rule>, StoreError> {
        let mut rules: Vec<Rule> = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        sort_rules(&mut rules);
        Ok(rules)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some())
    }
}
