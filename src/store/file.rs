//! JSON file rule store
//!
//! All rules live in one JSON array. Every mutating call rewrites the file
//! atomically (temp file + rename) and refreshes a SHA-256 sidecar checksum.
//! Each call holds an exclusive `flock` on `rules.json.lock` across its
//! read-modify-write, so separate processes sharing one store (the daemon and
//! one-shot CLI commands) never lose each other's updates. An async mutex
//! orders callers within a process before they queue on the file lock.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{RuleStore, StoreError, sort_rules};
use crate::core::rule::Rule;
use crate::utils::{FileLockGuard, get_data_dir, lock_exclusive, write_atomic};

pub const RULES_FILE_NAME: &str = "rules.json";

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

fn checksum(json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `rules.json` in the XDG data directory.
    pub fn default_location() -> Result<Self, StoreError> {
        let mut path = get_data_dir().ok_or(StoreError::DataDirUnavailable)?;
        path.push(RULES_FILE_NAME);
        Ok(Self::open(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    fn checksum_path(&self) -> PathBuf {
        self.sibling(".sha256")
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// Held for the duration of one store call.
    async fn lock(&self) -> Result<(MutexGuard<'_, ()>, FileLockGuard), StoreError> {
        let local = self.lock.lock().await;
        let shared = lock_exclusive(&self.lock_path()).await?;
        Ok((local, shared))
    }

    async fn load(&self) -> Result<Vec<Rule>, StoreError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let json = tokio::fs::read_to_string(&self.path).await?;

        // Warn but don't fail: the file may have been edited by hand
        if let Ok(expected) = tokio::fs::read_to_string(self.checksum_path()).await {
            let actual = checksum(&json);
            if expected.trim() != actual {
                tracing::warn!(
                    "Rule store {} checksum mismatch (expected: {}, got: {})",
                    self.path.display(),
                    expected.trim(),
                    actual
                );
            }
        }

        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&json)?)
    }

    async fn save(&self, rules: &[Rule]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rules)?;

        write_atomic(&self.path, json.as_bytes()).await?;
        write_atomic(&self.checksum_path(), checksum(&json).as_bytes()).await?;

        Ok(())
    }
}

impl RuleStore for FileStore {
    async fn insert(&self, rule: Rule) -> Result<(), StoreError> {
        let _guard = self.lock().await?;
        let mut rules = self.load().await?;
        rules.push(rule);
        sort_rules(&mut rules);
        self.save(&rules).await
    }

    async fn list(&self) -> Result<Vec<Rule>, StoreError> {
        let _guard = self.lock().await?;
        let mut rules = self.load().await?;
        sort_rules(&mut rules);
        Ok(rules)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.lock().await?;
        let mut rules = self.load().await?;
        let before = rules.len();
        rules.retain(|rule| rule.id != id);

        if rules.len() == before {
            return Ok(false);
        }

        self.save(&rules).await?;
        Ok(true)
    }
}
