//! Rule operations exposed to transports
//!
//! [`RuleService`] is the boundary a transport (HTTP handler, CLI) calls into.
//! Submission-time validation happens here so that nothing invalid is ever
//! persisted; [`Error::is_client_error`] tells the transport how to report a
//! failure.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::compiler;
use crate::core::error::{Error, Result};
use crate::core::filter::Filter;
use crate::core::rule::{Rule, RuleSummary};
use crate::core::xdp_config::CompileSettings;
use crate::store::RuleStore;
use crate::validators::parse_expire;

/// Create request as submitted by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateRule {
    pub name: String,
    /// Raw filter spec
    pub filter: String,
    /// Lifetime, e.g. `"1h 30m"`
    pub expire: String,
}

pub struct RuleService<S> {
    store: Arc<S>,
    settings: CompileSettings,
}

impl<S> Clone for RuleService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
        }
    }
}

impl<S: RuleStore> RuleService<S> {
    pub fn new(store: Arc<S>, settings: CompileSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    /// Validates and persists a new rule.
    ///
    /// The raw filter text is stored verbatim; it was just proven to parse
    /// and validate, so compilation can re-parse it later.
    pub async fn create(&self, request: CreateRule) -> Result<Rule> {
        let expire = parse_expire(&request.expire).map_err(|source| Error::InvalidDuration {
            input: request.expire.clone(),
            source,
        })?;

        let filter = Filter::from_spec(&request.filter)?;
        filter.validate()?;

        let rule = Rule::new(request.name, request.filter, expire);
        debug!("Creating {:?}", rule);

        self.store.insert(rule.clone()).await?;
        info!(id = %rule.id, name = %rule.name, "Rule created");
        Ok(rule)
    }

    pub async fn list(&self) -> Result<Vec<RuleSummary>> {
        let rules = self.store.list().await?;
        debug!("Retrieved {} rules", rules.len());
        Ok(rules.iter().map(Rule::summary).collect())
    }

    /// Removes a rule. Returns whether it existed; absence is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        debug!("Deleting rule {id}");
        let removed = self.store.delete(id).await?;
        if removed {
            info!(%id, "Rule deleted");
        } else {
            debug!(%id, "Rule already absent");
        }
        Ok(removed)
    }

    /// Compiles every stored rule into the xdpfw document.
    pub async fn generate(&self) -> Result<String> {
        compiler::generate(self.store.as_ref(), &self.settings).await
    }
}
