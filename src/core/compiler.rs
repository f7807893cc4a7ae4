//! Turns persisted rules into the xdpfw configuration document
//!
//! Compilation does not filter by expiry; the sweeper keeps the store current.
//! Any failure aborts the whole compile, so a returned document is always
//! fully valid.

use tracing::{debug, info};

use crate::core::error::{Error, Result};
use crate::core::filter::Filter;
use crate::core::rule::Rule;
use crate::core::xdp_config::{CompileSettings, Config};
use crate::store::RuleStore;

/// Parses every rule's filter in order and assembles a validated [`Config`].
pub fn build_config(rules: &[Rule], settings: &CompileSettings) -> Result<Config> {
    let mut filters = Vec::with_capacity(rules.len());

    for rule in rules {
        let filter = Filter::from_spec(&rule.filter).map_err(|e| match e {
            Error::MalformedSpec(source) => Error::CorruptRule {
                id: rule.id,
                source,
            },
            other => other,
        })?;
        filters.push(filter);
    }

    let config = Config::new(settings, filters);
    config.validate()?;
    Ok(config)
}

/// Compiles `rules` into the document text.
pub fn compile(rules: &[Rule], settings: &CompileSettings) -> Result<String> {
    Ok(build_config(rules, settings)?.to_string())
}

/// Loads all rules from `store` and compiles them.
pub async fn generate<S: RuleStore>(store: &S, settings: &CompileSettings) -> Result<String> {
    let rules = store.list().await?;
    debug!("Compiling {} rules for {}", rules.len(), settings.interface);

    let document = compile(&rules, settings)?;
    info!(
        rules = rules.len(),
        interface = %settings.interface,
        "Generated xdpfw config"
    );
    Ok(document)
}
