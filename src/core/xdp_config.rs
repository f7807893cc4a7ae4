//! Full xdpfw configuration document
//!
//! A [`Config`] is the ordered filter list plus the global settings the engine
//! reads from the document header. Filter order becomes match priority.

use std::fmt;

use crate::core::error::{Error, Result};
use crate::core::filter::Filter;
use crate::validators::{validate_interface, validate_update_time};

/// Maximum number of filters the engine can evaluate (eBPF jump limit)
pub const MAX_FILTERS: usize = 100;

/// Global settings written to the document header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Interface the XDP program attaches to
    pub interface: String,
    /// Seconds between the engine re-reading its config
    pub update_time: u32,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            update_time: 15,
        }
    }
}

/// The compiled document: header settings plus filter blocks in match order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Rendered as `interface = "...";`
    pub interface: String,
    /// Rendered as `updatetime = N;`
    pub update_time: u32,
    /// At most [`MAX_FILTERS`]; the first matching filter wins
    pub filters: Vec<Filter>,
}

impl Config {
    pub fn new(settings: &CompileSettings, filters: Vec<Filter>) -> Self {
        Self {
            interface: settings.interface.clone(),
            update_time: settings.update_time,
            filters,
        }
    }

    /// Checks the filter limit, the header settings and then every filter in
    /// sequence, returning the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.filters.len() > MAX_FILTERS {
            return Err(Error::TooManyFilters {
                count: self.filters.len(),
                max: MAX_FILTERS,
            });
        }

        validate_interface(&self.interface).map_err(|message| Error::InvalidField {
            field: "interface",
            message,
        })?;

        validate_update_time(self.update_time).map_err(|message| Error::InvalidField {
            field: "update_time",
            message,
        })?;

        for filter in &self.filters {
            filter.validate()?;
        }

        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "interface = \"{}\";", self.interface)?;
        writeln!(f, "updatetime = {};", self.update_time)?;
        writeln!(f)?;
        writeln!(f, "filters = (")?;

        for (i, filter) in self.filters.iter().enumerate() {
            let block = filter.to_string();
            let mut lines = block.lines().peekable();
            while let Some(line) = lines.next() {
                if lines.peek().is_some() {
                    writeln!(f, "  {line}")?;
                } else {
                    // Closing brace: separator follows on the same line
                    write!(f, "  {line}")?;
                }
            }

            if i + 1 != self.filters.len() {
                write!(f, ",")?;
            }
            writeln!(f)?;
        }

        writeln!(f, ");")
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::core::test_helpers::{arb_filter, parse_document};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_validate_fails_iff_over_limit_or_invalid(
            count in 0usize..=110,
            bad_index in proptest::option::of(0usize..110),
        ) {
            let mut filters = vec![Filter::default(); count];
            let has_bad = match bad_index {
                Some(i) if i < count => {
                    filters[i].src_ip6 = Some("nope".to_string());
                    true
                }
                _ => false,
            };
            let config = Config::new(&CompileSettings::default(), filters);
            let expect_err = count > MAX_FILTERS || has_bad;
            prop_assert_eq!(config.validate().is_err(), expect_err);
        }

        #[test]
        fn test_document_reparse_preserves_order(filters in prop::collection::vec(arb_filter(), 0..8)) {
            let config = Config::new(&CompileSettings::default(), filters.clone());
            let parsed = parse_document(&config.to_string()).unwrap();

            prop_assert_eq!(parsed.len(), filters.len());
            for (blocks, filter) in parsed.iter().zip(&filters) {
                let expected: Vec<(String, String)> = filter
                    .present_fields()
                    .map(|(f, v)| (f.to_string(), v.to_string()))
                    .collect();
                prop_assert_eq!(blocks, &expected);
            }
        }
    }
}
