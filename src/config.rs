//! Process-wide defaults.
//!
//! Every operation that takes options falls back to these values for the
//! fields a caller leaves unset. The configuration is fixed on first use;
//! call [`Config::install`] before any analysis to replace the defaults.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::compare::ComparisonLevel;
use crate::rings::RingSearchOptions;

static GLOBAL: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Level used when a comparison names none.
    pub comparison_level: ComparisonLevel,
    pub ring_search: RingSearchOptions,
    pub structure_search: SearchDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// Standardize query and target before substructure search.
    pub do_standardize: bool,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            do_standardize: true,
        }
    }
}

impl Config {
    /// The active configuration.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(Config::default)
    }

    /// Make `self` the active configuration. Fails, handing the value back,
    /// once the configuration has been read or installed.
    pub fn install(self) -> Result<(), Config> {
        GLOBAL.set(self).inspect(|_| tracing::debug!("configuration installed"))
    }

    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
