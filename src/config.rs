//! Configuration loading helpers.
//!
//! Table tuning comes from an optional TOML file plus
//! `KMERDHT__section__field` environment overrides. The assembly driver
//! loads one [`KmerDhtConfig`] before launching the job and passes the
//! resulting [`TableOptions`] to every rank's table construction.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::DEFAULT_OUTBOX_CAPACITY;

/// Conventional sizing headroom: slots per expected distinct k-mer.
const CAPACITY_HEADROOM: u64 = 2;

/// Errors returned by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading config files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Invalid value for a key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown configuration key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Construction-time tuning for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Capacity of one per-target outbox, in records.
    ///
    /// Larger values amortize shipment cost; per-rank staging memory grows
    /// with `ranks * outbox_capacity * size_of::<R>()`.
    pub outbox_capacity: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

/// Top-level configuration schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KmerDhtConfig {
    /// Table configuration.
    pub table: Option<TableSpec>,
    /// Runtime configuration.
    pub runtime: Option<RuntimeSpec>,
}

/// `[table]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSpec {
    /// Requested slot count; overrides the sizing heuristic.
    pub capacity: Option<u64>,
    /// Capacity of one per-target outbox, in records.
    pub outbox_capacity: Option<usize>,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSpec {
    /// Number of ranks to launch.
    pub ranks: Option<usize>,
}

impl KmerDhtConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from the `KMERDHT_CONFIG` env var (if set), then
    /// apply `KMERDHT__section__field` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let config_path = env::var("KMERDHT_CONFIG").ok();
        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment overrides in-place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for (key, value) in env::vars() {
            if !key.starts_with("KMERDHT__") {
                continue;
            }
            let path = key["KMERDHT__".len()..].to_ascii_lowercase();
            let parts: Vec<&str> = path.split("__").collect();
            let value = value.trim().to_string();

            match parts.as_slice() {
                ["table", "capacity"] => {
                    self.table_mut().capacity = Some(parse_value(&key, &value)?);
                }
                ["table", "outbox_capacity"] => {
                    self.table_mut().outbox_capacity = Some(parse_value(&key, &value)?);
                }
                ["runtime", "ranks"] => {
                    self.runtime_mut().ranks = Some(parse_value(&key, &value)?);
                }
                _ => return Err(ConfigError::UnknownKey(key)),
            }
        }

        Ok(())
    }

    /// Build [`TableOptions`] using defaults plus overrides.
    pub fn to_table_options(&self) -> TableOptions {
        let mut options = TableOptions::default();
        if let Some(table) = &self.table {
            if let Some(outbox_capacity) = table.outbox_capacity {
                options.outbox_capacity = outbox_capacity;
            }
        }
        options
    }

    /// The slot count to construct with, given the expected number of
    /// distinct k-mers: the configured capacity, or double the distinct
    /// count.
    pub fn suggested_capacity(&self, distinct_kmers: u64) -> u64 {
        self.table
            .as_ref()
            .and_then(|t| t.capacity)
            .unwrap_or(distinct_kmers * CAPACITY_HEADROOM)
    }

    fn table_mut(&mut self) -> &mut TableSpec {
        self.table.get_or_insert_with(TableSpec::default)
    }

    fn runtime_mut(&mut self) -> &mut RuntimeSpec {
        self.runtime.get_or_insert_with(RuntimeSpec::default)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
