//! Layered configuration for the SplitSage engine.
//!
//! Sources are merged in order: built-in defaults, `config/default.toml`,
//! `config/{env}.toml`, then `SPLITSAGE__*` environment variables
//! (`SPLITSAGE__LOG__LEVEL=debug`, `SPLITSAGE__CURRENCIES__JPY=0`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use splitsage_core::{CurrencyUnits, MAX_EXPONENT};

pub const DEFAULT_ENV_PREFIX: &str = "SPLITSAGE";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots in the broadcast bus before slow subscribers start lagging.
    pub event_bus_capacity: usize,
    /// Minor-unit exponent overrides keyed by currency code.
    pub currencies: BTreeMap<String, u32>,
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 1024,
            currencies: BTreeMap::new(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot represent.
    pub fn validate(&self) -> Result<()> {
        for (code, exponent) in &self.currencies {
            ensure!(
                *exponent <= MAX_EXPONENT,
                "currency {code} has exponent {exponent}; at most {MAX_EXPONENT} is supported"
            );
        }
        Ok(())
    }

    /// Currency precision table with the configured overrides applied.
    pub fn currency_units(&self) -> CurrencyUnits {
        CurrencyUnits::from_overrides(
            self.currencies
                .iter()
                .map(|(code, exponent)| (code.as_str(), *exponent)),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `splitsage_engine=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Builder over the configuration sources.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    dir: PathBuf,
    env: Option<String>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("config"),
            env: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }

    /// Environment name selecting the `config/{env}.toml` overlay.
    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(&self) -> Result<EngineConfig> {
        let mut builder = Config::builder()
            .add_source(
                Config::try_from(&EngineConfig::default())
                    .context("failed to serialize default configuration")?,
            )
            .add_source(toml_file(&self.dir.join("default.toml")));
        if let Some(env) = &self.env {
            builder = builder.add_source(toml_file(&self.dir.join(format!("{env}.toml"))));
        }
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let settings = builder
            .build()
            .with_context(|| format!("failed to load configuration from {}", self.dir.display()))?;
        let config: EngineConfig = settings
            .try_deserialize()
            .context("invalid engine configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn toml_file(path: &Path) -> impl config::Source + Send + Sync + 'static {
    File::new(&path.to_string_lossy(), FileFormat::Toml).required(false)
}

/// Load configuration from `./config` for the given environment name.
pub fn load_config(env: Option<&str>) -> Result<EngineConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(env) = env {
        loader = loader.env(env);
    }
    loader.load()
}

/// Parse a standalone TOML document. Missing keys take their defaults.
pub fn from_toml_str(raw: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(raw).context("invalid engine configuration")?;
    config.validate()?;
    Ok(config)
}
