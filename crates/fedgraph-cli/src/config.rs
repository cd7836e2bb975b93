//! Gateway configuration (`fedgraph.toml`).
//!
//! ```toml
//! [gateway]
//! resolution_timeout_ms = 250
//!
//! [[subgraphs]]
//! name = "speakers"
//! schema = "speakers.graphql"
//! data = "speakers.json"
//! resolvers = ["Speaker"]
//! ```
//!
//! Relative `schema`/`data` paths resolve against the config file's directory.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "fedgraph.toml";
pub const DEFAULT_RESOLUTION_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config declares no subgraphs")]
    NoSubgraphs,

    #[error("invalid subgraph name `{name}` (expected lowercase letters, digits, `-` or `_`)")]
    InvalidName { name: String },

    #[error("subgraph `{name}` is declared more than once")]
    DuplicateName { name: String },

    #[error("resolution_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default)]
    pub resolution_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubgraphConfig {
    pub name: String,
    pub schema: PathBuf,
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Entity types this subgraph serves reference resolution for.
    #[serde(default)]
    pub resolvers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub subgraphs: Vec<SubgraphConfig>,
}

fn subgraph_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_-]{0,62}$").expect("subgraph name regex must compile")
    })
}

impl GatewayConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse config text, resolving relative paths against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        for subgraph in &mut config.subgraphs {
            subgraph.schema = base.join(&subgraph.schema);
            if let Some(data) = subgraph.data.take() {
                subgraph.data = Some(base.join(data));
            }
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.subgraphs.is_empty() {
            return Err(ConfigError::NoSubgraphs);
        }
        if self.gateway.resolution_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        let mut seen = BTreeSet::new();
        for subgraph in &self.subgraphs {
            if !subgraph_name_re().is_match(&subgraph.name) {
                return Err(ConfigError::InvalidName {
                    name: subgraph.name.clone(),
                });
            }
            if !seen.insert(subgraph.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    name: subgraph.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(
            self.gateway
                .resolution_timeout_ms
                .unwrap_or(DEFAULT_RESOLUTION_TIMEOUT_MS),
        )
    }
}
