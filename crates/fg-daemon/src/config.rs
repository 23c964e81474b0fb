//! # Daemon Configuration
//!
//! TOML configuration for the finality gadget daemon. Every section has
//! defaults, so an empty file parses; `validate()` enforces what the engine
//! cannot run without.
//!
//! ```toml
//! rpc_listener = "127.0.0.1:50051"
//!
//! [babylon]
//! contract_addr = "bbn1..."
//! chain_id = "euphrates-0.4.0"
//! network = "testnet"
//!
//! [bitcoin]
//! rpc_host = "127.0.0.1:18443"
//!
//! [engine]
//! max_in_flight_queries = 16
//! query_timeout_secs = 30
//! power_strategy = "concurrent"
//!
//! [collaborators]
//! snapshot = "snapshot.json"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fg_finality::{FinalityConfig, PowerStrategy};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding `[logging] level`
pub const LOG_LEVEL_ENV: &str = "FG_LOG_LEVEL";

const LOCALNET_RPC_ADDR: &str = "http://127.0.0.1:26657";
const DEVNET_RPC_ADDR: &str = "https://rpc-euphrates.devnet.babylonchain.io/";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine.max_in_flight_queries must be at least 1")]
    ZeroInFlight,

    #[error("babylon.contract_addr is not set")]
    MissingContractAddr,

    #[error("collaborators.snapshot is not set")]
    MissingSnapshot,
}

/// Babylon network the contract is deployed on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BabylonNetwork {
    Localnet,
    #[default]
    Testnet,
    Mainnet,
}

impl BabylonNetwork {
    pub fn default_rpc_addr(self) -> &'static str {
        match self {
            BabylonNetwork::Localnet => LOCALNET_RPC_ADDR,
            // mainnet has no endpoint of its own yet
            BabylonNetwork::Testnet | BabylonNetwork::Mainnet => DEVNET_RPC_ADDR,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BabylonConfig {
    /// Finality contract address on the Babylon chain
    pub contract_addr: String,
    pub chain_id: String,
    pub network: BabylonNetwork,
    /// Overrides the network's default RPC address
    pub rpc_addr: Option<String>,
}

impl BabylonConfig {
    pub fn rpc_addr(&self) -> &str {
        self.rpc_addr
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_addr())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BitcoinConfig {
    pub rpc_host: String,
}

/// Query engine tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_in_flight_queries: usize,
    /// Per-query deadline; 0 disables it
    pub query_timeout_secs: u64,
    pub power_strategy: PowerStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let finality = FinalityConfig::default();
        Self {
            max_in_flight_queries: finality.max_in_flight_queries,
            query_timeout_secs: 30,
            power_strategy: finality.power_strategy,
        }
    }
}

impl EngineConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }

    pub fn finality_config(&self) -> FinalityConfig {
        FinalityConfig {
            max_in_flight_queries: self.max_in_flight_queries,
            power_strategy: self.power_strategy,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollaboratorsConfig {
    /// JSON committee snapshot
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `fg_finality=debug`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub babylon: BabylonConfig,
    pub bitcoin: BitcoinConfig,
    /// Address a transport front-end binds
    pub rpc_listener: String,
    pub engine: EngineConfig,
    pub collaborators: CollaboratorsConfig,
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            babylon: BabylonConfig::default(),
            bitcoin: BitcoinConfig::default(),
            rpc_listener: "127.0.0.1:50051".to_string(),
            engine: EngineConfig::default(),
            collaborators: CollaboratorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load and validate a config file, applying environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());

        // snapshot paths are relative to the config file
        if let (Some(snapshot), Some(dir)) = (config.collaborators.snapshot.as_mut(), path.parent())
        {
            if snapshot.is_relative() {
                *snapshot = dir.join(&*snapshot);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse without validating
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|l| !l.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_in_flight_queries == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.babylon.contract_addr.trim().is_empty() {
            return Err(ConfigError::MissingContractAddr);
        }
        if self.collaborators.snapshot.is_none() {
            return Err(ConfigError::MissingSnapshot);
        }
        Ok(())
    }
}
