use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use waves_rewards::{FeatureActivation, RewardsSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    Mainnet,
    Testnet,
}

impl NetworkProfile {
    pub fn from_env(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mainnet" => Some(NetworkProfile::Mainnet),
            "testnet" => Some(NetworkProfile::Testnet),
            _ => None,
        }
    }

    fn config_path(&self) -> PathBuf {
        PathBuf::from("config").join(format!("{self}.toml"))
    }

    fn rewards(&self) -> RewardsSettings {
        match self {
            NetworkProfile::Mainnet => RewardsSettings::mainnet(),
            NetworkProfile::Testnet => RewardsSettings::testnet(),
        }
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            NetworkProfile::Mainnet => "mainnet",
            NetworkProfile::Testnet => "testnet",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkProfile,
    pub node_id: String,
    pub rpc_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// JSON array of block headers replayed into the ledger at startup.
    #[serde(default)]
    pub chain_file: Option<PathBuf>,
    #[serde(default)]
    pub features: Vec<FeatureActivation>,
    pub rewards: RewardsSettings,
}

impl NodeConfig {
    pub fn defaults(profile: NetworkProfile) -> Self {
        Self {
            network: profile,
            node_id: format!("waves-{profile}-node"),
            rpc_addr: "127.0.0.1:6869".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            chain_file: None,
            features: Vec::new(),
            rewards: profile.rewards(),
        }
    }

    /// Profile defaults, then the TOML file, then `WAVES_*` variables.
    ///
    /// Nested keys use a double underscore, e.g. `WAVES_REWARDS__TERM`.
    pub fn load(profile: NetworkProfile, config_path_override: Option<&Path>) -> Result<Self> {
        let resolved_path = match config_path_override {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => Some(profile.config_path()).filter(|path| path.exists()),
        };

        let defaults = Config::try_from(&Self::defaults(profile))
            .context("failed to build default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix("WAVES")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: NodeConfig = builder
            .build()?
            .try_deserialize()
            .context("failed to parse node configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            anyhow::bail!("node_id must not be empty");
        }
        if self.rpc_addr.trim().is_empty() {
            anyhow::bail!("rpc_addr must not be empty");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!("log_format must be 'pretty' or 'json', got '{}'", self.log_format);
        }
        self.rewards
            .validate()
            .context("invalid rewards configuration")?;
        Ok(())
    }
}
