use astrace_storage::DEFAULT_FLAG_KEY;
use astrace_types::{ChainId, ChainParameters};
use serde::{Deserialize, Serialize};

/// Chains the injected connector accepts. Non-Polygon entries are allowed
/// so the user gets a "Switch Network" prompt instead of a failed connect.
pub const DEFAULT_SUPPORTED_CHAINS: [u64; 12] =
    [137, 1, 2, 3, 4, 42, 56, 42161, 43114, 10, 250, 100];

/// What to do when the wallet reports a chain change mid-session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainChangePolicy {
    /// Reload the whole page, discarding unsaved UI state.
    #[default]
    Reload,
    /// Update the session in place.
    Reconcile,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid session config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid session config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub required_chain: ChainParameters,
    pub supported_chains: Vec<ChainId>,
    pub flag_key: String,
    pub chain_change: ChainChangePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_chain: ChainParameters::polygon_mainnet(),
            supported_chains: DEFAULT_SUPPORTED_CHAINS.into_iter().map(ChainId).collect(),
            flag_key: DEFAULT_FLAG_KEY.to_owned(),
            chain_change: ChainChangePolicy::Reload,
        }
    }
}

impl SessionConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flag_key.trim().is_empty() {
            return Err(ConfigError::Invalid("flag_key cannot be empty".to_owned()));
        }
        if self.required_chain.rpc_urls.is_empty() {
            return Err(ConfigError::Invalid(
                "required_chain needs at least one rpc url".to_owned(),
            ));
        }
        if !self.supported_chains.is_empty()
            && !self.supported_chains.contains(&self.required_chain.chain_id)
        {
            return Err(ConfigError::Invalid(format!(
                "required chain {} missing from supported_chains",
                self.required_chain.chain_id
            )));
        }
        Ok(())
    }
}
