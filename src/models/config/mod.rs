//! Monitor configuration loading and validation.
//!
//! The config file is a single JSON document with a `childChains` array.
//! It is loaded and validated exactly once per run, before any chain is
//! processed; an invalid file is a fatal startup error. Address fields are
//! rejected at the serde boundary unless they are `0x` + 40 hex characters,
//! URL fields are checked with a real URL parse in the validation pass.

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::path::Path;
use url::Url;

use crate::models::core::ChildChain;

/// Top-level monitor configuration: the set of chains to watch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
	pub child_chains: Vec<ChildChain>,
}

impl MonitorConfig {
	/// Loads and validates a configuration file.
	///
	/// # Errors
	/// * `ConfigError::FileError` - the file cannot be read
	/// * `ConfigError::ParseError` - the file is not valid JSON or does not
	///   match the schema
	/// * `ConfigError::ValidationError` - the parsed config fails semantic
	///   validation
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path)?;
		let config: MonitorConfig = serde_json::from_reader(file)?;

		if let Err(validation_error) = config.validate() {
			return Err(ConfigError::validation_error(validation_error));
		}

		Ok(config)
	}

	fn validate(&self) -> Result<(), String> {
		if self.child_chains.is_empty() {
			return Err("Child chains not found in the config file".to_string());
		}

		for chain in &self.child_chains {
			if chain.name.trim().is_empty() {
				return Err("Chain name must not be empty".to_string());
			}

			if chain.chain_id == 0 {
				return Err(format!("[{}] chainId must be non-zero", chain.name));
			}

			if chain.parent_chain_id == 0 {
				return Err(format!("[{}] parentChainId must be non-zero", chain.name));
			}

			for (field, url) in [
				("orbitRpcUrl", &chain.orbit_rpc_url),
				("parentRpcUrl", &chain.parent_rpc_url),
				("explorerUrl", &chain.explorer_url),
				("parentExplorerUrl", &chain.parent_explorer_url),
			] {
				if Url::parse(url).is_err() {
					return Err(format!("[{}] {} is not a valid URL: {}", chain.name, field, url));
				}
			}

			if chain.confirm_period_blocks == 0 {
				return Err(format!(
					"[{}] confirmPeriodBlocks must be greater than 0",
					chain.name
				));
			}

			if let Some(block_time) = chain.block_time {
				if block_time <= 0.0 {
					return Err(format!("[{}] blockTime must be positive", chain.name));
				}
			}
		}

		Ok(())
	}
}
