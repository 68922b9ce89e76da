//! Per-chain connection and address data.
//!
//! One [`ChildChain`] is loaded from configuration for every monitored
//! Orbit chain. The struct is immutable for the lifetime of a run: every
//! service borrows it, nothing mutates it.

use alloy_primitives::Address;
use serde::Deserialize;

/// Default retryable ticket lifetime: seven days, fixed by the protocol.
pub const SEVEN_DAYS_IN_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Minimum block time of Arbitrum-family parent chains, in seconds.
pub const ARB_MINIMUM_BLOCK_TIME_IN_SECONDS: f64 = 0.25;

/// Core protocol contract addresses on the parent chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBridge {
	pub bridge: Address,
	pub inbox: Address,
	pub outbox: Address,
	pub rollup: Address,
	pub sequencer_inbox: Address,
}

/// Token bridge gateway addresses on the parent chain.
///
/// Only the parent-side gateways are used: deposit-initiated events are
/// fetched from them to enrich retryable reports with token metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBridge {
	pub parent_erc20_gateway: Option<Address>,
	pub parent_custom_gateway: Option<Address>,
	pub parent_weth_gateway: Option<Address>,
}

impl TokenBridge {
	/// All configured parent-chain gateway addresses.
	pub fn parent_gateways(&self) -> Vec<Address> {
		[
			self.parent_erc20_gateway,
			self.parent_custom_gateway,
			self.parent_weth_gateway,
		]
		.into_iter()
		.flatten()
		.collect()
	}
}

/// Connection and address data for a single monitored Orbit chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildChain {
	pub chain_id: u64,
	pub parent_chain_id: u64,
	pub name: String,
	#[serde(default)]
	pub slug: Option<String>,
	/// Child chain RPC endpoint. Config files written for older monitor
	/// versions call this `rpcUrl`.
	#[serde(alias = "rpcUrl")]
	pub orbit_rpc_url: String,
	pub parent_rpc_url: String,
	pub explorer_url: String,
	pub parent_explorer_url: String,
	pub eth_bridge: EthBridge,
	#[serde(default)]
	pub token_bridge: Option<TokenBridge>,
	pub confirm_period_blocks: u64,
	#[serde(default)]
	pub block_time: Option<f64>,
	#[serde(default = "default_retryable_lifetime")]
	pub retryable_lifetime_seconds: u64,
	#[serde(default)]
	pub native_token: Option<Address>,
	#[serde(default)]
	pub is_custom: bool,
}

fn default_retryable_lifetime() -> u64 {
	SEVEN_DAYS_IN_SECONDS
}

impl ChildChain {
	/// Block time of the parent chain in seconds.
	///
	/// Ethereum L1s post a block every 12 seconds, Base every 2; everything
	/// else in the Orbit universe is an Arbitrum chain at the protocol
	/// minimum block time.
	pub fn parent_chain_block_time(&self) -> f64 {
		match self.parent_chain_id {
			// Ethereum / Sepolia / Holesky
			1 | 11155111 | 17000 => 12.0,
			// Base / Base Sepolia
			8453 | 84532 => 2.0,
			_ => ARB_MINIMUM_BLOCK_TIME_IN_SECONDS,
		}
	}

	/// Explorer URL prefix for parent-chain transactions.
	pub fn parent_tx_prefix(&self) -> String {
		format!("{}tx/", self.parent_explorer_url)
	}

	/// Explorer URL prefix for parent-chain addresses.
	pub fn parent_address_prefix(&self) -> String {
		format!("{}address/", self.parent_explorer_url)
	}

	/// Explorer URL prefix for child-chain transactions.
	pub fn child_tx_prefix(&self) -> String {
		format!("{}tx/", self.explorer_url)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain_with_parent(parent_chain_id: u64) -> ChildChain {
		ChildChain {
			chain_id: 660279,
			parent_chain_id,
			name: "Test Chain".to_string(),
			slug: None,
			orbit_rpc_url: "https://rpc.example.com".to_string(),
			parent_rpc_url: "https://parent-rpc.example.com".to_string(),
			explorer_url: "https://explorer.example.com/".to_string(),
			parent_explorer_url: "https://parent-explorer.example.com/".to_string(),
			eth_bridge: EthBridge {
				bridge: Address::ZERO,
				inbox: Address::ZERO,
				outbox: Address::ZERO,
				rollup: Address::ZERO,
				sequencer_inbox: Address::ZERO,
			},
			token_bridge: None,
			confirm_period_blocks: 150,
			block_time: None,
			retryable_lifetime_seconds: SEVEN_DAYS_IN_SECONDS,
			native_token: None,
			is_custom: true,
		}
	}

	#[test]
	fn test_parent_chain_block_time() {
		assert_eq!(chain_with_parent(1).parent_chain_block_time(), 12.0);
		assert_eq!(chain_with_parent(8453).parent_chain_block_time(), 2.0);
		assert_eq!(chain_with_parent(42161).parent_chain_block_time(), 0.25);
	}

	#[test]
	fn test_explorer_prefixes() {
		let chain = chain_with_parent(1);
		assert_eq!(
			chain.parent_tx_prefix(),
			"https://parent-explorer.example.com/tx/"
		);
		assert_eq!(chain.child_tx_prefix(), "https://explorer.example.com/tx/");
	}

	#[test]
	fn test_rpc_url_alias() {
		let json = r#"{
			"chainId": 1234,
			"parentChainId": 1,
			"name": "Aliased",
			"rpcUrl": "https://rpc.example.com",
			"parentRpcUrl": "https://parent.example.com",
			"explorerUrl": "https://explorer.example.com/",
			"parentExplorerUrl": "https://parent-explorer.example.com/",
			"ethBridge": {
				"bridge": "0x1234567890123456789012345678901234567890",
				"inbox": "0x1234567890123456789012345678901234567890",
				"outbox": "0x1234567890123456789012345678901234567890",
				"rollup": "0x1234567890123456789012345678901234567890",
				"sequencerInbox": "0x1234567890123456789012345678901234567890"
			},
			"confirmPeriodBlocks": 150
		}"#;

		let chain: ChildChain = serde_json::from_str(json).unwrap();
		assert_eq!(chain.orbit_rpc_url, "https://rpc.example.com");
		assert_eq!(chain.retryable_lifetime_seconds, SEVEN_DAYS_IN_SECONDS);
	}
}
