//! EVM JSON-RPC response models.
//!
//! These structs mirror the subset of the `eth_*` response surface the
//! monitors consume. Quantities arrive as `0x`-prefixed hex strings and are
//! decoded into native integers at the deserialization boundary; raw log
//! payloads are kept as opaque bytes and decoded by the typed event layer
//! in `services::correlator::events`.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer};

/// A single entry returned by `eth_getLogs`.
///
/// Never mutated after creation; topic and data decoding is the job of the
/// event decoding layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	#[serde(default, deserialize_with = "opt_u64_from_hex")]
	pub block_number: Option<u64>,
	pub transaction_hash: Option<B256>,
}

impl LogEntry {
	/// The first topic (the event signature hash), if present.
	pub fn topic0(&self) -> Option<&B256> {
		self.topics.first()
	}
}

/// Receipt returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: B256,
	#[serde(deserialize_with = "u64_from_hex")]
	pub block_number: u64,
	pub from: Address,
	pub to: Option<Address>,
	#[serde(deserialize_with = "u64_from_hex")]
	pub status: u64,
	#[serde(deserialize_with = "u256_from_hex")]
	pub gas_used: U256,
	#[serde(default)]
	pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
	/// Whether the transaction executed successfully.
	pub fn succeeded(&self) -> bool {
		self.status == 1
	}
}

/// Transaction returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
	pub hash: B256,
	pub from: Address,
	pub to: Option<Address>,
	pub input: Bytes,
	#[serde(deserialize_with = "u256_from_hex")]
	pub value: U256,
	#[serde(deserialize_with = "u64_from_hex")]
	pub gas: u64,
	#[serde(default, deserialize_with = "opt_u256_from_hex")]
	pub gas_price: Option<U256>,
	#[serde(default, deserialize_with = "opt_u256_from_hex")]
	pub max_fee_per_gas: Option<U256>,
}

impl Transaction {
	/// The effective gas fee cap: `maxFeePerGas` for EIP-1559 transactions,
	/// falling back to `gasPrice` for legacy ones, zero when neither is set.
	pub fn gas_fee_cap(&self) -> U256 {
		self.max_fee_per_gas
			.or(self.gas_price)
			.unwrap_or(U256::ZERO)
	}
}

/// Block header fields returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
	#[serde(deserialize_with = "u64_from_hex")]
	pub number: u64,
	#[serde(deserialize_with = "u64_from_hex")]
	pub timestamp: u64,
	pub miner: Address,
}

fn parse_hex_u64<'de, D: Deserializer<'de>>(s: &str) -> Result<u64, D::Error> {
	u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

fn u64_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
	let s = String::deserialize(deserializer)?;
	parse_hex_u64::<D>(&s)
}

fn opt_u64_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
	let s = Option::<String>::deserialize(deserializer)?;
	s.map(|s| parse_hex_u64::<D>(&s)).transpose()
}

fn u256_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
	let s = String::deserialize(deserializer)?;
	U256::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

fn opt_u256_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
	let s = Option::<String>::deserialize(deserializer)?;
	s.map(|s| {
		U256::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
	})
	.transpose()
}
