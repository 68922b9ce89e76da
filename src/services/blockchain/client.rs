//! EVM JSON-RPC client.
//!
//! Typed access to the subset of the `eth_*` namespace the monitors need.
//! Each monitored chain gets its own client instance (parent and child
//! side); instances share nothing, which keeps concurrent per-chain tasks
//! free of shared mutable state.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};

use super::error::BlockChainError;
use super::transport::HttpTransportClient;
use crate::models::{Block, LogEntry, Transaction, TransactionReceipt};

/// Parameters for an `eth_getLogs` query over an inclusive block range.
#[derive(Debug, Clone)]
pub struct LogFilter {
	pub address: Address,
	pub topic0: B256,
	pub from_block: u64,
	pub to_block: u64,
}

/// Block selector for `eth_getBlockByNumber`.
#[derive(Debug, Clone, Copy)]
pub enum BlockTag {
	Number(u64),
	Latest,
	/// The latest block considered safe (posted to the parent chain).
	Safe,
}

impl BlockTag {
	fn to_param(self) -> Value {
		match self {
			Self::Number(n) => json!(format!("0x{:x}", n)),
			Self::Latest => json!("latest"),
			Self::Safe => json!("safe"),
		}
	}
}

/// Client for a single EVM JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct EvmClient {
	transport: HttpTransportClient,
}

impl EvmClient {
	/// Creates a new client for the given endpoint URL.
	pub fn new(rpc_url: &str) -> Result<Self, BlockChainError> {
		Ok(Self {
			transport: HttpTransportClient::new(rpc_url)?,
		})
	}

	/// Retrieves the latest block number.
	pub async fn get_block_number(&self) -> Result<u64, BlockChainError> {
		let result = self
			.transport
			.send_raw_request("eth_blockNumber", json!([]))
			.await?;
		parse_quantity_u64(&result)
	}

	/// Retrieves logs matching `filter`.
	///
	/// Callers are expected to bound the range themselves; this method
	/// issues exactly one `eth_getLogs` call. Range chunking and retries
	/// live in `services::scanner`.
	pub async fn get_logs(&self, filter: LogFilter) -> Result<Vec<LogEntry>, BlockChainError> {
		let params = json!([{
			"address": filter.address,
			"topics": [filter.topic0],
			"fromBlock": format!("0x{:x}", filter.from_block),
			"toBlock": format!("0x{:x}", filter.to_block),
		}]);

		let result = self.transport.send_raw_request("eth_getLogs", params).await?;
		serde_json::from_value(result)
			.map_err(|e| BlockChainError::decode_error(format!("Failed to parse logs: {}", e)))
	}

	/// Retrieves a transaction receipt, `None` when the transaction is not
	/// yet (or never was) included.
	pub async fn get_transaction_receipt(
		&self,
		transaction_hash: B256,
	) -> Result<Option<TransactionReceipt>, BlockChainError> {
		let result = self
			.transport
			.send_raw_request("eth_getTransactionReceipt", json!([transaction_hash]))
			.await?;

		if result.is_null() {
			return Ok(None);
		}

		serde_json::from_value(result)
			.map(Some)
			.map_err(|e| BlockChainError::decode_error(format!("Failed to parse receipt: {}", e)))
	}

	/// Retrieves a transaction by hash, `None` when unknown to the node.
	pub async fn get_transaction_by_hash(
		&self,
		transaction_hash: B256,
	) -> Result<Option<Transaction>, BlockChainError> {
		let result = self
			.transport
			.send_raw_request("eth_getTransactionByHash", json!([transaction_hash]))
			.await?;

		if result.is_null() {
			return Ok(None);
		}

		serde_json::from_value(result).map(Some).map_err(|e| {
			BlockChainError::decode_error(format!("Failed to parse transaction: {}", e))
		})
	}

	/// Retrieves a block header by tag or number.
	pub async fn get_block(&self, tag: BlockTag) -> Result<Block, BlockChainError> {
		let result = self
			.transport
			.send_raw_request("eth_getBlockByNumber", json!([tag.to_param(), false]))
			.await?;

		if result.is_null() {
			return Err(BlockChainError::request_error(format!(
				"Block not found: {:?}",
				tag
			)));
		}

		serde_json::from_value(result)
			.map_err(|e| BlockChainError::decode_error(format!("Failed to parse block: {}", e)))
	}

	/// Retrieves the balance of an address at the latest block.
	pub async fn get_balance(&self, address: Address) -> Result<U256, BlockChainError> {
		let result = self
			.transport
			.send_raw_request("eth_getBalance", json!([address, "latest"]))
			.await?;
		parse_quantity_u256(&result)
	}

	/// Retrieves the current gas price.
	pub async fn gas_price(&self) -> Result<U256, BlockChainError> {
		let result = self.transport.send_raw_request("eth_gasPrice", json!([])).await?;
		parse_quantity_u256(&result)
	}

	/// Retrieves the base fee of a historical block.
	///
	/// Used as the "gas price at ticket creation" figure in reports. Pruned
	/// nodes routinely fail this query; callers treat the value as optional.
	pub async fn gas_price_at_block(&self, number: u64) -> Result<U256, BlockChainError> {
		let result = self
			.transport
			.send_raw_request(
				"eth_getBlockByNumber",
				json!([format!("0x{:x}", number), false]),
			)
			.await?;

		result
			.get("baseFeePerGas")
			.map(parse_quantity_u256)
			.transpose()?
			.ok_or_else(|| {
				BlockChainError::request_error(format!("No base fee available for block {}", number))
			})
	}

	/// Executes an `eth_call` against `to` with the given calldata.
	///
	/// # Errors
	/// * `BlockChainError::RevertError` when the call reverts
	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, BlockChainError> {
		let params = json!([{ "to": to, "data": data }, "latest"]);
		let result = self.transport.send_raw_request("eth_call", params).await?;

		let hex = result
			.as_str()
			.ok_or_else(|| BlockChainError::decode_error("eth_call result is not a string"))?;

		hex::decode(hex.trim_start_matches("0x"))
			.map(Bytes::from)
			.map_err(|e| BlockChainError::decode_error(format!("Invalid eth_call result: {}", e)))
	}
}

fn parse_quantity_u64(value: &Value) -> Result<u64, BlockChainError> {
	let hex = value
		.as_str()
		.ok_or_else(|| BlockChainError::decode_error("Expected hex quantity"))?;
	u64::from_str_radix(hex.trim_start_matches("0x"), 16)
		.map_err(|e| BlockChainError::decode_error(format!("Failed to parse quantity: {}", e)))
}

fn parse_quantity_u256(value: &Value) -> Result<U256, BlockChainError> {
	let hex = value
		.as_str()
		.ok_or_else(|| BlockChainError::decode_error("Expected hex quantity"))?;
	U256::from_str_radix(hex.trim_start_matches("0x"), 16)
		.map_err(|e| BlockChainError::decode_error(format!("Failed to parse quantity: {}", e)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_quantity() {
		assert_eq!(parse_quantity_u64(&json!("0x64")).unwrap(), 100);
		assert_eq!(
			parse_quantity_u256(&json!("0x3b9aca00")).unwrap(),
			U256::from(1_000_000_000u64)
		);
		assert!(parse_quantity_u64(&json!(42)).is_err());
	}

	#[test]
	fn test_block_tag_params() {
		assert_eq!(BlockTag::Number(256).to_param(), json!("0x100"));
		assert_eq!(BlockTag::Latest.to_param(), json!("latest"));
		assert_eq!(BlockTag::Safe.to_param(), json!("safe"));
	}
}
