//! HTTP transport for JSON-RPC interactions.
//!
//! A thin JSON-RPC 2.0 client over a single endpoint. Retry policy is
//! deliberately absent here: transient-failure handling is owned by the
//! chunked range scanner so that backoff behavior exists in exactly one
//! place.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::error::BlockChainError;

/// JSON-RPC 2.0 client over HTTP for a single endpoint.
///
/// The client is cheap to clone and safe to share across tasks.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	client: Client,
	url: Url,
}

impl HttpTransportClient {
	/// Creates a new transport client for the given endpoint URL.
	///
	/// # Errors
	/// * Returns `BlockChainError::InternalError` if the URL does not parse
	///   or the HTTP client cannot be constructed
	pub fn new(rpc_url: &str) -> Result<Self, BlockChainError> {
		let url = Url::parse(rpc_url)
			.map_err(|e| BlockChainError::internal_error(format!("Invalid RPC URL: {}", e)))?;

		let client = reqwest::ClientBuilder::new()
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.map_err(|e| {
				BlockChainError::internal_error(format!("Failed to create HTTP client: {}", e))
			})?;

		Ok(Self { client, url })
	}

	/// The endpoint this transport talks to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Sends a JSON-RPC request and returns the `result` field.
	///
	/// # Arguments
	/// * `method` - The JSON-RPC method name to call
	/// * `params` - Parameters for the method call
	///
	/// # Errors
	/// * `BlockChainError::RequestError` - transport failure, non-success
	///   HTTP status, or a JSON-RPC error object (other than a revert)
	/// * `BlockChainError::RevertError` - the node reported an execution
	///   revert for an `eth_call`
	/// * `BlockChainError::DecodeError` - the response body is not valid
	///   JSON-RPC
	pub async fn send_raw_request(
		&self,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		let payload = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(self.url.clone())
			.json(&payload)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(BlockChainError::request_error(format!(
				"{} returned HTTP {}",
				method,
				status.as_u16()
			)));
		}

		let body: Value = response.json().await.map_err(|e| {
			BlockChainError::decode_error(format!("Invalid JSON-RPC response for {}: {}", method, e))
		})?;

		if let Some(error) = body.get("error") {
			let message = error
				.get("message")
				.and_then(|m| m.as_str())
				.unwrap_or("unknown JSON-RPC error");

			// Execution reverts come back as JSON-RPC errors; they are a
			// definitive result for status probes, not a transport failure.
			if message.to_lowercase().contains("revert")
				|| error.get("code").and_then(|c| c.as_i64()) == Some(3)
			{
				return Err(BlockChainError::revert_error(message.to_string()));
			}

			return Err(BlockChainError::request_error(format!(
				"{} failed: {}",
				method, message
			)));
		}

		body.get("result").cloned().ok_or_else(|| {
			BlockChainError::decode_error(format!("Missing 'result' field for {}", method))
		})
	}
}
