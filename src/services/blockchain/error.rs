//! Blockchain service error types.

use log::error;
use std::{error::Error, fmt};

/// Represents possible errors when talking to a chain over JSON-RPC
#[derive(Debug)]
pub enum BlockChainError {
	/// Network-level failures (timeouts, rate limits, provider hiccups).
	/// These are the only errors worth retrying.
	RequestError(String),
	/// An `eth_call` reverted. Definitive answer, never retried.
	RevertError(String),
	/// A response or payload failed to decode. Retrying a parse error is
	/// pointless, so these propagate immediately.
	DecodeError(String),
	/// Internal errors (e.g. malformed request parameters)
	InternalError(String),
}

impl BlockChainError {
	/// Formats the error message based on the error type
	fn format_message(&self) -> String {
		match self {
			Self::RequestError(msg) => format!("Request error: {}", msg),
			Self::RevertError(msg) => format!("Revert error: {}", msg),
			Self::DecodeError(msg) => format!("Decode error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new request error with logging
	pub fn request_error(msg: impl Into<String>) -> Self {
		let error = Self::RequestError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new revert error. Reverts are an expected outcome of some
	/// status probes, so they are not logged at error level.
	pub fn revert_error(msg: impl Into<String>) -> Self {
		Self::RevertError(msg.into())
	}

	/// Creates a new decode error with logging
	pub fn decode_error(msg: impl Into<String>) -> Self {
		let error = Self::DecodeError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Whether the operation that produced this error may succeed on retry.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::RequestError(_))
	}
}

impl From<reqwest::Error> for BlockChainError {
	fn from(error: reqwest::Error) -> Self {
		Self::request_error(error.to_string())
	}
}

impl fmt::Display for BlockChainError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for BlockChainError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_formatting() {
		let error = BlockChainError::decode_error("bad payload");
		assert_eq!(error.to_string(), "Decode error: bad payload");
	}

	#[test]
	fn test_only_request_errors_are_transient() {
		assert!(BlockChainError::request_error("timeout").is_transient());
		assert!(!BlockChainError::decode_error("bad hex").is_transient());
		assert!(!BlockChainError::revert_error("reverted").is_transient());
		assert!(!BlockChainError::internal_error("oops").is_transient());
	}
}
