//! Blockchain access: JSON-RPC transport and typed EVM client.

mod client;
mod error;
mod transport;

pub use client::{BlockTag, EvmClient, LogFilter};
pub use error::BlockChainError;
pub use transport::HttpTransportClient;
