//! Domain models and data structures for Orbit chain monitoring.
//!
//! This module contains all the core data structures used throughout the application:
//!
//! - `blockchain`: typed views over raw JSON-RPC responses (logs, receipts, blocks)
//! - `config`: configuration loading and validation
//! - `core`: core domain models (chains, cross-chain messages, alerts)

mod blockchain;
mod config;
mod core;

// Re-export blockchain types
pub use blockchain::evm::{Block, LogEntry, Transaction, TransactionReceipt};

// Re-export core types
pub use core::{
	AlertRecord, ChildChain, ChildChainTicketReport, CrossChainMessage, EthBridge,
	ParentChainTicketReport, RetryableStatus, Severity, TokenBridge, TokenDepositData,
	ARB_MINIMUM_BLOCK_TIME_IN_SECONDS, SEVEN_DAYS_IN_SECONDS,
};

// Re-export config types
pub use config::{ConfigError, MonitorConfig};
