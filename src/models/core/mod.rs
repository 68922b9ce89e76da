//! Core domain models.

mod alert;
mod chain;
mod message;

pub use alert::{AlertRecord, Severity};
pub use chain::{
	ChildChain, EthBridge, TokenBridge, ARB_MINIMUM_BLOCK_TIME_IN_SECONDS, SEVEN_DAYS_IN_SECONDS,
};
pub use message::{
	ChildChainTicketReport, CrossChainMessage, ParentChainTicketReport, RetryableStatus,
	TokenDepositData,
};
