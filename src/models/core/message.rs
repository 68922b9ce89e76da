//! Cross-chain message state and ticket report models.

use alloy_primitives::{Address, Bytes, B256, U256};
use std::fmt;

/// Point-in-time lifecycle state of a retryable ticket.
///
/// Re-queried against the child chain on every run; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableStatus {
	/// The ticket's creation transaction has not landed on the child chain.
	NotYetCreated,
	/// The creation transaction landed but reverted.
	CreationFailed,
	/// The ticket exists and holds funds, waiting to be redeemed.
	FundsDeposited,
	/// The ticket was redeemed.
	Redeemed,
	/// The ticket's lifetime elapsed without a redeem.
	Expired,
}

impl RetryableStatus {
	/// Whether an operator can still act on a ticket in this state.
	pub fn is_actionable(&self) -> bool {
		matches!(self, Self::NotYetCreated | Self::FundsDeposited)
	}
}

impl fmt::Display for RetryableStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::NotYetCreated => "NOT_YET_CREATED",
			Self::CreationFailed => "CREATION_FAILED",
			Self::FundsDeposited => "FUNDS_DEPOSITED",
			Self::Redeemed => "REDEEMED",
			Self::Expired => "EXPIRED",
		};
		write!(f, "{}", s)
	}
}

/// A cross-chain message derived from one parent-chain transaction.
///
/// A single parent transaction can create several of these; each carries
/// its own content-addressed ticket id and child-chain status snapshot.
#[derive(Debug, Clone)]
pub struct CrossChainMessage {
	pub source_transaction_hash: B256,
	pub ticket_id: B256,
	/// Unix timestamp of ticket creation. Taken from the child-chain
	/// creation block when one exists, otherwise from the parent-chain
	/// delivery event.
	pub creation_timestamp: u64,
	/// `creation_timestamp` plus the retryable lifetime.
	pub timeout_timestamp: u64,
	pub status: RetryableStatus,
	pub destination_address: Address,
	pub call_value: U256,
	pub gas_fee_cap: U256,
	pub gas_limit: u64,
}

/// Parent-chain side of a failed-ticket report.
#[derive(Debug, Clone)]
pub struct ParentChainTicketReport {
	pub transaction_hash: B256,
	pub sender: Address,
	pub retryable_ticket_id: B256,
}

/// Child-chain side of a failed-ticket report.
#[derive(Debug, Clone)]
pub struct ChildChainTicketReport {
	pub ticket_id: B256,
	pub created_at_timestamp: u64,
	pub created_at_block_number: Option<u64>,
	pub timeout_timestamp: u64,
	/// ETH amount carried by the ticket (the child-chain call value).
	pub deposit: U256,
	pub status: RetryableStatus,
	pub retry_to: Option<Address>,
	pub retry_data: Bytes,
	pub gas_fee_cap: U256,
	pub gas_limit: u64,
	/// Child-chain gas price at the creation block. Historical queries can
	/// fail on pruned nodes; reports render the absence, not a sentinel.
	pub gas_price_at_creation: Option<U256>,
}

/// Token metadata attached to a report when the retryable was a bridge
/// deposit. Best-effort enrichment, absent whenever decoding or ERC20
/// metadata lookups fail.
#[derive(Debug, Clone)]
pub struct TokenDepositData {
	pub child_ticket_id: B256,
	pub token_amount: Option<U256>,
	pub sender: Address,
	pub parent_token_address: Address,
	pub symbol: String,
	pub decimals: u8,
}
