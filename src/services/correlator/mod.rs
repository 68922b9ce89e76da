//! Cross-chain event correlation.
//!
//! Correlates parent-chain message-delivery events with child-chain
//! execution state to classify the lifecycle of every retryable ticket
//! created in a block range. The algorithm:
//!
//! 1. scan the bridge for `MessageDelivered` events (via the chunked
//!    scanner), keeping only the retryable-creation kind
//! 2. scan the token gateways for `DepositInitiated` events; these only
//!    enrich reports and their absence never blocks classification
//! 3. deduplicate by parent transaction hash, first-discovery order
//! 4. for each unique parent transaction, derive the retryable messages it
//!    created (a transaction can create several) and query each ticket's
//!    status on the child chain
//!
//! Re-running over the same historical range against a deterministic chain
//! state yields an identical result set: there is no hidden state here.

pub mod events;
pub mod retryable;

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, Bytes, B256};
use tracing::warn;

use crate::models::{
	ChildChain, ChildChainTicketReport, CrossChainMessage, ParentChainTicketReport,
	RetryableStatus, TokenDepositData, TransactionReceipt,
};
use crate::services::blockchain::{BlockChainError, BlockTag, EvmClient, LogFilter};
use crate::services::scanner::{scan_range, BlockRange, RetryPolicy};

use events::{
	decode_abi_string, decode_abi_u8, extract_request_id, DepositInitiatedEvent,
	InboxMessageDeliveredEvent, MessageDeliveredEvent, DEPOSIT_INITIATED_TOPIC,
	ERC20_DECIMALS_SELECTOR, ERC20_SYMBOL_SELECTOR, INBOX_MESSAGE_DELIVERED_TOPIC,
	MESSAGE_DELIVERED_TOPIC,
};
use retryable::{query_status, SubmitRetryableMessage};

/// Log queries are broken into sub-ranges of this many blocks to stay
/// below provider pagination caps.
pub const MAX_BLOCKS_TO_PROCESS: u64 = 5000;

/// One correlated ticket: the message itself plus the report material the
/// alerting path needs. `child_report` and `token_deposit` are only
/// populated when enrichment is requested and the ticket is unredeemed.
#[derive(Debug, Clone)]
pub struct CorrelatedTicket {
	pub message: CrossChainMessage,
	pub parent_report: ParentChainTicketReport,
	pub child_report: Option<ChildChainTicketReport>,
	pub token_deposit: Option<TokenDepositData>,
}

/// Deduplicates delivery events down to their parent transaction hashes,
/// preserving first-discovery order.
pub fn dedup_transaction_hashes(events: &[MessageDeliveredEvent]) -> Vec<B256> {
	let mut seen = HashSet::new();
	let mut hashes = Vec::new();
	for event in events {
		if let Some(hash) = event.transaction_hash {
			if seen.insert(hash) {
				hashes.push(hash);
			}
		}
	}
	hashes
}

/// Correlates events for one chain. Borrows its clients; owns nothing
/// mutable.
pub struct Correlator<'a> {
	chain: &'a ChildChain,
	parent_client: &'a EvmClient,
	child_client: &'a EvmClient,
	retry_policy: RetryPolicy,
}

impl<'a> Correlator<'a> {
	pub fn new(
		chain: &'a ChildChain,
		parent_client: &'a EvmClient,
		child_client: &'a EvmClient,
	) -> Self {
		Self {
			chain,
			parent_client,
			child_client,
			retry_policy: RetryPolicy::default(),
		}
	}

	/// Runs the full correlation over `range`.
	///
	/// # Arguments
	/// * `range` - parent-chain block range to scan
	/// * `enrich` - whether to fetch the extra report material (child-chain
	///   reports, token deposit data) for unredeemed tickets
	/// * `now` - current unix time, passed in so runs are reproducible
	///
	/// An empty result means no qualifying events were in range; callers
	/// log and continue, they never retry on empty.
	pub async fn correlate(
		&self,
		range: BlockRange,
		enrich: bool,
		now: u64,
	) -> Result<Vec<CorrelatedTicket>, BlockChainError> {
		let bridge = self.chain.eth_bridge.bridge;
		let delivered_logs = scan_range(range, MAX_BLOCKS_TO_PROCESS, &self.retry_policy, |sub| {
			self.parent_client.get_logs(LogFilter {
				address: bridge,
				topic0: *MESSAGE_DELIVERED_TOPIC,
				from_block: sub.from_block,
				to_block: sub.to_block,
			})
		})
		.await?;

		let mut creation_events = Vec::new();
		for log in &delivered_logs {
			let event = MessageDeliveredEvent::decode(log)?;
			if event.is_submit_retryable() {
				creation_events.push(event);
			}
		}

		if creation_events.is_empty() {
			return Ok(Vec::new());
		}

		let deposit_events = if enrich {
			self.fetch_deposit_events(range).await
		} else {
			Vec::new()
		};

		let mut tickets = Vec::new();
		for tx_hash in dedup_transaction_hashes(&creation_events) {
			let receipt = self
				.parent_client
				.get_transaction_receipt(tx_hash)
				.await?
				.ok_or_else(|| {
					BlockChainError::request_error(format!(
						"Missing receipt for parent transaction {}",
						tx_hash
					))
				})?;

			for message in self.derive_messages(&receipt)? {
				tickets.push(
					self.resolve_ticket(tx_hash, &receipt, message, &deposit_events, enrich, now)
						.await?,
				);
			}
		}

		Ok(tickets)
	}

	/// Fetches `DepositInitiated` events from every configured parent-chain
	/// gateway. Best-effort: failures degrade reports, never the scan.
	async fn fetch_deposit_events(&self, range: BlockRange) -> Vec<DepositInitiatedEvent> {
		let gateways = self
			.chain
			.token_bridge
			.as_ref()
			.map(|bridge| bridge.parent_gateways())
			.unwrap_or_default();

		let mut deposit_events = Vec::new();
		for gateway in gateways {
			let logs = scan_range(range, MAX_BLOCKS_TO_PROCESS, &self.retry_policy, |sub| {
				self.parent_client.get_logs(LogFilter {
					address: gateway,
					topic0: *DEPOSIT_INITIATED_TOPIC,
					from_block: sub.from_block,
					to_block: sub.to_block,
				})
			})
			.await;

			match logs {
				Ok(logs) => {
					for log in &logs {
						match DepositInitiatedEvent::decode(log) {
							Ok(event) => deposit_events.push(event),
							Err(e) => warn!(gateway = %gateway, "Skipping undecodable deposit log: {}", e),
						}
					}
				}
				Err(e) => {
					warn!(gateway = %gateway, "Deposit log fetch failed, reports will lack token data: {}", e);
				}
			}
		}
		deposit_events
	}

	/// Derives the retryable messages created by one parent transaction by
	/// pairing its bridge events with the inbox payload events they index.
	fn derive_messages(
		&self,
		receipt: &TransactionReceipt,
	) -> Result<Vec<SubmitRetryableMessage>, BlockChainError> {
		let inbox_address = self.chain.eth_bridge.inbox;
		let bridge_address = self.chain.eth_bridge.bridge;

		let mut payloads = HashMap::new();
		for log in &receipt.logs {
			if log.address == inbox_address
				&& log.topic0() == Some(&*INBOX_MESSAGE_DELIVERED_TOPIC)
			{
				let event = InboxMessageDeliveredEvent::decode(log)?;
				payloads.insert(event.message_num, event);
			}
		}

		let mut messages = Vec::new();
		for log in &receipt.logs {
			if log.address != bridge_address || log.topic0() != Some(&*MESSAGE_DELIVERED_TOPIC) {
				continue;
			}
			let delivered = MessageDeliveredEvent::decode(log)?;
			if !delivered.is_submit_retryable() {
				continue;
			}
			let payload = payloads.get(&delivered.message_index).ok_or_else(|| {
				BlockChainError::decode_error(format!(
					"No inbox payload for message {}",
					delivered.message_index
				))
			})?;
			messages.push(SubmitRetryableMessage::from_events(&delivered, payload)?);
		}

		Ok(messages)
	}

	async fn resolve_ticket(
		&self,
		tx_hash: B256,
		parent_receipt: &TransactionReceipt,
		message: SubmitRetryableMessage,
		deposit_events: &[DepositInitiatedEvent],
		enrich: bool,
		now: u64,
	) -> Result<CorrelatedTicket, BlockChainError> {
		let ticket_id = message.ticket_id(self.chain.chain_id);

		let creation_receipt = self.child_client.get_transaction_receipt(ticket_id).await?;
		let creation_timestamp = match &creation_receipt {
			Some(receipt) => {
				self.child_client
					.get_block(BlockTag::Number(receipt.block_number))
					.await?
					.timestamp
			}
			// the ticket has no child-chain footprint yet; the parent-chain
			// delivery timestamp anchors the suppression window instead
			None => message.parent_timestamp,
		};
		let timeout_timestamp = creation_timestamp + self.chain.retryable_lifetime_seconds;

		let status = query_status(
			self.child_client,
			ticket_id,
			creation_receipt.as_ref(),
			timeout_timestamp,
			now,
		)
		.await?;

		let cross_chain_message = CrossChainMessage {
			source_transaction_hash: tx_hash,
			ticket_id,
			creation_timestamp,
			timeout_timestamp,
			status,
			destination_address: message.dest_address,
			call_value: message.l2_call_value,
			gas_fee_cap: message.max_fee_per_gas,
			gas_limit: message.gas_limit.saturating_to::<u64>(),
		};

		let parent_report = ParentChainTicketReport {
			transaction_hash: tx_hash,
			sender: parent_receipt.from,
			retryable_ticket_id: ticket_id,
		};

		let (child_report, token_deposit) = if enrich && status != RetryableStatus::Redeemed {
			let child_report = self
				.build_child_report(
					&message,
					ticket_id,
					creation_receipt.as_ref(),
					creation_timestamp,
					timeout_timestamp,
					status,
				)
				.await;
			let token_deposit = self
				.find_token_deposit(ticket_id, parent_receipt.from, deposit_events)
				.await;
			(Some(child_report), token_deposit)
		} else {
			(None, None)
		};

		Ok(CorrelatedTicket {
			message: cross_chain_message,
			parent_report,
			child_report,
			token_deposit,
		})
	}

	async fn build_child_report(
		&self,
		message: &SubmitRetryableMessage,
		ticket_id: B256,
		creation_receipt: Option<&TransactionReceipt>,
		creation_timestamp: u64,
		timeout_timestamp: u64,
		status: RetryableStatus,
	) -> ChildChainTicketReport {
		// historical gas price is nice-to-have; pruned nodes fail it
		let gas_price_at_creation = match creation_receipt {
			Some(receipt) => self
				.child_client
				.gas_price_at_block(receipt.block_number)
				.await
				.ok(),
			None => None,
		};

		ChildChainTicketReport {
			ticket_id,
			created_at_timestamp: creation_timestamp,
			created_at_block_number: creation_receipt.map(|r| r.block_number),
			timeout_timestamp,
			deposit: message.l2_call_value,
			status,
			retry_to: creation_receipt.and_then(|r| r.to),
			retry_data: message.data.clone(),
			gas_fee_cap: message.max_fee_per_gas,
			gas_limit: message.gas_limit.saturating_to::<u64>(),
			gas_price_at_creation,
		}
	}

	/// Matches a ticket to the token deposit that funded it, if any.
	///
	/// The request id is extracted from the child-chain creation
	/// transaction's calldata and matched against the gateway deposit
	/// events' sequence-number topic. Every step is best-effort.
	async fn find_token_deposit(
		&self,
		ticket_id: B256,
		sender: Address,
		deposit_events: &[DepositInitiatedEvent],
	) -> Option<TokenDepositData> {
		let child_tx = self
			.child_client
			.get_transaction_by_hash(ticket_id)
			.await
			.ok()??;
		let request_id = extract_request_id(&child_tx.input)?;
		let deposit = deposit_events
			.iter()
			.find(|event| event.sequence_number == request_id)?;

		let symbol = self
			.parent_client
			.call(deposit.l1_token, Bytes::from(ERC20_SYMBOL_SELECTOR.to_vec()))
			.await
			.ok()
			.and_then(|ret| decode_abi_string(&ret))?;
		let decimals = self
			.parent_client
			.call(deposit.l1_token, Bytes::from(ERC20_DECIMALS_SELECTOR.to_vec()))
			.await
			.ok()
			.and_then(|ret| decode_abi_u8(&ret))?;

		Some(TokenDepositData {
			child_ticket_id: ticket_id,
			token_amount: Some(deposit.amount),
			sender,
			parent_token_address: deposit.l1_token,
			symbol,
			decimals,
		})
	}
}
