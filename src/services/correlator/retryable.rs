//! Submit-retryable message parsing and child-chain status queries.
//!
//! A retryable ticket is born on the parent chain as a pair of events: the
//! bridge's `MessageDelivered` (carrying the kind discriminant, sender and
//! parent base fee) and the inbox's `InboxMessageDelivered` (carrying the
//! packed message payload). Pairing the two yields everything needed to
//! derive the child-chain ticket id without ever talking to the child
//! chain: the id is the hash of the type-0x69 transaction the child chain
//! will auto-submit, so it is content-addressed and reproducible offline.

use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_rlp::Header;

use super::events::{
	InboxMessageDeliveredEvent, MessageDeliveredEvent, GET_TIMEOUT_SELECTOR,
};
use crate::models::{RetryableStatus, TransactionReceipt};
use crate::services::blockchain::{BlockChainError, EvmClient};

/// The ArbRetryableTx precompile, present on every Orbit chain.
pub const ARB_RETRYABLE_TX_ADDRESS: Address =
	address!("000000000000000000000000000000000000006E");

/// A parsed submit-retryable message.
///
/// Field order and widths follow the packed payload emitted by the inbox:
/// nine 32-byte header words, then the call data as the payload tail.
#[derive(Debug, Clone)]
pub struct SubmitRetryableMessage {
	pub message_num: U256,
	pub sender: Address,
	pub base_fee_l1: U256,
	/// Parent-chain timestamp of the delivery event.
	pub parent_timestamp: u64,
	pub dest_address: Address,
	pub l2_call_value: U256,
	pub l1_value: U256,
	pub max_submission_fee: U256,
	pub excess_fee_refund_address: Address,
	pub call_value_refund_address: Address,
	pub gas_limit: U256,
	pub max_fee_per_gas: U256,
	pub data: Bytes,
}

const WORD: usize = 32;

// Header word positions inside the packed submit-retryable payload.
const WORD_DEST_ADDRESS: usize = 0;
const WORD_L2_CALL_VALUE: usize = 1;
const WORD_L1_VALUE: usize = 2;
const WORD_MAX_SUBMISSION_FEE: usize = 3;
const WORD_EXCESS_FEE_REFUND: usize = 4;
const WORD_CALL_VALUE_REFUND: usize = 5;
const WORD_GAS_LIMIT: usize = 6;
const WORD_MAX_FEE_PER_GAS: usize = 7;
const WORD_DATA_LENGTH: usize = 8;

fn payload_word(payload: &[u8], index: usize) -> Result<&[u8], BlockChainError> {
	payload
		.get(index * WORD..(index + 1) * WORD)
		.ok_or_else(|| {
			BlockChainError::decode_error(format!(
				"Submit-retryable payload missing header word {}",
				index
			))
		})
}

fn word_address(w: &[u8]) -> Address {
	Address::from_slice(&w[12..32])
}

impl SubmitRetryableMessage {
	/// Builds a message from its parent-chain event pair.
	///
	/// The two events must share a message number; callers pair them before
	/// calling this.
	pub fn from_events(
		delivered: &MessageDeliveredEvent,
		inbox: &InboxMessageDeliveredEvent,
	) -> Result<Self, BlockChainError> {
		if delivered.message_index != inbox.message_num {
			return Err(BlockChainError::internal_error(format!(
				"Mismatched message numbers: {} vs {}",
				delivered.message_index, inbox.message_num
			)));
		}

		let payload = inbox.data.as_ref();
		let data_length = U256::from_be_slice(payload_word(payload, WORD_DATA_LENGTH)?);
		let data_length = u64::try_from(data_length)
			.map_err(|_| {
				BlockChainError::decode_error("Submit-retryable data length does not fit in u64")
			})? as usize;

		if payload.len() < data_length {
			return Err(BlockChainError::decode_error(
				"Submit-retryable payload shorter than its declared data length",
			));
		}

		// the call data is the tail of the payload, exactly data_length bytes
		let data = &payload[payload.len() - data_length..];

		Ok(Self {
			message_num: inbox.message_num,
			sender: delivered.sender,
			base_fee_l1: delivered.base_fee_l1,
			parent_timestamp: delivered.timestamp,
			dest_address: word_address(payload_word(payload, WORD_DEST_ADDRESS)?),
			l2_call_value: U256::from_be_slice(payload_word(payload, WORD_L2_CALL_VALUE)?),
			l1_value: U256::from_be_slice(payload_word(payload, WORD_L1_VALUE)?),
			max_submission_fee: U256::from_be_slice(payload_word(
				payload,
				WORD_MAX_SUBMISSION_FEE,
			)?),
			excess_fee_refund_address: word_address(payload_word(
				payload,
				WORD_EXCESS_FEE_REFUND,
			)?),
			call_value_refund_address: word_address(payload_word(
				payload,
				WORD_CALL_VALUE_REFUND,
			)?),
			gas_limit: U256::from_be_slice(payload_word(payload, WORD_GAS_LIMIT)?),
			max_fee_per_gas: U256::from_be_slice(payload_word(payload, WORD_MAX_FEE_PER_GAS)?),
			data: Bytes::from(data.to_vec()),
		})
	}

	/// Derives the retryable creation id: the hash of the type-0x69
	/// transaction the child chain auto-submits for this message.
	///
	/// Content-addressed, never sequentially assigned: two identical
	/// messages on different chains or with different message numbers get
	/// different ids.
	pub fn ticket_id(&self, child_chain_id: u64) -> B256 {
		let mut payload = Vec::new();
		append_rlp_number(&mut payload, U256::from(child_chain_id));
		// the message number is the one field encoded at full width
		append_rlp_bytes(&mut payload, &self.message_num.to_be_bytes::<32>());
		append_rlp_bytes(&mut payload, self.sender.as_slice());
		append_rlp_number(&mut payload, self.base_fee_l1);
		append_rlp_number(&mut payload, self.l1_value);
		append_rlp_number(&mut payload, self.max_fee_per_gas);
		append_rlp_number(&mut payload, self.gas_limit);
		if self.dest_address == Address::ZERO {
			append_rlp_bytes(&mut payload, &[]);
		} else {
			append_rlp_bytes(&mut payload, self.dest_address.as_slice());
		}
		append_rlp_number(&mut payload, self.l2_call_value);
		append_rlp_bytes(&mut payload, self.call_value_refund_address.as_slice());
		append_rlp_number(&mut payload, self.max_submission_fee);
		append_rlp_bytes(&mut payload, self.excess_fee_refund_address.as_slice());
		append_rlp_bytes(&mut payload, &self.data);

		let mut encoded = vec![0x69u8];
		Header {
			list: true,
			payload_length: payload.len(),
		}
		.encode(&mut encoded);
		encoded.extend_from_slice(&payload);

		keccak256(&encoded)
	}
}

fn append_rlp_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
	if bytes.len() == 1 && bytes[0] < 0x80 {
		out.push(bytes[0]);
		return;
	}
	Header {
		list: false,
		payload_length: bytes.len(),
	}
	.encode(out);
	out.extend_from_slice(bytes);
}

fn append_rlp_number(out: &mut Vec<u8>, value: U256) {
	let be = value.to_be_bytes::<32>();
	let first_nonzero = be.iter().position(|b| *b != 0).unwrap_or(32);
	append_rlp_bytes(out, &be[first_nonzero..]);
}

/// Queries the point-in-time status of a ticket on the child chain.
///
/// The creation receipt (fetched by the caller, since it also needs it for
/// timestamps) answers the first two questions: no receipt means the
/// creation transaction has not landed, a failed receipt means creation
/// reverted. For created tickets the ArbRetryableTx precompile is probed:
/// a live timeout means the funds still sit in the ticket, a revert means
/// the precompile no longer tracks it, which within the lifetime can only
/// mean a redeem.
pub async fn query_status(
	child_client: &EvmClient,
	ticket_id: B256,
	creation_receipt: Option<&TransactionReceipt>,
	timeout_timestamp: u64,
	now: u64,
) -> Result<RetryableStatus, BlockChainError> {
	let receipt = match creation_receipt {
		None => return Ok(RetryableStatus::NotYetCreated),
		Some(receipt) => receipt,
	};

	if !receipt.succeeded() {
		return Ok(RetryableStatus::CreationFailed);
	}

	let mut calldata = GET_TIMEOUT_SELECTOR.to_vec();
	calldata.extend_from_slice(ticket_id.as_slice());

	match child_client
		.call(ARB_RETRYABLE_TX_ADDRESS, Bytes::from(calldata))
		.await
	{
		Ok(ret) => {
			let word = ret.get(..32).unwrap_or(&ret);
			let timeout = U256::from_be_slice(word).saturating_to::<u64>();
			if now > timeout {
				Ok(RetryableStatus::Expired)
			} else {
				Ok(RetryableStatus::FundsDeposited)
			}
		}
		Err(BlockChainError::RevertError(_)) => {
			if now > timeout_timestamp {
				Ok(RetryableStatus::Expired)
			} else {
				Ok(RetryableStatus::Redeemed)
			}
		}
		Err(e) => Err(e),
	}
}
