//! Typed decoding of the on-chain events the monitors consume.
//!
//! The source this monitor descends from accessed raw log objects through
//! ad hoc field paths and decoded calldata by string-splitting on a
//! selector. Here every event kind has a fixed topic hash, a decode
//! function with named word offsets, and tests pinning the exact byte
//! layout.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use lazy_static::lazy_static;

use crate::models::LogEntry;
use crate::services::blockchain::BlockChainError;

/// ABI word size in bytes.
const WORD: usize = 32;

/// `MessageDelivered` on the parent-chain bridge contract.
pub const MESSAGE_DELIVERED_SIGNATURE: &str =
	"MessageDelivered(uint256,bytes32,address,uint8,address,bytes32,uint256,uint64)";

/// `InboxMessageDelivered` on the parent-chain inbox contract.
pub const INBOX_MESSAGE_DELIVERED_SIGNATURE: &str = "InboxMessageDelivered(uint256,bytes)";

/// `DepositInitiated` on the parent-chain token gateways.
pub const DEPOSIT_INITIATED_SIGNATURE: &str = "DepositInitiated(address,address,address,uint256,uint256)";

/// `SequencerBatchDelivered` on the parent-chain sequencer inbox.
pub const SEQUENCER_BATCH_DELIVERED_SIGNATURE: &str =
	"SequencerBatchDelivered(uint256,bytes32,bytes32,bytes32,uint256,(uint64,uint64,uint64,uint64),uint8)";

/// `NodeCreated` on the parent-chain rollup contract.
pub const NODE_CREATED_SIGNATURE: &str =
	"NodeCreated(uint64,bytes32,bytes32,bytes32,(((bytes32[2],uint64[2]),uint8),((bytes32[2],uint64[2]),uint8),uint64),bytes32,bytes32,uint256)";

lazy_static! {
	pub static ref MESSAGE_DELIVERED_TOPIC: B256 =
		keccak256(MESSAGE_DELIVERED_SIGNATURE.as_bytes());
	pub static ref INBOX_MESSAGE_DELIVERED_TOPIC: B256 =
		keccak256(INBOX_MESSAGE_DELIVERED_SIGNATURE.as_bytes());
	pub static ref DEPOSIT_INITIATED_TOPIC: B256 =
		keccak256(DEPOSIT_INITIATED_SIGNATURE.as_bytes());
	pub static ref SEQUENCER_BATCH_DELIVERED_TOPIC: B256 =
		keccak256(SEQUENCER_BATCH_DELIVERED_SIGNATURE.as_bytes());
	pub static ref NODE_CREATED_TOPIC: B256 = keccak256(NODE_CREATED_SIGNATURE.as_bytes());
}

/// Message kind discriminant for retryable-ticket creation.
///
/// Other kinds are other cross-chain message types (eth deposits, batch
/// postings, ...) and are excluded from retryable correlation.
pub const L2_MESSAGE_KIND_SUBMIT_RETRYABLE: u8 = 9;

/// 4-byte selector of `submitRetryable(...)`, the call executed by the
/// auto-submitted ticket-creation transaction on the child chain. The
/// request id used to match token deposits sits in the 32 bytes directly
/// after this selector.
pub const SUBMIT_RETRYABLE_SELECTOR: [u8; 4] = [0xc9, 0xf9, 0x5d, 0x32];

/// Signature behind [`SUBMIT_RETRYABLE_SELECTOR`].
pub const SUBMIT_RETRYABLE_SIGNATURE: &str =
	"submitRetryable(bytes32,uint256,uint256,uint256,uint256,uint64,uint256,address,address,address,bytes)";

/// `getTimeout(bytes32)` on the ArbRetryableTx precompile.
pub const GET_TIMEOUT_SELECTOR: [u8; 4] = [0x9f, 0x10, 0x25, 0xc6];

/// `maxTimeVariation()` on the sequencer inbox.
pub const MAX_TIME_VARIATION_SELECTOR: [u8; 4] = [0xeb, 0xea, 0x46, 0x1d];

/// `sequencerReportedSubMessageCount()` on the bridge.
pub const SEQUENCER_REPORTED_SUB_MESSAGE_COUNT_SELECTOR: [u8; 4] = [0x5f, 0xca, 0x4a, 0x16];

/// `symbol()` on an ERC20.
pub const ERC20_SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

/// `decimals()` on an ERC20.
pub const ERC20_DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

fn word(data: &[u8], index: usize) -> Result<&[u8], BlockChainError> {
	data.get(index * WORD..(index + 1) * WORD)
		.ok_or_else(|| BlockChainError::decode_error(format!("Event data missing word {}", index)))
}

fn word_to_address(w: &[u8]) -> Address {
	Address::from_slice(&w[12..32])
}

fn word_to_u256(w: &[u8]) -> U256 {
	U256::from_be_slice(w)
}

fn word_to_u64(w: &[u8]) -> Result<u64, BlockChainError> {
	let value = U256::from_be_slice(w);
	u64::try_from(value)
		.map_err(|_| BlockChainError::decode_error("Event word does not fit in u64"))
}

fn word_to_usize(w: &[u8]) -> Result<usize, BlockChainError> {
	word_to_u64(w).map(|v| v as usize)
}

fn expect_topic0(log: &LogEntry, expected: &B256, name: &str) -> Result<(), BlockChainError> {
	match log.topic0() {
		Some(topic) if topic == expected => Ok(()),
		_ => Err(BlockChainError::decode_error(format!(
			"Log is not a {} event",
			name
		))),
	}
}

/// Decoded `MessageDelivered` event.
///
/// Data layout (non-indexed fields, one word each): inbox, kind, sender,
/// messageDataHash, baseFeeL1, timestamp.
#[derive(Debug, Clone)]
pub struct MessageDeliveredEvent {
	pub message_index: U256,
	pub before_inbox_acc: B256,
	pub inbox: Address,
	pub kind: u8,
	pub sender: Address,
	pub message_data_hash: B256,
	pub base_fee_l1: U256,
	pub timestamp: u64,
	pub transaction_hash: Option<B256>,
	pub block_number: Option<u64>,
}

impl MessageDeliveredEvent {
	const DATA_WORD_INBOX: usize = 0;
	const DATA_WORD_KIND: usize = 1;
	const DATA_WORD_SENDER: usize = 2;
	const DATA_WORD_MESSAGE_DATA_HASH: usize = 3;
	const DATA_WORD_BASE_FEE_L1: usize = 4;
	const DATA_WORD_TIMESTAMP: usize = 5;

	pub fn decode(log: &LogEntry) -> Result<Self, BlockChainError> {
		expect_topic0(log, &MESSAGE_DELIVERED_TOPIC, "MessageDelivered")?;
		if log.topics.len() < 3 {
			return Err(BlockChainError::decode_error(
				"MessageDelivered event is missing indexed topics",
			));
		}

		let data = &log.data;
		Ok(Self {
			message_index: U256::from_be_slice(log.topics[1].as_slice()),
			before_inbox_acc: log.topics[2],
			inbox: word_to_address(word(data, Self::DATA_WORD_INBOX)?),
			kind: word(data, Self::DATA_WORD_KIND)?[WORD - 1],
			sender: word_to_address(word(data, Self::DATA_WORD_SENDER)?),
			message_data_hash: B256::from_slice(word(data, Self::DATA_WORD_MESSAGE_DATA_HASH)?),
			base_fee_l1: word_to_u256(word(data, Self::DATA_WORD_BASE_FEE_L1)?),
			timestamp: word_to_u64(word(data, Self::DATA_WORD_TIMESTAMP)?)?,
			transaction_hash: log.transaction_hash,
			block_number: log.block_number,
		})
	}

	/// Whether this delivery created a retryable ticket.
	pub fn is_submit_retryable(&self) -> bool {
		self.kind == L2_MESSAGE_KIND_SUBMIT_RETRYABLE
	}
}

/// Decoded `InboxMessageDelivered` event: the raw message payload keyed by
/// message number.
#[derive(Debug, Clone)]
pub struct InboxMessageDeliveredEvent {
	pub message_num: U256,
	pub data: Bytes,
}

impl InboxMessageDeliveredEvent {
	pub fn decode(log: &LogEntry) -> Result<Self, BlockChainError> {
		expect_topic0(log, &INBOX_MESSAGE_DELIVERED_TOPIC, "InboxMessageDelivered")?;
		if log.topics.len() < 2 {
			return Err(BlockChainError::decode_error(
				"InboxMessageDelivered event is missing the message number topic",
			));
		}

		// data is a single ABI-encoded `bytes`: offset word, length word at
		// the offset, then the payload
		let data = &log.data;
		let offset = word_to_usize(word(data, 0)?)?;
		let length_word = data.get(offset..offset + WORD).ok_or_else(|| {
			BlockChainError::decode_error("InboxMessageDelivered data shorter than its offset")
		})?;
		let length = word_to_usize(length_word)?;
		let payload = data
			.get(offset + WORD..offset + WORD + length)
			.ok_or_else(|| {
				BlockChainError::decode_error("InboxMessageDelivered data shorter than its length")
			})?;

		Ok(Self {
			message_num: U256::from_be_slice(log.topics[1].as_slice()),
			data: Bytes::from(payload.to_vec()),
		})
	}
}

/// Decoded `DepositInitiated` event from a parent-chain token gateway.
#[derive(Debug, Clone)]
pub struct DepositInitiatedEvent {
	pub l1_token: Address,
	pub from: Address,
	pub to: Address,
	/// The message sequence number, kept as the raw topic so it can be
	/// compared byte-for-byte with a request id extracted from calldata.
	pub sequence_number: B256,
	pub amount: U256,
}

impl DepositInitiatedEvent {
	/// Topic index carrying the sequence number used for request-id
	/// matching.
	pub const SEQUENCE_NUMBER_TOPIC_INDEX: usize = 3;

	pub fn decode(log: &LogEntry) -> Result<Self, BlockChainError> {
		expect_topic0(log, &DEPOSIT_INITIATED_TOPIC, "DepositInitiated")?;
		if log.topics.len() < 4 {
			return Err(BlockChainError::decode_error(
				"DepositInitiated event is missing indexed topics",
			));
		}

		let data = &log.data;
		Ok(Self {
			l1_token: word_to_address(word(data, 0)?),
			from: word_to_address(log.topics[1].as_slice()),
			to: word_to_address(log.topics[2].as_slice()),
			sequence_number: log.topics[Self::SEQUENCE_NUMBER_TOPIC_INDEX],
			amount: word_to_u256(word(data, 1)?),
		})
	}
}

/// Extracts the deposit request id from submit-retryable calldata.
///
/// The calldata is split on [`SUBMIT_RETRYABLE_SELECTOR`]; the 32 bytes
/// that follow are the request id. This reproduces the source's
/// string-split decode exactly (including tolerating garbage before the
/// selector), it just operates on bytes instead of hex strings.
pub fn extract_request_id(calldata: &[u8]) -> Option<B256> {
	let at = calldata
		.windows(SUBMIT_RETRYABLE_SELECTOR.len())
		.position(|w| w == SUBMIT_RETRYABLE_SELECTOR)?;
	let start = at + SUBMIT_RETRYABLE_SELECTOR.len();
	calldata
		.get(start..start + WORD)
		.map(B256::from_slice)
}

/// Decodes an ABI-encoded `string` return value (offset, length, bytes).
pub fn decode_abi_string(ret: &[u8]) -> Option<String> {
	let offset = word_to_usize(ret.get(..WORD)?).ok()?;
	let length = word_to_usize(ret.get(offset..offset + WORD)?).ok()?;
	let bytes = ret.get(offset + WORD..offset + WORD + length)?;
	String::from_utf8(bytes.to_vec()).ok()
}

/// Decodes a single ABI-encoded `uint8` return value.
pub fn decode_abi_u8(ret: &[u8]) -> Option<u8> {
	ret.get(..WORD).map(|w| w[WORD - 1])
}
