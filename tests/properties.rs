//! Property-based tests for the scanner, correlator and classifier.

use alloy_primitives::{Address, B256, U256};
use proptest::prelude::*;

use orbit_monitor::models::RetryableStatus;
use orbit_monitor::services::classifier::{
	classify_ticket, REPORTING_PERIOD_FOR_EXPIRED, REPORTING_PERIOD_FOR_NOT_SCHEDULED,
};
use orbit_monitor::services::correlator::dedup_transaction_hashes;
use orbit_monitor::services::correlator::events::MessageDeliveredEvent;
use orbit_monitor::services::correlator::retryable::SubmitRetryableMessage;
use orbit_monitor::services::scanner::BlockRange;

fn block_range() -> impl Strategy<Value = (u64, u64)> {
	(0u64..1_000_000).prop_flat_map(|from| (Just(from), (from + 1)..(from + 100_000)))
}

fn delivered_event(hash_byte: u8, index: u64) -> MessageDeliveredEvent {
	MessageDeliveredEvent {
		message_index: U256::from(index),
		before_inbox_acc: B256::ZERO,
		inbox: Address::ZERO,
		kind: 9,
		sender: Address::ZERO,
		message_data_hash: B256::ZERO,
		base_fee_l1: U256::ZERO,
		timestamp: 0,
		transaction_hash: Some(B256::repeat_byte(hash_byte)),
		block_number: Some(index),
	}
}

proptest! {
	/// Sub-ranges exactly partition `[from, to]`: contiguous, bounded,
	/// gap-free and overlap-free.
	#[test]
	fn chunks_partition_exactly((from, to) in block_range(), chunk_size in 1u64..10_000) {
		let range = BlockRange::new(from, to);
		let chunks = range.chunks(chunk_size);

		prop_assert!(!chunks.is_empty());
		prop_assert_eq!(chunks.first().unwrap().from_block, from);
		prop_assert_eq!(chunks.last().unwrap().to_block, to);

		for pair in chunks.windows(2) {
			prop_assert_eq!(pair[0].to_block + 1, pair[1].from_block);
		}
		for chunk in &chunks {
			prop_assert!(chunk.from_block <= chunk.to_block);
			prop_assert!(chunk.len() <= chunk_size);
		}

		let covered: u64 = chunks.iter().map(|chunk| chunk.len()).sum();
		prop_assert_eq!(covered, range.len());
	}

	/// Single-block ranges are always skipped, whatever the chunk size.
	#[test]
	fn single_block_ranges_yield_no_chunks(block in 0u64..u64::MAX, chunk_size in 1u64..10_000) {
		prop_assert!(BlockRange::new(block, block).chunks(chunk_size).is_empty());
	}

	/// Deduplication keeps exactly the distinct hashes, in first-discovery
	/// order, however the duplicates are arranged.
	#[test]
	fn dedup_keeps_unique_hashes_once(hash_bytes in proptest::collection::vec(0u8..8, 1..50)) {
		let events: Vec<_> = hash_bytes
			.iter()
			.enumerate()
			.map(|(index, byte)| delivered_event(*byte, index as u64))
			.collect();

		let unique = dedup_transaction_hashes(&events);

		// one entry per distinct input hash
		let mut expected = Vec::new();
		for byte in &hash_bytes {
			let hash = B256::repeat_byte(*byte);
			if !expected.contains(&hash) {
				expected.push(hash);
			}
		}
		prop_assert_eq!(unique, expected);
	}

	/// The 2-hour suppression boundary for unscheduled tickets is strict:
	/// suppressed iff age < 2h.
	#[test]
	fn not_yet_created_suppression_boundary(age in 0u64..(4 * 60 * 60)) {
		let created_at = 1_700_000_000u64;
		let now = created_at + age;
		let decision = classify_ticket(
			RetryableStatus::NotYetCreated,
			created_at,
			created_at + 7 * 24 * 3600,
			now,
		);
		prop_assert_eq!(decision.is_suppressed(), age < REPORTING_PERIOD_FOR_NOT_SCHEDULED);
	}

	/// The staleness boundary for expired tickets is strict: suppressed
	/// iff more than 2 days past timeout.
	#[test]
	fn expired_suppression_boundary(past_timeout in 0u64..(4 * 24 * 60 * 60)) {
		let timeout = 1_700_000_000u64;
		let decision = classify_ticket(
			RetryableStatus::Expired,
			timeout - 7 * 24 * 3600,
			timeout,
			timeout + past_timeout,
		);
		prop_assert_eq!(decision.is_suppressed(), past_timeout > REPORTING_PERIOD_FOR_EXPIRED);
	}

	/// Ticket ids are deterministic and sensitive to the chain id and the
	/// message number.
	#[test]
	fn ticket_id_is_content_addressed(
		message_num in 0u64..u64::MAX,
		chain_id in 1u64..u64::MAX,
		call_value in 0u64..u64::MAX,
	) {
		let message = SubmitRetryableMessage {
			message_num: U256::from(message_num),
			sender: Address::repeat_byte(0x11),
			base_fee_l1: U256::from(7u64),
			parent_timestamp: 0,
			dest_address: Address::repeat_byte(0x22),
			l2_call_value: U256::from(call_value),
			l1_value: U256::ZERO,
			max_submission_fee: U256::ZERO,
			excess_fee_refund_address: Address::repeat_byte(0x44),
			call_value_refund_address: Address::repeat_byte(0x33),
			gas_limit: U256::from(21000u64),
			max_fee_per_gas: U256::ZERO,
			data: alloy_primitives::Bytes::new(),
		};

		prop_assert_eq!(message.ticket_id(chain_id), message.ticket_id(chain_id));
		prop_assert_ne!(message.ticket_id(chain_id), message.ticket_id(chain_id ^ 1));

		let mut other = message.clone();
		other.message_num = U256::from(message_num) + U256::from(1u64);
		prop_assert_ne!(message.ticket_id(chain_id), other.ticket_id(chain_id));
	}
}
