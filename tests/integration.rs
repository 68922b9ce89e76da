//! Integration tests against mocked JSON-RPC endpoints.

use alloy_primitives::{Address, Bytes, B256, U256};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use orbit_monitor::models::{ChildChain, RetryableStatus};
use orbit_monitor::services::blockchain::{BlockChainError, BlockTag, EvmClient, LogFilter};
use orbit_monitor::services::classifier::{classify_ticket, TicketDecision};
use orbit_monitor::services::correlator::events::{
	INBOX_MESSAGE_DELIVERED_TOPIC, MESSAGE_DELIVERED_TOPIC,
};
use orbit_monitor::services::correlator::retryable::SubmitRetryableMessage;
use orbit_monitor::services::correlator::Correlator;
use orbit_monitor::services::scanner::BlockRange;

const T0: u64 = 1_700_000_000;

fn pad32(bytes: &[u8]) -> Vec<u8> {
	let mut word = vec![0u8; 32 - bytes.len()];
	word.extend_from_slice(bytes);
	word
}

fn hex_bytes(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

async fn mock_rpc(server: &mut ServerGuard, method: &str, result: serde_json::Value) {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({ "method": method })))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
		.create_async()
		.await;
}

////////////////////////////////////////////////////////////
// EvmClient surface
////////////////////////////////////////////////////////////

#[tokio::test]
async fn test_get_block_number() {
	let mut server = Server::new_async().await;
	mock_rpc(&mut server, "eth_blockNumber", json!("0x64")).await;

	let client = EvmClient::new(&server.url()).unwrap();
	assert_eq!(client.get_block_number().await.unwrap(), 100);
}

#[tokio::test]
async fn test_missing_receipt_is_none() {
	let mut server = Server::new_async().await;
	mock_rpc(&mut server, "eth_getTransactionReceipt", json!(null)).await;

	let client = EvmClient::new(&server.url()).unwrap();
	let receipt = client
		.get_transaction_receipt(B256::repeat_byte(0xAA))
		.await
		.unwrap();
	assert!(receipt.is_none());
}

#[tokio::test]
async fn test_eth_call_revert_is_classified() {
	let mut server = Server::new_async().await;
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({ "method": "eth_call" })))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(
			json!({
				"jsonrpc": "2.0",
				"id": 1,
				"error": { "code": 3, "message": "execution reverted" }
			})
			.to_string(),
		)
		.create_async()
		.await;

	let client = EvmClient::new(&server.url()).unwrap();
	let result = client.call(Address::repeat_byte(0x01), Bytes::new()).await;
	assert!(matches!(result, Err(BlockChainError::RevertError(_))));
}

#[tokio::test]
async fn test_get_logs_decodes_entries() {
	let mut server = Server::new_async().await;
	mock_rpc(
		&mut server,
		"eth_getLogs",
		json!([{
			"address": Address::repeat_byte(0x22),
			"topics": [*MESSAGE_DELIVERED_TOPIC],
			"data": "0x",
			"blockNumber": "0x64",
			"transactionHash": B256::repeat_byte(0xAA),
		}]),
	)
	.await;

	let client = EvmClient::new(&server.url()).unwrap();
	let logs = client
		.get_logs(LogFilter {
			address: Address::repeat_byte(0x22),
			topic0: *MESSAGE_DELIVERED_TOPIC,
			from_block: 100,
			to_block: 200,
		})
		.await
		.unwrap();

	assert_eq!(logs.len(), 1);
	assert_eq!(logs[0].block_number, Some(100));
	assert_eq!(logs[0].transaction_hash, Some(B256::repeat_byte(0xAA)));
}

#[tokio::test]
async fn test_get_block_safe_tag() {
	let mut server = Server::new_async().await;
	mock_rpc(
		&mut server,
		"eth_getBlockByNumber",
		json!({
			"number": "0x10",
			"timestamp": format!("0x{:x}", T0),
			"miner": Address::repeat_byte(0x05),
		}),
	)
	.await;

	let client = EvmClient::new(&server.url()).unwrap();
	let block = client.get_block(BlockTag::Safe).await.unwrap();
	assert_eq!(block.number, 16);
	assert_eq!(block.timestamp, T0);
}

////////////////////////////////////////////////////////////
// end-to-end correlation scenarios
////////////////////////////////////////////////////////////

fn test_chain(parent_url: &str, child_url: &str) -> ChildChain {
	serde_json::from_value(json!({
		"chainId": 412346,
		"parentChainId": 1,
		"name": "Test Orbit Chain",
		"orbitRpcUrl": child_url,
		"parentRpcUrl": parent_url,
		"explorerUrl": "https://child-explorer.example.com/",
		"parentExplorerUrl": "https://parent-explorer.example.com/",
		"ethBridge": {
			"bridge": Address::repeat_byte(0x22),
			"inbox": Address::repeat_byte(0x11),
			"outbox": Address::repeat_byte(0x0A),
			"rollup": Address::repeat_byte(0x0B),
			"sequencerInbox": Address::repeat_byte(0x0C),
		},
		"confirmPeriodBlocks": 45818
	}))
	.unwrap()
}

/// The packed submit-retryable payload delivered by the inbox event.
fn submit_retryable_payload() -> Vec<u8> {
	let mut payload = Vec::new();
	payload.extend_from_slice(&pad32(Address::repeat_byte(0x33).as_slice())); // dest
	payload.extend_from_slice(&pad32(&1_000_000u64.to_be_bytes())); // l2 call value
	payload.extend_from_slice(&pad32(&2_000_000u64.to_be_bytes())); // l1 value
	payload.extend_from_slice(&pad32(&3_000u64.to_be_bytes())); // max submission fee
	payload.extend_from_slice(&pad32(Address::repeat_byte(0x44).as_slice())); // excess fee refund
	payload.extend_from_slice(&pad32(Address::repeat_byte(0x55).as_slice())); // call value refund
	payload.extend_from_slice(&pad32(&21_000u64.to_be_bytes())); // gas limit
	payload.extend_from_slice(&pad32(&600_000_000u64.to_be_bytes())); // max fee per gas
	payload.extend_from_slice(&pad32(&[0])); // data length
	payload
}

fn message_delivered_log(kind: u8) -> serde_json::Value {
	let mut data = Vec::new();
	data.extend_from_slice(&pad32(Address::repeat_byte(0x11).as_slice())); // inbox
	data.extend_from_slice(&pad32(&[kind]));
	data.extend_from_slice(&pad32(Address::repeat_byte(0x66).as_slice())); // sender
	data.extend_from_slice(&[0x77; 32]); // messageDataHash
	data.extend_from_slice(&pad32(&1_000_000_000u64.to_be_bytes())); // baseFeeL1
	data.extend_from_slice(&pad32(&T0.to_be_bytes())); // timestamp

	json!({
		"address": Address::repeat_byte(0x22),
		"topics": [
			*MESSAGE_DELIVERED_TOPIC,
			B256::from(U256::from(5u64)),
			B256::repeat_byte(0x01),
		],
		"data": hex_bytes(&data),
		"blockNumber": "0x64",
		"transactionHash": B256::repeat_byte(0xAA),
	})
}

fn inbox_message_delivered_log() -> serde_json::Value {
	let payload = submit_retryable_payload();
	let mut data = Vec::new();
	data.extend_from_slice(&pad32(&[0x20])); // offset
	data.extend_from_slice(&pad32(&(payload.len() as u64).to_be_bytes()));
	data.extend_from_slice(&payload);

	json!({
		"address": Address::repeat_byte(0x11),
		"topics": [*INBOX_MESSAGE_DELIVERED_TOPIC, B256::from(U256::from(5u64))],
		"data": hex_bytes(&data),
		"blockNumber": "0x64",
		"transactionHash": B256::repeat_byte(0xAA),
	})
}

/// One kind-9 MessageDelivered event at block 100, transaction 0xAA…AA,
/// child-chain status FUNDS_DEPOSITED: the correlator emits exactly one
/// message and the classifier warns on it.
#[tokio::test]
async fn test_correlates_single_unredeemed_ticket() {
	let mut parent = Server::new_async().await;
	let mut child = Server::new_async().await;

	mock_rpc(&mut parent, "eth_getLogs", json!([message_delivered_log(9)])).await;
	mock_rpc(
		&mut parent,
		"eth_getTransactionReceipt",
		json!({
			"transactionHash": B256::repeat_byte(0xAA),
			"blockNumber": "0x64",
			"from": Address::repeat_byte(0x99),
			"to": Address::repeat_byte(0x11),
			"status": "0x1",
			"gasUsed": "0x5208",
			"logs": [message_delivered_log(9), inbox_message_delivered_log()],
		}),
	)
	.await;

	let creation_timestamp = T0 + 100;
	mock_rpc(
		&mut child,
		"eth_getTransactionReceipt",
		json!({
			"transactionHash": B256::repeat_byte(0xBB),
			"blockNumber": "0x10",
			"from": Address::repeat_byte(0x66),
			"to": Address::repeat_byte(0x33),
			"status": "0x1",
			"gasUsed": "0x5208",
			"logs": [],
		}),
	)
	.await;
	mock_rpc(
		&mut child,
		"eth_getBlockByNumber",
		json!({
			"number": "0x10",
			"timestamp": format!("0x{:x}", creation_timestamp),
			"miner": Address::repeat_byte(0x05),
		}),
	)
	.await;
	// getTimeout: the ticket is still live
	let timeout = creation_timestamp + 7 * 24 * 3600;
	mock_rpc(&mut child, "eth_call", json!(format!("0x{:064x}", timeout))).await;

	let chain = test_chain(&parent.url(), &child.url());
	let parent_client = EvmClient::new(&parent.url()).unwrap();
	let child_client = EvmClient::new(&child.url()).unwrap();
	let correlator = Correlator::new(&chain, &parent_client, &child_client);

	let now = T0 + 3 * 60 * 60;
	let tickets = correlator
		.correlate(BlockRange::new(100, 150), false, now)
		.await
		.unwrap();

	assert_eq!(tickets.len(), 1);
	let ticket = &tickets[0];
	assert_eq!(ticket.message.status, RetryableStatus::FundsDeposited);
	assert_eq!(
		ticket.message.source_transaction_hash,
		B256::repeat_byte(0xAA)
	);
	assert_eq!(ticket.message.creation_timestamp, creation_timestamp);
	assert_eq!(ticket.message.call_value, U256::from(1_000_000u64));
	assert_eq!(ticket.message.destination_address, Address::repeat_byte(0x33));

	// the ticket id matches an offline derivation from the same content
	let expected = SubmitRetryableMessage {
		message_num: U256::from(5u64),
		sender: Address::repeat_byte(0x66),
		base_fee_l1: U256::from(1_000_000_000u64),
		parent_timestamp: T0,
		dest_address: Address::repeat_byte(0x33),
		l2_call_value: U256::from(1_000_000u64),
		l1_value: U256::from(2_000_000u64),
		max_submission_fee: U256::from(3_000u64),
		excess_fee_refund_address: Address::repeat_byte(0x44),
		call_value_refund_address: Address::repeat_byte(0x55),
		gas_limit: U256::from(21_000u64),
		max_fee_per_gas: U256::from(600_000_000u64),
		data: Bytes::new(),
	};
	assert_eq!(ticket.message.ticket_id, expected.ticket_id(412346));

	// and the classifier warns on it (no escalation: plenty of time left)
	let decision = classify_ticket(
		ticket.message.status,
		ticket.message.creation_timestamp,
		ticket.message.timeout_timestamp,
		now,
	);
	assert_eq!(decision, TicketDecision::Warn { escalate: false });

	// correlation over the same immutable range is idempotent
	let rerun = correlator
		.correlate(BlockRange::new(100, 150), false, now)
		.await
		.unwrap();
	assert_eq!(rerun.len(), 1);
	assert_eq!(rerun[0].message.ticket_id, ticket.message.ticket_id);
	assert_eq!(rerun[0].message.status, ticket.message.status);
	assert_eq!(
		rerun[0].message.creation_timestamp,
		ticket.message.creation_timestamp
	);
}

/// Zero qualifying events in range: empty result, no error, nothing else
/// queried.
#[tokio::test]
async fn test_zero_events_yield_empty_result() {
	let mut parent = Server::new_async().await;
	let mut child = Server::new_async().await;

	mock_rpc(&mut parent, "eth_getLogs", json!([])).await;

	let chain = test_chain(&parent.url(), &child.url());
	let parent_client = EvmClient::new(&parent.url()).unwrap();
	let child_client = EvmClient::new(&child.url()).unwrap();
	let correlator = Correlator::new(&chain, &parent_client, &child_client);

	let tickets = correlator
		.correlate(BlockRange::new(100, 150), true, T0)
		.await
		.unwrap();
	assert!(tickets.is_empty());
}

/// Non-retryable message kinds are excluded from correlation entirely.
#[tokio::test]
async fn test_other_message_kinds_are_ignored() {
	let mut parent = Server::new_async().await;
	let mut child = Server::new_async().await;

	mock_rpc(&mut parent, "eth_getLogs", json!([message_delivered_log(12)])).await;

	let chain = test_chain(&parent.url(), &child.url());
	let parent_client = EvmClient::new(&parent.url()).unwrap();
	let child_client = EvmClient::new(&child.url()).unwrap();
	let correlator = Correlator::new(&chain, &parent_client, &child_client);

	let tickets = correlator
		.correlate(BlockRange::new(100, 150), false, T0)
		.await
		.unwrap();
	assert!(tickets.is_empty());
}
