//! Batch poster monitor.
//!
//! Scans the sequencer inbox for `SequencerBatchDelivered` events over a
//! bounded window and decides whether batch posting has stalled or the
//! batch poster is running out of funds. Chains run sequentially to avoid
//! hammering shared RPC endpoints; per-chain alerts are collected after
//! all chains finish and delivered as one batched message.

use alloy_primitives::{address, Address, Bytes, U256};
use tracing::{error, info, warn};

use crate::models::{AlertRecord, ChildChain, LogEntry, MonitorConfig, Severity};
use crate::services::blockchain::{BlockChainError, BlockTag, EvmClient, LogFilter};
use crate::services::classifier::{
	batch_posting_time_bounds, estimated_daily_spend, minimum_balance_threshold,
	should_alert_batch_posting, MAX_TIMEBOUNDS_SECONDS, RECENT_BATCH_TX_LIMIT,
};
use crate::services::correlator::events::{
	MAX_TIME_VARIATION_SELECTOR, SEQUENCER_BATCH_DELIVERED_TOPIC,
	SEQUENCER_REPORTED_SUB_MESSAGE_COUNT_SELECTOR,
};
use crate::services::notification::{format_alert_record, format_eth, AlertReporter, MonitorKind};
use crate::services::scanner::{scan_range, BlockRange, RetryPolicy};
use crate::utils::time::unix_now;

/// CLI options for the batch poster monitor.
#[derive(Debug, Clone)]
pub struct BatchPosterMonitorOptions {
	pub enable_alerting: bool,
}

/// Blocks whose miner is this address contain user transactions.
const MINER_OF_USER_TX_BLOCKS: Address = address!("a4b000000000000000000073657175656e636572");

/// Ethereum mainnet parents need a conservative chunk to dodge rate
/// limits; everyone else tolerates wide ranges.
fn max_blocks_to_process(chain: &ChildChain) -> u64 {
	if chain.parent_chain_id == 1 {
		500
	} else {
		500_000
	}
}

/// Runs the batch poster monitor across all configured chains.
pub async fn run(config: &MonitorConfig, options: &BatchPosterMonitorOptions) -> anyhow::Result<()> {
	info!(
		">>>>>> Processing chains: {:?}",
		config
			.child_chains
			.iter()
			.map(|chain| (chain.name.as_str(), chain.chain_id))
			.collect::<Vec<_>>()
	);

	let reporter = AlertReporter::from_env(MonitorKind::BatchPoster, options.enable_alerting);

	// single aggregation pass after all chains complete; nothing appends
	// concurrently
	let mut batched_alerts: Vec<AlertRecord> = Vec::new();

	for chain in &config.child_chains {
		info!(">>>>> Processing chain: {}", chain.name);
		match monitor_batch_poster(chain).await {
			Ok(Some(record)) => {
				info!("Alert on {}:", record.chain_name);
				for reason in &record.reasons {
					info!("• {}", reason);
				}
				info!("--------------------------------------");
				batched_alerts.push(record);
			}
			Ok(None) => {}
			Err(e) => {
				let error_str = format!(
					"Batch Posting alert on [{}]:\nError processing chain: {}",
					chain.name, e
				);
				error!("{}", error_str);
				if options.enable_alerting {
					reporter.report(&error_str).await;
				}
			}
		}
	}

	if options.enable_alerting && !batched_alerts.is_empty() {
		let final_message = format!(
			"Batch poster monitor summary \n\n{}",
			batched_alerts
				.iter()
				.map(format_alert_record)
				.collect::<Vec<_>>()
				.join("\n--------------------------------------\n")
		);
		reporter.report(&final_message).await;
	}

	Ok(())
}

async fn monitor_batch_poster(chain: &ChildChain) -> anyhow::Result<Option<AlertRecord>> {
	let parent_client = EvmClient::new(&chain.parent_rpc_url)?;
	let child_client = EvmClient::new(&chain.orbit_rpc_url)?;

	let mut reasons: Vec<String> = Vec::new();

	let latest_block_number = parent_client.get_block_number().await?;
	let window_blocks = (MAX_TIMEBOUNDS_SECONDS as f64 / chain.parent_chain_block_time()) as u64;
	let to_block = latest_block_number;
	let from_block = to_block.saturating_sub(window_blocks);

	let sequencer_inbox = chain.eth_bridge.sequencer_inbox;
	let sequencer_inbox_logs = scan_range(
		BlockRange::new(from_block, to_block),
		max_blocks_to_process(chain),
		&RetryPolicy::default(),
		|sub| {
			parent_client.get_logs(LogFilter {
				address: sequencer_inbox,
				topic0: *SEQUENCER_BATCH_DELIVERED_TOPIC,
				from_block: sub.from_block,
				to_block: sub.to_block,
			})
		},
	)
	.await?;

	if let Some(reason) =
		batch_poster_low_balance_reason(chain, &parent_client, &sequencer_inbox_logs).await?
	{
		reasons.push(reason);
	}

	let time_bounds = get_batch_posting_time_bounds(chain, &parent_client).await;
	let latest_child_block_number = child_client.get_block_number().await?;

	if sequencer_inbox_logs.is_empty() {
		// nothing posted in the whole window; that is only a problem if
		// there are unposted blocks carrying user transactions
		let safe_block = child_client.get_block(BlockTag::Safe).await?;
		let blocks_pending = latest_child_block_number.saturating_sub(safe_block.number);
		let user_activity = check_for_user_transaction_blocks(
			&child_client,
			safe_block.number + 1,
			latest_child_block_number,
		)
		.await?;

		if blocks_pending > 0 && user_activity {
			reasons.push(format!(
				"No batch has been posted in the last {} hours, and last block number ({}) is \
				 greater than the last safe block number ({}). {}",
				MAX_TIMEBOUNDS_SECONDS / 60 / 60,
				latest_child_block_number,
				safe_block.number,
				time_bounds_expected_message(time_bounds)
			));
			reasons.push(sequencer_inbox_reason(chain));
			return Ok(Some(AlertRecord::new(&chain.name, Severity::Warn, reasons)));
		}

		info!("**********");
		info!("Batch poster summary of [{}]", chain.name);
		info!(
			"No user activity in the last {} hours, and hence no batch has been posted.",
			MAX_TIMEBOUNDS_SECONDS / 60 / 60
		);
		return Ok(None);
	}

	// last posted batch and its age
	let last_log = sequencer_inbox_logs.last().ok_or_else(|| {
		BlockChainError::internal_error("Sequencer inbox logs vanished mid-check")
	})?;
	let last_log_block_number = last_log.block_number.ok_or_else(|| {
		BlockChainError::decode_error("SequencerBatchDelivered log without a block number")
	})?;
	let last_batch_block = parent_client
		.get_block(BlockTag::Number(last_log_block_number))
		.await?;
	let seconds_since_last_batch = unix_now().saturating_sub(last_batch_block.timestamp);

	// last child block included in a posted batch
	let reported = parent_client
		.call(
			chain.eth_bridge.bridge,
			Bytes::from(SEQUENCER_REPORTED_SUB_MESSAGE_COUNT_SELECTOR.to_vec()),
		)
		.await?;
	let last_block_reported =
		U256::from_be_slice(reported.get(..32).unwrap_or(&reported)).saturating_to::<u64>();

	let backlog = latest_child_block_number.saturating_sub(last_block_reported);

	if should_alert_batch_posting(backlog, seconds_since_last_batch, time_bounds) {
		reasons.push(format!(
			"Last batch was posted {} hours and {} mins ago, and there's a backlog of {} blocks \
			 in the chain. {}",
			seconds_since_last_batch / 60 / 60,
			(seconds_since_last_batch / 60) % 60,
			backlog,
			time_bounds_expected_message(time_bounds)
		));
	}

	if !reasons.is_empty() {
		reasons.push(sequencer_inbox_reason(chain));
		return Ok(Some(AlertRecord::new(&chain.name, Severity::Warn, reasons)));
	}

	info!("**********");
	info!("Batch poster summary of [{}]", chain.name);
	info!(
		"Latest block number on [{}] is {}.",
		chain.name, latest_child_block_number
	);
	info!(
		"Latest [{}] block included on [Parent chain id: {}, block-number {}] is {} => {} hours, \
		 {} minutes, {} seconds ago.",
		chain.name,
		chain.parent_chain_id,
		last_batch_block.number,
		last_block_reported,
		seconds_since_last_batch / 60 / 60,
		(seconds_since_last_batch / 60) % 60,
		seconds_since_last_batch % 60
	);
	info!("Batch poster backlog is {} blocks.", backlog);
	info!("{}", time_bounds_expected_message(time_bounds));
	info!("**********");

	Ok(None)
}

fn sequencer_inbox_reason(chain: &ChildChain) -> String {
	format!(
		"SequencerInbox located at <{}{}|{}> on [chain id {}]",
		chain.parent_address_prefix(),
		chain.eth_bridge.sequencer_inbox,
		chain.eth_bridge.sequencer_inbox,
		chain.parent_chain_id
	)
}

fn time_bounds_expected_message(time_bounds: u64) -> String {
	format!(
		"At least 1 batch is expected to be posted every {} hours.",
		time_bounds as f64 / 60.0 / 60.0
	)
}

/// Reads `maxTimeVariation()` from the sequencer inbox and derives the
/// expected posting interval; read failures fall back to the default.
async fn get_batch_posting_time_bounds(chain: &ChildChain, parent_client: &EvmClient) -> u64 {
	let max_time_variation = match parent_client
		.call(
			chain.eth_bridge.sequencer_inbox,
			Bytes::from(MAX_TIME_VARIATION_SELECTOR.to_vec()),
		)
		.await
	{
		Ok(ret) if ret.len() >= 128 => {
			let delay_blocks = U256::from_be_slice(&ret[0..32]).saturating_to::<u64>();
			let delay_seconds = U256::from_be_slice(&ret[64..96]).saturating_to::<u64>();
			Some((delay_blocks, delay_seconds))
		}
		Ok(_) => None,
		Err(e) => {
			warn!(
				"maxTimeVariation() read failed for [{}], using fallback: {}",
				chain.name, e
			);
			None
		}
	};

	batch_posting_time_bounds(max_time_variation, chain.parent_chain_block_time())
}

/// Whether any block in `[from_block, to_block]` contains user
/// transactions, judged by the block miner address.
async fn check_for_user_transaction_blocks(
	child_client: &EvmClient,
	from_block: u64,
	to_block: u64,
) -> Result<bool, BlockChainError> {
	for block_number in from_block..=to_block {
		let block = child_client.get_block(BlockTag::Number(block_number)).await?;
		if block.miner == MINER_OF_USER_TX_BLOCKS {
			return Ok(true);
		}
	}
	Ok(false)
}

/// Low-balance sub-check. Resolution failures produce an informational
/// reason rather than an error; the balance math itself is delegated to
/// the classifier.
async fn batch_poster_low_balance_reason(
	chain: &ChildChain,
	parent_client: &EvmClient,
	sequencer_inbox_logs: &[LogEntry],
) -> Result<Option<String>, BlockChainError> {
	// the batch poster is whoever sent the first batch-posting transaction
	let batch_poster = match resolve_batch_poster(parent_client, sequencer_inbox_logs).await {
		Some(address) => address,
		None => return Ok(Some("Batch poster information not found".to_string())),
	};

	let current_balance = parent_client.get_balance(batch_poster).await?;

	// spend estimate from the most recent postings, bounded
	let recent_logs = &sequencer_inbox_logs
		[sequencer_inbox_logs.len().saturating_sub(RECENT_BATCH_TX_LIMIT)..];
	let mut gas_used = U256::ZERO;
	for log in recent_logs {
		if let Some(hash) = log.transaction_hash {
			if let Some(receipt) = parent_client.get_transaction_receipt(hash).await? {
				gas_used += receipt.gas_used;
			}
		}
	}

	let gas_price = parent_client.gas_price().await?;
	let daily_spend = estimated_daily_spend(gas_used, gas_price, MAX_TIMEBOUNDS_SECONDS);
	let minimum_expected_balance = minimum_balance_threshold(daily_spend);

	info!(
		"[{}] batch poster {} balance: {} ETH, minimum expected: {} ETH",
		chain.name,
		batch_poster,
		format_eth(current_balance),
		format_eth(minimum_expected_balance)
	);

	if current_balance < minimum_expected_balance {
		return Ok(Some(format!(
			"Low Batch poster balance (<{}{}|{}>): {} ETH (Expected balance: {} ETH)",
			chain.parent_address_prefix(),
			batch_poster,
			batch_poster,
			format_eth(current_balance),
			format_eth(minimum_expected_balance)
		)));
	}

	Ok(None)
}

async fn resolve_batch_poster(
	parent_client: &EvmClient,
	sequencer_inbox_logs: &[LogEntry],
) -> Option<Address> {
	let transaction_hash = sequencer_inbox_logs.first()?.transaction_hash?;
	let transaction = parent_client
		.get_transaction_by_hash(transaction_hash)
		.await
		.ok()??;
	Some(transaction.from)
}
