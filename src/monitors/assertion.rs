//! Assertion monitor.
//!
//! A healthy rollup posts `NodeCreated` assertions on its parent chain at
//! a steady cadence. This monitor computes a per-chain search window from
//! the confirmation period and scans the rollup contract for assertion
//! events; silence over the whole window is alert-worthy.

use tracing::{error, info};

use crate::models::{AlertRecord, ChildChain, MonitorConfig, Severity};
use crate::services::blockchain::{BlockTag, EvmClient, LogFilter};
use crate::services::classifier::assertion_search_window_seconds;
use crate::services::correlator::events::NODE_CREATED_TOPIC;
use crate::services::notification::{AlertReporter, MonitorKind};
use crate::services::scanner::{scan_range, BlockRange, RetryPolicy};
use crate::utils::time::{timestamp_to_utc, unix_now};

/// CLI options for the assertion monitor.
#[derive(Debug, Clone)]
pub struct AssertionMonitorOptions {
	pub enable_alerting: bool,
}

/// Rollup contracts emit few events; a small chunk keeps within the
/// stricter pagination caps of the public endpoints this monitor targets.
const CHUNK_SIZE: u64 = 800;

/// Runs the assertion monitor across all configured chains.
pub async fn run(config: &MonitorConfig, options: &AssertionMonitorOptions) -> anyhow::Result<()> {
	let reporter = AlertReporter::from_env(MonitorKind::Assertions, options.enable_alerting);

	let mut alerts: Vec<AlertRecord> = Vec::new();

	for chain in &config.child_chains {
		info!("Checking for assertion creation events on {}...", chain.name);
		match monitor_node_created_events(chain).await {
			Ok(Some(record)) => {
				info!("No assertion creation events found on {}", chain.name);
				alerts.push(record);
			}
			Ok(None) => {}
			Err(e) => {
				let error_str = format!(
					"Error processing chain data for assertion monitoring on [{}]: {}",
					chain.name, e
				);
				error!("{}", error_str);
				if options.enable_alerting {
					reporter.report(&error_str).await;
				}
			}
		}
	}

	if alerts.is_empty() {
		info!("No alerts generated for any chains.");
		return Ok(());
	}

	let summary = alerts
		.iter()
		.flat_map(|record| record.reasons.iter())
		.map(|reason| format!("- {}", reason))
		.collect::<Vec<_>>()
		.join("\n");
	let alert_message = format!("Assertion Creation Alert Summary:\n{}", summary);
	error!("{}", alert_message);

	if options.enable_alerting {
		reporter.report(&alert_message).await;
	}

	Ok(())
}

async fn monitor_node_created_events(
	chain: &ChildChain,
) -> anyhow::Result<Option<AlertRecord>> {
	let parent_client = EvmClient::new(&chain.parent_rpc_url)?;
	let child_client = EvmClient::new(&chain.orbit_rpc_url)?;

	let parent_block_time = chain.parent_chain_block_time();
	let window_seconds =
		assertion_search_window_seconds(chain.confirm_period_blocks, parent_block_time);
	let window_blocks = (window_seconds as f64 / parent_block_time) as u64;

	let to_block = parent_client.get_block_number().await?;
	let from_block = to_block.saturating_sub(window_blocks);

	let rollup = chain.eth_bridge.rollup;
	let logs = scan_range(
		BlockRange::new(from_block, to_block),
		CHUNK_SIZE,
		&RetryPolicy::default(),
		|sub| {
			parent_client.get_logs(LogFilter {
				address: rollup,
				topic0: *NODE_CREATED_TOPIC,
				from_block: sub.from_block,
				to_block: sub.to_block,
			})
		},
	)
	.await?;

	let duration_days = window_seconds as f64 / 86400.0;
	let duration_string = if duration_days == 1.0 {
		"in the last day".to_string()
	} else {
		format!("in the last {} days", duration_days)
	};

	if !logs.is_empty() {
		info!(
			"Found {} assertion creation event(s) on {} {}.",
			logs.len(),
			chain.name,
			duration_string
		);
		return Ok(None);
	}

	// enrich the alert with where batch posting currently stands
	let latest_safe_block = child_client.get_block(BlockTag::Safe).await?;
	let safe_block_within_window =
		latest_safe_block.timestamp >= unix_now().saturating_sub(window_seconds);

	let message = format!(
		"No assertion creation events found on {} {}. Latest batch {} posted within this \
		 duration, at {} (block {})",
		chain.name,
		duration_string,
		if safe_block_within_window {
			"was"
		} else {
			"was not"
		},
		timestamp_to_utc(latest_safe_block.timestamp),
		latest_safe_block.number
	);

	Ok(Some(AlertRecord::new(
		&chain.name,
		Severity::Warn,
		vec![message],
	)))
}
