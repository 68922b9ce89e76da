//! Retryable ticket monitor.
//!
//! For every configured chain: scan the parent-chain bridge for retryable
//! creations, correlate each ticket with its child-chain state, log a
//! status line per ticket, and report every unredeemed ticket that
//! survives the suppression rules. Chains are processed concurrently;
//! each chain owns its own clients, so tasks share nothing mutable.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::models::{ChildChain, MonitorConfig, RetryableStatus, SEVEN_DAYS_IN_SECONDS};
use crate::services::classifier::{classify_ticket, TicketDecision};
use crate::services::correlator::{CorrelatedTicket, Correlator};
use crate::services::notification::{
	format_ticket_report, AlertReporter, MonitorKind, PriceCache,
};
use crate::services::blockchain::EvmClient;
use crate::services::scanner::BlockRange;
use crate::utils::time::unix_now;

/// CLI options for the retryable monitor.
#[derive(Debug, Clone)]
pub struct RetryableMonitorOptions {
	/// First parent-chain block to scan; 0 means "use the default window".
	pub from_block: u64,
	/// Last parent-chain block to scan; 0 means "use the latest block".
	pub to_block: u64,
	pub continuous: bool,
	pub enable_alerting: bool,
}

/// Wall-clock cap on a continuous-mode run.
const PROCESSING_DURATION: Duration = Duration::from_secs(180);

/// Delay between polls once the scan has caught up with the chain head.
const CONTINUOUS_POLL_DELAY: Duration = Duration::from_secs(1);

/// Runs the retryable monitor across all configured chains.
pub async fn run(config: &MonitorConfig, options: &RetryableMonitorOptions) -> anyhow::Result<()> {
	info!(
		">>>>>> Processing child chains: {:?}",
		config
			.child_chains
			.iter()
			.map(|chain| (chain.name.as_str(), chain.chain_id))
			.collect::<Vec<_>>()
	);

	let reporter = Arc::new(AlertReporter::from_env(
		MonitorKind::Retryables,
		options.enable_alerting,
	));

	let tasks = config.child_chains.iter().map(|chain| {
		let reporter = reporter.clone();
		async move {
			if let Err(e) = process_child_chain(chain, options, &reporter).await {
				let error_str = format!(
					"Retryable monitor - Error processing chain [{}]: {}",
					chain.name, e
				);
				error!("{}", error_str);
				if options.enable_alerting {
					reporter.report(&error_str).await;
				}
			}
		}
	});

	futures::future::join_all(tasks).await;
	Ok(())
}

async fn process_child_chain(
	chain: &ChildChain,
	options: &RetryableMonitorOptions,
	reporter: &AlertReporter,
) -> anyhow::Result<()> {
	info!("----------------------------------------------------------");
	info!("Running for Chain: {}", chain.name);
	info!("----------------------------------------------------------");

	let parent_client = EvmClient::new(&chain.parent_rpc_url)?;
	let child_client = EvmClient::new(&chain.orbit_rpc_url)?;
	let correlator = Correlator::new(chain, &parent_client, &child_client);
	let mut price_cache = PriceCache::new();

	if options.continuous {
		info!("Continuous mode activated.");
		check_retryables_continuous(
			chain,
			&parent_client,
			&correlator,
			reporter,
			&mut price_cache,
			options,
		)
		.await
	} else {
		info!("One-off mode activated.");
		let (found, _) = check_retryables_one_off(
			chain,
			&parent_client,
			&correlator,
			reporter,
			&mut price_cache,
			options.from_block,
			options.to_block,
			options.enable_alerting,
		)
		.await?;

		if !found {
			info!("No retryables found for {}", chain.name);
			info!("----------------------------------------------------------");
		}
		Ok(())
	}
}

/// Scans one block range; returns whether any retryables were found and
/// the last block checked (for the continuous-mode cursor).
#[allow(clippy::too_many_arguments)]
async fn check_retryables_one_off(
	chain: &ChildChain,
	parent_client: &EvmClient,
	correlator: &Correlator<'_>,
	reporter: &AlertReporter,
	price_cache: &mut PriceCache,
	from_block: u64,
	to_block: u64,
	enable_alerting: bool,
) -> anyhow::Result<(bool, u64)> {
	let mut from_block = from_block;
	let mut to_block = to_block;

	if to_block == 0 {
		to_block = parent_client.get_block_number().await?;

		// with no explicit range, bound the scan to the period a ticket
		// could still matter for: twice the retryable lifetime
		if from_block == 0 && enable_alerting {
			let window_blocks = ((2 * SEVEN_DAYS_IN_SECONDS) as f64
				/ chain.parent_chain_block_time()) as u64;
			from_block = to_block.saturating_sub(window_blocks);
			info!(
				"[{}] Alerting mode enabled: limiting block-range to last 14 days [{} to {}]",
				chain.name, from_block, to_block
			);
		}
	}

	if from_block > to_block {
		return Ok((false, to_block));
	}

	let now = unix_now();
	let tickets = correlator
		.correlate(BlockRange::new(from_block, to_block), enable_alerting, now)
		.await?;

	if tickets.is_empty() {
		return Ok((false, to_block));
	}

	info!(
		"[{}] {} retryable{} found. Checking their status:",
		chain.name,
		tickets.len(),
		if tickets.len() == 1 { "" } else { "s" }
	);

	for (index, ticket) in tickets.iter().enumerate() {
		info!(
			"[{}] {}. {}:\nParentChainTxHash: {}{}\nChildChainTxHash: {}{}",
			chain.name,
			index + 1,
			ticket.message.status,
			chain.parent_tx_prefix(),
			ticket.message.source_transaction_hash,
			chain.child_tx_prefix(),
			ticket.message.ticket_id
		);
		info!("----------------------------------------------------------");

		if ticket.message.status != RetryableStatus::Redeemed && enable_alerting {
			report_failed_ticket(chain, ticket, reporter, price_cache, now).await;
		}
	}

	Ok((true, to_block))
}

/// Applies the suppression rules and, when they pass, formats and delivers
/// the failed-ticket report.
async fn report_failed_ticket(
	chain: &ChildChain,
	ticket: &CorrelatedTicket,
	reporter: &AlertReporter,
	price_cache: &mut PriceCache,
	now: u64,
) {
	let Some(child_report) = &ticket.child_report else {
		return;
	};

	let decision = classify_ticket(
		child_report.status,
		child_report.created_at_timestamp,
		child_report.timeout_timestamp,
		now,
	);
	let escalate = match decision {
		TicketDecision::Suppress(_) => return,
		TicketDecision::Warn { escalate } => escalate,
	};

	let eth_usd = price_cache.eth_price().await;
	let token_usd = match &ticket.token_deposit {
		Some(deposit) => price_cache.token_price(deposit.parent_token_address).await,
		None => None,
	};

	let report = format_ticket_report(
		chain,
		&ticket.parent_report,
		child_report,
		ticket.token_deposit.as_ref(),
		escalate,
		eth_usd,
		token_usd,
		now,
	);
	reporter.report(&report).await;
}

/// Continuous mode: re-poll from the last checked block until the
/// wall-clock cap expires.
async fn check_retryables_continuous(
	chain: &ChildChain,
	parent_client: &EvmClient,
	correlator: &Correlator<'_>,
	reporter: &AlertReporter,
	price_cache: &mut PriceCache,
	options: &RetryableMonitorOptions,
) -> anyhow::Result<()> {
	let start = tokio::time::Instant::now();
	let mut from_block = options.from_block;
	let mut to_block = options.to_block;

	loop {
		let (_, last_checked) = check_retryables_one_off(
			chain,
			parent_client,
			correlator,
			reporter,
			price_cache,
			from_block,
			to_block,
			options.enable_alerting,
		)
		.await?;

		info!("Check completed for block: {}", last_checked);
		from_block = last_checked + 1;
		info!("Continuing from block: {}", from_block);

		to_block = parent_client.get_block_number().await?;

		if last_checked >= to_block {
			tokio::time::sleep(CONTINUOUS_POLL_DELAY).await;
		}

		if start.elapsed() >= PROCESSING_DURATION {
			return Ok(());
		}
	}
}
