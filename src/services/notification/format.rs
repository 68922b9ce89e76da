//! Report formatting for the Slack sink.
//!
//! Classification emits structured records; everything human-readable is
//! assembled here, including the failed-ticket report layout carried over
//! from the original monitoring scripts.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use reqwest::Client;
use tracing::debug;

use crate::models::{
	AlertRecord, ChildChain, ChildChainTicketReport, ParentChainTicketReport, RetryableStatus,
	TokenDepositData,
};
use crate::utils::time::{format_remaining_time, timestamp_to_utc};

/// Formats a wei-denominated value with the given number of decimals,
/// trimming trailing zeros ("1.5", "0.25", "12").
pub fn format_units(value: U256, decimals: u32) -> String {
	let divisor = U256::from(10u64).pow(U256::from(decimals));
	let integer = value / divisor;
	let fraction = value % divisor;

	if fraction.is_zero() {
		return integer.to_string();
	}

	let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
	let fraction = fraction.trim_end_matches('0');
	format!("{}.{}", integer, fraction)
}

/// Formats a wei value as ETH.
pub fn format_eth(value: U256) -> String {
	format_units(value, 18)
}

/// Formats a wei value as gwei.
pub fn format_gwei(value: U256) -> String {
	format_units(value, 9)
}

/// USD price lookups with per-run memoization.
///
/// Owned by the caller and injected where needed, so there is no hidden
/// process-wide price state and tests stay deterministic. Lookups are
/// best-effort; failures yield `None` and reports simply omit USD figures.
pub struct PriceCache {
	client: Client,
	eth_usd: Option<f64>,
	token_usd: HashMap<Address, f64>,
}

impl PriceCache {
	pub fn new() -> Self {
		Self {
			client: Client::new(),
			eth_usd: None,
			token_usd: HashMap::new(),
		}
	}

	/// USD price of ETH, memoized after the first successful fetch.
	pub async fn eth_price(&mut self) -> Option<f64> {
		if let Some(price) = self.eth_usd {
			return Some(price);
		}

		let url = "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd";
		let price = self.fetch_usd(url, "ethereum").await;
		if let Some(price) = price {
			self.eth_usd = Some(price);
		}
		price
	}

	/// USD price of an ERC20 on Ethereum, memoized per token.
	pub async fn token_price(&mut self, token: Address) -> Option<f64> {
		if let Some(price) = self.token_usd.get(&token) {
			return Some(*price);
		}

		let key = format!("{:#x}", token);
		let url = format!(
			"https://api.coingecko.com/api/v3/simple/token_price/ethereum?contract_addresses={}&vs_currencies=usd",
			key
		);
		let price = self.fetch_usd(&url, &key).await;
		if let Some(price) = price {
			self.token_usd.insert(token, price);
		}
		price
	}

	async fn fetch_usd(&self, url: &str, key: &str) -> Option<f64> {
		let response = self.client.get(url).send().await.ok()?;
		let body: serde_json::Value = response.json().await.ok()?;
		let price = body.get(key)?.get("usd")?.as_f64();
		if price.is_none() {
			debug!(key, "No USD price in response");
		}
		price
	}
}

impl Default for PriceCache {
	fn default() -> Self {
		Self::new()
	}
}

fn report_prefix(status: RetryableStatus, escalate: bool) -> String {
	let prefix = match status {
		RetryableStatus::FundsDeposited => "*[Orbit] Retryable ticket hasn't been redeemed:*",
		RetryableStatus::NotYetCreated => "*[Orbit] Retryable ticket hasn't been scheduled:*",
		RetryableStatus::Expired => "*[Orbit] Retryable ticket expired:*",
		RetryableStatus::CreationFailed => "*[Orbit] Retryable ticket creation failed:*",
		RetryableStatus::Redeemed => "*[Orbit] Found retryable ticket in unrecognized state:*",
	};

	if escalate {
		format!("🆘📣 {} 📣🆘", prefix)
	} else {
		prefix.to_string()
	}
}

/// Renders one failed-ticket report.
///
/// `eth_usd` and `token_usd` are optional price enrichments; when absent
/// the USD figures are simply omitted.
pub fn format_ticket_report(
	chain: &ChildChain,
	parent: &ParentChainTicketReport,
	child: &ChildChainTicketReport,
	token_deposit: Option<&TokenDepositData>,
	escalate: bool,
	eth_usd: Option<f64>,
	token_usd: Option<f64>,
	now: u64,
) -> String {
	let mut report = report_prefix(child.status, escalate);

	let sender = token_deposit.map(|d| d.sender).unwrap_or(parent.sender);
	report.push_str(&format!(
		"\n\t *Retryable sender:* <{}{}|{}>",
		chain.parent_address_prefix(),
		sender,
		sender
	));

	if let Some(to) = child.retry_to {
		report.push_str(&format!("\n\t *Destination:* <{}>", to));
	}

	report.push_str(&format!(
		"\n\t *Parent chain TX:* <{}{}|{}>",
		chain.parent_tx_prefix(),
		parent.transaction_hash,
		parent.transaction_hash
	));

	report.push_str(&format!(
		"\n\t *Child chain ticket creation TX:* <{}{}|{}>",
		chain.child_tx_prefix(),
		child.ticket_id,
		child.ticket_id
	));

	let eth_amount = format_eth(child.deposit);
	match eth_usd.and_then(|price| eth_amount.parse::<f64>().ok().map(|a| a * price)) {
		Some(worth) => report.push_str(&format!(
			"\n\t *Child chain callvalue:* {} ETH (${:.2})",
			eth_amount, worth
		)),
		None => report.push_str(&format!("\n\t *Child chain callvalue:* {} ETH", eth_amount)),
	}

	match token_deposit {
		Some(deposit) => {
			let amount = deposit
				.token_amount
				.map(|a| format_units(a, deposit.decimals as u32))
				.unwrap_or_else(|| "-".to_string());
			let mut line = format!("\n\t *Tokens deposited:* {} {}", amount, deposit.symbol);
			if let Some(worth) = token_usd
				.and_then(|price| amount.parse::<f64>().ok().map(|a| a * price))
			{
				line.push_str(&format!(" (${:.2})", worth));
			}
			line.push_str(&format!(" ({})", deposit.parent_token_address));
			report.push_str(&line);
		}
		None => report.push_str("\n\t *Tokens deposited:* -"),
	}

	report.push_str("\n\t *Gas params:* ");
	report.push_str(&format!(
		"\n\t\t gas price provided: {} gwei",
		format_gwei(child.gas_fee_cap)
	));
	match child.gas_price_at_creation {
		Some(price) => report.push_str(&format!(
			"\n\t\t gas price at ticket creation block: {} gwei",
			format_gwei(price)
		)),
		None => report.push_str("\n\t\t gas price at ticket creation block: unable to fetch"),
	}
	report.push_str(&format!("\n\t\t gas limit provided: {}", child.gas_limit));

	report.push_str(&format!(
		"\n\t *Created at:* {}",
		timestamp_to_utc(child.created_at_timestamp)
	));

	let expiry_word = if child.status == RetryableStatus::Expired {
		"Expired"
	} else {
		"Expires"
	};
	let mut expiry_line = format!(
		"\n\t *{} at:* {}",
		expiry_word,
		timestamp_to_utc(child.timeout_timestamp)
	);
	if child.status.is_actionable() {
		expiry_line.push_str(&format!(
			" (that's {} from now)",
			format_remaining_time(child.timeout_timestamp, now)
		));
	}
	report.push_str(&expiry_line);

	report.push_str("\n=================================================================");
	report
}

/// Renders an aggregated alert record as a Slack message block.
pub fn format_alert_record(record: &AlertRecord) -> String {
	let reasons = record
		.reasons
		.iter()
		.filter(|reason| !reason.trim().is_empty())
		.cloned()
		.collect::<Vec<_>>()
		.join("\n• ");
	format!("[{}]:\n• {}", record.chain_name, reasons)
}
