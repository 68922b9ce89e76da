//! Orbit chain monitoring entry point.
//!
//! One binary, three monitors selected by subcommand:
//!
//! - `retryables`: unredeemed cross-chain retryable tickets
//! - `batch-poster`: batch-posting stalls and low batch-poster balance
//! - `assertions`: missing rollup assertions
//!
//! # Flow
//! 1. Parse CLI flags and load environment variables
//! 2. Load and validate the chain configuration (invalid config is fatal:
//!    the process exits nonzero before touching any chain)
//! 3. Run the selected monitor; per-chain errors are reported, not fatal
//! 4. Exit 0 on completion, including "no issues found"

use std::path::Path;

use clap::{Arg, ArgAction, Command};
use dotenvy::dotenv;
use tracing::error;

use orbit_monitor::models::MonitorConfig;
use orbit_monitor::monitors::{
	assertion::{self, AssertionMonitorOptions},
	batch_poster::{self, BatchPosterMonitorOptions},
	retryable::{self, RetryableMonitorOptions},
};
use orbit_monitor::utils::logging::setup_logging;

fn config_path_arg() -> Arg {
	Arg::new("configPath")
		.long("configPath")
		.help("Path to the chain configuration file")
		.value_name("PATH")
		.default_value("config.json")
}

fn enable_alerting_arg() -> Arg {
	Arg::new("enableAlerting")
		.long("enableAlerting")
		.help("Report findings to Slack instead of only logging them")
		.action(ArgAction::SetTrue)
}

fn cli() -> Command {
	Command::new("orbit-monitor")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Monitoring for Arbitrum Orbit chains: retryable tickets, batch posting and rollup \
			 assertions, with optional Slack alerting.",
		)
		.subcommand_required(true)
		.arg_required_else_help(true)
		.subcommand(
			Command::new("retryables")
				.about("Find cross-chain retryable tickets and report unredeemed ones")
				.arg(
					Arg::new("fromBlock")
						.long("fromBlock")
						.help("First parent-chain block to scan (0 = default window)")
						.value_name("BLOCK")
						.value_parser(clap::value_parser!(u64))
						.default_value("0"),
				)
				.arg(
					Arg::new("toBlock")
						.long("toBlock")
						.help("Last parent-chain block to scan (0 = latest)")
						.value_name("BLOCK")
						.value_parser(clap::value_parser!(u64))
						.default_value("0"),
				)
				.arg(
					Arg::new("continuous")
						.long("continuous")
						.help("Keep re-polling from the last checked block")
						.action(ArgAction::SetTrue),
				)
				.arg(config_path_arg())
				.arg(enable_alerting_arg()),
		)
		.subcommand(
			Command::new("batch-poster")
				.about("Check for batch-posting stalls and low batch poster balance")
				.arg(config_path_arg())
				.arg(enable_alerting_arg()),
		)
		.subcommand(
			Command::new("assertions")
				.about("Check that rollup assertions are still being created")
				.arg(config_path_arg())
				.arg(enable_alerting_arg()),
		)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let matches = cli().get_matches();

	// Load environment variables from .env file
	dotenv().ok();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	let (subcommand, sub_matches) = matches
		.subcommand()
		.ok_or_else(|| anyhow::anyhow!("a monitor subcommand is required"))?;

	let config_path = sub_matches
		.get_one::<String>("configPath")
		.map(String::as_str)
		.unwrap_or("config.json");
	let config = MonitorConfig::load(Path::new(config_path))
		.map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", config_path, e))?;

	let enable_alerting = sub_matches.get_flag("enableAlerting");

	match subcommand {
		"retryables" => {
			let options = RetryableMonitorOptions {
				from_block: *sub_matches.get_one::<u64>("fromBlock").unwrap_or(&0),
				to_block: *sub_matches.get_one::<u64>("toBlock").unwrap_or(&0),
				continuous: sub_matches.get_flag("continuous"),
				enable_alerting,
			};
			retryable::run(&config, &options).await
		}
		"batch-poster" => {
			let options = BatchPosterMonitorOptions { enable_alerting };
			batch_poster::run(&config, &options).await
		}
		"assertions" => {
			let options = AssertionMonitorOptions { enable_alerting };
			assertion::run(&config, &options).await
		}
		_ => Err(anyhow::anyhow!("unknown subcommand: {}", subcommand)),
	}
}
