//! Alert reporting sink.
//!
//! Slack delivery is best-effort relative to the monitor's primary job of
//! surfacing console/log output: sink failures are logged and swallowed,
//! never propagated.

mod error;
pub mod format;
mod slack;

pub use error::NotificationError;
pub use format::{format_alert_record, format_eth, format_gwei, format_ticket_report, PriceCache};
pub use slack::{sanitize_message, should_post, MonitorKind, Notifier, SlackNotifier};

use tracing::{error, info};

/// The reporting front door the monitors use.
///
/// Wraps the optional Slack sink with the environment gating and
/// sanitization rules; when alerting is disabled (or credentials are
/// missing) reports degrade to log lines.
pub struct AlertReporter {
	notifier: Option<SlackNotifier>,
	enabled: bool,
}

impl AlertReporter {
	/// Builds a reporter for the given monitor.
	///
	/// Missing credentials with alerting enabled are logged and leave the
	/// reporter in log-only mode: alerting is never allowed to crash the
	/// monitor.
	pub fn from_env(kind: MonitorKind, enabled: bool) -> Self {
		let notifier = if enabled {
			match SlackNotifier::from_env(kind) {
				Ok(notifier) => Some(notifier),
				Err(e) => {
					error!("Alerting enabled but Slack sink unavailable: {}", e);
					None
				}
			}
		} else {
			None
		};

		Self { notifier, enabled }
	}

	/// Creates a disabled reporter (log-only). Useful for tests.
	pub fn disabled() -> Self {
		Self {
			notifier: None,
			enabled: false,
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Reports a message: always logged, posted to Slack when enabled,
	/// configured and not suppressed by the environment.
	pub async fn report(&self, message: &str) {
		info!("{}", message);

		let Some(notifier) = &self.notifier else {
			return;
		};

		if !should_post(message) {
			return;
		}

		let sanitized = sanitize_message(message);
		if let Err(e) = notifier.notify(&sanitized).await {
			error!("Failed to deliver alert to Slack: {}", e);
		}
	}
}
