//! Structured alert records.
//!
//! The classifier produces these; only the reporting sink consumes them.
//! Keeping the record structured (rather than a preformatted string)
//! decouples classification from Slack presentation.

use chrono::{DateTime, Utc};

/// Alert severity. `Critical` maps to the escalated ("🆘") presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
	Info,
	Warn,
	Critical,
}

/// One alert for one chain, with ordered human-readable reasons.
#[derive(Debug, Clone)]
pub struct AlertRecord {
	pub chain_name: String,
	pub severity: Severity,
	pub reasons: Vec<String>,
	pub timestamp_utc: DateTime<Utc>,
}

impl AlertRecord {
	pub fn new(chain_name: impl Into<String>, severity: Severity, reasons: Vec<String>) -> Self {
		Self {
			chain_name: chain_name.into(),
			severity,
			reasons,
			timestamp_utc: Utc::now(),
		}
	}
}
