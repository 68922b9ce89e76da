//! Slack notification implementation.
//!
//! Posts messages through the Slack Web API (`chat.postMessage`) using a
//! bot token and channel taken from per-monitor environment variables.
//! Posting is environment-gated: a `DEV` environment never posts, a `CI`
//! environment swallows the literal "success" heartbeat. Messages are
//! sanitized so that values of sensitive environment variables never reach
//! the channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::error::NotificationError;

const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Environment variable name fragments whose values are scrubbed from
/// outgoing messages.
const SENSITIVE_KEY_CONTENT: [&str; 6] = ["NEXT", "API", "KEY", "MONITOR", "INFURA", "RPC"];

/// Which monitor is posting; selects the env vars holding credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
	Retryables,
	BatchPoster,
	Assertions,
}

impl MonitorKind {
	pub fn token_env(&self) -> &'static str {
		match self {
			Self::Retryables => "RETRYABLE_MONITORING_SLACK_TOKEN",
			Self::BatchPoster => "BATCH_POSTER_MONITORING_SLACK_TOKEN",
			Self::Assertions => "ASSERTION_MONITORING_SLACK_TOKEN",
		}
	}

	pub fn channel_env(&self) -> &'static str {
		match self {
			Self::Retryables => "RETRYABLE_MONITORING_SLACK_CHANNEL",
			Self::BatchPoster => "BATCH_POSTER_MONITORING_SLACK_CHANNEL",
			Self::Assertions => "ASSERTION_MONITORING_SLACK_CHANNEL",
		}
	}
}

/// Trait implemented by alert sinks.
#[async_trait]
pub trait Notifier {
	async fn notify(&self, message: &str) -> Result<(), NotificationError>;
}

/// Sink delivering messages to a Slack channel.
pub struct SlackNotifier {
	token: String,
	channel: String,
	client: Client,
}

#[derive(Serialize)]
struct PostMessagePayload<'a> {
	channel: &'a str,
	text: &'a str,
	unfurl_links: bool,
}

impl SlackNotifier {
	/// Creates a notifier from explicit credentials.
	pub fn new(token: String, channel: String) -> Self {
		Self {
			token,
			channel,
			client: Client::new(),
		}
	}

	/// Creates a notifier from the environment variables of `kind`.
	///
	/// # Errors
	/// * `NotificationError::ConfigError` when the token or channel is
	///   missing
	pub fn from_env(kind: MonitorKind) -> Result<Self, NotificationError> {
		let token = std::env::var(kind.token_env())
			.map_err(|_| NotificationError::config_error("Slack token is required"))?;
		let channel = std::env::var(kind.channel_env())
			.map_err(|_| NotificationError::config_error("Slack channel is required"))?;
		Ok(Self::new(token, channel))
	}
}

#[async_trait]
impl Notifier for SlackNotifier {
	/// Posts a message to the configured channel.
	async fn notify(&self, message: &str) -> Result<(), NotificationError> {
		let payload = PostMessagePayload {
			channel: &self.channel,
			text: message,
			unfurl_links: false,
		};

		let response = self
			.client
			.post(SLACK_POST_MESSAGE_URL)
			.bearer_auth(&self.token)
			.json(&payload)
			.send()
			.await
			.map_err(|e| NotificationError::network_error(e.to_string()))?;

		let body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| NotificationError::network_error(e.to_string()))?;

		if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
			let reason = body
				.get("error")
				.and_then(|v| v.as_str())
				.unwrap_or("unknown error");
			return Err(NotificationError::network_error(format!(
				"Slack rejected the message: {}",
				reason
			)));
		}

		Ok(())
	}
}

/// Whether a message should be posted at all in the current environment.
///
/// `DEV` suppresses everything; `CI` suppresses only the literal "success"
/// heartbeat message.
pub fn should_post(message: &str) -> bool {
	match std::env::var("NODE_ENV").as_deref() {
		Ok("DEV") => false,
		Ok("CI") if message == "success" => false,
		_ => true,
	}
}

/// Replaces values of sensitive environment variables with `***`.
pub fn sanitize_message(message: &str) -> String {
	let mut sanitized = message.to_string();
	for (key, value) in std::env::vars() {
		if !SENSITIVE_KEY_CONTENT.iter().any(|c| key.contains(c)) {
			continue;
		}
		let value = value.trim();
		if !value.is_empty() {
			sanitized = sanitized.replace(value, "***");
		}
	}
	sanitized
}
