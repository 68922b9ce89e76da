//! Logging utilities for the application
//!
//! This module provides utilities for setting up and configuring logging for the application.
//! It uses the `tracing_subscriber` crate to configure the logging.
//!
//! The `setup_logging` function sets up the logging for the application.
//! It sets the logging to stdout.
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Setup logging for the application
///
/// Logs go to stdout by default. Setting `LOG_MODE=file` writes to a local
/// log file instead (`LOG_FILE_PATH`, default `logfile.log`), recreated at
/// each run start. The file is diagnostic output, not authoritative state.
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	if std::env::var("LOG_MODE").as_deref() == Ok("file") {
		let path =
			std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logfile.log".to_string());
		let file = std::fs::File::create(path)?;
		setup_logging_with_writer(std::sync::Arc::new(file))?;
		return Ok(());
	}
	setup_logging_with_writer(std::io::stdout)?;
	Ok(())
}

/// Setup logging for the application with a custom writer
///
/// This function sets up the logging for the application with a custom writer.
/// It uses the `tracing_subscriber` crate to configure the logging.
pub fn setup_logging_with_writer<W>(
	writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	// Create a filter based on environment variable or default to INFO
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	// Create a subscriber that uses the filter and a console output
	tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(
					fmt::format()
						.with_level(true)
						.with_target(true)
						.with_thread_ids(false)
						.with_thread_names(false)
						.with_ansi(true)
						.compact(),
				)
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}
