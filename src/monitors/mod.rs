//! Per-monitor orchestration.
//!
//! Each monitor owns its CLI options, builds per-chain clients, drives the
//! core services and hands alert text to the reporting sink. Per-chain
//! errors are caught at this boundary: they are logged (and reported when
//! alerting is on) without aborting sibling chains.

pub mod assertion;
pub mod batch_poster;
pub mod retryable;
