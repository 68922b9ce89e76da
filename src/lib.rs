//! Monitoring library for Arbitrum Orbit chains.
//!
//! This crate implements the shared machinery behind three monitors:
//!
//! - `retryables`: finds cross-chain retryable tickets created on a parent
//!   chain and reports any that were never redeemed on the child chain
//! - `batch-poster`: watches the sequencer inbox for batch-posting stalls
//!   and low batch-poster balance
//! - `assertions`: checks that rollup assertions are still being posted
//!
//! The heavy lifting lives in three core services: a chunked block-range
//! scanner that tolerates provider limits and transient RPC failures
//! (`services::scanner`), a cross-chain event correlator that pairs
//! parent-chain message-delivery events with child-chain execution state
//! (`services::correlator`), and a pure classifier that turns raw status
//! data into alerting decisions (`services::classifier`). Everything else
//! is glue: configuration loading, JSON-RPC plumbing and the Slack sink.

pub mod models;
pub mod monitors;
pub mod services;
pub mod utils;
