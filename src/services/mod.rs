//! Core services used for monitoring Orbit chains.
//!
//! - `blockchain`: JSON-RPC transport and typed EVM client
//! - `scanner`: chunked block-range scanning with retry/backoff
//! - `correlator`: cross-chain event correlation and retryable derivation
//! - `classifier`: pure alerting decisions
//! - `notification`: Slack alert sink

pub mod blockchain;
pub mod classifier;
pub mod correlator;
pub mod notification;
pub mod scanner;
