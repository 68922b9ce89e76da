//! Typed views over raw JSON-RPC responses.
//!
//! Only the EVM flavor exists today; both parent and child chains of an
//! Orbit deployment speak the same JSON-RPC dialect.

pub mod evm;
