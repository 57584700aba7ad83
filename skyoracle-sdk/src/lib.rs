//! Shared types for the SkyOracle flight-status watcher.
//!
//! `objects` holds the wire shapes exchanged with the flight feed and the
//! natural-key to ledger-id derivation. The typed HTTP client lives behind
//! the `client` feature.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
