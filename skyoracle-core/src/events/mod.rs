//! Oracle event channel.
//!
//! The reconciler reports what it committed to the ledger, and what the
//! ledger did in response, as [`OracleEvent`]s. The events are observational:
//! no processor feeds them back into reconciliation.
//!
//! # Event Flow
//!
//! 1. `Reconciler` emits `OracleEvent` -> `SettlementReporter`
//! 2. `SettlementReporter` logs each event

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, OracleEventReceiver, OracleEventSender, oracle_event_channel,
};

pub use types::OracleEvent;
