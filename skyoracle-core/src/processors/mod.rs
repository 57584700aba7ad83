//! Processors that make up the oracle loop.
//!
//! - `OracleWatcher`: Owns the registry, ticks on a fixed cadence
//! - `PolicyDiscovery`: Scans `PolicyPurchased` events, admits flights
//! - `Reconciler`: Mirrors feed records onto the ledger, emits `OracleEvent`
//! - `SettlementReporter`: Receives `OracleEvent`, logs committed updates and payouts

pub mod discovery;
pub mod reconciler;
pub mod reporter;
pub mod watcher;

pub use discovery::{DEFAULT_LOOKBACK_BLOCKS, DiscoveryError, DiscoveryReport, PolicyDiscovery};
pub use reconciler::{Decision, ItemOutcome, Reconciler, TickReport, decide, needs_cross_check};
pub use reporter::SettlementReporter;
pub use watcher::{DEFAULT_POLL_INTERVAL, OracleWatcher, TickSummary, WatcherConfig};
