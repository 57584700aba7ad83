//! PolicyDiscovery processor.
//!
//! PolicyDiscovery is responsible for:
//! - Keeping a block cursor over the hub's event log
//! - Fetching `PolicyPurchased` events for blocks past the cursor
//! - Admitting the flights those events reference into the registry
//!
//! The cursor lives in memory only. On the first scan after start-up it is
//! placed `lookback` blocks behind the chain head; purchases older than that
//! are never seen by this process.

use crate::ledger::{Ledger, LedgerError};
use crate::registry::{Admission, FlightRegistry};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Blocks scanned behind the head on the first discovery pass.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 1000;

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The ledger could not be read; the cursor was left where it was.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Summary of one discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryReport {
    /// Scanned range, `None` when there were no new blocks.
    pub range: Option<(u64, u64)>,
    pub events: usize,
    pub admitted: usize,
    pub rejected: usize,
}

/// Incremental scanner of `PolicyPurchased` events.
#[derive(Debug)]
pub struct PolicyDiscovery {
    lookback: u64,
    cursor: Option<u64>,
}

impl PolicyDiscovery {
    pub fn new(lookback: u64) -> Self {
        Self {
            lookback,
            cursor: None,
        }
    }

    /// Highest block fully scanned, `None` before the first pass.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Scan the blocks past the cursor and admit newly referenced flights.
    ///
    /// On error nothing is admitted and the cursor does not move, so the
    /// same range is scanned again next time.
    pub async fn discover(
        &mut self,
        ledger: &dyn Ledger,
        registry: &mut FlightRegistry,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let height = ledger.current_height().await?;

        let cursor = match self.cursor {
            Some(cursor) => cursor,
            None => {
                let start = height.saturating_sub(self.lookback);
                info!(
                    height,
                    start_block = start,
                    lookback = self.lookback,
                    "First discovery pass, scanning lookback window"
                );
                self.cursor = Some(start);
                start
            }
        };

        if height <= cursor {
            debug!(height, cursor, "No new blocks");
            return Ok(DiscoveryReport::default());
        }

        let from_block = cursor + 1;
        debug!(from_block, to_block = height, "Scanning for PolicyPurchased events");
        let purchases = ledger.query_purchases(from_block, height).await?;

        let mut report = DiscoveryReport {
            range: Some((from_block, height)),
            events: purchases.len(),
            ..Default::default()
        };

        for entry in &purchases {
            let purchase = match entry {
                Ok(purchase) => purchase,
                Err(e) => {
                    warn!(error = %e, "Undecodable PolicyPurchased log, ignoring");
                    report.rejected += 1;
                    continue;
                }
            };
            let derived = purchase.key.flight_id();
            if derived != purchase.flight_id {
                warn!(
                    policy_id = %purchase.policy_id,
                    flight = %purchase.key,
                    event_flight_id = %purchase.flight_id,
                    derived_flight_id = %derived,
                    "PolicyPurchased flight id does not match its natural key, ignoring"
                );
                report.rejected += 1;
                continue;
            }

            match registry.admit(purchase) {
                Admission::Admitted => {
                    report.admitted += 1;
                    info!(
                        policy_id = %purchase.policy_id,
                        flight = %purchase.key,
                        holder = %purchase.holder,
                        product_id = purchase.product_id,
                        coverage_end = purchase.coverage_end,
                        block = ?purchase.block_number,
                        flight_id = %derived,
                        "New policy discovered, tracking flight"
                    );
                }
                Admission::AlreadyTracked => {
                    debug!(
                        policy_id = %purchase.policy_id,
                        flight = %purchase.key,
                        "Policy for already tracked flight"
                    );
                }
                Admission::Retired => {
                    debug!(
                        policy_id = %purchase.policy_id,
                        flight = %purchase.key,
                        "Policy for a flight whose coverage already ended, ignoring"
                    );
                }
            }
        }

        self.cursor = Some(height);
        debug!(tracked = registry.len(), cursor = height, "Discovery pass complete");

        Ok(report)
    }
}

impl Default for PolicyDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK_BLOCKS)
    }
}
