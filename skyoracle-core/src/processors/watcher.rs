//! OracleWatcher processor.
//!
//! The OracleWatcher owns the flight registry and drives the two passes on a
//! fixed cadence:
//! - `PolicyDiscovery` admits flights from new `PolicyPurchased` events
//! - `Reconciler` mirrors feed records of tracked flights onto the ledger
//!
//! Ticks never overlap. The next tick starts `poll_interval` after the
//! previous one finished, so a slow tick delays the schedule instead of
//! piling up.

use crate::events::OracleEventSender;
use crate::feed::FlightFeed;
use crate::ledger::{Ledger, LedgerError};
use crate::processors::discovery::{DEFAULT_LOOKBACK_BLOCKS, DiscoveryReport, PolicyDiscovery};
use crate::processors::reconciler::{Reconciler, TickReport};
use crate::registry::FlightRegistry;
use crate::utils::unix_now;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Pause between the end of one tick and the start of the next.
    pub poll_interval: Duration,
    /// Blocks scanned behind the head on the first discovery pass.
    pub lookback: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            lookback: DEFAULT_LOOKBACK_BLOCKS,
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// `None` when discovery failed this tick.
    pub discovery: Option<DiscoveryReport>,
    pub reconciliation: TickReport,
}

pub struct OracleWatcher {
    ledger: Arc<dyn Ledger>,
    feed: Arc<dyn FlightFeed>,
    discovery: PolicyDiscovery,
    reconciler: Reconciler,
    registry: FlightRegistry,
    poll_interval: Duration,
}

impl OracleWatcher {
    pub fn new(ledger: Arc<dyn Ledger>, feed: Arc<dyn FlightFeed>, config: WatcherConfig) -> Self {
        let reconciler = Reconciler::new(ledger.clone(), feed.clone());
        Self {
            ledger,
            feed,
            discovery: PolicyDiscovery::new(config.lookback),
            reconciler,
            registry: FlightRegistry::new(),
            poll_interval: config.poll_interval,
        }
    }

    /// Report committed updates on `events_tx`.
    ///
    /// The watcher holds the sender until `run` returns.
    pub fn with_events(mut self, events_tx: OracleEventSender) -> Self {
        self.reconciler =
            Reconciler::new(self.ledger.clone(), self.feed.clone()).with_events(events_tx);
        self
    }

    pub fn registry(&self) -> &FlightRegistry {
        &self.registry
    }

    /// Check both collaborators before the first tick.
    ///
    /// An unreachable ledger is fatal and returned as an error. An unhealthy
    /// feed only produces a warning; per-flight lookups will report it again.
    pub async fn preflight(&self) -> Result<u64, LedgerError> {
        let height = self.ledger.current_height().await?;
        info!(height, "Ledger reachable");

        match self.feed.health().await {
            Ok(()) => info!("Flight feed reachable"),
            Err(e) => warn!(error = %e, "Flight feed health check failed, continuing"),
        }

        Ok(height)
    }

    /// Run one discovery pass followed by one reconciliation pass.
    ///
    /// A failed discovery pass is logged and reconciliation still runs over
    /// the flights already known.
    pub async fn tick(&mut self, now: u64) -> TickSummary {
        let discovery = match self
            .discovery
            .discover(self.ledger.as_ref(), &mut self.registry)
            .await
        {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, cursor = ?self.discovery.cursor(), "Discovery pass failed");
                None
            }
        };

        if self.registry.is_empty() {
            debug!("No flights to track yet");
            return TickSummary {
                discovery,
                reconciliation: TickReport::default(),
            };
        }

        let reconciliation = self.reconciler.reconcile_all(&mut self.registry, now).await;
        if reconciliation.submitted > 0 || reconciliation.expired > 0 {
            info!(
                tracked = self.registry.len(),
                submitted = reconciliation.submitted,
                caught_up = reconciliation.caught_up,
                expired = reconciliation.expired,
                failed = reconciliation.submission_failed,
                "Tick complete"
            );
        } else {
            debug!(
                tracked = self.registry.len(),
                unchanged = reconciliation.unchanged,
                feed_unavailable = reconciliation.feed_unavailable,
                feed_missing = reconciliation.feed_missing,
                ledger_unavailable = reconciliation.ledger_unavailable,
                failed = reconciliation.submission_failed,
                "Tick complete"
            );
        }

        TickSummary {
            discovery,
            reconciliation,
        }
    }

    /// Tick every `poll_interval` until shutdown is signalled.
    ///
    /// A tick in progress always finishes; shutdown is only observed between
    /// ticks. Dropping the sender counts as a shutdown signal. Returns the
    /// number of ticks run.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> u64 {
        info!(
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            "OracleWatcher started"
        );
        let mut ticks = 0u64;

        loop {
            if *shutdown_rx.borrow() {
                info!("OracleWatcher received shutdown signal");
                break;
            }

            self.tick(unix_now()).await;
            ticks += 1;

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("OracleWatcher received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(
            ticks,
            tracked = self.registry.len(),
            cursor = ?self.discovery.cursor(),
            "OracleWatcher shutdown complete"
        );
        ticks
    }
}
