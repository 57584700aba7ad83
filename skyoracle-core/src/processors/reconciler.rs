//! Reconciler processor.
//!
//! The Reconciler is responsible for:
//! - Retiring flights whose coverage window is over
//! - Fetching the current feed record of every other tracked flight
//! - Deciding, from the feed revision, the acknowledged revision and the
//!   ledger revision, whether an update must be pushed
//! - Pushing updates and advancing the acknowledged revision on success
//! - Emitting `OracleEvent`s for committed updates and their effects
//!
//! There is no retry queue. A failed push leaves the acknowledged revision
//! untouched, so the next pass sees the same gap and pushes again.

use crate::events::{OracleEvent, OracleEventSender};
use crate::feed::{FeedLookup, FlightFeed};
use crate::ledger::{FlightUpdate, Ledger};
use crate::registry::{FlightRegistry, TrackedFlight};
use skyoracle_sdk::objects::FlightId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What to do with a feed record, given what is known about the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The ledger already holds this revision; only bookkeeping moves.
    CatchUp,
    /// The ledger is behind; the record must be submitted.
    Submit,
}

/// Compare the feed revision with the ledger revision.
///
/// Only meaningful when `feed_revision > acknowledged`; see [`needs_cross_check`].
pub fn decide(feed_revision: u64, chain_revision: u64) -> Decision {
    if feed_revision <= chain_revision {
        Decision::CatchUp
    } else {
        Decision::Submit
    }
}

/// Whether a feed revision is newer than what this process acknowledged.
pub fn needs_cross_check(feed_revision: u64, acknowledged: u64) -> bool {
    feed_revision > acknowledged
}

/// How a single flight ended up in one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Expired,
    FeedUnavailable,
    FeedMissing,
    Unchanged,
    CaughtUp(u64),
    Submitted(u64),
    SubmissionFailed,
    LedgerUnavailable,
}

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub expired: usize,
    pub feed_unavailable: usize,
    pub feed_missing: usize,
    pub unchanged: usize,
    pub caught_up: usize,
    pub submitted: usize,
    pub submission_failed: usize,
    pub ledger_unavailable: usize,
}

impl TickReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Expired => self.expired += 1,
            ItemOutcome::FeedUnavailable => self.feed_unavailable += 1,
            ItemOutcome::FeedMissing => self.feed_missing += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::CaughtUp(_) => self.caught_up += 1,
            ItemOutcome::Submitted(_) => self.submitted += 1,
            ItemOutcome::SubmissionFailed => self.submission_failed += 1,
            ItemOutcome::LedgerUnavailable => self.ledger_unavailable += 1,
        }
    }

    /// Flights looked at in the pass.
    pub fn total(&self) -> usize {
        self.expired
            + self.feed_unavailable
            + self.feed_missing
            + self.unchanged
            + self.caught_up
            + self.submitted
            + self.submission_failed
            + self.ledger_unavailable
    }
}

/// Mirrors feed records of tracked flights onto the ledger.
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    feed: Arc<dyn FlightFeed>,
    events_tx: Option<OracleEventSender>,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn Ledger>, feed: Arc<dyn FlightFeed>) -> Self {
        Self {
            ledger,
            feed,
            events_tx: None,
        }
    }

    /// Report committed updates and their effects on `events_tx`.
    pub fn with_events(mut self, events_tx: OracleEventSender) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Run one pass over every tracked flight.
    ///
    /// `now` is the current time in epoch seconds. Expired flights are
    /// removed after the pass, all at once.
    pub async fn reconcile_all(&self, registry: &mut FlightRegistry, now: u64) -> TickReport {
        let mut report = TickReport::default();
        let mut expired: Vec<FlightId> = Vec::new();

        debug!(tracked = registry.len(), now, "Reconciling tracked flights");

        for flight_id in registry.ids() {
            let Some(flight) = registry.get_mut(&flight_id) else {
                continue;
            };

            let outcome = if flight.is_expired(now) {
                info!(
                    flight = %flight.key(),
                    coverage_end = flight.coverage_end(),
                    discovered_at_block = ?flight.discovered_at_block(),
                    policies = flight.policies().len(),
                    now,
                    "Flight coverage expired"
                );
                expired.push(flight_id);
                ItemOutcome::Expired
            } else {
                self.reconcile(flight).await
            };

            report.record(outcome);
        }

        for flight_id in expired {
            if let Some(flight) = registry.retire(&flight_id) {
                info!(flight = %flight.key(), "Stopped tracking expired flight");
            }
        }

        report
    }

    /// Reconcile a single flight that is still within its coverage window.
    pub async fn reconcile(&self, flight: &mut TrackedFlight) -> ItemOutcome {
        let key = flight.key().clone();

        let record = match self.feed.fetch(&key).await {
            FeedLookup::Found(record) => record,
            FeedLookup::NotFound => {
                warn!(flight = %key, "Flight not found in feed");
                return ItemOutcome::FeedMissing;
            }
            FeedLookup::Unavailable(reason) => {
                warn!(flight = %key, reason = %reason, "Feed unavailable");
                return ItemOutcome::FeedUnavailable;
            }
        };

        let feed_revision = record.updated_at;
        debug!(
            flight = %key,
            status = %record.status,
            delay_in_minutes = record.delay_in_minutes,
            reason_code = record.reason_code,
            feed_revision,
            acknowledged = flight.last_acknowledged(),
            "Fetched feed record"
        );

        if !needs_cross_check(feed_revision, flight.last_acknowledged()) {
            return ItemOutcome::Unchanged;
        }

        let chain_revision = match self.ledger.read_revision(flight.flight_id()).await {
            Ok(revision) => revision,
            Err(e) => {
                warn!(flight = %key, error = %e, "Could not read ledger revision");
                return ItemOutcome::LedgerUnavailable;
            }
        };

        match decide(feed_revision, chain_revision) {
            Decision::CatchUp => {
                debug!(
                    flight = %key,
                    feed_revision,
                    chain_revision,
                    "Ledger already has this revision"
                );
                flight.acknowledge(feed_revision);
                ItemOutcome::CaughtUp(feed_revision)
            }
            Decision::Submit => {
                info!(
                    flight = %key,
                    status = %record.status,
                    delay_in_minutes = record.delay_in_minutes,
                    reason_code = record.reason_code,
                    feed_revision,
                    chain_revision,
                    "Pushing flight update"
                );
                let update = FlightUpdate::new(flight.flight_id(), record);
                self.submit(flight, update).await
            }
        }
    }

    async fn submit(&self, flight: &mut TrackedFlight, update: FlightUpdate) -> ItemOutcome {
        let revision = update.revision();
        match self.ledger.submit_update(&update).await {
            Ok(receipt) if receipt.success => {
                flight.acknowledge(revision);
                info!(
                    flight = %flight.key(),
                    revision,
                    tx_hash = %receipt.tx_hash,
                    gas_used = receipt.gas_used,
                    settlements = receipt.settlements().count(),
                    "Update committed"
                );
                let events =
                    OracleEvent::from_receipt(flight.key(), flight.flight_id(), revision, &receipt);
                self.emit(events).await;
                ItemOutcome::Submitted(revision)
            }
            Ok(receipt) => {
                error!(
                    flight = %flight.key(),
                    revision,
                    tx_hash = %receipt.tx_hash,
                    "Update reverted, will retry next tick"
                );
                ItemOutcome::SubmissionFailed
            }
            Err(e) => {
                error!(
                    flight = %flight.key(),
                    revision,
                    error = %e,
                    "Failed to push update, will retry next tick"
                );
                ItemOutcome::SubmissionFailed
            }
        }
    }

    async fn emit(&self, events: Vec<OracleEvent>) {
        let Some(events_tx) = &self.events_tx else {
            return;
        };
        for event in events {
            if let Err(e) = events_tx.send(event).await {
                warn!(error = %e, "Failed to send OracleEvent, reporter dropped");
                return;
            }
        }
    }
}
