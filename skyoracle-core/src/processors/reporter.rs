//! SettlementReporter processor.
//!
//! Receives `OracleEvent`s from the reconciler and logs them. Nothing here
//! feeds back into reconciliation; payouts are the hub's business.

use crate::events::{OracleEvent, OracleEventReceiver};
use tracing::info;

pub struct SettlementReporter {
    events_rx: OracleEventReceiver,
}

impl SettlementReporter {
    pub fn new(events_rx: OracleEventReceiver) -> Self {
        Self { events_rx }
    }

    /// Run until every sender is dropped.
    ///
    /// The watcher owns the only sender, so the reporter outlives the last
    /// tick and reports everything it committed. Returns the number of
    /// events reported.
    pub async fn run(mut self) -> usize {
        info!("SettlementReporter started");
        let mut reported = 0usize;

        while let Some(event) = self.events_rx.recv().await {
            report(&event);
            reported += 1;
        }

        info!(reported, "SettlementReporter shutdown complete");
        reported
    }
}

fn report(event: &OracleEvent) {
    match event {
        OracleEvent::UpdateCommitted {
            flight_id,
            key,
            revision,
            tx_hash,
            block_number,
            gas_used,
        } => {
            info!(
                flight = %key,
                %flight_id,
                revision,
                %tx_hash,
                block_number = ?block_number,
                gas_used,
                "Flight update on ledger"
            );
        }
        OracleEvent::StatusRecorded {
            flight_id,
            status,
            delay_in_minutes,
            reason_code,
            updated_at,
        } => {
            info!(
                %flight_id,
                %status,
                delay_in_minutes,
                reason_code,
                updated_at,
                "Hub recorded flight status"
            );
        }
        OracleEvent::PolicySettled {
            flight_id,
            policy_id,
            holder,
            payout_wei,
            tx_hash,
        } => {
            info!(
                %flight_id,
                %policy_id,
                %holder,
                %payout_wei,
                %tx_hash,
                "Payout triggered"
            );
        }
    }
}
