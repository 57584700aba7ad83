//! Event type definitions.

use crate::ledger::{LedgerEffect, UpdateReceipt};
use alloy::primitives::{Address, B256, U256};
use skyoracle_sdk::objects::{FlightId, FlightKey, FlightStatus};

/// Something the oracle caused on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleEvent {
    /// A status update was mined successfully.
    UpdateCommitted {
        flight_id: FlightId,
        key: FlightKey,
        revision: u64,
        tx_hash: B256,
        block_number: Option<u64>,
        gas_used: u64,
    },
    /// The hub recorded the pushed status.
    StatusRecorded {
        flight_id: FlightId,
        status: FlightStatus,
        delay_in_minutes: u32,
        reason_code: u16,
        updated_at: u64,
    },
    /// The update triggered a payout.
    PolicySettled {
        flight_id: FlightId,
        policy_id: U256,
        holder: Address,
        payout_wei: U256,
        tx_hash: B256,
    },
}

impl OracleEvent {
    /// All events carried by a successful receipt, commit first.
    pub fn from_receipt(
        key: &FlightKey,
        flight_id: FlightId,
        revision: u64,
        receipt: &UpdateReceipt,
    ) -> Vec<Self> {
        let mut events = Vec::with_capacity(receipt.effects.len() + 1);
        events.push(OracleEvent::UpdateCommitted {
            flight_id,
            key: key.clone(),
            revision,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        });
        events.extend(receipt.effects.iter().map(|effect| match effect {
            LedgerEffect::PolicySettled {
                policy_id,
                holder,
                payout_wei,
                flight_id,
            } => OracleEvent::PolicySettled {
                flight_id: *flight_id,
                policy_id: *policy_id,
                holder: *holder,
                payout_wei: *payout_wei,
                tx_hash: receipt.tx_hash,
            },
            LedgerEffect::FlightStatusRecorded {
                flight_id,
                status,
                delay_in_minutes,
                reason_code,
                updated_at,
            } => OracleEvent::StatusRecorded {
                flight_id: *flight_id,
                status: *status,
                delay_in_minutes: *delay_in_minutes,
                reason_code: *reason_code,
                updated_at: *updated_at,
            },
        }));
        events
    }

    pub fn flight_id(&self) -> FlightId {
        match self {
            OracleEvent::UpdateCommitted { flight_id, .. }
            | OracleEvent::StatusRecorded { flight_id, .. }
            | OracleEvent::PolicySettled { flight_id, .. } => *flight_id,
        }
    }
}
