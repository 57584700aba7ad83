//! Strongly typed ledger payloads.
//!
//! Raw logs are decoded into these shapes inside the ledger client so the
//! rest of the crate never sees ABI tuples.

use super::LedgerError;
use alloy::primitives::{Address, B256, U256};
use skyoracle_sdk::objects::{FlightId, FlightKey, FlightRecord, FlightStatus};

/// A decoded `PolicyPurchased` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedPolicy {
    pub policy_id: U256,
    pub holder: Address,
    pub product_id: u32,
    /// The flight id as recorded by the hub.
    pub flight_id: FlightId,
    pub key: FlightKey,
    pub premium_wei: U256,
    pub max_payout_wei: U256,
    /// Epoch seconds after which the policy can no longer pay out.
    pub coverage_end: u64,
    pub block_number: Option<u64>,
}

/// One log of a `PolicyPurchased` scan: the decoded event, or
/// [`LedgerError::Malformed`] when the log could not be decoded.
pub type PurchaseEntry = Result<PurchasedPolicy, LedgerError>;

/// The payload of an `updateFlightStatus` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightUpdate {
    pub flight_id: FlightId,
    pub record: FlightRecord,
}

impl FlightUpdate {
    pub fn new(flight_id: FlightId, record: FlightRecord) -> Self {
        Self { flight_id, record }
    }

    /// The revision this update carries.
    pub fn revision(&self) -> u64 {
        self.record.updated_at
    }
}

/// Secondary events observed in the receipt of a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEffect {
    /// The update triggered a payout on a policy.
    PolicySettled {
        policy_id: U256,
        holder: Address,
        payout_wei: U256,
        flight_id: FlightId,
    },
    /// The hub stored the new flight status.
    FlightStatusRecorded {
        flight_id: FlightId,
        status: FlightStatus,
        delay_in_minutes: u32,
        reason_code: u16,
        updated_at: u64,
    },
}

/// Outcome of a mined status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReceipt {
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effects: Vec<LedgerEffect>,
}

impl UpdateReceipt {
    /// Policy payouts carried by this receipt.
    pub fn settlements(&self) -> impl Iterator<Item = &LedgerEffect> {
        self.effects
            .iter()
            .filter(|e| matches!(e, LedgerEffect::PolicySettled { .. }))
    }
}
