//! In-memory ledger and feed used by the unit tests.

use crate::feed::{FeedError, FeedLookup, FlightFeed};
use crate::ledger::{
    FlightUpdate, Ledger, LedgerEffect, LedgerError, PurchaseEntry, PurchasedPolicy, UpdateReceipt,
};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use skyoracle_sdk::objects::{FlightId, FlightKey, FlightRecord, FlightStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn purchase(policy_id: u64, flight_number: &str, arrival: u64, coverage_end: u64) -> PurchasedPolicy {
    let key = FlightKey::new(flight_number, arrival);
    PurchasedPolicy {
        policy_id: U256::from(policy_id),
        holder: Address::repeat_byte(0x11),
        product_id: 1,
        flight_id: key.flight_id(),
        key,
        premium_wei: U256::from(3_000_000_000_000_000u64),
        max_payout_wei: U256::from(20_000_000_000_000_000u64),
        coverage_end,
        block_number: None,
    }
}

pub fn record(key: &FlightKey, updated_at: u64, status: FlightStatus, delay: u32) -> FlightRecord {
    FlightRecord {
        flight_number: key.flight_number.clone(),
        arrival_timestamp: key.arrival_timestamp,
        status,
        delay_in_minutes: delay,
        reason_code: if delay > 0 { 50 } else { 0 },
        updated_at,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMode {
    /// Mine the update; reverts like the hub when the revision is stale.
    #[default]
    Accept,
    /// Mine and revert every update.
    Revert,
    /// Fail before the transaction lands.
    Error,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    height_fails: bool,
    query_fails: bool,
    read_fails: bool,
    submit_mode: SubmitMode,
    purchases: Vec<PurchasedPolicy>,
    malformed: Vec<(u64, String)>,
    revisions: HashMap<FlightId, u64>,
    effects: Vec<LedgerEffect>,
    submissions: Vec<FlightUpdate>,
    queries: Vec<(u64, u64)>,
}

#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(height: u64) -> Self {
        let ledger = Self::default();
        ledger.set_height(height);
        ledger
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().unwrap().height = height;
    }

    /// Record a purchase as mined in `block`.
    pub fn push_purchase(&self, block: u64, mut purchase: PurchasedPolicy) {
        purchase.block_number = Some(block);
        self.state.lock().unwrap().purchases.push(purchase);
    }

    /// Record an undecodable `PolicyPurchased` log in `block`.
    pub fn push_malformed(&self, block: u64, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .malformed
            .push((block, reason.to_string()));
    }

    pub fn set_revision(&self, flight_id: FlightId, revision: u64) {
        self.state.lock().unwrap().revisions.insert(flight_id, revision);
    }

    pub fn revision(&self, flight_id: &FlightId) -> u64 {
        self.state
            .lock()
            .unwrap()
            .revisions
            .get(flight_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_height(&self, fail: bool) {
        self.state.lock().unwrap().height_fails = fail;
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().query_fails = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().read_fails = fail;
    }

    pub fn set_submit_mode(&self, mode: SubmitMode) {
        self.state.lock().unwrap().submit_mode = mode;
    }

    /// Effects attached to every successful receipt.
    pub fn set_effects(&self, effects: Vec<LedgerEffect>) {
        self.state.lock().unwrap().effects = effects;
    }

    pub fn submissions(&self) -> Vec<FlightUpdate> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn queries(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.height_fails {
            return Err(LedgerError::Unavailable("node down".to_string()));
        }
        Ok(state.height)
    }

    async fn query_purchases(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PurchaseEntry>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.query_fails {
            return Err(LedgerError::Unavailable("eth_getLogs failed".to_string()));
        }
        state.queries.push((from_block, to_block));
        let in_range = |block: u64| block >= from_block && block <= to_block;
        let malformed = state
            .malformed
            .iter()
            .filter(|(block, _)| in_range(*block))
            .map(|(_, reason)| Err(LedgerError::Malformed(reason.clone())));
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.block_number.is_some_and(in_range))
            .cloned()
            .map(Ok)
            .chain(malformed)
            .collect())
    }

    async fn read_revision(&self, flight_id: FlightId) -> Result<u64, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.read_fails {
            return Err(LedgerError::Unavailable("eth_call failed".to_string()));
        }
        Ok(state.revisions.get(&flight_id).copied().unwrap_or(0))
    }

    async fn submit_update(&self, update: &FlightUpdate) -> Result<UpdateReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(update.clone());
        let tx_hash = B256::repeat_byte(state.submissions.len() as u8);

        let current = state.revisions.get(&update.flight_id).copied().unwrap_or(0);
        let success = match state.submit_mode {
            SubmitMode::Error => {
                return Err(LedgerError::Submission("nonce too low".to_string()));
            }
            SubmitMode::Revert => false,
            SubmitMode::Accept => update.revision() > current,
        };
        if success {
            state.revisions.insert(update.flight_id, update.revision());
        }
        Ok(UpdateReceipt {
            success,
            tx_hash,
            block_number: Some(state.height + 1),
            gas_used: 84_000,
            effects: if success { state.effects.clone() } else { Vec::new() },
        })
    }
}

#[derive(Default)]
pub struct MockFeed {
    records: Mutex<HashMap<FlightKey, FeedLookup>>,
    fetches: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &FlightKey, lookup: FeedLookup) {
        self.records.lock().unwrap().insert(key.clone(), lookup);
    }

    pub fn publish(&self, record: FlightRecord) {
        let key = record.key();
        self.set(&key, FeedLookup::Found(record));
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightFeed for MockFeed {
    async fn fetch(&self, key: &FlightKey) -> FeedLookup {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(FeedLookup::NotFound)
    }

    async fn health(&self) -> Result<(), FeedError> {
        Ok(())
    }
}
