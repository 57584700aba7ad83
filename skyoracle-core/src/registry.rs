//! The working set of flights under observation.
//!
//! [`FlightRegistry`] is an owned, single-writer map: the discovery engine
//! admits flights, the reconciler advances their revisions and retires them.
//! Retired ids are remembered so a flight never re-enters the working set.

use crate::ledger::PurchasedPolicy;
use alloy::primitives::U256;
use skyoracle_sdk::objects::{FlightId, FlightKey};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A flight whose status is being mirrored to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFlight {
    flight_id: FlightId,
    key: FlightKey,
    coverage_end: u64,
    last_acknowledged: u64,
    policies: BTreeSet<U256>,
    discovered_at_block: Option<u64>,
}

impl TrackedFlight {
    /// Start tracking the flight a purchase refers to.
    pub fn from_purchase(purchase: &PurchasedPolicy) -> Self {
        Self {
            flight_id: purchase.key.flight_id(),
            key: purchase.key.clone(),
            coverage_end: purchase.coverage_end,
            last_acknowledged: 0,
            policies: BTreeSet::from([purchase.policy_id]),
            discovered_at_block: purchase.block_number,
        }
    }

    pub fn flight_id(&self) -> FlightId {
        self.flight_id
    }

    pub fn key(&self) -> &FlightKey {
        &self.key
    }

    pub fn coverage_end(&self) -> u64 {
        self.coverage_end
    }

    /// Highest revision known to be on the ledger.
    pub fn last_acknowledged(&self) -> u64 {
        self.last_acknowledged
    }

    pub fn policies(&self) -> &BTreeSet<U256> {
        &self.policies
    }

    pub fn discovered_at_block(&self) -> Option<u64> {
        self.discovered_at_block
    }

    /// Whether the coverage window is over at `now` (epoch seconds).
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.coverage_end
    }

    /// Record that `revision` is on the ledger.
    ///
    /// Never moves backwards; returns whether the value changed.
    pub fn acknowledge(&mut self, revision: u64) -> bool {
        if revision > self.last_acknowledged {
            self.last_acknowledged = revision;
            true
        } else {
            false
        }
    }
}

/// What happened when a purchase was offered to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The flight was not tracked before.
    Admitted,
    /// The flight was already tracked; only the policy id was recorded.
    AlreadyTracked,
    /// The flight was tracked once and has expired since.
    Retired,
}

#[derive(Debug, Default)]
pub struct FlightRegistry {
    flights: HashMap<FlightId, TrackedFlight>,
    retired: HashSet<FlightId>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the flight referenced by `purchase` unless it is known.
    pub fn admit(&mut self, purchase: &PurchasedPolicy) -> Admission {
        let flight_id = purchase.key.flight_id();
        if self.retired.contains(&flight_id) {
            return Admission::Retired;
        }
        if let Some(existing) = self.flights.get_mut(&flight_id) {
            existing.policies.insert(purchase.policy_id);
            return Admission::AlreadyTracked;
        }
        self.flights
            .insert(flight_id, TrackedFlight::from_purchase(purchase));
        Admission::Admitted
    }

    /// Snapshot of the tracked ids, safe to hold while mutating the registry.
    pub fn ids(&self) -> Vec<FlightId> {
        self.flights.keys().copied().collect()
    }

    pub fn get(&self, flight_id: &FlightId) -> Option<&TrackedFlight> {
        self.flights.get(flight_id)
    }

    pub fn get_mut(&mut self, flight_id: &FlightId) -> Option<&mut TrackedFlight> {
        self.flights.get_mut(flight_id)
    }

    /// Stop tracking `flight_id` for good.
    pub fn retire(&mut self, flight_id: &FlightId) -> Option<TrackedFlight> {
        let removed = self.flights.remove(flight_id);
        if removed.is_some() {
            self.retired.insert(*flight_id);
        }
        removed
    }

    pub fn contains(&self, flight_id: &FlightId) -> bool {
        self.flights.contains_key(flight_id)
    }

    pub fn is_retired(&self, flight_id: &FlightId) -> bool {
        self.retired.contains(flight_id)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::purchase;

    #[test]
    fn test_admit_is_idempotent_per_key() {
        let mut registry = FlightRegistry::new();
        let first = purchase(1, "AF123", 1_000, 5_000);
        let second = purchase(2, "AF123", 1_000, 5_000);

        assert_eq!(registry.admit(&first), Admission::Admitted);
        assert_eq!(registry.admit(&first), Admission::AlreadyTracked);
        assert_eq!(registry.admit(&second), Admission::AlreadyTracked);
        assert_eq!(registry.len(), 1);

        let tracked = registry.get(&first.key.flight_id()).unwrap();
        assert_eq!(tracked.last_acknowledged(), 0);
        assert_eq!(tracked.coverage_end(), 5_000);
        assert_eq!(tracked.policies().len(), 2);
    }

    #[test]
    fn test_distinct_keys_are_tracked_separately() {
        let mut registry = FlightRegistry::new();
        registry.admit(&purchase(1, "AF123", 1_000, 5_000));
        registry.admit(&purchase(2, "AF123", 2_000, 5_000));
        registry.admit(&purchase(3, "LH400", 1_000, 5_000));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_acknowledge_never_decreases() {
        let mut flight = TrackedFlight::from_purchase(&purchase(1, "AF123", 1_000, 5_000));
        assert!(flight.acknowledge(5));
        assert!(!flight.acknowledge(3));
        assert!(!flight.acknowledge(5));
        assert_eq!(flight.last_acknowledged(), 5);
        assert!(flight.acknowledge(6));
        assert_eq!(flight.last_acknowledged(), 6);
    }

    #[test]
    fn test_retired_flight_never_returns() {
        let mut registry = FlightRegistry::new();
        let p = purchase(1, "AF123", 1_000, 5_000);
        registry.admit(&p);

        assert!(registry.retire(&p.key.flight_id()).is_some());
        assert!(registry.retire(&p.key.flight_id()).is_none());
        assert!(registry.is_retired(&p.key.flight_id()));
        assert_eq!(registry.admit(&purchase(9, "AF123", 1_000, 99_000)), Admission::Retired);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_expiry_is_strictly_after_coverage_end() {
        let flight = TrackedFlight::from_purchase(&purchase(1, "AF123", 1_000, 5_000));
        assert!(!flight.is_expired(4_999));
        assert!(!flight.is_expired(5_000));
        assert!(flight.is_expired(5_001));
    }
}
