//! Flight records as served by the flight feed.

use alloy::primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};

/// Ledger-side identifier of a flight.
///
/// Always derived from a [`FlightKey`] via [`FlightKey::flight_id`].
pub type FlightId = B256;

/// The natural key of a flight: its number and scheduled arrival time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightKey {
    pub flight_number: String,
    /// Scheduled arrival, epoch seconds.
    pub arrival_timestamp: u64,
}

impl FlightKey {
    pub fn new(flight_number: impl Into<String>, arrival_timestamp: u64) -> Self {
        Self {
            flight_number: flight_number.into(),
            arrival_timestamp,
        }
    }

    /// Derive the ledger id of this flight.
    ///
    /// `keccak256(abi.encodePacked(string flightNumber, uint64 arrivalTimestamp))`,
    /// the same derivation the hub contract applies when a policy is bought.
    pub fn flight_id(&self) -> FlightId {
        let mut packed = Vec::with_capacity(self.flight_number.len() + 8);
        packed.extend_from_slice(self.flight_number.as_bytes());
        packed.extend_from_slice(&self.arrival_timestamp.to_be_bytes());
        keccak256(packed)
    }
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.flight_number, self.arrival_timestamp)
    }
}

/// Operational status of a flight. Discriminants match the hub contract's enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum FlightStatus {
    #[default]
    Scheduled = 0,
    OnTime = 1,
    Delayed = 2,
    Cancelled = 3,
    Diverted = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid flight status code {0}, expected 0..=4")]
pub struct InvalidFlightStatus(pub u8);

impl TryFrom<u8> for FlightStatus {
    type Error = InvalidFlightStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FlightStatus::Scheduled),
            1 => Ok(FlightStatus::OnTime),
            2 => Ok(FlightStatus::Delayed),
            3 => Ok(FlightStatus::Cancelled),
            4 => Ok(FlightStatus::Diverted),
            other => Err(InvalidFlightStatus(other)),
        }
    }
}

impl From<FlightStatus> for u8 {
    fn from(value: FlightStatus) -> Self {
        value as u8
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightStatus::Scheduled => write!(f, "scheduled"),
            FlightStatus::OnTime => write!(f, "on_time"),
            FlightStatus::Delayed => write!(f, "delayed"),
            FlightStatus::Cancelled => write!(f, "cancelled"),
            FlightStatus::Diverted => write!(f, "diverted"),
        }
    }
}

/// The current state of a flight in the feed.
///
/// `updated_at` is the feed's revision marker: it never decreases for a given
/// key, and a larger value means the record carries newer information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub flight_number: String,
    pub arrival_timestamp: u64,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(default)]
    pub delay_in_minutes: u32,
    #[serde(default)]
    pub reason_code: u16,
    #[serde(default)]
    pub updated_at: u64,
}

impl FlightRecord {
    pub fn key(&self) -> FlightKey {
        FlightKey::new(self.flight_number.clone(), self.arrival_timestamp)
    }

    /// Whether this record describes the flight identified by `key`.
    pub fn matches(&self, key: &FlightKey) -> bool {
        self.flight_number == key.flight_number && self.arrival_timestamp == key.arrival_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_id_uses_packed_encoding() {
        let key = FlightKey::new("AF123", 1_769_018_400);

        let mut expected = b"AF123".to_vec();
        expected.extend_from_slice(&1_769_018_400u64.to_be_bytes());

        assert_eq!(key.flight_id(), keccak256(&expected));
        assert_eq!(key.flight_id(), key.clone().flight_id());
        assert_ne!(key.flight_id(), FlightKey::new("AF123", 1_769_018_401).flight_id());
        assert_ne!(key.flight_id(), FlightKey::new("AF124", 1_769_018_400).flight_id());
    }

    #[test]
    fn test_record_parsing() {
        let json = r#"{
            "flightNumber": "AF123",
            "arrivalTimestamp": 1769018400,
            "status": 2,
            "delayInMinutes": 45,
            "reasonCode": 50,
            "updatedAt": 1769000000
        }"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, FlightStatus::Delayed);
        assert_eq!(record.delay_in_minutes, 45);
        assert_eq!(record.reason_code, 50);
        assert_eq!(record.updated_at, 1_769_000_000);
        assert!(record.matches(&FlightKey::new("AF123", 1_769_018_400)));
        assert!(!record.matches(&FlightKey::new("AF123", 1)));
    }

    #[test]
    fn test_record_defaults_for_missing_fields() {
        let json = r#"{"flightNumber": "LH400", "arrivalTimestamp": 10}"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, FlightStatus::Scheduled);
        assert_eq!(record.updated_at, 0);
    }

    #[test]
    fn test_record_rejects_out_of_range_fields() {
        let bad_status = r#"{"flightNumber": "X1", "arrivalTimestamp": 10, "status": 7}"#;
        assert!(serde_json::from_str::<FlightRecord>(bad_status).is_err());

        let bad_reason = r#"{"flightNumber": "X1", "arrivalTimestamp": 10, "reasonCode": 70000}"#;
        assert!(serde_json::from_str::<FlightRecord>(bad_reason).is_err());

        let negative_delay = r#"{"flightNumber": "X1", "arrivalTimestamp": 10, "delayInMinutes": -5}"#;
        assert!(serde_json::from_str::<FlightRecord>(negative_delay).is_err());
    }

    #[test]
    fn test_status_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&FlightStatus::Cancelled).unwrap(), "3");
        assert_eq!(FlightStatus::try_from(4), Ok(FlightStatus::Diverted));
        assert_eq!(FlightStatus::try_from(5), Err(InvalidFlightStatus(5)));
    }
}
