//! Ledger boundary.
//!
//! The watcher talks to the hub contract through the [`Ledger`] trait:
//! - `current_height`: latest block number
//! - `query_purchases`: `PolicyPurchased` events in an inclusive block range
//! - `read_revision`: the last `updatedAt` the hub accepted for a flight
//! - `submit_update`: send `updateFlightStatus` and wait for its receipt
//!
//! Implementations are thin adapters: no retries, no business rules. Every
//! call must give up after a bounded time and report it as an error.

pub mod hub;
pub mod types;

pub use hub::{HubClient, HubClientConfig};
pub use types::{FlightUpdate, LedgerEffect, PurchaseEntry, PurchasedPolicy, UpdateReceipt};

use async_trait::async_trait;
use skyoracle_sdk::objects::FlightId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The RPC node could not be reached or answered with an error.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A returned log did not have the expected shape.
    #[error("malformed ledger data: {0}")]
    Malformed(String),

    /// The transaction could not be sent or its receipt could not be obtained.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// The call did not complete within its deadline.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// The client could not be constructed (bad key, bad address).
    #[error("ledger client configuration error: {0}")]
    Config(String),
}

/// Read and write access to the hub contract.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Latest block number known to the node.
    async fn current_height(&self) -> Result<u64, LedgerError>;

    /// All `PolicyPurchased` events in `from_block..=to_block`, in log order.
    ///
    /// A log that cannot be decoded does not fail the scan; it is returned in
    /// place as [`LedgerError::Malformed`].
    async fn query_purchases(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PurchaseEntry>, LedgerError>;

    /// The revision (`updatedAt`) the hub last accepted for `flight_id`.
    ///
    /// Zero when the hub has never received an update for the flight.
    async fn read_revision(&self, flight_id: FlightId) -> Result<u64, LedgerError>;

    /// Submit a status update and wait until it is mined.
    ///
    /// A mined but reverted transaction is returned as `Ok` with
    /// `success == false`; only failures to land or to observe the receipt
    /// are errors.
    async fn submit_update(&self, update: &FlightUpdate) -> Result<UpdateReceipt, LedgerError>;
}

/// Run `fut`, turning an elapsed deadline into [`LedgerError::Timeout`].
pub(crate) async fn with_deadline<T, F>(
    operation: &'static str,
    deadline: Duration,
    fut: F,
) -> Result<T, LedgerError>
where
    F: std::future::Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout {
            operation,
            elapsed: deadline,
        }),
    }
}
