//! Feed boundary.
//!
//! Collapses every outcome of a feed lookup into [`FeedLookup`], so the
//! reconciler only has to tell "here is a record", "there is no record yet"
//! and "try again later" apart.

use async_trait::async_trait;
use skyoracle_sdk::client::{ClientError, FeedClient};
use skyoracle_sdk::objects::{FlightKey, FlightRecord};
use thiserror::Error;

/// Result of fetching one flight from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLookup {
    Found(FlightRecord),
    /// The feed has no record for the key (yet).
    NotFound,
    /// The feed could not answer; the reason is for logging only.
    Unavailable(String),
}

/// Errors surfaced by feed probes.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Client(#[from] ClientError),
}

/// Read access to the flight feed.
#[async_trait]
pub trait FlightFeed: Send + Sync {
    /// Current record of the flight identified by `key`.
    async fn fetch(&self, key: &FlightKey) -> FeedLookup;

    /// Liveness probe. Advisory only.
    async fn health(&self) -> Result<(), FeedError>;
}

#[async_trait]
impl FlightFeed for FeedClient {
    async fn fetch(&self, key: &FlightKey) -> FeedLookup {
        match self.get_flight(key).await {
            Ok(Some(record)) if record.matches(key) => FeedLookup::Found(record),
            Ok(Some(record)) => FeedLookup::Unavailable(format!(
                "feed answered {} for {}",
                record.key(),
                key
            )),
            Ok(None) => FeedLookup::NotFound,
            Err(e) if e.is_timeout() => FeedLookup::Unavailable(format!("timed out: {e}")),
            Err(e) => FeedLookup::Unavailable(e.to_string()),
        }
    }

    async fn health(&self) -> Result<(), FeedError> {
        Ok(FeedClient::health(self).await?)
    }
}
