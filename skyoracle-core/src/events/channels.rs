//! Event channel factories and handles.

use super::types::OracleEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for OracleEvent events.
pub type OracleEventSender = mpsc::Sender<OracleEvent>;
/// Receiver handle for OracleEvent events.
pub type OracleEventReceiver = mpsc::Receiver<OracleEvent>;

/// Create a new OracleEvent channel.
pub fn oracle_event_channel() -> (OracleEventSender, OracleEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
