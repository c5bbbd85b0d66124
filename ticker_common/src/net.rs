//! Endpoint and timing constants plus the connection status shared by the
//! connection manager and the view.
use strum_macros::{Display, EnumString};

/// Quote service endpoint the client connects to by default.
pub const ENDPOINT: &str = "wss://api.exchange.bitcoin.com/api/2/ws";

/// Shared timing constant: throttle window for view updates and the fixed
/// delay before every reconnect attempt.
pub const UPDATE_INTERVAL_MS: u64 = 1000;

/// Lifecycle state of the streaming connection.
#[derive(Debug, Clone, Copy, Default, Display, EnumString, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    /// No transport attached; a reconnect may be pending.
    #[default]
    Disconnected,
    /// Transport requested, waiting for the open signal.
    Connecting,
    /// Transport open; frames are flowing.
    Connected,
}
