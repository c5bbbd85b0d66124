//! Error types shared between the common crate and the ticker client.
//!
//! The `FeedError` enum unifies the failure cases of the feed: socket I/O,
//! JSON encoding, WebSocket handshake/transport problems and channel plumbing,
//! so every layer can propagate a single error type.
use std::io;

use thiserror::Error;

/// Unified error type for the ticker feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from the standard library or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// The endpoint URL could not be turned into a WebSocket request.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The WebSocket opening handshake failed (TLS, HTTP upgrade, etc.).
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// The WebSocket failed after the connection was established.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// An outbound frame was requested while no transport is attached.
    #[error("Not connected")]
    NotConnected,

    /// Installing the Ctrl+C handler failed.
    #[error("Signal handler error: {0}")]
    Signal(String),

    /// A worker thread panicked; contains the thread name.
    #[error("Thread panicked: {0}")]
    ThreadPanic(String),

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),
}
