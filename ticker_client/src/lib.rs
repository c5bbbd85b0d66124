//!
//! Streaming ticker client: connection management, session reconciliation
//! and the sorted view fed by it.
//!
//! This crate aggregates:
//! - `args` — command-line interface.
//! - `transport` — WebSocket connections reporting through event messages.
//! - `connection` — the reconnecting stream manager and its event loop.
//! - `model` — tick records and the per-session registry.
//! - `view` — published updates, the sorted projection and sort selection.
//! - `table` — plain-text rendering of the view.
#![warn(missing_docs)]
pub mod args;
pub mod connection;
pub mod model;
pub mod table;
pub mod transport;
pub mod view;

pub use connection::StreamClient;
pub use transport::WsConnector;
pub use view::{SortedView, ViewUpdate};
