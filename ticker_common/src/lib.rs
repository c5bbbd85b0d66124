//!
//! Common types and utilities shared by the ticker client.
//!
//! This crate aggregates:
//! - `error` — unified error type `FeedError` used across the workspace.
//! - `result` — handy `Result<T, FeedError>` alias.
//! - `fields` — sort keys and the fixed-precision price cell.
//! - `protocol` — JSON-RPC style requests and the lenient frame decoder.
//! - `throttle` — rate limiter collapsing bursts into one call per window.
//! - `net` — endpoint/timing constants and the connection status.
#![warn(missing_docs)]
pub mod error;
pub mod fields;
pub mod net;
pub mod protocol;
pub mod result;
pub mod throttle;

pub use error::FeedError;
pub use protocol::{Inbound, Message, Request};
pub use result::Result;
