//! Data model of the client session.
//!
//! This module groups the types owned by the connection manager:
//! - `record` — the normalized per-instrument `TickRecord`.
//! - `registry` — the session accumulator that reconciles ticks by instrument
//!   id, builds the label map and numbers subscription requests.
pub mod record;
pub mod registry;
