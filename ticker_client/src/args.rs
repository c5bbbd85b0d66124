//! Command-line arguments for the ticker client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use ticker_common::fields::SortKey;
use ticker_common::net::ENDPOINT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// WebSocket endpoint of the quote service.
    #[clap(long, default_value = ENDPOINT)]
    pub url: String,

    /// Column the table is initially ordered by (descending).
    #[clap(long, value_enum, default_value_t = SortKey::Last)]
    pub sort: SortKey,
}
