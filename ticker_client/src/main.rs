//! Ticker Client — keeps a live, sortable table of exchange tickers streamed
//! over a WebSocket. It connects to the quote service, asks for the symbol
//! catalog, subscribes to every listed instrument and reconciles incoming
//! ticks into one row per instrument. Table updates are throttled to one per
//! second; a dropped connection is retried every second, forever.
//!
//! Usage example (CLI):
//! ```bash
//! ticker_client --url wss://api.exchange.bitcoin.com/api/2/ws --sort last
//! ```
//!
//! While running, type a column name (`bid`, `ask`, `high`, `low`, `last`)
//! followed by Enter to re-sort the table. Ctrl+C stops the client.
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded, never, select, unbounded};
use log::{debug, error, info};
use ticker_common::FeedError;
use ticker_common::Result;
use ticker_common::net::UPDATE_INTERVAL_MS;

use ticker_client::args::Args;
use ticker_client::table;
use ticker_client::{SortedView, StreamClient, ViewUpdate, WsConnector};

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();
    let url = args.url.trim().replace('"', "");

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down client...");
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| FeedError::Signal(e.to_string()))?;

    let (updates_tx, updates_rx) = unbounded::<ViewUpdate>();
    let client = StreamClient::new(
        &url,
        WsConnector::default(),
        Duration::from_millis(UPDATE_INTERVAL_MS),
        updates_tx,
    );
    let client_thread = thread::Builder::new()
        .name(String::from("stream-client"))
        .spawn(move || client.run(stop_rx))?;

    let (sort_tx, sort_rx) = unbounded::<String>();
    start_sort_reader(sort_tx);

    info!("Client is running. Type a column name to sort, Ctrl+C to exit.");
    run_view_loop(SortedView::new(args.sort), updates_rx, sort_rx)?;

    let result = client_thread
        .join()
        .map_err(|_| FeedError::ThreadPanic(String::from("stream-client")))?;
    if let Err(e) = &result {
        error!("Stream client failed: {}", e);
    }
    result
}

/// Redraws the table whenever the view changes. Returns once the stream
/// client has gone away.
fn run_view_loop(
    mut view: SortedView,
    updates: Receiver<ViewUpdate>,
    mut sort_columns: Receiver<String>,
) -> Result<()> {
    redraw(&mut view)?;
    loop {
        select! {
            recv(updates) -> msg => match msg {
                Ok(update) => {
                    view.apply(update);
                    redraw(&mut view)?;
                }
                Err(_) => {
                    info!("View loop stopping...");
                    return Ok(());
                }
            },
            recv(sort_columns) -> msg => match msg {
                Ok(column) => {
                    if view.select_column(&column) {
                        redraw(&mut view)?;
                    }
                }
                Err(_) => {
                    debug!("Sort input closed");
                    sort_columns = never();
                }
            },
        }
    }
}

fn redraw(view: &mut SortedView) -> Result<()> {
    let table = table::render(view, Local::now());
    let mut stdout = io::stdout().lock();
    write!(stdout, "\x1B[2J\x1B[H{}", table)?;
    stdout.flush()?;
    Ok(())
}

/// Forwards every non-empty stdin line as a sort column request.
fn start_sort_reader(tx: Sender<String>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            };
            let column = line.trim();
            if column.is_empty() {
                continue;
            }
            if tx.send(String::from(column)).is_err() {
                break;
            }
        }
        debug!("Sort reader stopping...");
    });
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
