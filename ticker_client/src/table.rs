//! Plain-text rendering of the sorted view.
use chrono::{DateTime, Local};
use ticker_common::fields::SortKey;

use crate::model::record::TickRecord;
use crate::view::SortedView;

const TICKER_WIDTH: usize = 16;
const CELL_WIDTH: usize = 12;
/// Marker appended to the header of the active sort column.
pub const SORT_MARKER: &str = " ▲";

/// Renders the title, the header row and one row per record in display
/// order. Instruments without a label show their id.
pub fn render(view: &mut SortedView, at: DateTime<Local>) -> String {
    let mut out = format!(
        "Exchange Quotes ({})  {}\n",
        view.status(),
        at.format("%H:%M:%S")
    );
    out.push_str(&header_row(view.sort_key()));

    let (records, labels) = view.rows();
    for record in records {
        let label = labels.get(&record.id).unwrap_or(&record.id);
        out.push_str(&record_row(label, record));
    }
    out
}

fn header_row(sort_key: SortKey) -> String {
    let cells: String = SortKey::ALL
        .iter()
        .map(|&key| {
            let marker = if key == sort_key { SORT_MARKER } else { "" };
            format!("{:>width$}", format!("{}{}", key, marker), width = CELL_WIDTH)
        })
        .collect();
    format!("{:<width$}{}\n", "Ticker", cells, width = TICKER_WIDTH)
}

fn record_row(label: &str, record: &TickRecord) -> String {
    let cells: String = SortKey::ALL
        .iter()
        .map(|&key| format!("{:>width$}", record.field(key).to_string(), width = CELL_WIDTH))
        .collect();
    format!("{:<width$}{}\n", label, cells, width = TICKER_WIDTH)
}
