//! View-side state: what the connection manager publishes and how the table
//! ordering is derived from it.
//!
//! The manager pushes `ViewUpdate`s over a channel. `SortedView` folds them
//! into the state the renderer needs (status, labels, latest snapshot, sort
//! key) and memoizes the ordered projection until either the snapshot or the
//! sort key changes.
use std::cmp::Ordering;
use std::str::FromStr;

use log::{info, warn};
use ticker_common::fields::SortKey;
use ticker_common::net::ConnectionStatus;

use crate::model::record::TickRecord;
use crate::model::registry::LabelMap;

/// Message published by the connection manager to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Connection status changed.
    Status(ConnectionStatus),
    /// Catalog received; labels replaced.
    Labels(LabelMap),
    /// Throttled snapshot of the session records.
    Records(Vec<TickRecord>),
}

/// Orders `records` by the numeric value of `key`, largest first.
///
/// Not-a-number cells always sort after every number. Equal values keep
/// their input order.
pub fn project(records: &[TickRecord], key: SortKey) -> Vec<TickRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| compare_desc(a.field(key).as_f64(), b.field(key).as_f64()));
    ordered
}

fn compare_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Translates a clicked column name into a sort key.
pub fn sort_key_for_column(column: &str) -> Option<SortKey> {
    SortKey::from_str(column.trim()).ok()
}

/// State consumed by the renderer.
#[derive(Debug, Default)]
pub struct SortedView {
    status: ConnectionStatus,
    labels: LabelMap,
    records: Vec<TickRecord>,
    sort_key: SortKey,
    ordered: Option<Vec<TickRecord>>,
}

impl SortedView {
    /// Create an empty view ordered by `sort_key`.
    pub fn new(sort_key: SortKey) -> Self {
        Self {
            sort_key,
            ..Self::default()
        }
    }

    /// Folds a published update into the view.
    pub fn apply(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Status(status) => self.status = status,
            ViewUpdate::Labels(labels) => self.labels = labels,
            ViewUpdate::Records(records) => {
                self.records = records;
                self.ordered = None;
            }
        }
    }

    /// Switches the active sort key. Returns `true` if it changed.
    pub fn set_sort_key(&mut self, key: SortKey) -> bool {
        if key == self.sort_key {
            return false;
        }
        self.sort_key = key;
        self.ordered = None;
        true
    }

    /// Sort-change callback for a clicked column. Unknown columns are ignored.
    pub fn select_column(&mut self, column: &str) -> bool {
        match sort_key_for_column(column) {
            Some(key) => {
                let changed = self.set_sort_key(key);
                if changed {
                    info!("Sorting by {}", key);
                }
                changed
            }
            None => {
                warn!("Unknown sort column: {:?}", column);
                false
            }
        }
    }

    /// Records in display order, recomputed only when stale.
    pub fn ordered(&mut self) -> &[TickRecord] {
        self.rows().0
    }

    /// Ordered records together with the labels to show for them.
    pub fn rows(&mut self) -> (&[TickRecord], &LabelMap) {
        let (records, key) = (&self.records, self.sort_key);
        let ordered = self.ordered.get_or_insert_with(|| project(records, key));
        (ordered, &self.labels)
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Current label map.
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Active sort key.
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    #[cfg(test)]
    fn is_projected(&self) -> bool {
        self.ordered.is_some()
    }
}
