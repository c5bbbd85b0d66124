//! Session-scoped symbol registry and tick reconciler.
//!
//! A `Session` is the private accumulator of one connection: it is reset every
//! time the manager starts connecting, merges each incoming tick into its
//! record list by instrument id (last write wins, whole record replaced) and
//! hands back a fresh snapshot for throttled publication. It also turns the
//! catalog response into the label map and the subscription requests for that
//! connection.
use std::collections::HashMap;

use log::{debug, info};
use ticker_common::protocol::{CatalogEntry, FIRST_SUBSCRIPTION_ID, Inbound, Message, Request};

use crate::model::record::TickRecord;

/// Instrument id to display label (`QUOTE / BASE`).
pub type LabelMap = HashMap<String, String>;

/// Builds a fresh label map from the catalog.
pub fn build_labels(entries: &[CatalogEntry]) -> LabelMap {
    entries
        .iter()
        .map(|entry| (entry.id.clone(), entry.label()))
        .collect()
}

/// Whether a merge added a new instrument or replaced a known one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// First tick for this id this session.
    Inserted,
    /// An existing record was replaced.
    Replaced,
}

/// What the manager has to do after a frame was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Catalog received: publish the labels, send the subscriptions.
    Catalog {
        /// Label map replacing the previous one.
        labels: LabelMap,
        /// One subscription per listed instrument, in catalog order.
        subscriptions: Vec<Request>,
    },
    /// A tick was merged; the snapshot is ready for the throttle.
    Snapshot(Vec<TickRecord>),
    /// Nothing to do.
    Ignored,
}

/// Accumulator for one connection.
#[derive(Debug)]
pub struct Session {
    records: Vec<TickRecord>,
    next_request_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_request_id: FIRST_SUBSCRIPTION_ID,
        }
    }

    /// Drop every record and restart request numbering.
    pub fn reset(&mut self) {
        self.records.clear();
        self.next_request_id = FIRST_SUBSCRIPTION_ID;
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    /// Number of distinct instruments seen this session.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no tick was merged yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fresh copy of the current records.
    pub fn snapshot(&self) -> Vec<TickRecord> {
        self.records.clone()
    }

    /// Merges `record` by id. A linear scan is fine for a few hundred
    /// instruments.
    pub fn merge(&mut self, record: TickRecord) -> Merge {
        match self.records.iter_mut().find(|known| known.id == record.id) {
            Some(known) => {
                *known = record;
                Merge::Replaced
            }
            None => {
                self.records.push(record);
                Merge::Inserted
            }
        }
    }

    /// One `subscribeTicker` request per entry, each with a fresh id.
    pub fn subscriptions(&mut self, entries: &[CatalogEntry]) -> Vec<Request> {
        entries
            .iter()
            .map(|entry| {
                let id = self.next_request_id;
                self.next_request_id += 1;
                Request::subscribe_ticker(id, &entry.id)
            })
            .collect()
    }

    /// Applies a decoded frame to the session.
    pub fn dispatch(&mut self, message: &Message) -> Dispatch {
        match message.classify() {
            Inbound::Catalog(entries) => {
                info!("Catalog received with {} instruments", entries.len());
                Dispatch::Catalog {
                    labels: build_labels(&entries),
                    subscriptions: self.subscriptions(&entries),
                }
            }
            Inbound::Ticker(update) => {
                let record = TickRecord::from_update(&update);
                let merge = self.merge(record);
                debug!("Tick {} {:?}", update.symbol, merge);
                Dispatch::Snapshot(self.snapshot())
            }
            Inbound::Ignored => Dispatch::Ignored,
        }
    }
}
