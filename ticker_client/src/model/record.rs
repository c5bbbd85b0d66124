//! Normalized ticker row.
//!
//! Every numeric field is reduced to two-decimal text on arrival; values that
//! fail numeric coercion become `Price::NotANumber` for that field only.
use ticker_common::fields::{Price, SortKey};
use ticker_common::protocol::TickerUpdate;

/// Latest known prices for one instrument. Identity is `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    /// Instrument identifier (the ticker `symbol`).
    pub id: String,
    /// Best bid.
    pub bid: Price,
    /// Best ask.
    pub ask: Price,
    /// Session high.
    pub high: Price,
    /// Session low.
    pub low: Price,
    /// Last traded price.
    pub last: Price,
}

impl TickRecord {
    /// Normalizes a raw ticker notification into a record.
    pub fn from_update(update: &TickerUpdate) -> Self {
        let price = |key| Price::from_json(update.field(key));
        TickRecord {
            id: update.symbol.clone(),
            bid: price(SortKey::Bid),
            ask: price(SortKey::Ask),
            high: price(SortKey::High),
            low: price(SortKey::Low),
            last: price(SortKey::Last),
        }
    }

    /// The cell addressed by a sort key.
    pub fn field(&self, key: SortKey) -> &Price {
        match key {
            SortKey::Bid => &self.bid,
            SortKey::Ask => &self.ask,
            SortKey::High => &self.high,
            SortKey::Low => &self.low,
            SortKey::Last => &self.last,
        }
    }
}
