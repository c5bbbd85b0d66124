//! JSON-RPC style messages exchanged with the quote service.
//!
//! Outbound traffic is a `Request` (`getSymbols` once per connection, then one
//! `subscribeTicker` per instrument). Inbound frames are decoded leniently into
//! a `Message`: a frame that is not a JSON object decodes to an empty message,
//! and `Message::classify` recognizes the two shapes the client cares about by
//! the fields they carry.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::SortKey;
use crate::result::Result;

/// Correlation id of the catalog request and of its response.
pub const CATALOG_REQUEST_ID: u64 = 1;
/// Correlation id given to the first subscription of a session.
pub const FIRST_SUBSCRIPTION_ID: u64 = 2;
/// Method name of the catalog request.
pub const GET_SYMBOLS: &str = "getSymbols";
/// Method name of a ticker subscription.
pub const SUBSCRIBE_TICKER: &str = "subscribeTicker";
/// Method name carried by inbound ticker notifications.
pub const TICKER: &str = "ticker";

/// Request payload sent to the quote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Correlation id, unique within a session.
    pub id: u64,
    /// Remote method name.
    pub method: String,
    /// Method parameters (always an object).
    pub params: Value,
}

impl Request {
    /// Creates the catalog (`getSymbols`) request.
    pub fn get_symbols() -> Self {
        Request {
            id: CATALOG_REQUEST_ID,
            method: String::from(GET_SYMBOLS),
            params: Value::Object(Map::new()),
        }
    }

    /// Creates a `subscribeTicker` request for one instrument.
    pub fn subscribe_ticker(id: u64, symbol: &str) -> Self {
        let mut params = Map::new();
        params.insert(String::from("symbol"), Value::String(String::from(symbol)));
        Request {
            id,
            method: String::from(SUBSCRIBE_TICKER),
            params: Value::Object(params),
        }
    }

    /// Encode the request as a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A decoded inbound frame. Every field is optional; shapes are told apart
/// by which fields are present.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Message {
    /// Correlation id of a response.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name of a notification.
    #[serde(default)]
    pub method: Option<Value>,
    /// Result payload of a response.
    #[serde(default)]
    pub result: Option<Value>,
    /// Parameters of a notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// One instrument listed in the catalog response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Instrument identifier, e.g. `ETHBTC`.
    pub id: String,
    /// Quote currency code; `None` when missing or null.
    #[serde(default)]
    pub quote_currency: Option<String>,
    /// Base currency code; `None` when missing or null.
    #[serde(default)]
    pub base_currency: Option<String>,
}

impl CatalogEntry {
    /// Human readable label, `QUOTE / BASE`. Absent codes render empty.
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            self.quote_currency.as_deref().unwrap_or_default(),
            self.base_currency.as_deref().unwrap_or_default()
        )
    }
}

/// Raw ticker notification: the instrument and its unnormalized params.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    /// Instrument identifier.
    pub symbol: String,
    /// The notification params as received.
    pub params: Map<String, Value>,
}

impl TickerUpdate {
    /// Raw value of one numeric column, if present.
    pub fn field(&self, key: SortKey) -> Option<&Value> {
        self.params.get(key.field_name())
    }
}

/// Inbound shapes the client acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Response to the catalog request.
    Catalog(Vec<CatalogEntry>),
    /// Ticker notification for a subscribed instrument.
    Ticker(TickerUpdate),
    /// Anything else: subscription acks, errors, empty messages.
    Ignored,
}

impl Message {
    /// Decodes a raw text frame. Never fails: a frame that does not parse as a
    /// JSON object is logged and yields an empty message.
    pub fn decode(raw: &str) -> Message {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to decode frame: {}", e);
                debug!("Undecodable frame: {}", raw);
                return Message::default();
            }
        };
        // arrays would otherwise fill the fields by position
        if !value.is_object() {
            debug!("Ignoring non-object frame: {}", raw);
            return Message::default();
        }
        match Message::deserialize(&value) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to decode frame: {}", e);
                Message::default()
            }
        }
    }

    /// Returns `true` when no known field is present.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.method.is_none() && self.result.is_none() && self.params.is_none()
    }

    /// Sorts the message into one of the shapes the client reacts to.
    pub fn classify(&self) -> Inbound {
        if let Some(entries) = self.catalog_entries() {
            return Inbound::Catalog(entries);
        }
        if let Some(update) = self.ticker_update() {
            return Inbound::Ticker(update);
        }
        Inbound::Ignored
    }

    fn catalog_entries(&self) -> Option<Vec<CatalogEntry>> {
        let id = self.id.as_ref().and_then(Value::as_f64)?;
        if id != CATALOG_REQUEST_ID as f64 {
            return None;
        }
        let items = self.result.as_ref().and_then(Value::as_array)?;
        let entries = items
            .iter()
            .filter_map(|item| match CatalogEntry::deserialize(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping catalog entry {}: {}", item, e);
                    None
                }
            })
            .collect();
        Some(entries)
    }

    fn ticker_update(&self) -> Option<TickerUpdate> {
        if self.method.as_ref().and_then(Value::as_str) != Some(TICKER) {
            return None;
        }
        let params = self.params.as_ref().and_then(Value::as_object)?;
        let symbol = params.get("symbol").and_then(Value::as_str)?;
        Some(TickerUpdate {
            symbol: String::from(symbol),
            params: params.clone(),
        })
    }
}

/// Decodes a raw text frame, see [`Message::decode`].
pub fn decode(raw: &str) -> Message {
    Message::decode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_request_matches_wire_shape() {
        let value: Value = serde_json::from_str(&Request::get_symbols().to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"id": 1, "method": "getSymbols", "params": {}}));
    }

    #[test]
    fn subscribe_request_matches_wire_shape() {
        let frame = Request::subscribe_ticker(7, "ETHBTC").to_json().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"id": 7, "method": "subscribeTicker", "params": {"symbol": "ETHBTC"}})
        );
    }

    #[test]
    fn garbage_decodes_to_empty_message() {
        assert!(decode("not json").is_empty());
        assert!(decode("[1,2,3]").is_empty());
        assert!(decode("").is_empty());
        assert!(decode("42").is_empty());
        assert_eq!(decode("not json").classify(), Inbound::Ignored);
    }

    #[test]
    fn array_frames_are_ignored() {
        let catalog_like = r#"[1,null,[{"id":"X","quoteCurrency":"Q","baseCurrency":"B"}]]"#;
        assert!(decode(catalog_like).is_empty());
        assert_eq!(decode(catalog_like).classify(), Inbound::Ignored);

        let ticker_like = r#"[null,"ticker",null,{"symbol":"X","last":"1"}]"#;
        assert!(decode(ticker_like).is_empty());
        assert_eq!(decode(ticker_like).classify(), Inbound::Ignored);
    }

    #[test]
    fn catalog_needs_id_one_and_array_result() {
        let frame = r#"{"id":1,"result":[{"id":"ETHBTC","quoteCurrency":"BTC","baseCurrency":"ETH"}]}"#;
        match decode(frame).classify() {
            Inbound::Catalog(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].id, "ETHBTC");
                assert_eq!(entries[0].label(), "BTC / ETH");
            }
            other => panic!("expected catalog, got {:?}", other),
        }

        let wrong_id = r#"{"id":2,"result":[{"id":"ETHBTC"}]}"#;
        assert_eq!(decode(wrong_id).classify(), Inbound::Ignored);
        let not_array = r#"{"id":1,"result":true}"#;
        assert_eq!(decode(not_array).classify(), Inbound::Ignored);
        let string_id = r#"{"id":"1","result":[]}"#;
        assert_eq!(decode(string_id).classify(), Inbound::Ignored);
    }

    #[test]
    fn catalog_skips_entries_without_id() {
        let frame = r#"{"id":1,"result":[{"quoteCurrency":"BTC"},{"id":"LTCBTC"}]}"#;
        match decode(frame).classify() {
            Inbound::Catalog(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].id, "LTCBTC");
                assert_eq!(entries[0].label(), " / ");
            }
            other => panic!("expected catalog, got {:?}", other),
        }
    }

    #[test]
    fn catalog_keeps_entries_with_null_currencies() {
        let frame = r#"{"id":1,"result":[
            {"id":"A","quoteCurrency":null,"baseCurrency":"B"},
            {"id":"C","quoteCurrency":"Q","baseCurrency":"D"}]}"#;
        match decode(frame).classify() {
            Inbound::Catalog(entries) => {
                let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
                assert_eq!(ids, vec!["A", "C"]);
                assert_eq!(entries[0].quote_currency, None);
                assert_eq!(entries[0].label(), " / B");
                assert_eq!(entries[1].label(), "Q / D");
            }
            other => panic!("expected catalog, got {:?}", other),
        }
    }

    #[test]
    fn ticker_requires_method_and_symbol() {
        let frame = r#"{"method":"ticker","params":{"symbol":"ETHBTC","bid":"0.05","last":1}}"#;
        match decode(frame).classify() {
            Inbound::Ticker(update) => {
                assert_eq!(update.symbol, "ETHBTC");
                assert_eq!(update.field(SortKey::Bid), Some(&json!("0.05")));
                assert_eq!(update.field(SortKey::Last), Some(&json!(1)));
                assert_eq!(update.field(SortKey::Ask), None);
            }
            other => panic!("expected ticker, got {:?}", other),
        }

        let no_symbol = r#"{"method":"ticker","params":{"bid":"0.05"}}"#;
        assert_eq!(decode(no_symbol).classify(), Inbound::Ignored);
        let no_params = r#"{"method":"ticker"}"#;
        assert_eq!(decode(no_params).classify(), Inbound::Ignored);
        let other_method = r#"{"method":"snapshotOrderbook","params":{"symbol":"ETHBTC"}}"#;
        assert_eq!(decode(other_method).classify(), Inbound::Ignored);
    }

    #[test]
    fn subscription_ack_is_ignored() {
        assert_eq!(decode(r#"{"jsonrpc":"2.0","result":true,"id":2}"#).classify(), Inbound::Ignored);
    }
}
