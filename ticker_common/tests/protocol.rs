use std::time::{Duration, Instant};

use ticker_common::fields::{Price, SortKey};
use ticker_common::protocol::{Inbound, Message, Request, decode};
use ticker_common::throttle::Throttle;

const SESSION: &[&str] = &[
    r#"{"jsonrpc":"2.0","result":[{"id":"ETHBTC","baseCurrency":"ETH","quoteCurrency":"BTC"},{"id":"BTCUSD","baseCurrency":"BTC","quoteCurrency":"USD"}],"id":1}"#,
    r#"{"jsonrpc":"2.0","result":true,"id":2}"#,
    r#"{"jsonrpc":"2.0","result":true,"id":3}"#,
    r#"{"jsonrpc":"2.0","method":"ticker","params":{"ask":"0.054464","bid":"0.054463","last":"0.054463","open":"0.057133","low":"0.053615","high":"0.057559","volume":"33068.346","symbol":"ETHBTC"}}"#,
    "{\"jsonrpc\":\"2.0\",\"method\":\"ticker\",\"par",
    r#"{"jsonrpc":"2.0","method":"ticker","params":{"ask":null,"bid":"6500.10","last":"6500","low":"6400","high":"6600","symbol":"BTCUSD"}}"#,
];

#[test]
fn recorded_session_classifies_frame_by_frame() {
    let kinds: Vec<&str> = SESSION
        .iter()
        .map(|frame| match decode(frame).classify() {
            Inbound::Catalog(_) => "catalog",
            Inbound::Ticker(_) => "ticker",
            Inbound::Ignored => "ignored",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["catalog", "ignored", "ignored", "ticker", "ignored", "ticker"]
    );
}

#[test]
fn catalog_drives_subscriptions() {
    let Inbound::Catalog(entries) = Message::decode(SESSION[0]).classify() else {
        panic!("first frame must be the catalog");
    };
    let labels: Vec<String> = entries.iter().map(|e| e.label()).collect();
    assert_eq!(labels, vec!["BTC / ETH", "USD / BTC"]);

    let requests: Vec<Request> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| Request::subscribe_ticker(i as u64 + 2, &e.id))
        .collect();
    assert_eq!(requests[0].id, 2);
    assert_eq!(requests[1].id, 3);
}

#[test]
fn ticker_values_normalize_to_two_decimals() {
    let Inbound::Ticker(update) = decode(SESSION[5]).classify() else {
        panic!("expected ticker");
    };
    assert_eq!(Price::from_json(update.field(SortKey::Bid)).to_string(), "6500.10");
    assert_eq!(Price::from_json(update.field(SortKey::Last)).to_string(), "6500.00");
    assert!(Price::from_json(update.field(SortKey::Ask)).is_nan());
}

#[test]
fn throttled_publication_of_snapshots() {
    let mut published: Vec<Vec<String>> = Vec::new();
    let start = Instant::now();
    {
        let mut gate = Throttle::new(|ids: Vec<String>| published.push(ids), Duration::from_millis(1000), false);
        let mut ids = Vec::new();
        for (n, frame) in SESSION.iter().enumerate() {
            if let Inbound::Ticker(update) = decode(frame).classify() {
                ids.push(update.symbol);
                gate.call(start + Duration::from_millis(n as u64 * 10), ids.clone());
            }
        }
        gate.poll(start + Duration::from_secs(2));
    }
    assert_eq!(published, vec![vec![String::from("ETHBTC"), String::from("BTCUSD")]]);
}
