//! Ticker channel (`swap/ticker`, `futures/ticker`)

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::StreamResult;
use okex_types::convert::de_f64;
use okex_types::{Category, Ticker};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireTicker {
    instrument_id: String,
    #[serde(default, deserialize_with = "de_f64")]
    last: f64,
    #[serde(default, deserialize_with = "de_f64")]
    best_bid: f64,
    #[serde(default, deserialize_with = "de_f64")]
    best_ask: f64,
    #[serde(default, deserialize_with = "de_f64")]
    high_24h: f64,
    #[serde(default, deserialize_with = "de_f64")]
    low_24h: f64,
    #[serde(default, deserialize_with = "de_f64")]
    volume_24h: f64,
    #[serde(default)]
    timestamp: String,
}

/// Decode a ticker payload
pub fn decode(data: &Value, resolver: &dyn ContractResolver) -> StreamResult<Vec<Ticker>> {
    let wire: Vec<WireTicker> = records(Category::Ticker, data)?;

    Ok(wire
        .into_iter()
        .map(|t| {
            let (pair, contract_alias) = resolve_instrument(resolver, &t.instrument_id);
            Ticker {
                pair,
                contract_alias,
                last: t.last,
                buy: t.best_bid,
                sell: t.best_ask,
                high: t.high_24h,
                low: t.low_24h,
                volume: t.volume_24h,
                timestamp_ms: timestamp_ms(&t.timestamp),
                instrument_id: t.instrument_id,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractTable;
    use okex_types::CurrencyPair;

    #[test]
    fn test_decode_ticker() {
        let data: Value = serde_json::from_str(
            r#"[{"instrument_id":"BTC-USD-SWAP","last":"3640.5","best_bid":"3640.4","best_ask":"3640.6",
                 "high_24h":"3700","low_24h":"3600","volume_24h":"120000","timestamp":"2019-03-05T08:40:22.123Z"}]"#,
        )
        .unwrap();

        let tickers = decode(&data, &ContractTable::new()).unwrap();
        assert_eq!(tickers.len(), 1);

        let t = &tickers[0];
        assert_eq!(t.pair, CurrencyPair::new("BTC", "USD"));
        assert_eq!(t.contract_alias, "swap");
        assert_eq!(t.last, 3640.5);
        assert_eq!(t.buy, 3640.4);
        assert_eq!(t.sell, 3640.6);
        assert_eq!(t.volume, 120000.0);
        assert_eq!(t.timestamp_ms, 1551775222123);
    }

    #[test]
    fn test_unknown_instrument_keeps_batch() {
        let data: Value = serde_json::from_str(
            r#"[{"instrument_id":"LTC-USD-190329","last":"50"},{"instrument_id":"ETH-USD-SWAP","last":"130"}]"#,
        )
        .unwrap();

        let tickers = decode(&data, &ContractTable::new()).unwrap();
        assert_eq!(tickers.len(), 2);
        assert!(tickers[0].pair.is_unknown());
        assert_eq!(tickers[1].pair, CurrencyPair::new("ETH", "USD"));
    }
}
