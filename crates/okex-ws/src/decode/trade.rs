//! Trade channel (`swap/trade`, `futures/trade`)

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::{StreamError, StreamResult};
use okex_types::convert::{de_f64, de_i64};
use okex_types::{Category, Side, Trade};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireTrade {
    instrument_id: String,
    #[serde(deserialize_with = "de_i64")]
    trade_id: i64,
    side: String,
    #[serde(deserialize_with = "de_f64")]
    price: f64,
    // swaps send `size`, futures send `qty`
    #[serde(alias = "size", deserialize_with = "de_f64")]
    qty: f64,
    #[serde(default)]
    timestamp: String,
}

/// Decode a trade payload
///
/// An unknown side string fails the frame.
pub fn decode(data: &Value, resolver: &dyn ContractResolver) -> StreamResult<Vec<Trade>> {
    let wire: Vec<WireTrade> = records(Category::Trade, data)?;

    wire.into_iter()
        .map(|t| {
            let side: Side = t
                .side
                .parse()
                .map_err(|e| StreamError::decode(Category::Trade, e))?;
            let (pair, contract_alias) = resolve_instrument(resolver, &t.instrument_id);
            Ok(Trade {
                trade_id: t.trade_id,
                pair,
                contract_alias,
                side,
                price: t.price,
                amount: t.qty,
                timestamp_ms: timestamp_ms(&t.timestamp),
                instrument_id: t.instrument_id,
            })
        })
        .collect()
}
