//! Depth channel (`swap/depth5`, `futures/depth5`)
//!
//! Levels arrive as `[price, amount, liquidated_orders, orders]` string
//! arrays. Only price and amount are kept. Asks are re-sorted by descending
//! price; bids keep wire order, which is already best first.

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::{StreamError, StreamResult};
use okex_types::depth::sort_descending;
use okex_types::{Category, Depth, DepthRecord};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireDepth {
    instrument_id: String,
    #[serde(default)]
    asks: Vec<Vec<Value>>,
    #[serde(default)]
    bids: Vec<Vec<Value>>,
    #[serde(default)]
    timestamp: String,
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn level(raw: &[Value]) -> StreamResult<DepthRecord> {
    match (raw.first().and_then(number), raw.get(1).and_then(number)) {
        (Some(price), Some(amount)) => Ok(DepthRecord::new(price, amount)),
        _ => Err(StreamError::decode(
            Category::Depth,
            format!("invalid level: {:?}", raw),
        )),
    }
}

fn levels(raw: &[Vec<Value>]) -> StreamResult<Vec<DepthRecord>> {
    raw.iter().map(|l| level(l)).collect()
}

/// Decode a depth payload
pub fn decode(data: &Value, resolver: &dyn ContractResolver) -> StreamResult<Vec<Depth>> {
    let wire: Vec<WireDepth> = records(Category::Depth, data)?;

    wire.into_iter()
        .map(|d| {
            let mut asks = levels(&d.asks)?;
            sort_descending(&mut asks);
            let bids = levels(&d.bids)?;

            let (pair, contract_alias) = resolve_instrument(resolver, &d.instrument_id);
            Ok(Depth {
                pair,
                contract_alias,
                asks,
                bids,
                timestamp_ms: timestamp_ms(&d.timestamp),
                instrument_id: d.instrument_id,
            })
        })
        .collect()
}
