//! Order channel (`swap/order`, `futures/order`), private

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::{StreamError, StreamResult};
use okex_types::convert::{de_f64, de_i64, de_id};
use okex_types::{Category, OrderKind, OrderStatus, OrderUpdate};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireOrder {
    instrument_id: String,
    #[serde(deserialize_with = "de_id")]
    order_id: String,
    #[serde(default)]
    client_oid: String,
    #[serde(default, deserialize_with = "de_f64")]
    price: f64,
    #[serde(default, deserialize_with = "de_f64")]
    price_avg: f64,
    #[serde(default, deserialize_with = "de_f64")]
    size: f64,
    #[serde(default, deserialize_with = "de_f64")]
    filled_qty: f64,
    #[serde(default, deserialize_with = "de_f64")]
    fee: f64,
    #[serde(default)]
    state: Option<Value>,
    // deprecated duplicate of `state`, sole field on older frames
    #[serde(default)]
    status: Option<Value>,
    #[serde(rename = "type", deserialize_with = "de_i64")]
    kind: i64,
    #[serde(default, deserialize_with = "de_f64")]
    leverage: f64,
    #[serde(default, deserialize_with = "de_f64")]
    contract_val: f64,
    #[serde(default)]
    timestamp: String,
}

fn code(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MIN)
}

fn int(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Decode an order payload
pub fn decode(data: &Value, resolver: &dyn ContractResolver) -> StreamResult<Vec<OrderUpdate>> {
    let wire: Vec<WireOrder> = records(Category::Order, data)?;

    wire.into_iter()
        .map(|o| {
            let state = o
                .state
                .as_ref()
                .or(o.status.as_ref())
                .and_then(int)
                .ok_or_else(|| StreamError::decode(Category::Order, "missing or invalid state"))?;

            let (pair, contract_alias) = resolve_instrument(resolver, &o.instrument_id);
            Ok(OrderUpdate {
                order_id: o.order_id,
                client_oid: o.client_oid,
                pair,
                contract_alias,
                price: o.price,
                avg_price: o.price_avg,
                amount: o.size,
                filled_amount: o.filled_qty,
                fee: o.fee,
                status: OrderStatus::from_code(code(state)),
                kind: OrderKind::from_code(code(o.kind)),
                leverage: o.leverage,
                contract_value: o.contract_val,
                timestamp_ms: timestamp_ms(&o.timestamp),
                instrument_id: o.instrument_id,
            })
        })
        .collect()
}
