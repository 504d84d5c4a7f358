//! Position channel (`swap/position`, `futures/position`), private
//!
//! OKEx reports a hedged position as flat `long_*` and `short_*` fields.

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::StreamResult;
use okex_types::convert::de_f64;
use okex_types::{Category, PositionLeg, PositionUpdate};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WirePosition {
    instrument_id: String,
    #[serde(default, deserialize_with = "de_f64")]
    long_qty: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_avail_qty: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_avg_cost: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_settlement_price: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_margin: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_pnl_ratio: f64,
    #[serde(default, deserialize_with = "de_f64")]
    long_unrealised_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_qty: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_avail_qty: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_avg_cost: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_settlement_price: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_margin: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_pnl_ratio: f64,
    #[serde(default, deserialize_with = "de_f64")]
    short_unrealised_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    realised_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    leverage: f64,
    #[serde(default, deserialize_with = "de_f64")]
    liquidation_price: f64,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

/// Decode a position payload
pub fn decode(data: &Value, resolver: &dyn ContractResolver) -> StreamResult<Vec<PositionUpdate>> {
    let wire: Vec<WirePosition> = records(Category::Position, data)?;

    Ok(wire
        .into_iter()
        .map(|p| {
            let (pair, contract_alias) = resolve_instrument(resolver, &p.instrument_id);
            PositionUpdate {
                pair,
                contract_alias,
                long: PositionLeg {
                    qty: p.long_qty,
                    available: p.long_avail_qty,
                    avg_cost: p.long_avg_cost,
                    settlement_price: p.long_settlement_price,
                    margin: p.long_margin,
                    pnl: p.long_pnl,
                    pnl_ratio: p.long_pnl_ratio,
                    unrealised_pnl: p.long_unrealised_pnl,
                },
                short: PositionLeg {
                    qty: p.short_qty,
                    available: p.short_avail_qty,
                    avg_cost: p.short_avg_cost,
                    settlement_price: p.short_settlement_price,
                    margin: p.short_margin,
                    pnl: p.short_pnl,
                    pnl_ratio: p.short_pnl_ratio,
                    unrealised_pnl: p.short_unrealised_pnl,
                },
                realised_pnl: p.realised_pnl,
                leverage: p.leverage,
                liquidation_price: p.liquidation_price,
                created_at_ms: timestamp_ms(&p.created_at),
                updated_at_ms: timestamp_ms(&p.updated_at),
                instrument_id: p.instrument_id,
            }
        })
        .collect())
}
