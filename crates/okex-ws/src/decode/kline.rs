//! Candle channels (`swap/candle<N>s`, `futures/candle<N>s`)
//!
//! A candle is a positional string array:
//! `[timestamp, open, high, low, close, volume, currency_volume]`.
//! `currency_volume` is missing on some older frames and reads as 0.

use super::{records, timestamp_ms};
use crate::contract::{resolve_instrument, ContractResolver};
use crate::error::{StreamError, StreamResult};
use okex_types::{Category, Kline, KlinePeriod};
use serde::Deserialize;
use serde_json::Value;

const MIN_FIELDS: usize = 6;

#[derive(Debug, Deserialize)]
struct WireCandle {
    instrument_id: String,
    candle: Vec<String>,
}

fn field(candle: &[String], index: usize) -> StreamResult<f64> {
    match candle.get(index) {
        None => Ok(0.0),
        Some(s) if s.is_empty() => Ok(0.0),
        Some(s) => s.parse().map_err(|e| {
            StreamError::decode(Category::Candle, format!("field {} ({:?}): {}", index, s, e))
        }),
    }
}

/// Decode a candle payload
///
/// `period` comes from the table name and is `None` when that name carried
/// no usable granularity.
pub fn decode(
    data: &Value,
    period: Option<KlinePeriod>,
    resolver: &dyn ContractResolver,
) -> StreamResult<Vec<Kline>> {
    let wire: Vec<WireCandle> = records(Category::Candle, data)?;

    wire.into_iter()
        .map(|w| {
            let c = &w.candle;
            if c.len() < MIN_FIELDS {
                return Err(StreamError::decode(
                    Category::Candle,
                    format!("expected at least {} fields, got {}", MIN_FIELDS, c.len()),
                ));
            }

            let (pair, contract_alias) = resolve_instrument(resolver, &w.instrument_id);
            Ok(Kline {
                pair,
                contract_alias,
                period,
                timestamp_ms: timestamp_ms(&c[0]),
                open: field(c, 1)?,
                high: field(c, 2)?,
                low: field(c, 3)?,
                close: field(c, 4)?,
                volume: field(c, 5)?,
                currency_volume: field(c, 6)?,
                instrument_id: w.instrument_id,
            })
        })
        .collect()
}
