//! Typed decoders, one per category
//!
//! Each decoder reads the `data` array of a table frame into its wire shape,
//! resolves instruments through the [`ContractResolver`], and normalizes the
//! result into [`DomainEvent`]s. A payload that does not match the wire shape
//! fails the whole frame; an instrument that cannot be resolved does not.

pub mod account;
pub mod depth;
pub mod kline;
pub mod order;
pub mod position;
pub mod ticker;
pub mod trade;

use crate::channel::TableKind;
use crate::contract::ContractResolver;
use crate::error::{StreamError, StreamResult};
use okex_types::convert::rfc3339_to_millis;
use okex_types::{Category, DomainEvent};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Decode the payload of a classified table frame
pub fn decode(
    kind: &TableKind,
    data: &Value,
    resolver: &dyn ContractResolver,
) -> StreamResult<Vec<DomainEvent>> {
    let events = match kind.category {
        Category::Ticker => into_events(ticker::decode(data, resolver)?),
        Category::Depth => into_events(depth::decode(data, resolver)?),
        Category::Trade => into_events(trade::decode(data, resolver)?),
        Category::Candle => into_events(kline::decode(data, kind.period(), resolver)?),
        Category::Order => into_events(order::decode(data, resolver)?),
        Category::Account => vec![account::decode(data)?.into()],
        Category::Position => into_events(position::decode(data, resolver)?),
    };
    Ok(events)
}

fn into_events<T: Into<DomainEvent>>(items: Vec<T>) -> Vec<DomainEvent> {
    items.into_iter().map(Into::into).collect()
}

/// Deserialize the `data` array into wire records
pub(crate) fn records<T: DeserializeOwned>(category: Category, data: &Value) -> StreamResult<Vec<T>> {
    Vec::<T>::deserialize(data).map_err(|e| StreamError::decode(category, e))
}

/// RFC 3339 to epoch milliseconds; 0 for empty or unparseable input
pub(crate) fn timestamp_ms(value: &str) -> i64 {
    if value.is_empty() {
        return 0;
    }
    rfc3339_to_millis(value).unwrap_or_else(|| {
        warn!("Unparseable timestamp: {}", value);
        0
    })
}
