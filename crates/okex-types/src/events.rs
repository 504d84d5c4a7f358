//! Normalized domain events
//!
//! Every table frame decodes into one or more [`DomainEvent`]s. Each variant
//! belongs to exactly one [`Category`], which selects the handler that
//! receives it.

use crate::depth::DepthRecord;
use crate::enums::{Category, KlinePeriod, OrderKind, OrderStatus, Side};
use crate::pair::CurrencyPair;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ticker update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Exchange instrument id (e.g. `BTC-USD-SWAP`)
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias (`swap`, `this_week`, ...)
    pub contract_alias: String,
    /// Last trade price
    pub last: f64,
    /// Best bid
    pub buy: f64,
    /// Best ask
    pub sell: f64,
    /// 24h high
    pub high: f64,
    /// 24h low
    pub low: f64,
    /// 24h volume
    pub volume: f64,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
}

impl Ticker {
    /// Get the spread
    pub fn spread(&self) -> f64 {
        self.sell - self.buy
    }

    /// Get the mid price
    pub fn mid_price(&self) -> f64 {
        (self.sell + self.buy) / 2.0
    }
}

/// Depth snapshot
///
/// `asks` are sorted by descending price, so the best ask is the **last**
/// element. `bids` keep the order they had on the wire (best first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    /// Exchange instrument id
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias
    pub contract_alias: String,
    /// Ask levels, descending by price
    pub asks: Vec<DepthRecord>,
    /// Bid levels, wire order
    pub bids: Vec<DepthRecord>,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
}

impl Depth {
    /// Lowest ask
    pub fn best_ask(&self) -> Option<&DepthRecord> {
        self.asks.last()
    }

    /// Highest bid
    pub fn best_bid(&self) -> Option<&DepthRecord> {
        self.bids.first()
    }

    /// Best ask minus best bid
    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }
}

/// Public trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange trade id
    pub trade_id: i64,
    /// Exchange instrument id
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias
    pub contract_alias: String,
    /// Taker side
    pub side: Side,
    /// Price
    pub price: f64,
    /// Amount in contracts
    pub amount: f64,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
}

/// Candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Exchange instrument id
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias
    pub contract_alias: String,
    /// Candle period; `None` when the table name carried no usable period
    pub period: Option<KlinePeriod>,
    /// Candle open time, epoch milliseconds
    pub timestamp_ms: i64,
    /// Open
    pub open: f64,
    /// High
    pub high: f64,
    /// Low
    pub low: f64,
    /// Close
    pub close: f64,
    /// Volume in contracts
    pub volume: f64,
    /// Volume in coin
    pub currency_volume: f64,
}

/// Order update (private)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Exchange order id
    pub order_id: String,
    /// Client supplied id, empty if none
    pub client_oid: String,
    /// Exchange instrument id
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias
    pub contract_alias: String,
    /// Limit price
    pub price: f64,
    /// Average fill price
    pub avg_price: f64,
    /// Order size in contracts
    pub amount: f64,
    /// Filled contracts
    pub filled_amount: f64,
    /// Fee paid (negative when charged)
    pub fee: f64,
    /// Order state
    pub status: OrderStatus,
    /// Open/close long/short
    pub kind: OrderKind,
    /// Leverage
    pub leverage: f64,
    /// Face value of one contract
    pub contract_value: f64,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
}

impl OrderUpdate {
    /// Contracts still to fill
    pub fn remaining(&self) -> f64 {
        self.amount - self.filled_amount
    }
}

/// Per-currency account balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAccount {
    /// Currency code (e.g. `BTC`, `BTC-USDT`)
    pub currency: String,
    /// Account equity
    pub equity: f64,
    /// Margin frozen by open orders and positions
    pub margin_frozen: f64,
    /// Realized profit and loss
    pub realized_pnl: f64,
    /// Unrealized profit and loss
    pub unrealized_pnl: f64,
    /// Margin ratio
    pub margin_ratio: f64,
}

/// Account update (private)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// Balances keyed by currency
    pub accounts: HashMap<String, SubAccount>,
}

/// One side of a hedged position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionLeg {
    /// Contracts held
    pub qty: f64,
    /// Contracts that can be closed
    pub available: f64,
    /// Average open price
    pub avg_cost: f64,
    /// Settlement price
    pub settlement_price: f64,
    /// Margin
    pub margin: f64,
    /// Profit and loss
    pub pnl: f64,
    /// Profit and loss ratio
    pub pnl_ratio: f64,
    /// Unrealised profit and loss
    pub unrealised_pnl: f64,
}

/// Position update (private)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Exchange instrument id
    pub instrument_id: String,
    /// Resolved pair
    pub pair: CurrencyPair,
    /// Contract alias
    pub contract_alias: String,
    /// Long leg
    pub long: PositionLeg,
    /// Short leg
    pub short: PositionLeg,
    /// Realised profit and loss
    pub realised_pnl: f64,
    /// Leverage
    pub leverage: f64,
    /// Estimated liquidation price
    pub liquidation_price: f64,
    /// Epoch milliseconds
    pub created_at_ms: i64,
    /// Epoch milliseconds
    pub updated_at_ms: i64,
}

impl PositionUpdate {
    /// Long minus short contracts
    pub fn net_qty(&self) -> f64 {
        self.long.qty - self.short.qty
    }
}

/// Tagged union of every decoded event
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Ticker(Ticker),
    Depth(Depth),
    Trade(Trade),
    Kline(Kline),
    Order(OrderUpdate),
    Account(AccountUpdate),
    Position(PositionUpdate),
}

impl DomainEvent {
    /// Category whose handler receives this event
    pub fn category(&self) -> Category {
        match self {
            Self::Ticker(_) => Category::Ticker,
            Self::Depth(_) => Category::Depth,
            Self::Trade(_) => Category::Trade,
            Self::Kline(_) => Category::Candle,
            Self::Order(_) => Category::Order,
            Self::Account(_) => Category::Account,
            Self::Position(_) => Category::Position,
        }
    }
}

macro_rules! impl_from_event {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DomainEvent {
                fn from(e: $ty) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

impl_from_event! {
    Ticker => Ticker,
    Depth => Depth,
    Trade => Trade,
    Kline => Kline,
    OrderUpdate => Order,
    AccountUpdate => Account,
    PositionUpdate => Position,
}
