//! Category, Market, ContractType, KlinePeriod, Side and order enums

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message category carried by a table frame
///
/// Exactly one handler may be registered per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Best bid/ask and 24h statistics
    Ticker,
    /// Top-of-book depth (five levels per side)
    Depth,
    /// Public trades
    Trade,
    /// Candlesticks
    Candle,
    /// Order updates (private)
    Order,
    /// Account balances (private)
    Account,
    /// Position updates (private)
    Position,
}

impl Category {
    /// All categories
    pub const ALL: [Category; 7] = [
        Self::Ticker,
        Self::Depth,
        Self::Trade,
        Self::Candle,
        Self::Order,
        Self::Account,
        Self::Position,
    ];

    /// Returns the category name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Depth => "depth",
            Self::Trade => "trade",
            Self::Candle => "candle",
            Self::Order => "order",
            Self::Account => "account",
            Self::Position => "position",
        }
    }

    /// Returns true if the category requires a logged-in connection
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Order | Self::Account | Self::Position)
    }

    /// Map the trailing segment of a table name to a category
    ///
    /// `depth5` and `depth` both map to [`Category::Depth`]; candle names
    /// carry a period suffix and are matched by prefix.
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "ticker" => Some(Self::Ticker),
            "depth5" | "depth" => Some(Self::Depth),
            "trade" => Some(Self::Trade),
            "order" => Some(Self::Order),
            "account" => Some(Self::Account),
            "position" => Some(Self::Position),
            c if c.starts_with("candle") => Some(Self::Candle),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table prefix: which product line a topic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Perpetual swaps
    Swap,
    /// Dated futures
    Futures,
}

impl Market {
    /// Returns the table prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::Futures => "futures",
        }
    }

    /// Parse a table prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "swap" => Some(Self::Swap),
            "futures" => Some(Self::Futures),
            _ => None,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract type of a derivative instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Perpetual swap
    Swap,
    /// Weekly future
    ThisWeek,
    /// Bi-weekly future
    NextWeek,
    /// Quarterly future
    Quarter,
}

impl ContractType {
    /// Returns the contract alias as used by OKEx
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::ThisWeek => "this_week",
            Self::NextWeek => "next_week",
            Self::Quarter => "quarter",
        }
    }

    /// Returns the table prefix for this contract type
    pub fn market(&self) -> Market {
        match self {
            Self::Swap => Market::Swap,
            _ => Market::Futures,
        }
    }
}

impl FromStr for ContractType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swap" => Ok(Self::Swap),
            "this_week" => Ok(Self::ThisWeek),
            "next_week" => Ok(Self::NextWeek),
            "quarter" => Ok(Self::Quarter),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candlestick period supported by the candle channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlinePeriod {
    /// 1 minute
    M1,
    /// 3 minutes
    M3,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    M30,
    /// 1 hour
    H1,
    /// 2 hours
    H2,
    /// 4 hours
    H4,
    /// 6 hours
    H6,
    /// 12 hours
    H12,
    /// 1 day
    D1,
    /// 1 week
    W1,
}

impl KlinePeriod {
    /// Granularity in seconds, as embedded in `candle<N>s`
    pub fn seconds(&self) -> u32 {
        match self {
            Self::M1 => 60,
            Self::M3 => 180,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H2 => 7200,
            Self::H4 => 14400,
            Self::H6 => 21600,
            Self::H12 => 43200,
            Self::D1 => 86400,
            Self::W1 => 604800,
        }
    }

    /// Inverse of [`KlinePeriod::seconds`]
    ///
    /// Returns `None` for 0 (the "unknown period" sentinel) and for any
    /// granularity OKEx does not offer.
    pub fn from_seconds(seconds: u32) -> Option<Self> {
        match seconds {
            60 => Some(Self::M1),
            180 => Some(Self::M3),
            300 => Some(Self::M5),
            900 => Some(Self::M15),
            1800 => Some(Self::M30),
            3600 => Some(Self::H1),
            7200 => Some(Self::H2),
            14400 => Some(Self::H4),
            21600 => Some(Self::H6),
            43200 => Some(Self::H12),
            86400 => Some(Self::D1),
            604800 => Some(Self::W1),
            _ => None,
        }
    }

    /// Channel name, e.g. `candle60s`
    pub fn channel(&self) -> String {
        format!("candle{}s", self.seconds())
    }
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy / taker lifted the ask
    Buy,
    /// Sell / taker hit the bid
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Order state as reported on the order channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// -2
    Failed,
    /// -1
    Canceled,
    /// 0
    Open,
    /// 1
    PartiallyFilled,
    /// 2
    Filled,
    /// 3
    Submitting,
    /// 4
    Canceling,
    /// Any code OKEx adds later
    Unknown(i32),
}

impl OrderStatus {
    /// Map an OKEx `state` code
    pub fn from_code(code: i32) -> Self {
        match code {
            -2 => Self::Failed,
            -1 => Self::Canceled,
            0 => Self::Open,
            1 => Self::PartiallyFilled,
            2 => Self::Filled,
            3 => Self::Submitting,
            4 => Self::Canceling,
            other => Self::Unknown(other),
        }
    }

    /// Check if order is still working
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Open | Self::PartiallyFilled | Self::Submitting | Self::Canceling
        )
    }

    /// Check if order is terminal (no more changes)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled | Self::Filled)
    }
}

/// Direction of a futures/swap order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// 1
    OpenLong,
    /// 2
    OpenShort,
    /// 3
    CloseLong,
    /// 4
    CloseShort,
    /// Any other code
    Unknown(i32),
}

impl OrderKind {
    /// Map an OKEx `type` code
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::OpenLong,
            2 => Self::OpenShort,
            3 => Self::CloseLong,
            4 => Self::CloseShort,
            other => Self::Unknown(other),
        }
    }

    /// Side the order trades on
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::OpenLong | Self::CloseShort => Some(Side::Buy),
            Self::OpenShort | Self::CloseLong => Some(Side::Sell),
            Self::Unknown(_) => None,
        }
    }
}

/// Error for string-to-enum conversions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);
