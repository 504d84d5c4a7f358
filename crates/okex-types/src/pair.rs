//! Currency pairs (BTC_USD format)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const UNKNOWN: &str = "UNKNOWN";

/// Trading pair, normalized to upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (e.g., "BTC")
    pub base: String,
    /// Quote currency (e.g., "USD")
    pub quote: String,
}

impl CurrencyPair {
    /// Create a new pair
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().to_uppercase(),
            quote: quote.as_ref().to_uppercase(),
        }
    }

    /// Sentinel for instruments the contract metadata could not resolve
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }

    /// Check for the unknown sentinel
    pub fn is_unknown(&self) -> bool {
        self.base == UNKNOWN && self.quote == UNKNOWN
    }

    /// Join base and quote with a separator, e.g. `BTC-USD`
    pub fn to_symbol(&self, sep: &str) -> String {
        format!("{}{}{}", self.base, sep, self.quote)
    }

    /// Perpetual swap instrument id, e.g. `BTC-USD-SWAP`
    pub fn swap_instrument_id(&self) -> String {
        format!("{}-SWAP", self.to_symbol("-"))
    }

    /// Parse a swap instrument id (`BTC-USD-SWAP`)
    pub fn from_swap_instrument(instrument_id: &str) -> Option<Self> {
        let mut parts = instrument_id.split('-');
        let base = parts.next()?;
        let quote = parts.next()?;
        match (parts.next(), parts.next()) {
            (Some("SWAP"), None) if !base.is_empty() && !quote.is_empty() => {
                Some(Self::new(base, quote))
            }
            _ => None,
        }
    }
}

impl FromStr for CurrencyPair {
    type Err = PairParseError;

    /// Accepts `_`, `-` or `/` as separator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = ['_', '-', '/']
            .into_iter()
            .find(|c| s.contains(*c))
            .ok_or_else(|| PairParseError::MissingSeparator(s.to_string()))?;

        let parts: Vec<&str> = s.split(sep).collect();
        if parts.len() != 2 {
            return Err(PairParseError::InvalidFormat(s.to_string()));
        }

        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(PairParseError::EmptyPart(s.to_string()));
        }

        Ok(Self::new(parts[0], parts[1]))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

/// Error parsing a currency pair
#[derive(Debug, Clone, thiserror::Error)]
pub enum PairParseError {
    #[error("Pair must contain '_', '-' or '/': {0}")]
    MissingSeparator(String),

    #[error("Invalid pair format: {0}")]
    InvalidFormat(String),

    #[error("Pair has empty base or quote: {0}")]
    EmptyPart(String),
}
