//! Contract metadata lookup
//!
//! Dated futures are named by delivery date (`BTC-USD-190329`), which says
//! nothing about whether the contract is this week's, next week's or the
//! quarterly one. A [`ContractResolver`] maps between the two. Swaps need no
//! lookup: `BTC-USD-SWAP` resolves locally.

use okex_types::{ContractType, CurrencyPair};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Metadata of one dated contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Exchange instrument id, e.g. `BTC-USD-190329`
    pub instrument_id: String,
    /// Contract alias: `this_week`, `next_week` or `quarter`
    pub alias: String,
    /// Underlying index currency, e.g. `BTC`
    pub underlying_index: String,
    /// Quote currency, e.g. `USD`
    pub quote_currency: String,
}

impl ContractInfo {
    /// Pair the contract trades
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.underlying_index, &self.quote_currency)
    }

    /// Parsed contract type
    pub fn contract_type(&self) -> Option<ContractType> {
        self.alias.parse().ok()
    }
}

/// Lookup between instrument ids and (pair, contract type)
pub trait ContractResolver: Send + Sync {
    /// Metadata for an instrument id
    fn contract_info(&self, instrument_id: &str) -> Option<ContractInfo>;

    /// Instrument id of the contract of `contract_type` on `pair`
    fn contract_id(&self, pair: &CurrencyPair, contract_type: ContractType) -> Option<String>;
}

/// Resolve an instrument id to its pair and contract alias
///
/// Unresolvable instruments map to [`CurrencyPair::unknown`] with an empty
/// alias so one unknown record never sinks a whole batch.
pub fn resolve_instrument(
    resolver: &dyn ContractResolver,
    instrument_id: &str,
) -> (CurrencyPair, String) {
    if let Some(pair) = CurrencyPair::from_swap_instrument(instrument_id) {
        return (pair, ContractType::Swap.as_str().to_string());
    }

    match resolver.contract_info(instrument_id) {
        Some(info) => (info.pair(), info.alias),
        None => {
            warn!("No contract metadata for {}", instrument_id);
            (CurrencyPair::unknown(), String::new())
        }
    }
}

/// Instrument id for a subscription
///
/// Swaps are built locally; dated futures go through the resolver.
pub fn instrument_id(
    resolver: &dyn ContractResolver,
    pair: &CurrencyPair,
    contract_type: ContractType,
) -> Option<String> {
    match contract_type {
        ContractType::Swap => Some(pair.swap_instrument_id()),
        _ => resolver.contract_id(pair, contract_type),
    }
}

/// In-memory contract table, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct ContractTable {
    by_id: HashMap<String, ContractInfo>,
}

impl ContractTable {
    /// Create an empty table (swaps only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of contracts
    pub fn from_contracts(contracts: impl IntoIterator<Item = ContractInfo>) -> Self {
        let by_id = contracts
            .into_iter()
            .map(|c| (c.instrument_id.clone(), c))
            .collect();
        Self { by_id }
    }

    /// Parse the body of `GET /api/futures/v3/instruments`
    ///
    /// Fields other than the four in [`ContractInfo`] are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let contracts: Vec<ContractInfo> = serde_json::from_str(json)?;
        Ok(Self::from_contracts(contracts))
    }

    /// Add or replace a contract
    pub fn insert(&mut self, info: ContractInfo) {
        self.by_id.insert(info.instrument_id.clone(), info);
    }

    /// Number of dated contracts known
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the table has no dated contracts
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl ContractResolver for ContractTable {
    fn contract_info(&self, instrument_id: &str) -> Option<ContractInfo> {
        self.by_id.get(instrument_id).cloned()
    }

    /// Several contracts may share an alias while an expired one is still
    /// loaded; the latest delivery wins. Ids of one pair differ only in their
    /// `YYMMDD` suffix, so they order by delivery date.
    fn contract_id(&self, pair: &CurrencyPair, contract_type: ContractType) -> Option<String> {
        self.by_id
            .values()
            .filter(|c| c.alias == contract_type.as_str() && &c.pair() == pair)
            .max_by(|a, b| a.instrument_id.cmp(&b.instrument_id))
            .map(|c| c.instrument_id.clone())
    }
}
