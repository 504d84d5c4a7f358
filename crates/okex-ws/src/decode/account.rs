//! Account channel (`swap/account`, `futures/account`), private
//!
//! Each record maps a currency code to its balances:
//! `[{"BTC":{"equity":"1.2", ...}}]`. All records of one frame are merged
//! into a single [`AccountUpdate`].

use super::records;
use crate::error::StreamResult;
use okex_types::convert::de_f64;
use okex_types::{AccountUpdate, Category, SubAccount};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct WireSubAccount {
    #[serde(default, deserialize_with = "de_f64")]
    equity: f64,
    #[serde(default, deserialize_with = "de_f64")]
    margin_frozen: f64,
    #[serde(default, deserialize_with = "de_f64")]
    realized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    margin_ratio: f64,
}

/// Decode an account payload
pub fn decode(data: &Value) -> StreamResult<AccountUpdate> {
    let wire: Vec<HashMap<String, WireSubAccount>> = records(Category::Account, data)?;

    let accounts = wire
        .into_iter()
        .flatten()
        .map(|(currency, a)| {
            let sub = SubAccount {
                currency: currency.clone(),
                equity: a.equity,
                margin_frozen: a.margin_frozen,
                realized_pnl: a.realized_pnl,
                unrealized_pnl: a.unrealized_pnl,
                margin_ratio: a.margin_ratio,
            };
            (currency, sub)
        })
        .collect();

    Ok(AccountUpdate { accounts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_account() {
        let data: Value = serde_json::from_str(
            r#"[{"BTC":{"equity":"1.5","margin_frozen":"0.1","realized_pnl":"0.01","unrealized_pnl":"-0.02","margin_ratio":"12.5"}},
                {"BTC-USDT":{"equity":"1000"}}]"#,
        )
        .unwrap();

        let update = decode(&data).unwrap();
        assert_eq!(update.accounts.len(), 2);

        let btc = &update.accounts["BTC"];
        assert_eq!(btc.equity, 1.5);
        assert_eq!(btc.unrealized_pnl, -0.02);
        assert_eq!(update.accounts["BTC-USDT"].equity, 1000.0);
        assert_eq!(update.accounts["BTC-USDT"].margin_ratio, 0.0);
    }

    #[test]
    fn test_bad_shape() {
        let data: Value = serde_json::from_str(r#"[{"BTC":"1.5"}]"#).unwrap();
        assert!(decode(&data).is_err());
    }
}
