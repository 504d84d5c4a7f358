//! Subscription topics and the registry used to restore them
//!
//! A topic is written on the wire as `<prefix>/<channel>:<instrument>`, e.g.
//! `swap/depth5:BTC-USD-SWAP` or `futures/candle60s:BTC-USD-190329`.

use okex_types::{Category, KlinePeriod, Market};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// One subscribable topic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    /// `swap` or `futures`
    pub market: Market,
    /// Message category
    pub category: Category,
    /// Instrument id, or currency for account topics
    pub instrument: String,
    /// Candle period; only meaningful for [`Category::Candle`]
    pub period: Option<KlinePeriod>,
}

impl Topic {
    /// Create a topic for a non-candle category
    pub fn new(market: Market, category: Category, instrument: impl Into<String>) -> Self {
        Self {
            market,
            category,
            instrument: instrument.into(),
            period: None,
        }
    }

    /// Create a candle topic
    pub fn kline(market: Market, instrument: impl Into<String>, period: KlinePeriod) -> Self {
        Self {
            market,
            category: Category::Candle,
            instrument: instrument.into(),
            period: Some(period),
        }
    }

    /// Channel name as used on the wire
    ///
    /// A candle topic without a period subscribes to one-minute candles.
    pub fn channel(&self) -> String {
        match self.category {
            Category::Depth => "depth5".to_string(),
            Category::Candle => self.period.unwrap_or(KlinePeriod::M1).channel(),
            other => other.as_str().to_string(),
        }
    }

    /// Subscribe argument, e.g. `swap/ticker:BTC-USD-SWAP`
    pub fn arg(&self) -> String {
        format!("{}/{}:{}", self.market, self.channel(), self.instrument)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.arg())
    }
}

/// Build a subscribe frame for several topics
pub fn subscribe_request<'a>(topics: impl IntoIterator<Item = &'a Topic>) -> serde_json::Value {
    let args: Vec<String> = topics.into_iter().map(Topic::arg).collect();
    serde_json::json!({
        "op": "subscribe",
        "args": args
    })
}

/// Records accepted subscriptions for replay after reconnect
///
/// Topics are kept in insertion order and never duplicated.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: Vec<Topic>,
    index: HashSet<Topic>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a topic; returns false if it was already recorded
    pub fn insert(&mut self, topic: Topic) -> bool {
        if !self.index.insert(topic.clone()) {
            return false;
        }
        self.topics.push(topic);
        true
    }

    /// Remove a topic; returns false if it was not recorded
    pub fn remove(&mut self, topic: &Topic) -> bool {
        if !self.index.remove(topic) {
            return false;
        }
        self.topics.retain(|t| t != topic);
        true
    }

    /// Check if a topic is recorded
    pub fn contains(&self, topic: &Topic) -> bool {
        self.index.contains(topic)
    }

    /// All recorded topics, oldest first
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Number of recorded topics
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Single subscribe frame re-sending every recorded topic
    pub fn restoration_request(&self) -> Option<serde_json::Value> {
        if self.topics.is_empty() {
            return None;
        }
        Some(subscribe_request(&self.topics))
    }
}

/// Registry entry that is rolled back unless committed
///
/// Held across the subscribe send. If the send fails or the subscribing
/// future is dropped, a topic this guard inserted is removed again. A topic
/// that was already recorded is left alone.
pub(crate) struct PendingSubscription<'a> {
    registry: &'a RwLock<SubscriptionRegistry>,
    inserted: Option<Topic>,
}

impl<'a> PendingSubscription<'a> {
    pub(crate) fn insert(registry: &'a RwLock<SubscriptionRegistry>, topic: &Topic) -> Self {
        let inserted = registry.write().insert(topic.clone());
        Self {
            registry,
            inserted: inserted.then(|| topic.clone()),
        }
    }

    pub(crate) fn commit(mut self) {
        self.inserted = None;
    }
}

impl Drop for PendingSubscription<'_> {
    fn drop(&mut self) {
        if let Some(topic) = self.inserted.take() {
            debug!("Rolling back subscription {}", topic);
            self.registry.write().remove(&topic);
        }
    }
}
