//! Per-category handler registry
//!
//! At most one handler per [`Category`]. Registering again replaces the
//! previous handler. Handlers run on the receive task, so they should return
//! quickly; anything slow belongs on a channel.

use dashmap::DashMap;
use okex_types::{
    AccountUpdate, Category, Depth, DomainEvent, Kline, OrderUpdate, PositionUpdate, Ticker, Trade,
};
use std::sync::Arc;
use tracing::debug;

/// Type-erased handler stored in the registry
pub type EventHandler = Arc<dyn Fn(DomainEvent) + Send + Sync>;

/// Handler table keyed by category
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<Category, EventHandler>,
}

macro_rules! typed_registration {
    ($($(#[$doc:meta])* $name:ident => $category:ident, $variant:ident($ty:ty);)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&self, handler: F)
            where
                F: Fn($ty) + Send + Sync + 'static,
            {
                self.register(Category::$category, move |event| {
                    if let DomainEvent::$variant(inner) = event {
                        handler(inner)
                    }
                });
            }
        )*
    };
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw handler for a category, replacing any existing one
    pub fn register<F>(&self, category: Category, handler: F)
    where
        F: Fn(DomainEvent) + Send + Sync + 'static,
    {
        if self.handlers.insert(category, Arc::new(handler)).is_some() {
            debug!("Replaced handler for {}", category);
        }
    }

    /// Remove the handler for a category
    pub fn remove(&self, category: Category) -> bool {
        self.handlers.remove(&category).is_some()
    }

    /// Check if a handler is registered for a category
    pub fn contains(&self, category: Category) -> bool {
        self.handlers.contains_key(&category)
    }

    /// Deliver an event to its category's handler
    ///
    /// Returns false if no handler is registered. The map lock is released
    /// before the handler runs, so handlers may register other handlers.
    pub fn dispatch(&self, event: DomainEvent) -> bool {
        let handler = self
            .handlers
            .get(&event.category())
            .map(|entry| Arc::clone(entry.value()));

        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    typed_registration! {
        /// Register the ticker handler
        on_ticker => Ticker, Ticker(Ticker);
        /// Register the depth handler
        on_depth => Depth, Depth(Depth);
        /// Register the trade handler
        on_trade => Trade, Trade(Trade);
        /// Register the candle handler
        on_kline => Candle, Kline(Kline);
        /// Register the order handler
        on_order => Order, Order(OrderUpdate);
        /// Register the account handler
        on_account => Account, Account(AccountUpdate);
        /// Register the position handler
        on_position => Position, Position(PositionUpdate);
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let categories: Vec<Category> = self.handlers.iter().map(|e| *e.key()).collect();
        f.debug_struct("HandlerRegistry")
            .field("categories", &categories)
            .finish()
    }
}
