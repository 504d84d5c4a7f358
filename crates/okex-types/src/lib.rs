//! Shared types for the OKEx v3 streaming API
//!
//! This crate provides the core type definitions used across the workspace.
//! It has minimal dependencies and no async runtime.
//!
//! # Key Types
//!
//! - [`CurrencyPair`] - Trading pair (e.g., "BTC_USD") with an unknown sentinel
//! - [`Category`], [`Market`], [`ContractType`], [`KlinePeriod`], [`Side`] - Topic enums
//! - [`DepthRecord`] - Depth price level
//! - [`DomainEvent`] - Tagged union of normalized events

pub mod convert;
pub mod depth;
pub mod enums;
pub mod events;
pub mod pair;

// Re-export commonly used types
pub use depth::*;
pub use enums::*;
pub use events::*;
pub use pair::*;
