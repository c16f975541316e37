//! Catalog cache: languages and decks, refreshed from the remote store

mod manager;
pub mod policy;

pub use manager::{CacheEvent, Collections, DeckCacheManager, RefreshOutcome};
pub use policy::RefreshPolicy;
