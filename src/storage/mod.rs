mod kv;

pub use kv::{Envelope, KvStore, Result, StorageError, SCHEMA_VERSION};

/// Keys of the persisted store
pub mod keys {
    pub const LANGUAGES: &str = "languages";
    pub const DECK_PROGRESS: &str = "deck_progress";
    pub const LANGUAGES_REFRESHED_AT: &str = "refreshed_at.languages";
    pub const CATALOG_REFRESHED_AT: &str = "refreshed_at.catalog";

    pub fn cards(language: &str) -> String {
        format!("cards.{}", language)
    }

    pub fn cards_refreshed_at(language: &str) -> String {
        format!("refreshed_at.cards.{}", language)
    }
}
