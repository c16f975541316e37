//! Data models for cards, decks and languages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic label of the synthetic per-language deck holding every card
pub const ALL_TOPIC: &str = "Todos";

/// A single term/answer pair fetched from the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Remote document id, if the store supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub term: String,
    pub answer: String,
    pub language: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        term: impl Into<String>,
        answer: impl Into<String>,
        language: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            term: term.into(),
            answer: answer.into(),
            language: language.into(),
            topic: topic.into(),
            created_at: Utc::now(),
        }
    }

    /// Key used by the progress ledger; survives re-fetches and id changes
    pub fn storage_id(&self) -> String {
        format!("{}_{}_{}", self.language, self.topic, self.term)
    }
}

/// A grouping of cards sharing a language and a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Generated once per construction, never persisted as identity
    pub local_id: Uuid,
    pub name: String,
    pub language: String,
    pub topic: String,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(name: String, language: String, topic: String, cards: Vec<Card>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            name,
            language,
            topic,
            cards,
        }
    }

    /// Key joining a deck to its progress record
    pub fn storage_id(&self) -> String {
        format!("{}_{}", self.language, self.topic)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Whether this is the synthetic deck aggregating a whole language
    pub fn is_all_deck(&self) -> bool {
        self.topic == ALL_TOPIC
    }
}

/// A language offered by the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Language {
    pub fn new(name: impl Into<String>, active: bool) -> Self {
        Self {
            id: None,
            name: name.into(),
            active,
            created_at: Utc::now(),
        }
    }

    pub fn storage_id(&self) -> String {
        self.name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_storage_id_ignores_remote_id() {
        let mut a = Card::new("dog", "cão", "EN", "Animals");
        let mut b = a.clone();
        a.id = Some("abc".to_string());
        b.id = None;
        assert_eq!(a.storage_id(), "EN_Animals_dog");
        assert_eq!(a.storage_id(), b.storage_id());
    }

    #[test]
    fn test_deck_storage_id_is_stable_across_constructions() {
        let first = Deck::new("Animals (EN)".into(), "EN".into(), "Animals".into(), Vec::new());
        let second = Deck::new("Animals (EN)".into(), "EN".into(), "Animals".into(), Vec::new());
        assert_ne!(first.local_id, second.local_id);
        assert_eq!(first.storage_id(), "EN_Animals");
        assert_eq!(first.storage_id(), second.storage_id());
    }

    #[test]
    fn test_language_storage_id_is_lowercase() {
        let language = Language::new("Inglês", true);
        assert_eq!(language.storage_id(), "inglês");
    }
}
