//! Progress ledger
//!
//! Holds every deck's [`DeckProgress`] in memory and writes the whole mapping
//! back to the local store after each mutation.
//!
//! Per deck: Unstarted (no record) -> InProgress -> Completed. Only `reset`
//! leaves Completed.

use std::collections::HashMap;
use std::sync::Arc;

use super::models::DeckProgress;
use crate::clock::Clock;
use crate::storage::{keys, KvStore};

pub struct ProgressLedger {
    kv: KvStore,
    clock: Arc<dyn Clock>,
    progress: HashMap<String, DeckProgress>,
}

impl ProgressLedger {
    /// Load all persisted progress; unreadable data starts the ledger empty
    pub fn load(kv: KvStore, clock: Arc<dyn Clock>) -> Self {
        let mut progress = match kv.get_json::<HashMap<String, DeckProgress>>(keys::DECK_PROGRESS) {
            Ok(Some(envelope)) => envelope.payload,
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::error!("Discarding unreadable deck progress: {}", e);
                HashMap::new()
            }
        };

        for record in progress.values_mut() {
            if !record.is_consistent() {
                log::warn!("Repairing answer tallies for deck {}", record.deck_id);
                record.reconcile();
            }
        }

        log::info!("Loaded progress for {} decks", progress.len());
        Self { kv, clock, progress }
    }

    fn save(&self) {
        if let Err(e) = self
            .kv
            .set_json(keys::DECK_PROGRESS, &self.progress, self.clock.now())
        {
            log::error!("Failed to persist deck progress: {}", e);
        }
    }

    /// Get the record for a deck, creating and persisting an empty one if absent
    pub fn get_progress(&mut self, deck_id: &str) -> DeckProgress {
        if let Some(record) = self.progress.get(deck_id) {
            return record.clone();
        }

        let record = DeckProgress::new(deck_id.to_string(), self.clock.now());
        self.progress.insert(deck_id.to_string(), record.clone());
        self.save();
        record
    }

    fn entry(&mut self, deck_id: &str) -> &mut DeckProgress {
        let now = self.clock.now();
        self.progress
            .entry(deck_id.to_string())
            .or_insert_with(|| DeckProgress::new(deck_id.to_string(), now))
    }

    /// Record an answer; answering the same card again replaces the old answer
    pub fn record_answer(&mut self, deck_id: &str, card_id: &str, correct: bool) -> DeckProgress {
        let now = self.clock.now();
        let record = self.entry(deck_id);
        record.record_answer(card_id.to_string(), correct, now);
        let snapshot = record.clone();
        self.save();
        snapshot
    }

    /// Remember the card index the user is on
    pub fn set_resume_position(&mut self, deck_id: &str, index: usize) {
        let now = self.clock.now();
        self.entry(deck_id).set_resume_position(index, now);
        self.save();
    }

    /// Mark the deck complete once every card has an answer
    ///
    /// Returns the deck's `completed` flag after the check. Never clears it.
    pub fn check_completion(&mut self, deck_id: &str, total_cards: usize) -> bool {
        let now = self.clock.now();
        let record = self.entry(deck_id);
        if record.completed || total_cards == 0 || record.total_answered() < total_cards {
            return record.completed;
        }

        record.mark_completed(now);
        log::info!("Deck {} completed", deck_id);
        self.save();
        true
    }

    /// Discard all history for a deck
    pub fn reset(&mut self, deck_id: &str) {
        let record = DeckProgress::new(deck_id.to_string(), self.clock.now());
        self.progress.insert(deck_id.to_string(), record);
        log::info!("Reset progress for deck {}", deck_id);
        self.save();
    }

    /// Discard all history for every deck
    pub fn reset_all(&mut self) {
        self.progress.clear();
        log::info!("Reset progress for all decks");
        self.save();
    }

    /// Storage ids of completed decks, sorted
    pub fn completed_decks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .progress
            .values()
            .filter(|p| p.completed)
            .map(|p| p.deck_id.clone())
            .collect();
        ids.sort();
        ids
    }
}
