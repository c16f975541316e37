//! Per-deck learning progress

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Answers and completion state for one deck, keyed by the deck's storage id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckProgress {
    pub deck_id: String,
    /// Card storage id -> answered correctly
    #[serde(default)]
    pub answers: HashMap<String, bool>,
    #[serde(default)]
    pub correct_total: usize,
    #[serde(default)]
    pub incorrect_total: usize,
    #[serde(default)]
    pub completed: bool,
    /// Set once when the deck first completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_interaction_at: DateTime<Utc>,
    #[serde(default)]
    pub last_card_index: usize,
}

impl DeckProgress {
    pub fn new(deck_id: String, now: DateTime<Utc>) -> Self {
        Self {
            deck_id,
            answers: HashMap::new(),
            correct_total: 0,
            incorrect_total: 0,
            completed: false,
            completed_at: None,
            last_interaction_at: now,
            last_card_index: 0,
        }
    }

    /// Record an answer, replacing any earlier answer for the same card
    pub(crate) fn record_answer(&mut self, card_id: String, correct: bool, now: DateTime<Utc>) {
        if let Some(previous) = self.answers.insert(card_id, correct) {
            if previous {
                self.correct_total = self.correct_total.saturating_sub(1);
            } else {
                self.incorrect_total = self.incorrect_total.saturating_sub(1);
            }
        }
        if correct {
            self.correct_total += 1;
        } else {
            self.incorrect_total += 1;
        }
        self.last_interaction_at = now;
    }

    pub(crate) fn set_resume_position(&mut self, index: usize, now: DateTime<Utc>) {
        self.last_card_index = index;
        self.last_interaction_at = now;
    }

    pub(crate) fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    /// Number of distinct cards answered
    pub fn total_answered(&self) -> usize {
        self.answers.len()
    }

    /// Percentage of answers that were correct; 0 before any answer
    pub fn accuracy(&self) -> f64 {
        let answered = self.total_answered();
        if answered == 0 {
            return 0.0;
        }
        self.correct_total as f64 / answered as f64 * 100.0
    }

    /// Share of a deck's cards answered so far, in percent
    pub fn completion_percent(&self, total_cards: usize) -> f64 {
        if total_cards == 0 {
            return 0.0;
        }
        (self.total_answered() as f64 / total_cards as f64 * 100.0).min(100.0)
    }

    pub fn time_since_completion(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.completed_at.map(|at| now.signed_duration_since(at))
    }

    /// Tallies agree with the answer map
    pub fn is_consistent(&self) -> bool {
        let correct = self.answers.values().filter(|c| **c).count();
        correct == self.correct_total && self.answers.len() - correct == self.incorrect_total
    }

    /// Recompute the tallies from the answer map
    pub(crate) fn reconcile(&mut self) {
        self.correct_total = self.answers.values().filter(|c| **c).count();
        self.incorrect_total = self.answers.len() - self.correct_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwriting_answer_keeps_tallies_consistent() {
        let now = Utc::now();
        let mut progress = DeckProgress::new("EN_Animals".to_string(), now);

        progress.record_answer("EN_Animals_dog".to_string(), true, now);
        progress.record_answer("EN_Animals_dog".to_string(), false, now);
        progress.record_answer("EN_Animals_dog".to_string(), false, now);

        assert_eq!(progress.total_answered(), 1);
        assert_eq!(progress.correct_total, 0);
        assert_eq!(progress.incorrect_total, 1);
        assert!(progress.is_consistent());
    }

    #[test]
    fn test_reconcile_repairs_drifted_tallies() {
        let now = Utc::now();
        let mut progress = DeckProgress::new("EN_Animals".to_string(), now);
        progress.answers.insert("a".to_string(), true);
        progress.answers.insert("b".to_string(), false);
        progress.correct_total = 3;
        progress.incorrect_total = 2;
        assert!(!progress.is_consistent());

        progress.reconcile();
        assert_eq!(progress.correct_total, 1);
        assert_eq!(progress.incorrect_total, 1);
        assert!(progress.is_consistent());
    }

    #[test]
    fn test_accuracy_and_completion_percent() {
        let now = Utc::now();
        let mut progress = DeckProgress::new("EN_Animals".to_string(), now);
        assert_eq!(progress.accuracy(), 0.0);
        assert_eq!(progress.completion_percent(0), 0.0);

        progress.record_answer("a".to_string(), true, now);
        progress.record_answer("b".to_string(), true, now);
        progress.record_answer("c".to_string(), false, now);
        progress.record_answer("d".to_string(), false, now);

        assert_eq!(progress.accuracy(), 50.0);
        assert_eq!(progress.completion_percent(8), 50.0);
        assert_eq!(progress.completion_percent(2), 100.0);
    }

    #[test]
    fn test_completed_at_set_once() {
        let start = Utc::now();
        let mut progress = DeckProgress::new("EN_Animals".to_string(), start);
        assert_eq!(progress.time_since_completion(start), None);

        progress.mark_completed(start);
        progress.mark_completed(start + Duration::hours(1));
        assert_eq!(progress.completed_at, Some(start));
        assert_eq!(
            progress.time_since_completion(start + Duration::hours(3)),
            Some(Duration::hours(3))
        );
    }

    #[test]
    fn test_resume_position_bumps_interaction() {
        let start = Utc::now();
        let mut progress = DeckProgress::new("EN_Animals".to_string(), start);

        progress.set_resume_position(4, start + Duration::minutes(1));
        assert_eq!(progress.last_card_index, 4);
        assert_eq!(progress.last_interaction_at, start + Duration::minutes(1));
    }
}
