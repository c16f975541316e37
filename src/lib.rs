//! Offline-first flashcard catalog and learning progress
//!
//! Decks are built from cards fetched from a remote document store and cached
//! locally under a time-gated refresh policy. Answers and completion state are
//! tracked per deck in a local ledger.

pub mod cache;
pub mod clock;
pub mod config;
pub mod flashcards;
pub mod progress;
pub mod remote;
pub mod storage;
