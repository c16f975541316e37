pub mod decks;
pub mod languages;
pub mod progress;
pub mod refresh;
pub mod topics;
