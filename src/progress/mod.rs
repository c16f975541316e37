//! Per-deck learning progress, persisted across restarts

mod ledger;
mod models;

pub use ledger::ProgressLedger;
pub use models::DeckProgress;
