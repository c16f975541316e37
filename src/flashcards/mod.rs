//! Card, deck and language records
//!
//! This module provides:
//! - The record types shared by the cache and progress services
//! - Deck construction from flat card lists
//! - Typed decoding of remote documents

pub mod builder;
pub mod decode;
pub mod models;

pub use builder::{build_decks, topics_for_language};
pub use decode::{decode_batch, decode_card, decode_language, DecodeError};
pub use models::*;
