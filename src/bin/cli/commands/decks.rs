use std::time::Duration;

use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

/// Longest wait for a background refresh before the process exits
const BACKGROUND_WAIT: Duration = Duration::from_secs(30);

pub async fn run(app: &App, language: &str, refresh: bool, format: &OutputFormat) -> Result<()> {
    let decks = app.cache.get_decks_for_language(language, refresh).await;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = decks.iter().map(|deck| {
                serde_json::json!({
                    "id": deck.storage_id(),
                    "name": deck.name,
                    "language": deck.language,
                    "topic": deck.topic,
                    "cardCount": deck.len(),
                    "cards": deck.cards.iter().map(|card| serde_json::json!({
                        "id": card.storage_id(),
                        "term": card.term,
                        "answer": card.answer,
                    })).collect::<Vec<_>>(),
                })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if decks.is_empty() {
                println!("No decks for {}.", language);
            } else {
                let name_width = decks.iter().map(|d| d.name.len()).max().unwrap_or(4).max(4);
                println!("{:<nw$} {:>5}  {}", "Deck", "Cards", "ID", nw = name_width);
                println!("{} {}  {}", "\u{2500}".repeat(name_width), "\u{2500}".repeat(5), "\u{2500}".repeat(10));
                for deck in &decks {
                    println!("{:<nw$} {:>5}  {}", deck.name, deck.len(), deck.storage_id(), nw = name_width);
                }
            }
        }
    }

    // Let a stale-cache refresh land on disk for the next run
    let deadline = tokio::time::Instant::now() + BACKGROUND_WAIT;
    while app.cache.is_refreshing(language) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if app.cache.is_refreshing(language) {
        log::warn!("Background refresh for {} still running at exit", language);
    }

    Ok(())
}
