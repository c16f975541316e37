use anyhow::{Result, bail};
use chrono::Utc;

use donkey_lib::progress::DeckProgress;

use crate::app::App;
use crate::OutputFormat;

fn progress_json(progress: &DeckProgress) -> serde_json::Value {
    serde_json::json!({
        "deckId": progress.deck_id,
        "answered": progress.total_answered(),
        "correct": progress.correct_total,
        "incorrect": progress.incorrect_total,
        "accuracy": progress.accuracy(),
        "completed": progress.completed,
        "completedAt": progress.completed_at.map(|t| t.to_rfc3339()),
        "lastCardIndex": progress.last_card_index,
        "lastInteractionAt": progress.last_interaction_at.to_rfc3339(),
    })
}

fn print_progress(progress: &DeckProgress) {
    println!("Deck: {}", progress.deck_id);
    println!(
        "  Answered: {} ({} correct, {} incorrect, {:.0}% accuracy)",
        progress.total_answered(),
        progress.correct_total,
        progress.incorrect_total,
        progress.accuracy()
    );
    println!("  Resume at card: {}", progress.last_card_index);
    match progress.time_since_completion(Utc::now()) {
        Some(since) => println!("  Completed {} days ago", since.num_days()),
        None => println!("  Not completed"),
    }
}

pub fn run_show(app: &mut App, deck_id: &str, format: &OutputFormat) -> Result<()> {
    let progress = app.ledger.get_progress(deck_id);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&progress_json(&progress))?),
        OutputFormat::Plain => print_progress(&progress),
    }

    Ok(())
}

pub async fn run_answer(
    app: &mut App,
    deck_id: &str,
    card_id: &str,
    correct: bool,
    total: Option<usize>,
    format: &OutputFormat,
) -> Result<()> {
    let total = match total {
        Some(total) => total,
        None => app.find_deck(deck_id).await?.len(),
    };

    let recorded = app.ledger.record_answer(deck_id, card_id, correct);
    let completed_now = !recorded.completed && app.ledger.check_completion(deck_id, total);
    let progress = app.ledger.get_progress(deck_id);

    match format {
        OutputFormat::Json => {
            let mut output = progress_json(&progress);
            output["totalCards"] = serde_json::json!(total);
            output["percent"] = serde_json::json!(progress.completion_percent(total));
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Recorded {} answer for {} ({}/{} cards, {:.0}%)",
                if correct { "correct" } else { "incorrect" },
                card_id,
                progress.total_answered(),
                total,
                progress.completion_percent(total)
            );
            if completed_now {
                println!("Deck {} completed!", deck_id);
            }
        }
    }

    Ok(())
}

pub fn run_resume(app: &mut App, deck_id: &str, index: usize, format: &OutputFormat) -> Result<()> {
    app.ledger.set_resume_position(deck_id, index);
    let progress = app.ledger.get_progress(deck_id);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&progress_json(&progress))?),
        OutputFormat::Plain => println!("Deck {} will resume at card {}", deck_id, progress.last_card_index),
    }

    Ok(())
}

pub fn run_reset(app: &mut App, deck_id: Option<&str>, all: bool, format: &OutputFormat) -> Result<()> {
    let message = match (deck_id, all) {
        (_, true) => {
            app.ledger.reset_all();
            "Reset progress for all decks".to_string()
        }
        (Some(deck_id), false) => {
            app.ledger.reset(deck_id);
            format!("Reset progress for {}", deck_id)
        }
        (None, false) => bail!("Pass a deck id or --all"),
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "reset": if all { serde_json::Value::Null } else { serde_json::json!(deck_id) },
                "all": all,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("{}", message),
    }

    Ok(())
}

pub fn run_completed(app: &App, format: &OutputFormat) -> Result<()> {
    let completed = app.ledger.completed_decks();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&completed)?),
        OutputFormat::Plain => {
            if completed.is_empty() {
                println!("No completed decks.");
            }
            for deck_id in &completed {
                println!("{}", deck_id);
            }
        }
    }

    Ok(())
}
