use anyhow::Result;

use donkey_lib::cache::RefreshOutcome;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, force: bool, format: &OutputFormat) -> Result<()> {
    let outcome = app.cache.refresh_all_persisted(force).await;

    match format {
        OutputFormat::Json => {
            let output = match &outcome {
                RefreshOutcome::Refreshed { languages, decks } => serde_json::json!({
                    "status": "refreshed",
                    "languages": languages,
                    "decks": decks,
                }),
                RefreshOutcome::Throttled { remaining } => serde_json::json!({
                    "status": "throttled",
                    "remainingSecs": remaining.num_seconds(),
                }),
                RefreshOutcome::Unavailable => serde_json::json!({
                    "status": "unavailable",
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match &outcome {
            RefreshOutcome::Refreshed { languages, decks } => {
                println!("Refreshed {} languages and {} decks.", languages, decks);
            }
            RefreshOutcome::Throttled { remaining } => {
                println!(
                    "Catalog is up to date. Next refresh available in {}h {}m (use --force to override).",
                    remaining.num_hours(),
                    remaining.num_minutes() % 60
                );
            }
            RefreshOutcome::Unavailable => {
                println!("Remote store unavailable; cached catalog kept.");
            }
        },
    }

    Ok(())
}
