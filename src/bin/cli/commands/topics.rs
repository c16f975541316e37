use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, language: &str, format: &OutputFormat) -> Result<()> {
    // Topics come from in-memory decks, so load them first
    app.cache.get_decks_for_language(language, false).await;
    let topics = app.cache.topics_for_language(language);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&topics)?);
        }
        OutputFormat::Plain => {
            if topics.is_empty() {
                println!("No topics for {}.", language);
            }
            for topic in &topics {
                println!("{}", topic);
            }
        }
    }

    Ok(())
}
