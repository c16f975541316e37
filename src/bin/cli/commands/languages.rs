use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, refresh: bool, format: &OutputFormat) -> Result<()> {
    let languages = app.cache.get_languages(refresh).await;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = languages.iter().map(|language| {
                serde_json::json!({
                    "id": language.storage_id(),
                    "name": language.name,
                    "active": language.active,
                    "createdAt": language.created_at.to_rfc3339(),
                })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if languages.is_empty() {
                println!("No languages available.");
                return Ok(());
            }
            for language in &languages {
                println!("{}", language.name);
            }
        }
    }

    Ok(())
}
