use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use donkey_lib::cache::DeckCacheManager;
use donkey_lib::clock::{Clock, SystemClock};
use donkey_lib::config::AppConfig;
use donkey_lib::flashcards::Deck;
use donkey_lib::progress::ProgressLedger;

/// Shared application state for CLI commands
pub struct App {
    pub cache: DeckCacheManager,
    pub ledger: ProgressLedger,
}

impl App {
    /// Initialize from a config file, or the default location
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => AppConfig::default_path().context("Failed to get config directory")?,
        };
        let config = AppConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let kv = config.open_store().context("Failed to open local store")?;
        let store = config
            .document_store()
            .context("Failed to set up remote document store")?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let cache = DeckCacheManager::with_collections(
            store,
            kv.clone(),
            clock.clone(),
            config.refresh_policy(),
            config.collections(),
        );
        let ledger = ProgressLedger::load(kv, clock);

        Ok(Self { cache, ledger })
    }

    /// Find a deck by storage id across the languages with cached cards
    ///
    /// Storage ids start with the language (`EN_Animals`, `EN_Todos`), so that
    /// language is tried first.
    pub async fn find_deck(&self, deck_id: &str) -> Result<Deck> {
        let languages = self.cache.get_languages(false).await;
        let mut names: Vec<String> = languages.into_iter().map(|l| l.name).collect();
        names.sort_by_key(|name| !deck_id_mentions(deck_id, name));

        for language in &names {
            let decks = self.cache.get_decks_for_language(language, false).await;
            if let Some(deck) = decks.into_iter().find(|d| d.storage_id() == deck_id) {
                return Ok(deck);
            }
        }

        bail!("No deck with id '{}'", deck_id)
    }
}

fn deck_id_mentions(deck_id: &str, language: &str) -> bool {
    deck_id
        .strip_prefix(language)
        .map_or(false, |rest| rest.starts_with('_'))
}
