//! Deck cache manager
//!
//! Decides, per read, whether to serve cached catalog data or go to the remote
//! store. Deck reads resolve in three tiers:
//! 1. decks already in memory
//! 2. the persisted card cache for the language (refreshed in the background
//!    when stale)
//! 3. a blocking fetch from the remote store
//!
//! Read operations never fail: remote errors fall back to whatever cache
//! exists, or to an empty result.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use super::policy::RefreshPolicy;
use crate::clock::Clock;
use crate::flashcards::{build_decks, decode_batch, decode_card, decode_language, topics_for_language};
use crate::flashcards::{Card, Deck, Language};
use crate::remote::{DocumentStore, RemoteError};
use crate::storage::{keys, KvStore};

/// Names of the remote collections holding the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub cards: String,
    pub languages: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            cards: "cards".to_string(),
            languages: "languages".to_string(),
        }
    }
}

/// Notifications delivered to the UI layer
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A background refresh replaced the decks of a language
    DecksRefreshed { language: String, decks: Vec<Deck> },
    /// The remote store is misconfigured; sent at most once
    ConfigurationError(String),
}

/// Result of an explicit catalog refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Languages and every loaded language's decks were re-fetched
    Refreshed { languages: usize, decks: usize },
    /// The refresh window has not elapsed yet; nothing was fetched
    Throttled { remaining: Duration },
    /// The remote store could not be reached; cached data is untouched
    Unavailable,
}

#[derive(Default)]
struct CacheState {
    languages: Option<Vec<Language>>,
    decks: HashMap<String, Vec<Deck>>,
    /// Last sequence number handed out per language
    issued: HashMap<String, u64>,
    /// Sequence number of the result currently installed per language
    applied: HashMap<String, u64>,
    /// Languages with a background refresh in flight
    refreshing: HashSet<String>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    kv: KvStore,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
    collections: Collections,
    state: Mutex<CacheState>,
    events: mpsc::UnboundedSender<CacheEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<CacheEvent>>>,
    config_error_reported: AtomicBool,
}

/// Handle to the deck cache; clones share the same cache
#[derive(Clone)]
pub struct DeckCacheManager {
    inner: Arc<Inner>,
}

impl DeckCacheManager {
    pub fn new(store: Arc<dyn DocumentStore>, kv: KvStore, clock: Arc<dyn Clock>, policy: RefreshPolicy) -> Self {
        Self::with_collections(store, kv, clock, policy, Collections::default())
    }

    pub fn with_collections(
        store: Arc<dyn DocumentStore>,
        kv: KvStore,
        clock: Arc<dyn Clock>,
        policy: RefreshPolicy,
        collections: Collections,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                store,
                kv,
                clock,
                policy,
                collections,
                state: Mutex::new(CacheState::default()),
                events: tx,
                events_rx: Mutex::new(Some(rx)),
                config_error_reported: AtomicBool::new(false),
            }),
        }
    }

    /// Take the event receiver; only the first call gets it
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CacheEvent>> {
        self.inner
            .events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== Languages ====================

    /// Active languages, from cache while fresh
    pub async fn get_languages(&self, force_refresh: bool) -> Vec<Language> {
        if !force_refresh {
            let now = self.inner.clock.now();
            let stamp = self.read_stamp(keys::LANGUAGES_REFRESHED_AT);
            if !self.inner.policy.is_stale(stamp, now) {
                if let Some(languages) = self.cached_languages() {
                    log::debug!("Serving {} cached languages", languages.len());
                    return languages;
                }
            }
        }

        match self.refresh_languages(force_refresh).await {
            Ok(languages) => languages,
            Err(e) => {
                self.report_remote_error("languages", &e);
                self.cached_languages().unwrap_or_default()
            }
        }
    }

    /// In-memory languages, falling back to the persisted copy
    fn cached_languages(&self) -> Option<Vec<Language>> {
        if let Some(languages) = self.state().languages.clone() {
            return Some(languages);
        }

        let persisted = match self.inner.kv.get_json::<Vec<Language>>(keys::LANGUAGES) {
            Ok(envelope) => envelope.map(|e| e.payload),
            Err(e) => {
                log::warn!("Ignoring unreadable language cache: {}", e);
                None
            }
        }?;

        let active: Vec<Language> = persisted.into_iter().filter(|l| l.active).collect();
        self.state().languages = Some(active.clone());
        Some(active)
    }

    async fn refresh_languages(&self, force_server_read: bool) -> Result<Vec<Language>, RemoteError> {
        let active = self.fetch_languages(force_server_read).await?;
        self.install_languages(&active);
        Ok(active)
    }

    /// Fetch and decode the active languages without touching the cache
    async fn fetch_languages(&self, force_server_read: bool) -> Result<Vec<Language>, RemoteError> {
        let docs = self
            .inner
            .store
            .fetch_collection(&self.inner.collections.languages, force_server_read)
            .await?;

        let (languages, skipped) = decode_batch(&docs, self.inner.clock.now(), decode_language);
        let active: Vec<Language> = languages.into_iter().filter(|l| l.active).collect();
        log::info!(
            "Fetched {} active languages ({} documents, {} skipped)",
            active.len(),
            docs.len(),
            skipped
        );
        Ok(active)
    }

    fn install_languages(&self, active: &[Language]) {
        let now = self.inner.clock.now();
        self.state().languages = Some(active.to_vec());
        if let Err(e) = self.inner.kv.set_json(keys::LANGUAGES, &active, now) {
            log::error!("Failed to persist language cache: {}", e);
        }
        self.write_stamp(keys::LANGUAGES_REFRESHED_AT, now);
    }

    // ==================== Decks ====================

    /// Decks of one language: memory, then persisted cache, then remote
    pub async fn get_decks_for_language(&self, language: &str, force_refresh: bool) -> Vec<Deck> {
        if !force_refresh {
            if let Some(decks) = self.cached_decks(language) {
                return decks;
            }

            if let Some(cards) = self.persisted_cards(language) {
                let decks = self.install_from_disk(language, build_decks(&cards));
                log::debug!("Rebuilt {} decks for {} from local cache", decks.len(), language);

                let stamp = self.read_stamp(&keys::cards_refreshed_at(language));
                if self.inner.policy.is_stale(stamp, self.inner.clock.now()) {
                    self.spawn_background_refresh(language);
                }
                return decks;
            }
        }

        let seq = self.issue(language);
        match self.fetch_cards(language, force_refresh).await {
            Ok(cards) => {
                let decks = build_decks(&cards);
                self.apply(language, seq, &cards, decks);
                self.cached_decks(language).unwrap_or_default()
            }
            Err(e) => {
                self.report_remote_error("cards", &e);
                self.cached_decks(language)
                    .or_else(|| {
                        self.persisted_cards(language)
                            .map(|cards| self.install_from_disk(language, build_decks(&cards)))
                    })
                    .unwrap_or_default()
            }
        }
    }

    /// Decks currently held in memory for a language
    pub fn cached_decks(&self, language: &str) -> Option<Vec<Deck>> {
        self.state().decks.get(language).cloned()
    }

    /// Topic labels of the in-memory decks of a language, "Todos" last
    pub fn topics_for_language(&self, language: &str) -> Vec<String> {
        match self.cached_decks(language) {
            Some(decks) if !decks.is_empty() => topics_for_language(&decks, language),
            _ => Vec::new(),
        }
    }

    /// Whether a background refresh is running for a language
    pub fn is_refreshing(&self, language: &str) -> bool {
        self.state().refreshing.contains(language)
    }

    fn persisted_cards(&self, language: &str) -> Option<Vec<Card>> {
        let cards = match self.inner.kv.get_json::<Vec<Card>>(&keys::cards(language)) {
            Ok(envelope) => envelope.map(|e| e.payload)?,
            Err(e) => {
                log::warn!("Ignoring unreadable card cache for {}: {}", language, e);
                return None;
            }
        };

        let total = cards.len();
        let cards: Vec<Card> = cards.into_iter().filter(|c| c.language == language).collect();
        if cards.len() != total {
            log::warn!(
                "Card cache for {} held {} cards of other languages",
                language,
                total - cards.len()
            );
        }
        Some(cards)
    }

    /// Put disk-built decks in memory unless a fetch got there first
    fn install_from_disk(&self, language: &str, decks: Vec<Deck>) -> Vec<Deck> {
        self.state()
            .decks
            .entry(language.to_string())
            .or_insert(decks)
            .clone()
    }

    async fn fetch_cards(&self, language: &str, force_server_read: bool) -> Result<Vec<Card>, RemoteError> {
        let docs = self
            .inner
            .store
            .fetch_collection(&self.inner.collections.cards, force_server_read)
            .await?;

        let (cards, skipped) = decode_batch(&docs, self.inner.clock.now(), decode_card);
        let cards: Vec<Card> = cards.into_iter().filter(|c| c.language == language).collect();
        log::info!(
            "Fetched {} cards for {} ({} documents, {} skipped)",
            cards.len(),
            language,
            docs.len(),
            skipped
        );
        Ok(cards)
    }

    fn spawn_background_refresh(&self, language: &str) {
        {
            let mut state = self.state();
            if !state.refreshing.insert(language.to_string()) {
                log::debug!("Background refresh for {} already running", language);
                return;
            }
        }

        let seq = self.issue(language);
        let this = self.clone();
        let language = language.to_string();
        log::info!("Card cache for {} is stale, refreshing in background", language);

        tokio::spawn(async move {
            match this.fetch_cards(&language, false).await {
                Ok(cards) => {
                    let decks = build_decks(&cards);
                    if this.apply(&language, seq, &cards, decks) {
                        if let Some(decks) = this.cached_decks(&language) {
                            let _ = this.inner.events.send(CacheEvent::DecksRefreshed {
                                language: language.clone(),
                                decks,
                            });
                        }
                    }
                }
                Err(e) => this.report_remote_error("cards (background)", &e),
            }
            this.state().refreshing.remove(&language);
        });
    }

    // ==================== Ordering Guard ====================

    /// Hand out the next fetch sequence number for a language
    fn issue(&self, language: &str) -> u64 {
        let mut state = self.state();
        let seq = state.issued.entry(language.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Install a fetch result unless a later-issued fetch already landed
    ///
    /// Returns whether the result was applied.
    fn apply(&self, language: &str, seq: u64, cards: &[Card], mut decks: Vec<Deck>) -> bool {
        let now = self.inner.clock.now();
        let mut state = self.state();

        let installed = state.applied.get(language).copied().unwrap_or(0);
        if seq <= installed {
            log::debug!(
                "Discarding fetch #{} for {}; #{} is already installed",
                seq,
                language,
                installed
            );
            return false;
        }

        if let Some(previous) = state.decks.get(language) {
            carry_local_ids(previous, &mut decks);
        }
        state.applied.insert(language.to_string(), seq);
        state.decks.insert(language.to_string(), decks);

        // Persist under the lock so disk order matches install order
        if let Err(e) = self.inner.kv.set_json(&keys::cards(language), &cards, now) {
            log::error!("Failed to persist card cache for {}: {}", language, e);
        }
        self.write_stamp(&keys::cards_refreshed_at(language), now);
        true
    }

    // ==================== Catalog Refresh ====================

    /// User-triggered refresh of languages and every loaded language's decks
    ///
    /// Both collections are fetched before anything is installed, so a failure
    /// leaves every cache as it was.
    pub async fn refresh_all(&self, force_refresh: bool) -> RefreshOutcome {
        if !force_refresh {
            if let Some(remaining) = self.throttled() {
                log::info!("Catalog refresh throttled, {} minutes left", remaining.num_minutes());
                return RefreshOutcome::Throttled { remaining };
            }
        }

        let languages = match self.fetch_languages(true).await {
            Ok(languages) => languages,
            Err(e) => {
                self.report_remote_error("languages", &e);
                return RefreshOutcome::Unavailable;
            }
        };

        let mut loaded: Vec<String> = self.state().decks.keys().cloned().collect();
        loaded.sort();
        let issued: Vec<(String, u64)> = loaded
            .into_iter()
            .map(|language| {
                let seq = self.issue(&language);
                (language, seq)
            })
            .collect();

        let cards = if issued.is_empty() {
            Vec::new()
        } else {
            let docs = match self
                .inner
                .store
                .fetch_collection(&self.inner.collections.cards, true)
                .await
            {
                Ok(docs) => docs,
                Err(e) => {
                    self.report_remote_error("cards", &e);
                    return RefreshOutcome::Unavailable;
                }
            };

            let (cards, skipped) = decode_batch(&docs, self.inner.clock.now(), decode_card);
            if skipped > 0 {
                log::warn!("Skipped {} malformed card documents", skipped);
            }
            cards
        };

        self.install_languages(&languages);

        let mut deck_count = 0;
        for (language, seq) in issued {
            let language_cards: Vec<Card> =
                cards.iter().filter(|c| c.language == language).cloned().collect();
            let decks = build_decks(&language_cards);
            self.apply(&language, seq, &language_cards, decks);
            deck_count += self.cached_decks(&language).map(|d| d.len()).unwrap_or(0);
        }

        self.write_stamp(keys::CATALOG_REFRESHED_AT, self.inner.clock.now());
        log::info!(
            "Catalog refreshed: {} languages, {} decks",
            languages.len(),
            deck_count
        );
        RefreshOutcome::Refreshed {
            languages: languages.len(),
            decks: deck_count,
        }
    }

    /// `refresh_all` for a process that has not read any decks yet
    ///
    /// Every language with a persisted card cache joins the refresh. Loading
    /// those caches does no remote I/O and starts no background work, and
    /// nothing is loaded while the catalog is throttled.
    pub async fn refresh_all_persisted(&self, force_refresh: bool) -> RefreshOutcome {
        if !force_refresh {
            if let Some(remaining) = self.throttled() {
                log::info!("Catalog refresh throttled, {} minutes left", remaining.num_minutes());
                return RefreshOutcome::Throttled { remaining };
            }
        }

        for language in self.cached_languages().unwrap_or_default() {
            if let Some(cards) = self.persisted_cards(&language.name) {
                self.install_from_disk(&language.name, build_decks(&cards));
            }
        }
        self.refresh_all(true).await
    }

    /// Remaining wait while the catalog stamp is still fresh
    fn throttled(&self) -> Option<Duration> {
        let now = self.inner.clock.now();
        let stamp = self.read_stamp(keys::CATALOG_REFRESHED_AT)?;
        if self.inner.policy.is_stale(Some(stamp), now) {
            return None;
        }
        Some(self.inner.policy.remaining(stamp, now))
    }

    /// Time left before `refresh_all` will fetch again; `None` if never refreshed
    pub fn time_until_next_refresh(&self) -> Option<Duration> {
        let stamp = self.read_stamp(keys::CATALOG_REFRESHED_AT)?;
        Some(self.inner.policy.remaining(stamp, self.inner.clock.now()))
    }

    // ==================== Helpers ====================

    fn read_stamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.inner.kv.get_timestamp(key) {
            Ok(stamp) => stamp,
            Err(e) => {
                log::warn!("Ignoring unreadable refresh stamp {}: {}", key, e);
                None
            }
        }
    }

    fn write_stamp(&self, key: &str, time: DateTime<Utc>) {
        if let Err(e) = self.inner.kv.set_timestamp(key, time) {
            log::error!("Failed to persist refresh stamp {}: {}", key, e);
        }
    }

    fn report_remote_error(&self, what: &str, error: &RemoteError) {
        log::warn!("Remote fetch of {} failed, using cache: {}", what, error);
        if error.is_configuration() && !self.inner.config_error_reported.swap(true, Ordering::SeqCst) {
            let _ = self
                .inner
                .events
                .send(CacheEvent::ConfigurationError(error.to_string()));
        }
    }
}

/// Keep the local id of decks that survive a refresh
fn carry_local_ids(previous: &[Deck], fresh: &mut [Deck]) {
    for deck in fresh.iter_mut() {
        if let Some(old) = previous.iter().find(|d| d.storage_id() == deck.storage_id()) {
            deck.local_id = old.local_id;
        }
    }
}
