//! Deck construction
//!
//! Flat card lists from the remote store are grouped into decks:
//! - one deck per (language, topic) pair, named `"{topic} ({language})"`
//! - one synthetic deck per language, named `"Todos ({language})"`, holding
//!   every card of that language
//!
//! Languages and topics are emitted in first-appearance order so the same
//! input always produces the same decks in the same order. Cards whose topic
//! is itself "Todos" only go to the synthetic deck, keeping deck storage ids
//! unique.

use std::collections::HashMap;

use super::models::{Card, Deck, ALL_TOPIC};

/// Cards of one language, bucketed by topic in first-appearance order
struct LanguageGroup<'a> {
    language: &'a str,
    cards: Vec<&'a Card>,
    topics: Vec<(&'a str, Vec<&'a Card>)>,
}

/// Build every topic deck and "Todos" deck for a card list
pub fn build_decks(cards: &[Card]) -> Vec<Deck> {
    let mut groups: Vec<LanguageGroup> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    let mut folded = 0;

    for card in cards {
        let idx = *group_index.entry(card.language.as_str()).or_insert_with(|| {
            groups.push(LanguageGroup {
                language: card.language.as_str(),
                cards: Vec::new(),
                topics: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[idx];
        group.cards.push(card);
        if card.topic == ALL_TOPIC {
            folded += 1;
            continue;
        }
        match group.topics.iter_mut().find(|(topic, _)| *topic == card.topic) {
            Some((_, topic_cards)) => topic_cards.push(card),
            None => group.topics.push((card.topic.as_str(), vec![card])),
        }
    }

    if folded > 0 {
        log::warn!("{} cards use the reserved topic \"{}\"; kept in the language deck only", folded, ALL_TOPIC);
    }

    let mut decks = Vec::new();
    for group in groups {
        for (topic, topic_cards) in group.topics {
            decks.push(Deck::new(
                format!("{} ({})", topic, group.language),
                group.language.to_string(),
                topic.to_string(),
                topic_cards.into_iter().cloned().collect(),
            ));
        }

        decks.push(Deck::new(
            format!("{} ({})", ALL_TOPIC, group.language),
            group.language.to_string(),
            ALL_TOPIC.to_string(),
            group.cards.into_iter().cloned().collect(),
        ));
    }

    decks
}

/// Topic labels available for a language, sorted, with "Todos" last
pub fn topics_for_language(decks: &[Deck], language: &str) -> Vec<String> {
    let mut topics: Vec<String> = decks
        .iter()
        .filter(|d| d.language == language && !d.is_all_deck())
        .map(|d| d.topic.clone())
        .collect();
    topics.sort();
    topics.dedup();
    topics.push(ALL_TOPIC.to_string());
    topics
}
