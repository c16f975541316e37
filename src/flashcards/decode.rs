//! Typed decoding of remote documents into cards and languages
//!
//! Each document decodes on its own; a malformed document is skipped and the
//! rest of the batch still goes through.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

use super::models::{Card, Language};
use crate::remote::RawDocument;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("Document {id}: missing or non-string field '{field}'")]
    MissingString { id: String, field: &'static str },

    #[error("Document {id}: missing or non-boolean field '{field}'")]
    MissingBool { id: String, field: &'static str },
}

/// Field names accepted for each attribute; the second spelling is the
/// catalog's legacy Portuguese schema
const TERM: [&str; 2] = ["term", "palavra"];
const ANSWER: [&str; 2] = ["answer", "resposta"];
const LANGUAGE: [&str; 2] = ["language", "idioma"];
const TOPIC: [&str; 2] = ["topic", "tema"];
const NAME: [&str; 2] = ["name", "nome"];
const ACTIVE: [&str; 2] = ["active", "ativo"];
const CREATED_AT: [&str; 2] = ["createdAt", "dataCriacao"];

fn lookup<'a>(doc: &'a RawDocument, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| doc.fields.get(*name))
}

fn string_field(doc: &RawDocument, names: &[&'static str]) -> Result<String, DecodeError> {
    lookup(doc, names)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DecodeError::MissingString {
            id: doc.id.clone(),
            field: names[0],
        })
}

fn bool_field(doc: &RawDocument, names: &[&'static str]) -> Result<bool, DecodeError> {
    lookup(doc, names)
        .and_then(Value::as_bool)
        .ok_or_else(|| DecodeError::MissingBool {
            id: doc.id.clone(),
            field: names[0],
        })
}

/// Parse a creation timestamp; absent or unparseable values fall back to `now`
fn timestamp_field(doc: &RawDocument, names: &[&str], now: DateTime<Utc>) -> DateTime<Utc> {
    lookup(doc, names).and_then(parse_timestamp).unwrap_or(now)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let millis = (secs * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        // Firestore timestamp exported as {seconds, nanos}
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanos")
                .or_else(|| map.get("nanoseconds"))
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
        _ => None,
    }
}

fn document_id(doc: &RawDocument) -> Option<String> {
    if doc.id.is_empty() {
        None
    } else {
        Some(doc.id.clone())
    }
}

/// Decode a card document; `term`, `answer`, `language` and `topic` are required
pub fn decode_card(doc: &RawDocument, now: DateTime<Utc>) -> Result<Card, DecodeError> {
    Ok(Card {
        id: document_id(doc),
        term: string_field(doc, &TERM)?,
        answer: string_field(doc, &ANSWER)?,
        language: string_field(doc, &LANGUAGE)?,
        topic: string_field(doc, &TOPIC)?,
        created_at: timestamp_field(doc, &CREATED_AT, now),
    })
}

/// Decode a language document; `name` and `active` are required
pub fn decode_language(doc: &RawDocument, now: DateTime<Utc>) -> Result<Language, DecodeError> {
    Ok(Language {
        id: document_id(doc),
        name: string_field(doc, &NAME)?,
        active: bool_field(doc, &ACTIVE)?,
        created_at: timestamp_field(doc, &CREATED_AT, now),
    })
}

/// Decode a whole batch, skipping documents that fail
///
/// Returns the decoded records and the number of skipped documents.
pub fn decode_batch<T, F>(docs: &[RawDocument], now: DateTime<Utc>, decode: F) -> (Vec<T>, usize)
where
    F: Fn(&RawDocument, DateTime<Utc>) -> Result<T, DecodeError>,
{
    let mut decoded = Vec::with_capacity(docs.len());
    let mut skipped = 0;

    for doc in docs {
        match decode(doc, now) {
            Ok(record) => decoded.push(record),
            Err(e) => {
                log::warn!("Skipping malformed document: {}", e);
                skipped += 1;
            }
        }
    }

    (decoded, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> RawDocument {
        RawDocument {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_decode_card() {
        let now = Utc::now();
        let d = doc(
            "c1",
            json!({"term": "dog", "answer": "cão", "language": "EN", "topic": "Animals"}),
        );
        let card = decode_card(&d, now).unwrap();
        assert_eq!(card.id.as_deref(), Some("c1"));
        assert_eq!(card.storage_id(), "EN_Animals_dog");
        assert_eq!(card.created_at, now);
    }

    #[test]
    fn test_decode_card_legacy_field_names() {
        let d = doc(
            "c2",
            json!({"palavra": "cat", "resposta": "gato", "idioma": "EN", "tema": "Animals"}),
        );
        let card = decode_card(&d, Utc::now()).unwrap();
        assert_eq!(card.term, "cat");
        assert_eq!(card.answer, "gato");
    }

    #[test]
    fn test_decode_card_missing_field() {
        let d = doc("c3", json!({"term": "dog", "answer": "cão", "language": "EN"}));
        let err = decode_card(&d, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingString {
                id: "c3".to_string(),
                field: "topic"
            }
        );
    }

    #[test]
    fn test_decode_language_timestamps() {
        let now = Utc::now();

        let seconds = doc("l1", json!({"name": "EN", "active": true, "createdAt": 1700000000}));
        let lang = decode_language(&seconds, now).unwrap();
        assert_eq!(lang.created_at.timestamp(), 1_700_000_000);

        let rfc = doc(
            "l2",
            json!({"name": "ES", "active": false, "createdAt": "2024-03-01T12:00:00Z"}),
        );
        let lang = decode_language(&rfc, now).unwrap();
        assert!(!lang.active);
        assert_eq!(lang.created_at.timestamp(), 1_709_294_400);

        let object = doc(
            "l3",
            json!({"nome": "FR", "ativo": true, "dataCriacao": {"seconds": 1700000000, "nanos": 0}}),
        );
        assert_eq!(decode_language(&object, now).unwrap().created_at.timestamp(), 1_700_000_000);

        let garbage = doc("l4", json!({"name": "DE", "active": true, "createdAt": "yesterday"}));
        assert_eq!(decode_language(&garbage, now).unwrap().created_at, now);
    }

    #[test]
    fn test_decode_language_requires_bool_active() {
        let d = doc("l5", json!({"name": "EN", "active": "yes"}));
        assert!(matches!(
            decode_language(&d, Utc::now()),
            Err(DecodeError::MissingBool { field: "active", .. })
        ));
    }

    #[test]
    fn test_decode_batch_skips_bad_documents() {
        let docs = vec![
            doc("a", json!({"term": "dog", "answer": "cão", "language": "EN", "topic": "Animals"})),
            doc("b", json!({"term": 7})),
            doc("c", json!({"term": "cat", "answer": "gato", "language": "EN", "topic": "Animals"})),
        ];
        let (cards, skipped) = decode_batch(&docs, Utc::now(), decode_card);
        assert_eq!(cards.len(), 2);
        assert_eq!(skipped, 1);
    }
}
