//! Remote document store interface
//!
//! The catalog lives in a remote document database. The core only ever reads
//! whole collections from it, through the [`DocumentStore`] trait.

mod file;
mod http;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use file::FileDocumentStore;
pub use http::HttpDocumentStore;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Remote store misconfigured: {0}")]
    Misconfigured(String),
}

impl RemoteError {
    /// Configuration problems are reported to the UI; everything else is transient
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Misconfigured(_))
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// A single document: its id plus an untyped field bag
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RawDocument {
    /// Split an exported JSON object into id and fields
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let id = match object.remove("id") {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self { id, fields: object }
    }

    /// Parse a JSON array of document objects; non-object entries are dropped
    pub fn parse_collection(value: Value) -> Result<Vec<Self>> {
        let Value::Array(items) = value else {
            return Err(RemoteError::InvalidPayload(
                "collection is not a JSON array".to_string(),
            ));
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(object) => Some(Self::from_object(object)),
                other => {
                    log::warn!("Ignoring non-object document in collection: {}", other);
                    None
                }
            })
            .collect())
    }
}

/// Read access to the remote document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch every document of a collection
    ///
    /// `force_server_read` bypasses any intermediate cache the store keeps.
    async fn fetch_collection(&self, name: &str, force_server_read: bool) -> Result<Vec<RawDocument>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_collection() {
        let docs = RawDocument::parse_collection(json!([
            {"id": "a", "term": "dog"},
            {"id": 7, "term": "cat"},
            {"term": "bird"},
            "junk"
        ]))
        .unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].fields.get("term"), Some(&json!("dog")));
        assert!(!docs[0].fields.contains_key("id"));
        assert_eq!(docs[1].id, "7");
        assert_eq!(docs[2].id, "");
    }

    #[test]
    fn test_parse_collection_rejects_non_array() {
        assert!(RawDocument::parse_collection(json!({"cards": []})).is_err());
    }

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(RemoteError::Misconfigured("no url".to_string()).is_configuration());
        assert!(!RemoteError::NotFound("cards".to_string()).is_configuration());
    }
}
