//! Document store backed by a directory of collection exports
//!
//! Each collection is a `{collection}.json` file holding a JSON array of
//! document objects, the shape produced by exporting the remote database.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{DocumentStore, RawDocument, RemoteError, Result};

pub struct FileDocumentStore {
    dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        if !dir.is_dir() {
            return Err(RemoteError::Misconfigured(format!(
                "export directory {} does not exist",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn fetch_collection(&self, name: &str, _force_server_read: bool) -> Result<Vec<RawDocument>> {
        let path = self.collection_path(name);
        if !path.exists() {
            return Err(RemoteError::NotFound(name.to_string()));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let docs = RawDocument::parse_collection(serde_json::from_str(&content)?)?;
        log::debug!("Read {} documents from {:?}", docs.len(), path);
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_collection_from_export() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("cards.json"),
            r#"[{"id": "1", "term": "dog", "answer": "cão", "language": "EN", "topic": "Animals"}]"#,
        )
        .unwrap();

        let store = FileDocumentStore::new(temp.path().to_path_buf()).unwrap();
        let docs = store.fetch_collection("cards", false).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "1");

        let missing = store.fetch_collection("languages", false).await;
        assert!(matches!(missing, Err(RemoteError::NotFound(_))));
    }

    #[test]
    fn test_missing_directory_is_misconfigured() {
        let temp = TempDir::new().unwrap();
        let result = FileDocumentStore::new(temp.path().join("nope"));
        assert!(matches!(result, Err(ref e) if e.is_configuration()));
    }
}
