//! Document store reached over HTTP
//!
//! `GET {base_url}/{collection}` must answer with a JSON array of document
//! objects.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use super::{DocumentStore, RawDocument, RemoteError, Result};

pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDocumentStore {
    /// Create a new HTTP document store client
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::Misconfigured(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection.trim_start_matches('/'))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch_collection(&self, name: &str, force_server_read: bool) -> Result<Vec<RawDocument>> {
        let mut request = self
            .client
            .get(self.url(name))
            .header(header::ACCEPT, "application/json");
        if force_server_read {
            request = request.header(header::CACHE_CONTROL, "no-cache");
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RemoteError::Misconfigured(format!(
                    "access to collection '{}' was denied",
                    name
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(RemoteError::NotFound(name.to_string()));
            }
            status if !status.is_success() => {
                return Err(RemoteError::Status {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        RawDocument::parse_collection(body)
    }
}
