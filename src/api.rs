//! HTTP plumbing shared by every call to the Q&A service.
//!
//! # Endpoints
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/upload` | multipart, one `files` part per document |
//! | `POST` | `/chat` | `{ "query", "top_k", "source"? }` |
//! | `POST` | `/ingest_cms` | `{ "items": [{ "id", "title"?, "body" }] }` |
//! | `GET`  | `/health` | none |
//!
//! Status handling lives with the callers: this module only turns failures
//! to reach the server into [`ClientError::Transport`].

use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::{Health, IndexReply, UploadOutcome};

pub const UPLOAD_PATH: &str = "/upload";
pub const CHAT_PATH: &str = "/chat";
pub const INGEST_CMS_PATH: &str = "/ingest_cms";
pub const HEALTH_PATH: &str = "/health";

/// Client bound to one service base address. Clones share a connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "POST json");
        Ok(self.http.post(url).json(body).send().await?)
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "POST multipart");
        Ok(self.http.post(url).multipart(form).send().await?)
    }

    /// Ask the service whether it is up.
    pub async fn health(&self) -> Result<Health, ClientError> {
        let url = self.endpoint(HEALTH_PATH);
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::status(status));
        }
        Ok(resp.json::<Health>().await?)
    }
}

/// Read the reply of an indexing endpoint. The body of a failed response
/// is not inspected.
pub(crate) async fn index_outcome(resp: reqwest::Response) -> Result<UploadOutcome, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ClientError::status(status));
    }
    let reply: IndexReply = resp.json().await?;
    Ok(UploadOutcome {
        indexed_count: reply.indexed.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base.to_string(),
            timeout_secs: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let api = client("http://127.0.0.1:8000");
        assert_eq!(api.endpoint(CHAT_PATH), "http://127.0.0.1:8000/chat");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let api = client(" http://rag.local/api/ ");
        assert_eq!(api.base_url(), "http://rag.local/api");
        assert_eq!(api.endpoint(UPLOAD_PATH), "http://rag.local/api/upload");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let api = client("http://127.0.0.1:9");
        let err = api.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
    }
}
