//! Submitting documents for indexing.
//!
//! Files go to `POST /upload` as one multipart request; structured CMS
//! items go to `POST /ingest_cms` as JSON. Either way the caller gets back
//! how many fragments the service indexed, and the display sink receives
//! exactly one notice describing the result.

use std::path::{Path, PathBuf};

use anyhow::Context;
use reqwest::multipart::{Form, Part};

use crate::api::{index_outcome, ApiClient, INGEST_CMS_PATH, UPLOAD_PATH};
use crate::conversation::ConversationLog;
use crate::error::ClientError;
use crate::models::{CmsIngest, CmsItem, SelectedFile, UploadOutcome};

/// Multipart field every file is attached under.
pub const FILES_FIELD: &str = "files";

pub struct UploadCoordinator {
    api: ApiClient,
}

impl UploadCoordinator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Upload `selection` and report the result to `log`'s sink.
    ///
    /// An empty selection fails with [`ClientError::Validation`] without
    /// touching the network.
    pub async fn submit(
        &self,
        log: &ConversationLog,
        selection: Vec<SelectedFile>,
    ) -> Result<UploadOutcome, ClientError> {
        let result = self.send_files(selection).await;
        report(log, &result);
        result
    }

    /// Push structured items to the CMS ingest endpoint.
    pub async fn ingest_cms(
        &self,
        log: &ConversationLog,
        items: Vec<CmsItem>,
    ) -> Result<UploadOutcome, ClientError> {
        let result = self.send_items(items).await;
        report(log, &result);
        result
    }

    async fn send_files(&self, selection: Vec<SelectedFile>) -> Result<UploadOutcome, ClientError> {
        if selection.is_empty() {
            return Err(ClientError::validation("no files selected"));
        }

        let count = selection.len();
        let mut form = Form::new();
        for file in selection {
            form = form.part(FILES_FIELD, Part::bytes(file.bytes).file_name(file.name));
        }

        tracing::info!(files = count, "uploading documents");
        let resp = self.api.post_multipart(UPLOAD_PATH, form).await?;
        index_outcome(resp).await
    }

    async fn send_items(&self, items: Vec<CmsItem>) -> Result<UploadOutcome, ClientError> {
        if items.is_empty() {
            return Err(ClientError::validation("no items to ingest"));
        }

        tracing::info!(items = items.len(), "ingesting CMS items");
        let resp = self
            .api
            .post_json(INGEST_CMS_PATH, &CmsIngest { items })
            .await?;
        index_outcome(resp).await
    }
}

fn report(log: &ConversationLog, result: &Result<UploadOutcome, ClientError>) {
    match result {
        Ok(outcome) => log.notify(&format!(
            "indexed {} text fragments",
            outcome.indexed_count
        )),
        Err(err) if err.is_validation() => log.notify(&err.to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "indexing request failed");
            log.notify(&format!("upload failed: {}", err));
        }
    }
}

/// Read files from disk into a selection, keeping their order.
pub async fn read_selection(paths: &[PathBuf]) -> Result<Vec<SelectedFile>, ClientError> {
    let mut selection = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        selection.push(SelectedFile {
            name: file_name(path),
            bytes,
        });
    }
    Ok(selection)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load CMS items from a JSON file shaped like `{ "items": [...] }`.
pub fn load_cms_items(path: &Path) -> anyhow::Result<Vec<CmsItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CMS items file: {}", path.display()))?;
    let ingest: CmsIngest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse CMS items file: {}", path.display()))?;
    Ok(ingest.items)
}
