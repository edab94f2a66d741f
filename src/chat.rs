//! Asking questions and classifying the answers.
//!
//! [`QueryDispatcher::ask`] records the user's question, posts it to
//! `/chat`, and turns whatever comes back into exactly one
//! [`ChatOutcome`]:
//!
//! - the request never completed (or timed out) → [`ChatOutcome::Failed`]
//! - the server answered with a non-success status → [`ChatOutcome::Rejected`]
//! - the server answered → [`ChatOutcome::Answered`], with source attribution
//! - the question was withdrawn or superseded → [`ChatOutcome::Cancelled`]
//!
//! Asking happens in two steps. [`QueryDispatcher::issue`] is synchronous:
//! it logs the question and registers its [`RequestHandle`], so questions
//! are ordered by when they were issued even if their completions run on
//! different threads. [`QueryDispatcher::complete`] sends the request and
//! logs the outcome.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::{ApiClient, CHAT_PATH};
use crate::attribution::{aggregate, SourceSet};
use crate::config::{ChatConfig, PendingPolicy};
use crate::conversation::ConversationLog;
use crate::error::ClientError;
use crate::models::{ChatReply, ChatRequest, Match, Speaker};

/// How one question ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Answered {
        answer: String,
        matches: Vec<Match>,
        sources: SourceSet,
    },
    /// Non-success status; `body` is kept as diagnostic text.
    Rejected { status: u16, body: String },
    Failed { reason: String },
    Cancelled { reason: CancelReason },
}

/// Why a pending question was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A newer question was issued under [`PendingPolicy::CancelPrevious`].
    Superseded,
    /// Cancelled explicitly through [`QueryDispatcher::cancel_pending`].
    Withdrawn,
}

impl CancelReason {
    fn message(&self) -> &'static str {
        match self {
            CancelReason::Superseded => "cancelled: superseded by a newer question",
            CancelReason::Withdrawn => "cancelled: question withdrawn",
        }
    }
}

/// Identifies an in-flight question and lets it be cancelled.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: Uuid,
    cancel: Arc<watch::Sender<Option<CancelReason>>>,
}

impl RequestHandle {
    fn new() -> (Self, watch::Receiver<Option<CancelReason>>) {
        let (tx, rx) = watch::channel(None);
        let handle = Self {
            id: Uuid::new_v4(),
            cancel: Arc::new(tx),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The first reason given wins.
    pub fn cancel(&self, reason: CancelReason) {
        self.cancel.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }
}

/// A question that has been logged and registered but not yet sent.
#[derive(Debug)]
pub struct IssuedQuestion {
    request: ChatRequest,
    handle: RequestHandle,
    cancelled: watch::Receiver<Option<CancelReason>>,
}

impl IssuedQuestion {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn handle(&self) -> &RequestHandle {
        &self.handle
    }
}

pub struct QueryDispatcher {
    api: ApiClient,
    config: ChatConfig,
    /// Every question issued and not yet completed, oldest first.
    pending: Mutex<Vec<RequestHandle>>,
}

impl QueryDispatcher {
    pub fn new(api: ApiClient, config: ChatConfig) -> Self {
        Self {
            api,
            config,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Ask a question, optionally restricted to one source.
    ///
    /// Returns `None` without logging or sending anything when the trimmed
    /// input is empty.
    pub async fn ask(
        &self,
        log: &ConversationLog,
        raw_input: &str,
        source_filter: Option<&str>,
    ) -> Option<ChatOutcome> {
        let question = self.issue(log, raw_input, source_filter)?;
        Some(self.complete(log, question).await)
    }

    /// Log the question and register it as pending.
    ///
    /// Under [`PendingPolicy::CancelPrevious`] every question still pending
    /// is cancelled here, before the new one is registered.
    pub fn issue(
        &self,
        log: &ConversationLog,
        raw_input: &str,
        source_filter: Option<&str>,
    ) -> Option<IssuedQuestion> {
        let query = raw_input.trim();
        if query.is_empty() {
            return None;
        }

        let request = ChatRequest::new(query, self.config.top_k, source_filter);
        let (handle, cancelled) = RequestHandle::new();

        let mut pending = self.pending_slot();
        if self.config.pending == PendingPolicy::CancelPrevious {
            for previous in pending.drain(..) {
                tracing::debug!(request_id = %previous.id(), "cancelling superseded question");
                previous.cancel(CancelReason::Superseded);
            }
        }
        // Logged under the pending lock so log order matches issue order.
        log.append(Speaker::User, query);
        pending.push(handle.clone());
        drop(pending);

        tracing::debug!(request_id = %handle.id(), source = ?request.source, "question issued");
        Some(IssuedQuestion {
            request,
            handle,
            cancelled,
        })
    }

    /// Send an issued question and log its outcome.
    pub async fn complete(&self, log: &ConversationLog, question: IssuedQuestion) -> ChatOutcome {
        let IssuedQuestion {
            request,
            handle,
            mut cancelled,
        } = question;

        let outcome = tokio::select! {
            outcome = self.send(&request) => outcome,
            reason = wait_cancelled(&mut cancelled) => ChatOutcome::Cancelled { reason },
        };

        self.finish(&handle);
        report(log, &outcome);
        outcome
    }

    /// Cancel every pending question. Returns how many were cancelled.
    pub fn cancel_pending(&self) -> usize {
        let mut pending = self.pending_slot();
        let count = pending.len();
        for handle in pending.drain(..) {
            handle.cancel(CancelReason::Withdrawn);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending_slot().len()
    }

    fn finish(&self, handle: &RequestHandle) {
        self.pending_slot().retain(|h| h.id() != handle.id());
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Vec<RequestHandle>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn send(&self, request: &ChatRequest) -> ChatOutcome {
        let resp = match self.api.post_json(CHAT_PATH, request).await {
            Ok(resp) => resp,
            Err(err) => return failed(err),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "chat request rejected");
            return ChatOutcome::Rejected {
                status: status.as_u16(),
                body,
            };
        }

        let reply = match read_reply(resp).await {
            Ok(reply) => reply,
            Err(err) => return failed(err),
        };

        let sources = aggregate(&reply.matches);
        ChatOutcome::Answered {
            answer: reply
                .answer
                .unwrap_or_else(|| self.config.fallback_answer.clone()),
            matches: reply.matches,
            sources,
        }
    }
}

async fn read_reply(resp: reqwest::Response) -> Result<ChatReply, ClientError> {
    let value: Value = resp.json().await?;
    ChatReply::from_json(value)
}

fn failed(err: ClientError) -> ChatOutcome {
    tracing::warn!(error = %err, "chat request failed");
    ChatOutcome::Failed {
        reason: err.to_string(),
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<Option<CancelReason>>) -> CancelReason {
    if let Ok(reason) = rx.wait_for(Option::is_some).await {
        if let Some(reason) = *reason {
            return reason;
        }
    }
    // Sender gone without cancelling: never resolve.
    std::future::pending().await
}

fn report(log: &ConversationLog, outcome: &ChatOutcome) {
    match outcome {
        ChatOutcome::Answered {
            answer, sources, ..
        } => {
            log.append(Speaker::Bot, answer.as_str());
            if let Some(line) = sources.render() {
                log.append(Speaker::Info, line);
            }
        }
        ChatOutcome::Rejected { status, .. } => {
            log.append(Speaker::Error, format!("error: {}", status));
        }
        ChatOutcome::Failed { reason } => {
            log.append(Speaker::Error, format!("network error: {}", reason));
        }
        ChatOutcome::Cancelled { reason } => {
            log.append(Speaker::Error, reason.message());
        }
    }
}
