//! Wire and conversation types shared across the client.
//!
//! Request bodies are serialized exactly as the service expects them.
//! Response bodies are parsed leniently: optional fields default, and the
//! loosely-typed parts (`answer`, `matches`) are read from raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub query: String,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ChatRequest {
    /// `source` is kept only when the filter holds a non-empty value.
    pub fn new(query: &str, top_k: u32, source: Option<&str>) -> Self {
        Self {
            query: query.to_string(),
            top_k,
            source: source.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}

/// A retrieved fragment descriptor.
///
/// Backends disagree on where they put the origin document: some nest it
/// under `payload.source`, some put it at the top level. The variant
/// records which shape arrived.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Match {
    /// `payload` is an object; its `source` takes precedence.
    Nested {
        payload_source: Option<String>,
        source: Option<String>,
    },
    /// An object without a usable `payload`.
    Flat { source: Option<String> },
    /// Anything that is not a JSON object.
    Opaque,
}

impl From<Value> for Match {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Match::Opaque;
        };
        let source = map.get("source").and_then(identifier);
        match map.get("payload") {
            Some(Value::Object(payload)) => Match::Nested {
                payload_source: payload.get("source").and_then(identifier),
                source,
            },
            _ => Match::Flat { source },
        }
    }
}

impl Match {
    /// Source identifier for this match: `payload.source`, then `source`.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Match::Nested {
                payload_source,
                source,
            } => payload_source.as_deref().or(source.as_deref()),
            Match::Flat { source } => source.as_deref(),
            Match::Opaque => None,
        }
    }
}

/// Reads a displayable identifier from a loosely-typed field.
///
/// Non-empty strings and non-zero numbers count; null, `false`, `0`, `""`,
/// arrays and objects do not.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Parsed success body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatReply {
    /// `None` when the field is absent or falsy (`null`, `""`, `false`, `0`).
    /// Object and array answers are kept as their JSON text.
    pub answer: Option<String>,
    pub matches: Vec<Match>,
}

impl ChatReply {
    pub fn from_json(value: Value) -> Result<Self, ClientError> {
        let Value::Object(map) = value else {
            return Err(ClientError::Malformed(
                "chat response is not a JSON object".to_string(),
            ));
        };

        let answer = match map.get("answer") {
            Some(Value::Bool(true)) => Some("true".to_string()),
            // Objects and arrays are truthy even when empty; show them as JSON.
            Some(v @ (Value::Object(_) | Value::Array(_))) => Some(v.to_string()),
            Some(v) => identifier(v),
            None => None,
        };

        let matches = match map.get("matches") {
            Some(Value::Array(items)) => items.iter().cloned().map(Match::from).collect(),
            _ => Vec::new(),
        };

        Ok(Self { answer, matches })
    }
}

/// Success body of `POST /upload` and `POST /ingest_cms`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IndexReply {
    #[serde(default)]
    pub indexed: Option<u64>,
}

/// Result of an upload or ingest that the server accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub indexed_count: u64,
}

/// Success body of `GET /health`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Health {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub dim: Option<u64>,
}

/// A structured document pushed through `POST /ingest_cms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CmsItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CmsIngest {
    pub items: Vec<CmsItem>,
}

/// A named binary file chosen for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Who a conversation entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
    Info,
    Error,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "you",
            Speaker::Bot => "bot",
            Speaker::Info => "sources",
            Speaker::Error => "error",
        }
    }
}

/// One line of the conversation. Never changed once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationEntry {
    /// Position in the log, starting at 0.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub speaker: Speaker,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_missing_source() {
        let req = ChatRequest::new("what is rust", 5, None);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"query": "what is rust", "top_k": 5})
        );
    }

    #[test]
    fn test_request_omits_empty_source() {
        let req = ChatRequest::new("q", 5, Some(""));
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("source").is_none());
    }

    #[test]
    fn test_request_keeps_source() {
        let req = ChatRequest::new("q", 3, Some("cms:42"));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"query": "q", "top_k": 3, "source": "cms:42"})
        );
    }

    #[test]
    fn test_match_shapes() {
        let m: Match = serde_json::from_value(json!({"source": "a.pdf"})).unwrap();
        assert_eq!(
            m,
            Match::Flat {
                source: Some("a.pdf".into())
            }
        );

        let m: Match = serde_json::from_value(json!({"payload": {"source": "b.docx"}})).unwrap();
        assert_eq!(m.source_id(), Some("b.docx"));

        let m: Match = serde_json::from_value(json!("just text")).unwrap();
        assert_eq!(m, Match::Opaque);
    }

    #[test]
    fn test_match_payload_wins_over_top_level() {
        let m = Match::from(json!({"source": "c", "payload": {"source": "d"}}));
        assert_eq!(m.source_id(), Some("d"));
    }

    #[test]
    fn test_match_empty_payload_source_falls_back() {
        let m = Match::from(json!({"source": "c", "payload": {"source": ""}}));
        assert_eq!(m.source_id(), Some("c"));

        let m = Match::from(json!({"source": "c", "payload": null}));
        assert_eq!(m.source_id(), Some("c"));

        let m = Match::from(json!({"source": "c", "payload": "oops"}));
        assert_eq!(m.source_id(), Some("c"));
    }

    #[test]
    fn test_match_without_identifier() {
        let m = Match::from(json!({"payload": {"text": "body"}}));
        assert_eq!(m.source_id(), None);
        let m = Match::from(json!({"source": null, "score": 0.4}));
        assert_eq!(m.source_id(), None);
    }

    #[test]
    fn test_match_numeric_source() {
        let m = Match::from(json!({"payload": {"source": 7}}));
        assert_eq!(m.source_id(), Some("7"));
        let m = Match::from(json!({"payload": {"source": 0}, "source": "x"}));
        assert_eq!(m.source_id(), Some("x"));
    }

    #[test]
    fn test_reply_defaults() {
        let reply = ChatReply::from_json(json!({})).unwrap();
        assert_eq!(reply.answer, None);
        assert!(reply.matches.is_empty());
    }

    #[test]
    fn test_reply_falsy_answer() {
        let reply = ChatReply::from_json(json!({"answer": "", "matches": null})).unwrap();
        assert_eq!(reply.answer, None);
        assert!(reply.matches.is_empty());
    }

    #[test]
    fn test_reply_structured_answer_is_rendered() {
        let reply = ChatReply::from_json(json!({"answer": {"text": "hi"}})).unwrap();
        assert_eq!(reply.answer.as_deref(), Some(r#"{"text":"hi"}"#));
        let reply = ChatReply::from_json(json!({"answer": []})).unwrap();
        assert_eq!(reply.answer.as_deref(), Some("[]"));
        let reply = ChatReply::from_json(json!({"answer": false})).unwrap();
        assert_eq!(reply.answer, None);
    }

    #[test]
    fn test_reply_full() {
        let reply = ChatReply::from_json(json!({
            "answer": "Rust is a systems language.",
            "sources": ["ignored"],
            "matches": [{"score": 0.9, "payload": {"source": "rust.md", "text": "..."}}]
        }))
        .unwrap();
        assert_eq!(reply.answer.as_deref(), Some("Rust is a systems language."));
        assert_eq!(reply.matches.len(), 1);
        assert_eq!(reply.matches[0].source_id(), Some("rust.md"));
    }

    #[test]
    fn test_reply_not_an_object() {
        let err = ChatReply::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn test_index_reply_null_indexed() {
        let reply: IndexReply = serde_json::from_value(json!({"indexed": null})).unwrap();
        assert_eq!(reply.indexed, None);
        let reply: IndexReply = serde_json::from_value(json!({"indexed": 12})).unwrap();
        assert_eq!(reply.indexed, Some(12));
    }

    #[test]
    fn test_cms_item_skips_missing_title() {
        let item = CmsItem {
            id: "7".into(),
            title: None,
            body: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"id": "7", "body": "hello"})
        );
    }
}
