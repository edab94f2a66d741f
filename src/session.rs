//! Interactive chat session.
//!
//! A [`Session`] owns the conversation log, the current source filter and
//! the two request components. [`Session::run`] reads lines from any async
//! reader; plain lines are questions, lines starting with `/` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/upload <path>...` | upload files for indexing |
//! | `/source <name>` | restrict questions to one source |
//! | `/source` | clear the source filter |
//! | `/cancel` | cancel every question still waiting for an answer |
//! | `/help` | list commands |
//! | `/quit` | leave the session |
//!
//! Questions run as background tasks, so a new question can be typed while
//! an earlier one is still waiting for its answer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

use crate::api::ApiClient;
use crate::chat::{ChatOutcome, QueryDispatcher};
use crate::config::Config;
use crate::conversation::{ConversationLog, DisplaySink};
use crate::error::ClientError;
use crate::models::{CmsItem, UploadOutcome};
use crate::upload::{read_selection, UploadCoordinator};

const HELP: &str = "commands: /upload <path>..., /source [name], /cancel, /help, /quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Upload(Vec<PathBuf>),
    Source(Option<String>),
    Cancel,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Ask(trimmed.to_string());
    };
    let rest = rest.trim_start();

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match name {
        "upload" => Command::Upload(parts.map(PathBuf::from).collect()),
        "source" => {
            let value = rest[name.len()..].trim();
            Command::Source((!value.is_empty()).then(|| value.to_string()))
        }
        "cancel" => Command::Cancel,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

pub struct Session {
    log: ConversationLog,
    uploads: UploadCoordinator,
    dispatcher: Arc<QueryDispatcher>,
    source_filter: Option<String>,
    questions: JoinSet<Option<ChatOutcome>>,
}

impl Session {
    pub fn new(config: &Config, sink: Box<dyn DisplaySink>) -> Result<Self> {
        let api = ApiClient::new(&config.api)?;
        Ok(Self {
            log: ConversationLog::new(sink),
            uploads: UploadCoordinator::new(api.clone()),
            dispatcher: Arc::new(QueryDispatcher::new(api, config.chat.clone())),
            source_filter: None,
            questions: JoinSet::new(),
        })
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn source_filter(&self) -> Option<&str> {
        self.source_filter.as_deref()
    }

    pub fn set_source_filter(&mut self, source: Option<String>) {
        self.source_filter = source.filter(|s| !s.is_empty());
    }

    /// Ask a question and wait for its outcome.
    pub async fn ask(&self, input: &str) -> Option<ChatOutcome> {
        self.dispatcher
            .ask(&self.log, input, self.source_filter.as_deref())
            .await
    }

    /// Start a question in the background.
    ///
    /// The question is logged and registered before this returns; only
    /// sending it and reporting the outcome run in the background.
    pub fn spawn_ask(&mut self, input: &str) {
        let Some(question) = self
            .dispatcher
            .issue(&self.log, input, self.source_filter.as_deref())
        else {
            return;
        };
        let dispatcher = self.dispatcher.clone();
        let log = self.log.clone();
        self.questions
            .spawn(async move { Some(dispatcher.complete(&log, question).await) });
    }

    pub async fn upload(&self, paths: &[PathBuf]) -> Result<UploadOutcome, ClientError> {
        let selection = match read_selection(paths).await {
            Ok(selection) => selection,
            Err(err) => {
                self.log.notify(&err.to_string());
                return Err(err);
            }
        };
        self.uploads.submit(&self.log, selection).await
    }

    pub async fn ingest_cms(&self, items: Vec<CmsItem>) -> Result<UploadOutcome, ClientError> {
        self.uploads.ingest_cms(&self.log, items).await
    }

    /// Handle one input line. Returns `false` once the session should end.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Command::Ask(question) => {
                self.spawn_ask(&question);
            }
            Command::Upload(paths) => {
                // Failures were already reported to the sink.
                let _ = self.upload(&paths).await;
            }
            Command::Source(source) => {
                self.set_source_filter(source);
                match &self.source_filter {
                    Some(s) => self.log.notify(&format!("source filter: {}", s)),
                    None => self.log.notify("source filter cleared"),
                }
            }
            Command::Cancel => {
                if self.dispatcher.cancel_pending() == 0 {
                    self.log.notify("no pending question to cancel");
                }
            }
            Command::Help => self.log.notify(HELP),
            Command::Quit => return false,
            Command::Unknown(name) => {
                self.log.notify(&format!("unknown command: /{} ({})", name, HELP));
            }
        }
        true
    }

    /// Read lines until EOF or `/quit`, then wait for pending questions.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if !self.handle_line(&line).await {
                break;
            }
        }
        self.drain().await;
        Ok(())
    }

    /// Wait for every background question to finish.
    pub async fn drain(&mut self) {
        while let Some(joined) = self.questions.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "question task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MemorySink;

    #[test]
    fn test_parse_question() {
        assert_eq!(
            parse_command("  what is in the report?  "),
            Command::Ask("what is in the report?".into())
        );
        assert_eq!(parse_command("   "), Command::Ask(String::new()));
    }

    #[test]
    fn test_parse_upload() {
        assert_eq!(
            parse_command("/upload a.pdf docs/b.docx"),
            Command::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("docs/b.docx")])
        );
        assert_eq!(parse_command("/upload"), Command::Upload(vec![]));
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse_command("/source annual report.pdf"),
            Command::Source(Some("annual report.pdf".into()))
        );
        assert_eq!(parse_command("/source   "), Command::Source(None));
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/cancel"), Command::Cancel);
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("/frobnicate"), Command::Unknown("frobnicate".into()));
    }

    #[tokio::test]
    async fn test_filter_and_empty_upload_commands() {
        let sink = MemorySink::new();
        let mut session = Session::new(&Config::minimal(), Box::new(sink.clone())).unwrap();

        assert!(session.handle_line("/source cms:12").await);
        assert_eq!(session.source_filter(), Some("cms:12"));
        assert!(session.handle_line("/source").await);
        assert_eq!(session.source_filter(), None);
        assert!(session.handle_line("/upload").await);
        assert!(!session.handle_line("/quit").await);

        assert_eq!(
            sink.notices(),
            vec![
                "source filter: cms:12".to_string(),
                "source filter cleared".to_string(),
                "no files selected".to_string(),
            ]
        );
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_with_nothing_pending() {
        let sink = MemorySink::new();
        let mut session = Session::new(&Config::minimal(), Box::new(sink.clone())).unwrap();

        assert!(session.handle_line("/cancel").await);

        assert_eq!(sink.notices(), vec!["no pending question to cancel".to_string()]);
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_blank_lines_do_nothing() {
        let sink = MemorySink::new();
        let mut session = Session::new(&Config::minimal(), Box::new(sink.clone())).unwrap();

        session.run(&b"\n   \n\t\n"[..]).await.unwrap();

        assert!(session.log().is_empty());
        assert!(sink.notices().is_empty());
    }
}
