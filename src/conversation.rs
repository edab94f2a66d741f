//! The conversation log and the display sinks it reports to.
//!
//! A [`ConversationLog`] is owned by whoever drives the conversation (a
//! [`Session`](crate::session::Session) or a one-shot CLI command) and is
//! passed to each component call. Appends are serialized in call order and
//! forwarded to a [`DisplaySink`], which decides how entries are shown.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{ConversationEntry, Speaker};

/// Rendering surface for conversation entries and one-off notices.
pub trait DisplaySink: Send {
    /// Show a newly appended conversation entry.
    fn append(&mut self, entry: &ConversationEntry);

    /// Show a notice that is not part of the conversation (upload results).
    fn notify(&mut self, message: &str);
}

/// Prints entries to stdout and notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl DisplaySink for TerminalSink {
    fn append(&mut self, entry: &ConversationEntry) {
        match entry.speaker {
            Speaker::Error => eprintln!("[{}] {}", entry.speaker.label(), entry.text),
            _ => println!("{}: {}", entry.speaker.label(), entry.text),
        }
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Keeps everything it is shown; cloning shares the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    entries: Vec<ConversationEntry>,
    notices: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ConversationEntry> {
        lock(&self.inner).entries.clone()
    }

    pub fn notices(&self) -> Vec<String> {
        lock(&self.inner).notices.clone()
    }
}

impl DisplaySink for MemorySink {
    fn append(&mut self, entry: &ConversationEntry) {
        lock(&self.inner).entries.push(entry.clone());
    }

    fn notify(&mut self, message: &str) {
        lock(&self.inner).notices.push(message.to_string());
    }
}

struct LogInner {
    entries: Vec<ConversationEntry>,
    sink: Box<dyn DisplaySink>,
}

/// Append-only record of a conversation.
///
/// Cheap to clone; clones share the same entries and sink, so requests
/// running concurrently append to one ordered log.
#[derive(Clone)]
pub struct ConversationLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ConversationLog {
    pub fn new(sink: Box<dyn DisplaySink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                entries: Vec::new(),
                sink,
            })),
        }
    }

    /// Append an entry and show it. Returns the stored entry.
    pub fn append(&self, speaker: Speaker, text: impl Into<String>) -> ConversationEntry {
        let mut inner = lock(&self.inner);
        let entry = ConversationEntry {
            seq: inner.entries.len() as u64,
            at: Utc::now(),
            speaker,
            text: text.into(),
        };
        inner.sink.append(&entry);
        inner.entries.push(entry.clone());
        entry
    }

    /// Forward a notice to the sink without recording it.
    pub fn notify(&self, message: &str) {
        lock(&self.inner).sink.notify(message);
    }

    pub fn entries(&self) -> Vec<ConversationEntry> {
        lock(&self.inner).entries.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ConversationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLog")
            .field("entries", &self.len())
            .finish()
    }
}

// A sink that panicked mid-append leaves the entries intact; keep going.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
