//! # docchat
//!
//! A client for retrieval-augmented document Q&A services.
//!
//! docchat uploads documents to a service for indexing and asks it
//! questions. Answers are attributed to the documents the service
//! retrieved them from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │   Session    │──▶│ UploadCoordinator│──▶│ POST /upload  │
//! │ (CLI / REPL) │   └──────────────────┘   └───────────────┘
//! │              │   ┌──────────────────┐   ┌───────────────┐
//! │              │──▶│ QueryDispatcher  │──▶│ POST /chat    │
//! └──────┬───────┘   └────────┬─────────┘   └───────────────┘
//!        │                    ▼
//!        │            ┌───────────────┐
//!        │            │  attribution  │
//!        ▼            └───────────────┘
//! ┌──────────────┐
//! │ConversationLog──▶ DisplaySink (terminal, memory)
//! └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat health
//! docchat upload handbook.pdf faq.docx
//! docchat ask "How many vacation days do I get?"
//! docchat chat --source handbook.pdf
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request, response and conversation types |
//! | [`error`] | Component boundary errors |
//! | [`api`] | Shared HTTP plumbing |
//! | [`upload`] | Document and CMS indexing |
//! | [`chat`] | Questions and outcome classification |
//! | [`attribution`] | Source deduplication and rendering |
//! | [`conversation`] | Conversation log and display sinks |
//! | [`session`] | Interactive session |

pub mod api;
pub mod attribution;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod session;
pub mod upload;
