//! # docchat CLI
//!
//! Talks to a retrieval-augmented Q&A service: uploads documents for
//! indexing and asks questions about them.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat upload <files>...` | Upload documents for indexing |
//! | `docchat ask "<question>"` | Ask one question |
//! | `docchat chat` | Interactive session on stdin |
//! | `docchat ingest-cms <items.json>` | Index structured CMS items |
//! | `docchat health` | Check that the service is up |
//!
//! Diagnostics go through `tracing`; set `RUST_LOG=docchat=debug` to see
//! each request.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use docchat::api::ApiClient;
use docchat::chat::ChatOutcome;
use docchat::config;
use docchat::conversation::TerminalSink;
use docchat::session::Session;
use docchat::upload::load_cms_items;

/// docchat — ask questions about your documents.
///
/// All commands accept `--config` pointing to a TOML file. When the file
/// does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "docchat — ask questions about your documents",
    version,
    long_about = "docchat uploads documents to a retrieval-augmented Q&A service and asks \
    it questions. Answers are printed together with the documents they were drawn from."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    /// Override `api.base_url` from the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload documents for indexing.
    ///
    /// All files are sent in one request; the number of indexed text
    /// fragments is printed when the service accepts them.
    Upload {
        /// Files to upload, in order.
        files: Vec<PathBuf>,
    },

    /// Ask a single question and print the answer with its sources.
    Ask {
        /// The question.
        question: String,

        /// Only search fragments from this source (e.g. `report.pdf`, `cms:42`).
        #[arg(long)]
        source: Option<String>,
    },

    /// Start an interactive session reading questions from stdin.
    ///
    /// Type `/help` inside the session for commands.
    Chat {
        /// Initial source filter.
        #[arg(long)]
        source: Option<String>,
    },

    /// Index structured items from a JSON file (`{"items": [...]}`).
    IngestCms {
        /// Path to the items file.
        path: PathBuf,
    },

    /// Check whether the service is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = config::load_config(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        cfg.api.base_url = base_url;
        config::validate(&cfg)?;
    }

    let mut session = Session::new(&cfg, Box::new(TerminalSink))?;

    let ok = match cli.command {
        Commands::Upload { files } => session.upload(&files).await.is_ok(),
        Commands::Ask { question, source } => {
            session.set_source_filter(source);
            matches!(
                session.ask(&question).await,
                Some(ChatOutcome::Answered { .. }) | None
            )
        }
        Commands::Chat { source } => {
            session.set_source_filter(source);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            session.run(stdin).await?;
            true
        }
        Commands::IngestCms { path } => {
            let items = load_cms_items(&path)?;
            session.ingest_cms(items).await.is_ok()
        }
        Commands::Health => {
            let api = ApiClient::new(&cfg.api)?;
            match api.health().await {
                Ok(health) => {
                    match health.dim {
                        Some(dim) => println!("{}: ok={} dim={}", api.base_url(), health.ok, dim),
                        None => println!("{}: ok={}", api.base_url(), health.ok),
                    }
                    health.ok
                }
                Err(err) => {
                    eprintln!("{}: unreachable ({})", api.base_url(), err);
                    false
                }
            }
        }
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
