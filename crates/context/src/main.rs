//! # PDFChat CLI (`pdfchat`)
//!
//! Terminal front end for the chat service.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfchat ask <file.pdf>` | Upload a PDF, then answer questions from `--question` or stdin |
//! | `pdfchat chat <document-id>` | Continue the conversation on an uploaded document |
//! | `pdfchat list` | List uploaded documents, newest first |
//! | `pdfchat history <document-id>` | Show a document's conversation, newest first |
//!
//! Configuration is layered from `config/default.toml`, `config/{APP_ENV}.toml`,
//! `config/local.toml` and `APP__*` environment variables, or read from
//! `--config <file>`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use pdfchat_common::config::{AppConfig, ObservabilityConfig};
use pdfchat_common::metrics::{self, EMBEDDING_BUCKETS, GENERATION_BUCKETS, METRICS_PREFIX};
use pdfchat_common::VERSION;
use pdfchat_context::{build_service, ChatService, ReplyStatus};
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Ask questions about PDF documents.
#[derive(Parser)]
#[command(name = "pdfchat", version, about = "Retrieval-augmented question answering over PDF documents")]
struct Cli {
    /// Path to a TOML configuration file; overrides the layered config/ lookup
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF, index it, and answer questions about it.
    Ask {
        /// PDF file to upload
        file: PathBuf,

        /// Document title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        /// Question to ask; repeatable. Reads questions from stdin when absent.
        #[arg(long, short)]
        question: Vec<String>,
    },

    /// Continue asking questions about an uploaded document.
    Chat {
        document_id: Uuid,

        #[arg(long, short)]
        question: Vec<String>,
    },

    /// List uploaded documents, newest first.
    List,

    /// Show a document's conversation, newest first.
    History { document_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config.observability);
    info!("Starting PDFChat v{}", VERSION);

    init_metrics(&config.observability)?;

    let service = build_service(&config)
        .await
        .context("failed to assemble chat service")?;

    match cli.command {
        Commands::Ask { file, title, question } => {
            let title = title.unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Untitled".to_string())
            });
            let document = service
                .upload(&title, &file)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            println!("Uploaded \"{}\" as {}", document.title, document.id);
            converse(&service, document.id, question).await?;
        }
        Commands::Chat { document_id, question } => {
            converse(&service, document_id, question).await?;
        }
        Commands::List => {
            for document in service.list_documents().await? {
                println!(
                    "{}  {}  {}  {}",
                    document.id,
                    document.uploaded_at.format("%Y-%m-%d %H:%M"),
                    if document.processed { "processed" } else { "pending" },
                    document.title
                );
            }
        }
        Commands::History { document_id } => {
            for turn in service.turns_for_display(document_id).await? {
                println!("[{}]", turn.timestamp.format("%Y-%m-%d %H:%M:%S"));
                println!("Q: {}", turn.question);
                println!("A: {}\n", turn.answer);
            }
        }
    }

    Ok(())
}

/// Answer the given questions, or read them from stdin until EOF
async fn converse(service: &ChatService, document_id: Uuid, questions: Vec<String>) -> anyhow::Result<()> {
    if !questions.is_empty() {
        for question in questions {
            ask_one(service, document_id, &question).await?;
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if let Err(e) = ask_one(service, document_id, question).await {
            eprintln!("error: {:#}", e);
        }
    }
    Ok(())
}

async fn ask_one(service: &ChatService, document_id: Uuid, question: &str) -> anyhow::Result<()> {
    let reply = service.ask(document_id, question).await?;
    match reply.status {
        ReplyStatus::Answered => {
            println!("{}", reply.answer);
            for source in &reply.sources {
                println!("  - page {} (score {:.3})", source.passage.page_number, source.score);
            }
        }
        ReplyStatus::Unavailable { kind } => {
            println!("{} [{}]", reply.answer, kind);
        }
    }
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", METRICS_PREFIX)),
            GENERATION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_embedding_duration_seconds", METRICS_PREFIX)),
            EMBEDDING_BUCKETS,
        )?
        .install()
        .context("failed to install Prometheus exporter")?;

    metrics::register_metrics();
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
