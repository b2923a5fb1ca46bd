use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdfchat::Result;
use pdfchat::commands::{ingest_document, serve_chat, show_config, show_status};

#[derive(Parser)]
#[command(name = "pdfchat")]
#[command(about = "Retrieval-augmented chat over a single PDF document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document into the vector index and chunk store
    Ingest {
        /// Path to the PDF (or plain text) document
        file: PathBuf,
        /// Namespace for this dataset; defaults to the file stem
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Start the chat HTTP server
    Serve {
        /// Host to bind; overrides the configured value
        #[arg(long)]
        host: Option<String>,
        /// Port to bind; overrides the configured value
        #[arg(long)]
        port: Option<u16>,
        /// Namespace to answer questions from; defaults to the configured value
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Show the active configuration
    Config,
    /// Show model server and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { file, namespace } => {
            ingest_document(&file, namespace).await?;
        }
        Commands::Serve {
            host,
            port,
            namespace,
        } => {
            serve_chat(host, port, namespace).await?;
        }
        Commands::Config => {
            show_config()?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
