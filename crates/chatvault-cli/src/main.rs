//! chatvault: manage conversation attachments from the command line.
//!
//! Reads the same environment as the services (`DATABASE_URL`, `STORAGE_BACKEND`, ...).

use anyhow::Context;
use bytes::Bytes;
use chatvault_cli::{init_tracing, render_table, upload_name, App, OutputFormat};
use chatvault_core::models::FileUpload;
use chatvault_core::{Config, ErrorMetadata};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "chatvault", about = "Conversation attachment storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to a conversation
    Upload {
        /// Conversation the file belongs to
        #[arg(long)]
        conversation: String,
        /// User uploading the file
        #[arg(long)]
        sender: String,
        /// Content type stored with the blob (default: application/octet-stream)
        #[arg(long)]
        content_type: Option<String>,
        /// Path to the file to upload
        file: PathBuf,
    },
    /// List a conversation's files with freshly signed URLs
    List {
        #[arg(long)]
        conversation: String,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Delete a file and its record
    Delete {
        /// File record UUID
        #[arg(long)]
        id: Uuid,
    },
    /// Download the blob behind a signed URL (local backend)
    Open {
        url: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let app = App::from_config(config).await?;

    match cli.command {
        Commands::Upload {
            conversation,
            sender,
            content_type,
            file,
        } => {
            let name = upload_name(&file)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let mut upload = FileUpload::new(name, Bytes::from(bytes));
            if let Some(content_type) = content_type {
                upload = upload.with_content_type(content_type);
            }

            let record = app
                .manager
                .upload(&conversation, &sender, upload)
                .await
                .map_err(|e| {
                    tracing::error!(error_code = e.error_code(), error = %e, "Upload failed");
                    e
                })?;
            print_json(&record)?;
        }
        Commands::List {
            conversation,
            format,
        } => {
            let files = app.manager.list(&conversation).await?;
            match format {
                OutputFormat::Json => print_json(&files)?,
                OutputFormat::Table => print!("{}", render_table(&conversation, &files)),
            }
        }
        Commands::Delete { id } => {
            let record = app
                .records
                .get_by_id(id)
                .await?
                .with_context(|| format!("File {} not found", id))?;

            app.manager.delete(&record).await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("File {} deleted", id),
            }))?;
        }
        Commands::Open { url, output } => {
            let bytes = app.open(&url).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(())
}
