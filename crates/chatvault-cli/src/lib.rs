//! Shared plumbing for the `chatvault` binary: wiring a lifecycle manager from
//! configuration, tracing setup and output formatting.

use anyhow::Context;
use chatvault_core::models::AccessibleFile;
use chatvault_core::{Clock, Config, StorageBackend, SystemClock};
use chatvault_db::{setup_database, FileRecordRepository, FileRecordStore};
use chatvault_services::{FileLifecycleManager, LifecycleSettings};
use chatvault_storage::{create_storage, create_url_signer, ObjectStorage};
use std::path::Path;
use std::sync::Arc;

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Everything a command needs, built once per invocation.
pub struct App {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub storage: Arc<dyn ObjectStorage>,
    pub records: Arc<dyn FileRecordStore>,
    pub manager: Arc<FileLifecycleManager>,
}

impl App {
    /// Connect to the configured storage backend and Postgres.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate().context("Invalid configuration")?;
        ensure_durable_backend(&config)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage = create_storage(&config, clock.clone())
            .await
            .context("Failed to initialize object storage")?;
        let pool = setup_database(&config).await?;
        let records: Arc<dyn FileRecordStore> = Arc::new(FileRecordRepository::new(pool));

        Ok(Self::with_parts(config, clock, storage, records))
    }

    pub fn with_parts(
        config: Config,
        clock: Arc<dyn Clock>,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn FileRecordStore>,
    ) -> Self {
        let manager = Arc::new(FileLifecycleManager::new(
            storage.clone(),
            records.clone(),
            clock.clone(),
            LifecycleSettings::from_config(&config),
        ));
        Self {
            config,
            clock,
            storage,
            records,
            manager,
        }
    }

    /// Verify a signed URL issued by the local backend and read the blob.
    pub async fn open(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let signer = create_url_signer(&self.config, self.clock.clone())?;
        let storage_key = signer.verify(url).context("Signed URL rejected")?;
        let bytes = self
            .storage
            .get(&storage_key)
            .await
            .with_context(|| format!("Failed to read {}", storage_key))?;
        Ok(bytes)
    }
}

/// Blobs must outlive the process: records persist in Postgres, so an
/// in-process store would leave every row pointing at nothing after exit.
pub fn ensure_durable_backend(config: &Config) -> anyhow::Result<()> {
    if config.storage_backend() == StorageBackend::Memory {
        anyhow::bail!(
            "STORAGE_BACKEND=memory keeps blobs in process memory and cannot back the CLI; use local or s3"
        );
    }
    Ok(())
}

/// File name component of `path`, used as the attachment name.
pub fn upload_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a listing the way `chatvault list --format table` prints it.
pub fn render_table(conversation_id: &str, files: &[AccessibleFile]) -> String {
    let mut out = format!("\n=== Files in {} ===\n", conversation_id);

    if files.is_empty() {
        out.push_str("\nNo files found.\n");
        return out;
    }

    out.push_str(&format!(
        "\n{:<36} {:<30} {:<16} {:<20} {}\n",
        "ID", "File Name", "Sender", "Uploaded At", "URL"
    ));
    out.push_str(&"-".repeat(130));
    out.push('\n');

    for file in files {
        out.push_str(&format!(
            "{:<36} {:<30} {:<16} {:<20} {}\n",
            file.id(),
            truncate_string(file.file_name(), 30),
            truncate_string(&file.record.sender_id, 16),
            file.record.created_at.format("%Y-%m-%d %H:%M:%S"),
            file.file_url
                .as_deref()
                .map(|url| truncate_string(url, 60))
                .unwrap_or_else(|| "(unavailable)".to_string())
        ));
    }

    out.push_str(&format!("\nTotal: {} files\n", files.len()));
    out
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays usable for output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
