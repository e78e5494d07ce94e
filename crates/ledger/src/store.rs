use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use facit_core::CSV_HEADER;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Append-only sink for processed-invoice rows. Rows arrive preformatted
/// (five comma-separated fields); ordering between concurrent appenders is
/// the store's concern, not the pipeline's.
pub trait LedgerStore: Send + Sync {
    fn append(&self, row: &str) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// CSV table on local disk. The header is written the first time a row is
/// appended to a fresh table; after that every call appends one record.
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for FileLedger {
    async fn append(&self, row: &str) -> Result<(), LedgerError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let new_table = file.metadata().await?.len() == 0;

        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            if new_table {
                writer.write_record(CSV_HEADER.split(','))?;
            }
            writer.write_record(row.split(','))?;
            writer.flush()?;
        }
        file.write_all(&buf).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), "ledger row appended");
        Ok(())
    }
}

/// Marker row an upstream trigger writes when the processing service itself
/// cannot be reached, so the ledger records the event instead of silently
/// losing it. The detail is sanitized to keep the five-field shape.
pub fn service_unavailable_row(detail: &str) -> String {
    format!("ERROR,SERVICE_UNAVAILABLE - {},0,0,ERROR", detail.replace(',', " "))
}
