//! Append-only trade ledger
//!
//! One CSV row per simulated fill. The file is created with a fixed header
//! when absent and only ever grows: rows are never mutated, reordered, or
//! truncated after write, and each append is flushed to disk before the
//! cycle that produced it is considered complete.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::TradeRecord;

/// Fixed header row; column order matches the serde field order of
/// [`TradeRecord`].
pub const LEDGER_HEADER: [&str; 14] = [
    "utc",
    "exchange",
    "bot",
    "symbol",
    "side",
    "qty",
    "entry_px",
    "exit_px",
    "gross_pct",
    "net_pct",
    "fee_pct_rt",
    "pnl_usd",
    "runtime_sec",
    "notes",
];

pub struct TradeLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    // Separate handle for fsync; csv::Writer does not expose its inner file
    sync_handle: File,
}

impl TradeLog {
    /// Open the ledger at `path`, creating it with the header row if it does
    /// not exist yet. An existing file is opened for append and left intact.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create ledger dir {}", parent.display()))?;
            }
        }

        let needs_header = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open ledger {}", path.display()))?;
        let sync_handle = file
            .try_clone()
            .context("Failed to clone ledger file handle")?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(LEDGER_HEADER)
                .context("Failed to write ledger header")?;
            writer.flush().context("Failed to flush ledger header")?;
            sync_handle
                .sync_data()
                .context("Failed to sync ledger header")?;
        }

        Ok(TradeLog {
            path,
            writer,
            sync_handle,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and make it durable before returning
    pub fn append(&mut self, record: &TradeRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .context("Failed to serialize trade record")?;
        self.writer.flush().context("Failed to flush ledger")?;
        self.sync_handle
            .sync_data()
            .context("Failed to sync ledger")?;
        Ok(())
    }
}
