//! Tap audit log.
//!
//! Every tap of a real card is appended to a per-day CSV file so the
//! workshop can reconstruct who was in on a given day:
//!
//! ```text
//! tag-log/log-2025-03-14.csv
//!   2025-03-14 09:05:00,AABB0000000000000000
//!   2025-03-14 09:41:17,CCDD0000000000000000
//! ```
//!
//! The log is written by the tap orchestrator only and is never read back
//! by the station.

#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use chrono::{DateTime, Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagin_core::CardId;
use tagin_core::constants::{LOG_FILE_DATE_FORMAT, LOG_TIMESTAMP_FORMAT};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Destination for tap audit entries.
///
/// A failed append is reported to the caller, which logs it and moves on;
/// losing an audit line never stops the station.
pub trait AuditSink: Send + Sync {
    /// Record that `card_id` was tapped at `at`.
    async fn append(&self, card_id: &CardId, at: DateTime<Local>) -> StorageResult<()>;
}

impl<A: AuditSink> AuditSink for Arc<A> {
    async fn append(&self, card_id: &CardId, at: DateTime<Local>) -> StorageResult<()> {
        (**self).append(card_id, at).await
    }
}

/// Audit sink writing one CSV file per local calendar day.
#[derive(Debug, Clone)]
pub struct DailyCsvLog {
    dir: PathBuf,
}

impl DailyCsvLog {
    /// Open the log directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "Tap log directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entries of `date`.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("log-{}.csv", date.format(LOG_FILE_DATE_FORMAT)))
    }
}

impl AuditSink for DailyCsvLog {
    async fn append(&self, card_id: &CardId, at: DateTime<Local>) -> StorageResult<()> {
        let path = self.file_for(at.date_naive());
        let line = format!("{},{}\n", at.format(LOG_TIMESTAMP_FORMAT), card_id);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("tag-log");

        let log = DailyCsvLog::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(log.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_entries_split_by_day() {
        let root = tempfile::tempdir().unwrap();
        let log = DailyCsvLog::open(root.path()).await.unwrap();

        let morning = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2025, 3, 14, 21, 30, 12).unwrap();
        let next_day = Local.with_ymd_and_hms(2025, 3, 15, 8, 0, 0).unwrap();

        log.append(&card("AABB0000000000000000"), morning).await.unwrap();
        log.append(&card("CCDD0000000000000000"), evening).await.unwrap();
        log.append(&card("AABB0000000000000000"), next_day).await.unwrap();

        let first = std::fs::read_to_string(root.path().join("log-2025-03-14.csv")).unwrap();
        assert_eq!(
            first,
            "2025-03-14 09:05:00,AABB0000000000000000\n\
             2025-03-14 21:30:12,CCDD0000000000000000\n"
        );

        let second = std::fs::read_to_string(root.path().join("log-2025-03-15.csv")).unwrap();
        assert_eq!(second, "2025-03-15 08:00:00,AABB0000000000000000\n");
    }

    #[tokio::test]
    async fn test_append_fails_when_directory_vanishes() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("tag-log");
        let log = DailyCsvLog::open(&dir).await.unwrap();
        std::fs::remove_dir(&dir).unwrap();

        let result = log.append(&card("AABB0000000000000000"), Local::now()).await;
        assert!(result.is_err());
    }
}
