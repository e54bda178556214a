//! Append-only history of committed member edits.
//!
//! Each committed upsert adds one line:
//!
//! ```text
//! 2025-03-14 09:05:00,inserted,AABB0000000000000000,Alice,true,false,false,false,false,false
//! ```
//!
//! The store file only ever holds the latest state; this log is what lets an
//! administrator see who was granted what, and when.

use crate::error::StorageResult;
use crate::record::encode_record;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use tagin_core::MemberRecord;
use tagin_core::constants::LOG_TIMESTAMP_FORMAT;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Kind of committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Inserted => "inserted",
            ChangeKind::Updated => "updated",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changelog file handle. Opens the file per append.
#[derive(Debug, Clone)]
pub struct Changelog {
    path: PathBuf,
}

impl Changelog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one change, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub async fn append(
        &self,
        kind: ChangeKind,
        record: &MemberRecord,
        at: DateTime<Local>,
    ) -> StorageResult<()> {
        let line = format_entry(kind, record, at);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_entry(kind: ChangeKind, record: &MemberRecord, at: DateTime<Local>) -> String {
    format!(
        "{},{},{}\n",
        at.format(LOG_TIMESTAMP_FORMAT),
        kind,
        encode_record(record)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tagin_core::{CardId, Permissions};

    fn alice() -> MemberRecord {
        MemberRecord::new(
            CardId::new("AABB0000000000000000").unwrap(),
            "Alice",
            Permissions::default(),
        )
    }

    #[test]
    fn test_format_entry() {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 0).unwrap();

        assert_eq!(
            format_entry(ChangeKind::Inserted, &alice(), at),
            "2025-03-14 09:05:00,inserted,AABB0000000000000000,Alice,false,false,false,false,false,false\n"
        );
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let changelog = Changelog::new(dir.path().join("changes.log"));

        changelog
            .append(ChangeKind::Inserted, &alice(), Local::now())
            .await
            .unwrap();
        changelog
            .append(ChangeKind::Updated, &alice(), Local::now())
            .await
            .unwrap();

        let text = std::fs::read_to_string(changelog.path()).unwrap();
        let kinds: Vec<&str> = text
            .lines()
            .map(|line| line.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(kinds, vec!["inserted", "updated"]);
    }
}
