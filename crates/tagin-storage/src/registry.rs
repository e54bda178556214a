//! The member registry: every known card, durably stored.
//!
//! The registry is the single owner of member records. It keeps the full
//! ordered record sequence plus a card id index in memory and mirrors the
//! sequence to a CSV store file (see [`record`](crate::record)).
//!
//! # Concurrency
//!
//! Readers take a short `RwLock` read guard on the in-memory snapshot and
//! are never blocked by file I/O. Writers serialize on an async mutex that
//! covers the whole read, mutate, persist and swap sequence, so upserts are
//! totally ordered and a lookup observes either the complete pre-write or
//! post-write state.
//!
//! Once a mutation is accepted the commit runs on its own task, so a caller
//! that goes away mid-write (a dropped HTTP request, a timeout) cannot leave
//! the file and the snapshot disagreeing.
//!
//! # Durability
//!
//! A commit writes the full sequence to `<store>.tmp`, syncs it and renames
//! it over the store. The in-memory snapshot changes only after the rename
//! succeeds, so an I/O failure leaves both file and memory untouched.
//!
//! # Examples
//!
//! ```no_run
//! use tagin_core::{CardId, MemberUpdate, Permissions};
//! use tagin_storage::{MemberRegistry, RegistryConfig};
//!
//! # async fn example() -> tagin_storage::StorageResult<()> {
//! let registry = MemberRegistry::open(RegistryConfig::new("tag-users.csv")).await?;
//!
//! let card = CardId::new("AABB0000000000000000")?;
//! let update = MemberUpdate::new("Alice", Permissions::default());
//! registry.upsert(&card, |record| Some(update.apply_to(record))).await?;
//!
//! assert_eq!(registry.lookup(&card).unwrap().name, "Alice");
//! # Ok(())
//! # }
//! ```

use crate::changelog::{ChangeKind, Changelog};
use crate::error::{StorageError, StorageResult};
use crate::record::{encode_record, parse_store};
use chrono::Local;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tagin_core::constants::{MEMBER_STORE_FILE, TEMP_FILE_SUFFIX};
use tagin_core::{CardId, MemberRecord};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Member registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Path to the CSV store file
    pub path: PathBuf,

    /// Where committed edits are logged, if anywhere
    pub changelog_path: Option<PathBuf>,

    /// Whether to start empty when the store file doesn't exist
    pub create_if_missing: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(MEMBER_STORE_FILE),
            changelog_path: None,
            create_if_missing: false,
        }
    }
}

impl RegistryConfig {
    /// Create a new registry configuration with the given store path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Log committed edits to `path`
    pub fn changelog(mut self, path: impl Into<PathBuf>) -> Self {
        self.changelog_path = Some(path.into());
        self
    }

    /// Set whether a missing store file starts an empty registry
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sibling file used for atomic replacement of the store.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(TEMP_FILE_SUFFIX);
        PathBuf::from(name)
    }
}

/// Why an upsert was not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The mutation returned `None`.
    MutationDeclined,
    /// The mutation changed the card id.
    CardIdChanged,
    /// The mutated record has no name.
    EmptyName,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::MutationDeclined => "mutation declined",
            RejectReason::CardIdChanged => "card id changed",
            RejectReason::EmptyName => "name is empty",
        };
        f.write_str(text)
    }
}

/// Result of [`MemberRegistry::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was appended.
    Inserted(MemberRecord),
    /// An existing record was replaced in place.
    Updated(MemberRecord),
    /// Nothing changed.
    Rejected(RejectReason),
}

impl UpsertOutcome {
    /// The committed record, if any.
    pub fn committed(&self) -> Option<&MemberRecord> {
        match self {
            UpsertOutcome::Inserted(record) | UpsertOutcome::Updated(record) => Some(record),
            UpsertOutcome::Rejected(_) => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed().is_some()
    }
}

/// In-memory state: records in store order plus their index.
#[derive(Debug, Default)]
struct Snapshot {
    records: Vec<MemberRecord>,
    index: HashMap<CardId, usize>,
}

impl Snapshot {
    /// Build from loaded records. A repeated card id replaces the earlier
    /// record in its original position.
    fn from_records(loaded: Vec<MemberRecord>) -> Self {
        let mut snapshot = Snapshot::default();
        for record in loaded {
            if let Some(&at) = snapshot.index.get(&record.card_id) {
                warn!(card_id = %record.card_id, "Duplicate card id in store, keeping the later entry");
                snapshot.records[at] = record;
            } else {
                snapshot.push(record);
            }
        }
        snapshot
    }

    fn push(&mut self, record: MemberRecord) {
        self.index.insert(record.card_id.clone(), self.records.len());
        self.records.push(record);
    }

    fn get(&self, card_id: &CardId) -> Option<&MemberRecord> {
        self.index.get(card_id).map(|&at| &self.records[at])
    }
}

/// Durable, concurrency-safe store of member records.
#[derive(Debug)]
pub struct MemberRegistry {
    shared: Arc<Shared>,
    writer: Arc<Mutex<()>>,
}

/// State reachable from a detached commit task.
#[derive(Debug)]
struct Shared {
    config: RegistryConfig,
    snapshot: RwLock<Arc<Snapshot>>,
    changelog: Option<Changelog>,
}

impl MemberRegistry {
    /// Load the registry from its store file.
    ///
    /// Malformed lines are skipped with a warning. A leftover temporary file
    /// from an interrupted write is reported and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store file cannot be read, or if it is missing
    /// and `create_if_missing` is not set.
    pub async fn open(config: RegistryConfig) -> StorageResult<Self> {
        let temp_path = config.temp_path();
        if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
            warn!(
                path = %temp_path.display(),
                "Found leftover temporary store file from an interrupted write"
            );
        }

        let text = match tokio::fs::read_to_string(&config.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && config.create_if_missing => {
                info!(path = %config.path.display(), "Store file missing, starting empty");
                String::new()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::Configuration(format!(
                    "Member store {} does not exist",
                    config.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut loaded = Vec::new();
        for stored in parse_store(&text) {
            match stored.record {
                Ok(record) => loaded.push(record),
                Err(e) => warn!(line = stored.line, "Skipping store line: {}", e),
            }
        }

        let snapshot = Snapshot::from_records(loaded);
        info!(
            path = %config.path.display(),
            members = snapshot.records.len(),
            "Member registry loaded"
        );

        let changelog = config.changelog_path.clone().map(Changelog::new);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                snapshot: RwLock::new(Arc::new(snapshot)),
                changelog,
            }),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Current record for `card_id`, if registered.
    pub fn lookup(&self, card_id: &CardId) -> Option<MemberRecord> {
        self.shared.read().get(card_id).cloned()
    }

    /// Unsaved record for an unknown card: empty name, no capabilities.
    pub fn placeholder(&self, card_id: &CardId) -> MemberRecord {
        MemberRecord::placeholder(card_id.clone())
    }

    /// Insert or update the record for `card_id`.
    ///
    /// `mutate` receives a private copy of the current record (or a
    /// placeholder). The result is committed only if `mutate` returns
    /// `Some`, the card id is unchanged and the name is not empty. A
    /// committed record is on disk before this returns.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the store cannot be written; the registry is
    /// unchanged in that case.
    pub async fn upsert<F>(&self, card_id: &CardId, mutate: F) -> StorageResult<UpsertOutcome>
    where
        F: FnOnce(MemberRecord) -> Option<MemberRecord>,
    {
        self.upsert_then(card_id, mutate, |_| {}).await
    }

    /// Like [`upsert`](Self::upsert), and run `on_commit` with the committed
    /// record before the next writer can start.
    ///
    /// Once the mutation has been accepted, persisting and swapping run on
    /// a spawned task. Dropping the returned future after that point does not
    /// abort the commit: the store, the in-memory snapshot, the changelog and
    /// `on_commit` all still happen, in that order.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the store cannot be written, or
    /// [`StorageError::Commit`] if the commit task panicked.
    pub async fn upsert_then<F, H>(
        &self,
        card_id: &CardId,
        mutate: F,
        on_commit: H,
    ) -> StorageResult<UpsertOutcome>
    where
        F: FnOnce(MemberRecord) -> Option<MemberRecord>,
        H: FnOnce(&MemberRecord) + Send + 'static,
    {
        let writer = Arc::clone(&self.writer).lock_owned().await;

        let current = self.shared.read();
        let existing = current.index.get(card_id).copied();
        let base = match existing {
            Some(at) => current.records[at].clone(),
            None => self.placeholder(card_id),
        };

        let Some(candidate) = mutate(base) else {
            return Ok(reject(card_id, RejectReason::MutationDeclined));
        };
        if candidate.card_id != *card_id {
            return Ok(reject(card_id, RejectReason::CardIdChanged));
        }
        if candidate.name.is_empty() {
            return Ok(reject(card_id, RejectReason::EmptyName));
        }

        let shared = Arc::clone(&self.shared);
        let commit = tokio::spawn(async move {
            let outcome = shared.commit(&current, existing, candidate).await;
            if let Ok(outcome) = &outcome
                && let Some(record) = outcome.committed()
            {
                on_commit(record);
            }
            drop(writer);
            outcome
        });
        commit.await?
    }

    /// All records in store order.
    pub fn members(&self) -> Vec<MemberRecord> {
        self.shared.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().records.is_empty()
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.shared.config.path
    }
}

fn reject(card_id: &CardId, reason: RejectReason) -> UpsertOutcome {
    warn!(card_id = %card_id, %reason, "Member update rejected");
    UpsertOutcome::Rejected(reason)
}

impl Shared {
    /// Persist `candidate` on top of `current`, then swap it in.
    ///
    /// Caller holds the writer lock.
    async fn commit(
        &self,
        current: &Snapshot,
        existing: Option<usize>,
        candidate: MemberRecord,
    ) -> StorageResult<UpsertOutcome> {
        let mut records = current.records.clone();
        let kind = match existing {
            Some(at) => {
                records[at] = candidate.clone();
                ChangeKind::Updated
            }
            None => {
                records.push(candidate.clone());
                ChangeKind::Inserted
            }
        };

        self.persist(&records).await?;

        let mut next = Snapshot {
            records,
            index: current.index.clone(),
        };
        if kind == ChangeKind::Inserted {
            next.index.insert(candidate.card_id.clone(), next.records.len() - 1);
        }
        *self.write() = Arc::new(next);

        info!(card_id = %candidate.card_id, name = %candidate.name, change = %kind, "Member record committed");
        self.log_change(kind, &candidate).await;

        Ok(match kind {
            ChangeKind::Inserted => UpsertOutcome::Inserted(candidate),
            ChangeKind::Updated => UpsertOutcome::Updated(candidate),
        })
    }

    async fn persist(&self, records: &[MemberRecord]) -> StorageResult<()> {
        let mut contents = String::with_capacity(records.len() * 64);
        for record in records {
            contents.push_str(&encode_record(record));
            contents.push('\n');
        }

        let temp_path = self.config.temp_path();
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.config.path).await?;
        debug!(path = %self.config.path.display(), records = records.len(), "Store file replaced");
        Ok(())
    }

    async fn log_change(&self, kind: ChangeKind, record: &MemberRecord) {
        let Some(changelog) = &self.changelog else {
            return;
        };
        if let Err(e) = changelog.append(kind, record, Local::now()).await {
            warn!(path = %changelog.path().display(), "Failed to append to changelog: {}", e);
        }
    }

    fn read(&self) -> Arc<Snapshot> {
        // Poisoning cannot leave a partial snapshot behind the Arc.
        let guard = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Snapshot>> {
        self.snapshot.write().unwrap_or_else(|e| e.into_inner())
    }
}
