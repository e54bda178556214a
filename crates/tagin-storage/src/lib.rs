//! Durable state for the tagin station.
//!
//! - [`registry`]: the member registry, a CSV file mirrored in memory
//! - [`record`]: the store file's line codec
//! - [`changelog`]: append-only history of committed member edits
//! - [`audit`]: per-day tap logs behind the [`AuditSink`] seam

pub mod audit;
pub mod changelog;
pub mod error;
pub mod record;
pub mod registry;

pub use audit::{AuditSink, DailyCsvLog};
pub use changelog::{ChangeKind, Changelog};
pub use error::{StorageError, StorageResult};
pub use registry::{MemberRegistry, RegistryConfig, RejectReason, UpsertOutcome};
