//! Core constants for the tag-in station.
//!
//! Centralizes the identifier sizes, file layout names, form/JSON field keys,
//! and timing defaults shared by the hardware, storage, station and web
//! crates.
//!
//! # Identifier Layout
//!
//! Readers report UIDs of 4, 7 or 10 bytes (ISO 14443 single, double and
//! triple size). The station always works with a 10-byte buffer, padding
//! shorter UIDs with zero bytes, and renders it as 20 uppercase hex digits:
//!
//! ```text
//! UID bytes   A2 36 3D 55
//! buffer      A2 36 3D 55 00 00 00 00 00 00
//! card id     "A2363D55000000000000"
//! ```
//!
//! # Usage
//!
//! ```
//! use tagin_core::constants::*;
//!
//! assert_eq!(CARD_ID_LENGTH, CARD_UID_LENGTH * 2);
//! assert_eq!(FIELD_CARD_ID, "user_rfid");
//! ```

// ============================================================================
// Identifiers
// ============================================================================

/// Size of the UID buffer in bytes (ISO 14443 triple-size UID).
pub const CARD_UID_LENGTH: usize = 10;

/// Length of the hexadecimal card id (two digits per UID byte).
pub const CARD_ID_LENGTH: usize = CARD_UID_LENGTH * 2;

// ============================================================================
// Field Keys
// ============================================================================
//
// Shared by the JSON bodies served to the dashboard and the form posted back
// by it.

/// Card identifier field.
pub const FIELD_CARD_ID: &str = "user_rfid";

/// Display name field.
pub const FIELD_NAME: &str = "user_name";

/// Arrival time field (`HH:MM`).
pub const FIELD_TAG_TIME: &str = "tag_time";

/// Prefix of every capability field (`perm_laser`, `perm_cnc`, ...).
pub const CAPABILITY_FIELD_PREFIX: &str = "perm_";

// ============================================================================
// File Layout
// ============================================================================

/// Member store file, relative to the data directory.
pub const MEMBER_STORE_FILE: &str = "tag-users.csv";

/// Changelog of committed member updates, relative to the data directory.
pub const MEMBER_CHANGELOG_FILE: &str = "changelog-user-updates.log";

/// Directory of daily tag logs, relative to the data directory.
pub const TAG_LOG_DIR: &str = "tag-log";

/// Directory of indicator sounds, relative to the resource directory.
pub const SOUND_DIR: &str = "tagsounds";

/// Dashboard page, relative to the resource directory.
pub const DASHBOARD_PAGE: &str = "template/tagin.html";

/// Suffix of the temporary file used while rewriting the member store.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

// ============================================================================
// Time Formats
// ============================================================================

/// Arrival time as shown on the dashboard.
pub const ARRIVAL_TIME_FORMAT: &str = "%H:%M";

/// Timestamp column of tag log and changelog lines.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date used in daily tag log file names.
pub const LOG_FILE_DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Timing
// ============================================================================

/// Watchdog timeout in milliseconds.
///
/// The reader is polled continuously, so three seconds without a completed
/// poll means the USB transport is wedged.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 3000;

/// How long a recognized tap lights the indicator, in milliseconds.
pub const RECOGNIZED_FLASH_MS: u64 = 200;

/// How long an unrecognized tap lights the indicator, in milliseconds.
pub const UNRECOGNIZED_FLASH_MS: u64 = 2000;

/// Browser cache lifetime of the dashboard page, in seconds.
pub const PAGE_CACHE_SECONDS: u32 = 10;
