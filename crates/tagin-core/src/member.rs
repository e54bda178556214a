//! Member records and the events built from them.
//!
//! A [`MemberRecord`] ties a [`CardId`] to a display name and a fixed set of
//! [`Capability`] flags. Records with an empty name are *placeholders*: the
//! station synthesizes them for cards it has never seen, and they only become
//! real members once an administrator fills in a name.
//!
//! # JSON Shape
//!
//! Records serialize flat, with the same keys the dashboard form posts back:
//!
//! ```
//! use tagin_core::{CardId, MemberRecord};
//!
//! let id = CardId::new("A2363D55000000000000").unwrap();
//! let mut member = MemberRecord::placeholder(id);
//! member.name = "Alice".to_string();
//!
//! let json = serde_json::to_value(&member).unwrap();
//! assert_eq!(json["user_rfid"], "A2363D55000000000000");
//! assert_eq!(json["user_name"], "Alice");
//! assert_eq!(json["perm_laser"], false);
//! ```

use crate::constants::{ARRIVAL_TIME_FORMAT, FIELD_NAME};
use crate::{CardId, Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A workshop capability a member may be cleared for.
///
/// The declaration order is the column order of the member store file and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Printer3d,
    Laser,
    Vinyl,
    Cnc,
    Tablesaw,
    Electronics,
}

impl Capability {
    /// All capabilities in storage column order.
    pub const ALL: [Capability; 6] = [
        Capability::Printer3d,
        Capability::Laser,
        Capability::Vinyl,
        Capability::Cnc,
        Capability::Tablesaw,
        Capability::Electronics,
    ];

    /// Short name, e.g. `laser`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Capability::Printer3d => "printer3d",
            Capability::Laser => "laser",
            Capability::Vinyl => "vinyl",
            Capability::Cnc => "cnc",
            Capability::Tablesaw => "tablesaw",
            Capability::Electronics => "electronics",
        }
    }

    /// JSON and form key, e.g. `perm_laser`.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Capability::Printer3d => "perm_printer3d",
            Capability::Laser => "perm_laser",
            Capability::Vinyl => "perm_vinyl",
            Capability::Cnc => "perm_cnc",
            Capability::Tablesaw => "perm_tablesaw",
            Capability::Electronics => "perm_electronics",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.name() == s || cap.field() == s)
            .ok_or_else(|| Error::UnknownCapability(s.to_string()))
    }
}

/// The capability flags of one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(rename = "perm_printer3d", default)]
    pub printer3d: bool,

    #[serde(rename = "perm_laser", default)]
    pub laser: bool,

    #[serde(rename = "perm_vinyl", default)]
    pub vinyl: bool,

    #[serde(rename = "perm_cnc", default)]
    pub cnc: bool,

    #[serde(rename = "perm_tablesaw", default)]
    pub tablesaw: bool,

    #[serde(rename = "perm_electronics", default)]
    pub electronics: bool,
}

impl Permissions {
    /// Check a single capability.
    #[must_use]
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Printer3d => self.printer3d,
            Capability::Laser => self.laser,
            Capability::Vinyl => self.vinyl,
            Capability::Cnc => self.cnc,
            Capability::Tablesaw => self.tablesaw,
            Capability::Electronics => self.electronics,
        }
    }

    /// Grant or revoke a single capability.
    pub fn set(&mut self, capability: Capability, granted: bool) {
        let flag = match capability {
            Capability::Printer3d => &mut self.printer3d,
            Capability::Laser => &mut self.laser,
            Capability::Vinyl => &mut self.vinyl,
            Capability::Cnc => &mut self.cnc,
            Capability::Tablesaw => &mut self.tablesaw,
            Capability::Electronics => &mut self.electronics,
        };
        *flag = granted;
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, capability: Capability, granted: bool) -> Self {
        self.set(capability, granted);
        self
    }

    /// Flags in storage column order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        Capability::ALL.into_iter().map(|cap| (cap, self.get(cap)))
    }

    /// Returns `true` when no capability is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, granted)| !granted)
    }
}

/// A registered (or placeholder) member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Registry key; never changes once the record exists.
    #[serde(rename = "user_rfid")]
    pub card_id: CardId,

    /// Display name. Empty for placeholders.
    #[serde(rename = "user_name")]
    pub name: String,

    #[serde(flatten)]
    pub permissions: Permissions,
}

impl MemberRecord {
    /// Create a record for a named member.
    pub fn new(card_id: CardId, name: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            card_id,
            name: name.into(),
            permissions,
        }
    }

    /// A placeholder for a card nobody has registered yet: empty name, no
    /// capabilities.
    #[must_use]
    pub fn placeholder(card_id: CardId) -> Self {
        Self {
            card_id,
            name: String::new(),
            permissions: Permissions::default(),
        }
    }

    /// Returns `true` while the record still awaits a name.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty()
    }
}

/// Field values of one administrative edit.
///
/// Applying an update replaces the name and every capability flag; the card
/// id is never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberUpdate {
    pub name: String,
    pub permissions: Permissions,
}

impl MemberUpdate {
    pub fn new(name: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }

    /// Build an update from submitted form values.
    ///
    /// A capability is granted when its `perm_*` key is present with a
    /// non-empty value, which is how HTML checkboxes arrive. The name is
    /// trimmed.
    #[must_use]
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let name = form
            .get(FIELD_NAME)
            .map(|name| name.trim().to_string())
            .unwrap_or_default();

        let permissions = Capability::ALL
            .into_iter()
            .fold(Permissions::default(), |perms, cap| {
                let granted = form.get(cap.field()).is_some_and(|v| !v.is_empty());
                perms.with(cap, granted)
            });

        Self { name, permissions }
    }

    /// Apply the update to a record.
    #[must_use]
    pub fn apply_to(self, mut record: MemberRecord) -> MemberRecord {
        record.name = self.name;
        record.permissions = self.permissions;
        record
    }
}

/// Whether a tapped card belonged to a registered member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapOutcome {
    Recognized,
    Unrecognized,
}

impl TapOutcome {
    #[must_use]
    pub fn is_recognized(self) -> bool {
        matches!(self, TapOutcome::Recognized)
    }
}

impl fmt::Display for TapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TapOutcome::Recognized => write!(f, "recognized"),
            TapOutcome::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Who most recently tapped in, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalEvent {
    #[serde(flatten)]
    pub member: MemberRecord,

    #[serde(rename = "tag_time", serialize_with = "serialize_arrival_time")]
    pub arrived_at: DateTime<Local>,
}

impl ArrivalEvent {
    pub fn new(member: MemberRecord, arrived_at: DateTime<Local>) -> Self {
        Self { member, arrived_at }
    }

    /// Stamp a record with the current local time.
    #[must_use]
    pub fn now(member: MemberRecord) -> Self {
        Self::new(member, Local::now())
    }
}

fn serialize_arrival_time<S: Serializer>(
    at: &DateTime<Local>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&at.format(ARRIVAL_TIME_FORMAT))
}
