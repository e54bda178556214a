//! Common types shared across hardware device implementations.
//!
//! This module defines the tag families a reader can report, reader metadata,
//! and LED colors used by the indicator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Radio family of a tag found in the reader field.
///
/// The station only accepts ISO 14443-A tags (Mifare and friends); other
/// families may show up in the field and are ignored by the card reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TagFamily {
    /// ISO 14443-A (Mifare Classic, Ultralight, DESFire, NTAG).
    Iso14443a,

    /// ISO 14443-B.
    Iso14443b,

    /// Sony FeliCa.
    Felica,

    /// ISO 15693 vicinity cards.
    Iso15693,

    /// Anything the reader could not classify.
    Other,
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso14443a => write!(f, "ISO14443A"),
            Self::Iso14443b => write!(f, "ISO14443B"),
            Self::Felica => write!(f, "FeliCa"),
            Self::Iso15693 => write!(f, "ISO15693"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A tag currently present in the reader field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Radio family the tag answered with.
    pub family: TagFamily,

    /// UID bytes as reported by the reader (4-10 bytes for ISO 14443).
    pub uid: Vec<u8>,
}

impl Target {
    pub fn new(family: TagFamily, uid: impl Into<Vec<u8>>) -> Self {
        Self {
            family,
            uid: uid.into(),
        }
    }

    /// Shorthand for an ISO 14443-A target.
    pub fn iso14443a(uid: impl Into<Vec<u8>>) -> Self {
        Self::new(TagFamily::Iso14443a, uid)
    }
}

/// RFID reader information.
///
/// Contains reader-specific metadata such as supported protocols
/// and maximum baud rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Reader name (e.g., "ACS ACR122U PICC Interface").
    pub name: String,

    /// List of supported protocols (e.g., ["ISO14443A", "ISO14443B"]).
    pub protocols: Vec<String>,

    /// Maximum supported baud rate in bits per second.
    pub max_baud_rate: Option<u32>,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, protocols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            protocols,
            max_baud_rate: None,
        }
    }

    /// Set the maximum baud rate.
    pub fn with_max_baud_rate(mut self, max_baud_rate: u32) -> Self {
        self.max_baud_rate = Some(max_baud_rate);
        self
    }
}

impl fmt::Display for ReaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.protocols.join(", "))
    }
}

/// Colors the status light is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Off,
    Red,
    Green,
}

impl LedColor {
    /// Get the RGB components of the LED color.
    pub fn as_rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Off => (0, 0, 0),
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
        }
    }

    /// Lowercase `rrggbb` hex, the form HTTP-driven lights expect.
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.as_rgb();
        format!("{r:02x}{g:02x}{b:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_info() {
        let info =
            ReaderInfo::new("ACR122U", vec!["ISO14443A".to_string()]).with_max_baud_rate(424000);

        assert_eq!(info.name, "ACR122U");
        assert_eq!(info.protocols, vec!["ISO14443A"]);
        assert_eq!(info.max_baud_rate, Some(424000));
        assert_eq!(info.to_string(), "ACR122U [ISO14443A]");
    }

    #[test]
    fn test_target_shorthand() {
        let target = Target::iso14443a(vec![0x04, 0xAB, 0xCD, 0xEF]);
        assert_eq!(target.family, TagFamily::Iso14443a);
        assert_eq!(target.uid.len(), 4);
    }

    #[test]
    fn test_led_color_hex() {
        assert_eq!(LedColor::Green.to_hex(), "00ff00");
        assert_eq!(LedColor::Red.to_hex(), "ff0000");
        assert_eq!(LedColor::Off.to_hex(), "000000");
    }
}
