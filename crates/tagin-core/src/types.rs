use crate::{
    Result,
    constants::{CARD_ID_LENGTH, CARD_UID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Raw card UID as reported by the reader, in a fixed 10-byte buffer.
///
/// Shorter UIDs (4 or 7 bytes) are right-padded with zero bytes. The
/// all-zero buffer is reserved: readers report it when no real tag was
/// decoded, so it never identifies a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CardUid([u8; CARD_UID_LENGTH]);

impl CardUid {
    /// The reserved all-zero UID.
    pub const BLANK: CardUid = CardUid([0; CARD_UID_LENGTH]);

    /// Create a UID from the bytes reported by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if the slice is longer than 10 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > CARD_UID_LENGTH {
            return Err(Error::InvalidUid(format!(
                "UID must be at most {CARD_UID_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; CARD_UID_LENGTH];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(CardUid(buf))
    }

    /// Parse a UID from hexadecimal text, as typed by keyboard-wedge readers.
    ///
    /// Whitespace and `:` separators are ignored.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` on an odd digit count, a non-hex digit, or
    /// more than 10 bytes.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: Vec<u8> = text
            .bytes()
            .filter(|b| !b.is_ascii_whitespace() && *b != b':')
            .collect();
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(Error::InvalidUid(format!(
                "UID must have an even number of hex digits: {text:?}"
            )));
        }
        let bytes = digits
            .chunks(2)
            .map(|pair| -> Result<u8> { Ok((hex_value(pair[0])? << 4) | hex_value(pair[1])?) })
            .collect::<Result<Vec<u8>>>()?;
        Self::from_slice(&bytes)
    }

    /// Returns `true` for the reserved all-zero UID.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0 == [0; CARD_UID_LENGTH]
    }

    /// Get the raw buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CARD_UID_LENGTH] {
        &self.0
    }

    /// The card id under which this UID is registered.
    #[must_use]
    pub fn card_id(&self) -> CardId {
        CardId(self.to_string())
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(Error::InvalidUid(format!(
            "Invalid hex digit: {:?}",
            digit as char
        ))),
    }
}

/// Card identifier: 20 uppercase hex digits.
///
/// This is the key of the member registry and the token exchanged with the
/// dashboard. It is opaque to everything except [`CardUid::card_id`].
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when comparing card ids.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Create a card id with validation.
    ///
    /// The input is normalized (trimmed and converted to uppercase) before
    /// validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` if:
    /// - The id is not exactly 20 characters
    /// - The id contains anything but hex digits
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim().to_uppercase();

        if id.len() != CARD_ID_LENGTH {
            return Err(Error::InvalidCardId(format!(
                "Card id must be {CARD_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardId(format!(
                "Card id must be hexadecimal: {id}"
            )));
        }

        Ok(CardId(id))
    }

    /// Get the card id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the id of the reserved all-zero UID.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s)
    }
}

impl TryFrom<String> for CardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardId::new(&value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

impl From<CardUid> for CardId {
    fn from(uid: CardUid) -> Self {
        uid.card_id()
    }
}

/// Constant-time comparison implementation for CardId
///
/// This prevents timing attacks by ensuring comparison takes the same time
/// regardless of where the strings differ.
impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0xA2, 0x36, 0x3D, 0x55], "A2363D55000000000000")]
    #[case(&[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66], "04112233445566000000")]
    #[case(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A], "0102030405060708090A")]
    fn test_uid_pads_to_card_id(#[case] bytes: &[u8], #[case] expected: &str) {
        let uid = CardUid::from_slice(bytes).unwrap();
        assert_eq!(uid.card_id().as_str(), expected);
        assert!(!uid.is_blank());
    }

    #[test]
    fn test_uid_too_long() {
        assert!(CardUid::from_slice(&[0x01; 11]).is_err());
    }

    #[test]
    fn test_blank_uid() {
        assert!(CardUid::BLANK.is_blank());
        assert!(CardUid::from_slice(&[]).unwrap().is_blank());
        assert!(CardUid::BLANK.card_id().is_blank());
    }

    #[rstest]
    #[case("a2363d55", "A2363D55000000000000")]
    #[case("A2:36:3D:55", "A2363D55000000000000")]
    #[case(" 04 11 22 33 44 55 66\n", "04112233445566000000")]
    fn test_uid_from_hex(#[case] text: &str, #[case] expected: &str) {
        let uid = CardUid::from_hex(text).unwrap();
        assert_eq!(uid.to_string(), expected);
    }

    #[rstest]
    #[case("")] // empty
    #[case("ABC")] // odd length
    #[case("ZZ112233")] // not hex
    #[case("0102030405060708090A0B")] // 11 bytes
    fn test_uid_from_hex_invalid(#[case] text: &str) {
        assert!(CardUid::from_hex(text).is_err());
    }

    #[rstest]
    #[case("a2363d55000000000000", "A2363D55000000000000")]
    #[case("  0102030405060708090A ", "0102030405060708090A")]
    fn test_card_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id = CardId::new(input).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("AABB")] // too short
    #[case("0102030405060708090A0B")] // too long
    #[case("G102030405060708090A")] // not hex
    fn test_card_id_invalid(#[case] input: &str) {
        let result: Result<CardId> = input.parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_card_id_equality_and_hash() {
        use std::collections::HashMap;

        let a = CardId::new("a2363d55000000000000").unwrap();
        let b = CardId::new("A2363D55000000000000").unwrap();
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn test_card_id_serde() {
        let id = CardId::new("A2363D55000000000000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"A2363D55000000000000\"");

        let bad: std::result::Result<CardId, _> = serde_json::from_str("\"AABB\"");
        assert!(bad.is_err());
    }
}
