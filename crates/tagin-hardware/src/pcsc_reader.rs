//! PC/SC contactless reader driver (ACR122U and compatible).
//!
//! Only compiled with the `hardware-pcsc` feature, which links against
//! `libpcsclite`. The UID is read with the PC/SC "Get Data" pseudo-APDU
//! (`FF CA 00 00 00`), and the tag family is taken from the ATR that the
//! reader synthesizes for contactless cards.
//!
//! PC/SC calls block, so each poll runs on Tokio's blocking pool.

use crate::error::{HardwareError, Result};
use crate::traits::TagReader;
use crate::types::{ReaderInfo, TagFamily, Target};
use pcsc::{Attribute, Context, Protocols, Scope, ShareMode};
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, info};

/// PC/SC "Get Data" command returning the tag UID.
const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Registered application provider identifier of the PC/SC workgroup,
/// followed in the ATR by the card standard byte.
const PCSC_RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

/// Status word for a successful APDU.
const SW_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Default pause after a poll that found no card.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_millis(100);

/// Contactless reader accessed through the PC/SC daemon.
pub struct PcscTagReader {
    context: Context,
    reader: CString,
    scan_window: Duration,
}

impl PcscTagReader {
    /// Connect to the first reader the PC/SC daemon knows about.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or no reader is
    /// attached.
    pub fn open_first() -> Result<Self> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        let readers = context.list_readers_owned().map_err(map_pcsc_error)?;
        let reader = readers
            .into_iter()
            .next()
            .ok_or_else(|| HardwareError::initialization_failed("No PC/SC reader attached"))?;

        info!(reader = %reader.to_string_lossy(), "Opened PC/SC reader");
        Ok(Self {
            context,
            reader,
            scan_window: DEFAULT_SCAN_WINDOW,
        })
    }

    /// Connect to a reader by its PC/SC name.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or the name is invalid.
    pub fn open(name: &str) -> Result<Self> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        let reader = CString::new(name)
            .map_err(|_| HardwareError::initialization_failed("Reader name contains NUL"))?;

        Ok(Self {
            context,
            reader,
            scan_window: DEFAULT_SCAN_WINDOW,
        })
    }

    pub fn with_scan_window(mut self, scan_window: Duration) -> Self {
        self.scan_window = scan_window;
        self
    }

    fn poll_blocking(context: &Context, reader: &CString) -> Result<Option<Target>> {
        let Some(card) = card_level(context.connect(reader, ShareMode::Shared, Protocols::ANY))?
        else {
            return Ok(None);
        };
        let Some(atr) = card_level(card.get_attribute_owned(Attribute::AtrString))? else {
            return Ok(None);
        };

        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        let Some(response) = card_level(card.transmit(&GET_UID_APDU, &mut buffer))? else {
            return Ok(None);
        };

        let uid = uid_from_response(response)?;
        Ok(Some(Target::new(family_from_atr(&atr), uid)))
    }
}

impl TagReader for PcscTagReader {
    async fn list_passive_targets(&mut self) -> Result<Vec<Target>> {
        let context = self.context.clone();
        let reader = self.reader.clone();

        let polled = tokio::task::spawn_blocking(move || Self::poll_blocking(&context, &reader))
            .await
            .map_err(|e| HardwareError::communication(format!("PC/SC poll task failed: {e}")))??;

        match polled {
            Some(target) => Ok(vec![target]),
            None => {
                tokio::time::sleep(self.scan_window).await;
                Ok(Vec::new())
            }
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(
            self.reader.to_string_lossy(),
            vec!["ISO14443A".to_string(), "ISO14443B".to_string(), "FeliCa".to_string()],
        )
        .with_max_baud_rate(424000))
    }
}

/// Strip the status word from a "Get Data" response.
fn uid_from_response(response: &[u8]) -> Result<Vec<u8>> {
    match response.split_last_chunk::<2>() {
        Some((uid, sw)) if *sw == SW_SUCCESS && !uid.is_empty() => Ok(uid.to_vec()),
        Some((_, sw)) => Err(HardwareError::invalid_data(format!(
            "Get UID failed with status {:02X}{:02X}",
            sw[0], sw[1]
        ))),
        None => Err(HardwareError::invalid_data("Truncated Get UID response")),
    }
}

/// Tag family from a PC/SC contactless ATR.
///
/// ATRs without the PC/SC RID belong to ISO 14443-4 cards, which readers
/// of this class only see over type A.
fn family_from_atr(atr: &[u8]) -> TagFamily {
    let standard = atr
        .windows(PCSC_RID.len())
        .position(|window| window == PCSC_RID)
        .and_then(|at| atr.get(at + PCSC_RID.len()).copied());

    match standard {
        None => TagFamily::Iso14443a,
        Some(0x01..=0x03) => TagFamily::Iso14443a,
        Some(0x05..=0x07) => TagFamily::Iso14443b,
        Some(0x09..=0x0B) => TagFamily::Iso15693,
        Some(0x11) => TagFamily::Felica,
        Some(other) => {
            debug!(standard = other, "Unrecognized card standard in ATR");
            TagFamily::Other
        }
    }
}

/// Whether `error` is about the card in the field rather than the reader.
///
/// A tag pulled away mid-read, or one that never answered, is the same as
/// no tag at all.
fn is_card_level(error: &pcsc::Error) -> bool {
    matches!(
        error,
        pcsc::Error::NoSmartcard
            | pcsc::Error::RemovedCard
            | pcsc::Error::ResetCard
            | pcsc::Error::UnpoweredCard
            | pcsc::Error::UnresponsiveCard
    )
}

/// Card-level failures become `None`, reader-level ones an error.
fn card_level<T>(result: std::result::Result<T, pcsc::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_card_level(&e) => {
            debug!(error = %e, "Card left the field during poll");
            Ok(None)
        }
        Err(e) => Err(map_pcsc_error(e)),
    }
}

fn map_pcsc_error(error: pcsc::Error) -> HardwareError {
    match error {
        pcsc::Error::NoService
        | pcsc::Error::ServiceStopped
        | pcsc::Error::NoReadersAvailable
        | pcsc::Error::ReaderUnavailable
        | pcsc::Error::UnknownReader => HardwareError::disconnected(error.to_string()),
        other => HardwareError::communication(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_storage_card_atr() {
        // MIFARE Classic 1K on an ACR122U
        let atr = [
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x6A,
        ];
        assert_eq!(family_from_atr(&atr), TagFamily::Iso14443a);
    }

    #[test]
    fn test_family_from_felica_atr() {
        let atr = [
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x11, 0x00,
            0x3B, 0x00, 0x00, 0x00, 0x00, 0x42,
        ];
        assert_eq!(family_from_atr(&atr), TagFamily::Felica);
    }

    #[test]
    fn test_family_without_rid_defaults_to_type_a() {
        // DESFire EV1
        let atr = [0x3B, 0x81, 0x80, 0x01, 0x80, 0x80];
        assert_eq!(family_from_atr(&atr), TagFamily::Iso14443a);
    }

    #[test]
    fn test_uid_from_response() {
        let uid = uid_from_response(&[0x04, 0xAB, 0xCD, 0xEF, 0x90, 0x00]).unwrap();
        assert_eq!(uid, vec![0x04, 0xAB, 0xCD, 0xEF]);

        assert!(uid_from_response(&[0x63, 0x00]).is_err());
        assert!(uid_from_response(&[0x90]).is_err());
        assert!(uid_from_response(&[0x90, 0x00]).is_err());
    }

    #[test]
    fn test_card_level_errors_mean_no_card() {
        for error in [
            pcsc::Error::NoSmartcard,
            pcsc::Error::RemovedCard,
            pcsc::Error::ResetCard,
            pcsc::Error::UnpoweredCard,
            pcsc::Error::UnresponsiveCard,
        ] {
            assert!(matches!(card_level::<()>(Err(error)), Ok(None)));
        }
    }

    #[test]
    fn test_reader_level_errors_stay_fatal() {
        assert!(matches!(
            card_level::<()>(Err(pcsc::Error::ReaderUnavailable)),
            Err(HardwareError::Disconnected { .. })
        ));
        assert!(matches!(
            card_level::<()>(Err(pcsc::Error::NoService)),
            Err(HardwareError::Disconnected { .. })
        ));
        assert!(matches!(card_level(Ok(7u8)), Ok(Some(7))));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_pcsc_error(pcsc::Error::ReaderUnavailable),
            HardwareError::Disconnected { .. }
        ));
        assert!(matches!(
            map_pcsc_error(pcsc::Error::Timeout),
            HardwareError::CommunicationError { .. }
        ));
    }
}
