//! Sound and light feedback after a tap.
//!
//! Two optional channels make up the station's [`Feedback`]:
//!
//! - [`Chime`] plays `accept.wav` or `attention.wav` through an external WAV
//!   player (aplay on the Raspberry Pi).
//! - [`Orb`] flashes a USB status light exposed by a small local HTTP daemon
//!   (`GET /set?c=rrggbb`), green briefly for a known card and red for
//!   longer for an unknown one.
//!
//! Both run as detached Tokio tasks. Failures are logged and otherwise
//! ignored: the reader loop never waits for feedback.

use crate::traits::Indicator;
use crate::types::LedColor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tagin_core::TapOutcome;
use tagin_core::constants::{RECOGNIZED_FLASH_MS, UNRECOGNIZED_FLASH_MS};
use tokio::process::Command;
use tracing::{debug, warn};

/// Sound played for a recognized card.
pub const ACCEPT_SOUND: &str = "accept.wav";

/// Sound played for an unrecognized card.
pub const ATTENTION_SOUND: &str = "attention.wav";

/// Default WAV player.
pub const DEFAULT_WAV_PLAYER: &str = "/usr/bin/aplay";

/// Default base URL of the orb daemon.
pub const DEFAULT_ORB_URL: &str = "http://127.0.0.1:9999";

/// Plays a short sound file per tap outcome.
#[derive(Debug, Clone)]
pub struct Chime {
    player: PathBuf,
    sound_dir: PathBuf,
}

impl Chime {
    pub fn new(player: impl Into<PathBuf>, sound_dir: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            sound_dir: sound_dir.into(),
        }
    }

    /// Sound file for `outcome`.
    pub fn sound_for(&self, outcome: TapOutcome) -> PathBuf {
        let file = if outcome.is_recognized() {
            ACCEPT_SOUND
        } else {
            ATTENTION_SOUND
        };
        self.sound_dir.join(file)
    }

    /// Spawn the player without waiting for it.
    pub fn play(&self, outcome: TapOutcome) {
        let player = self.player.clone();
        let sound = self.sound_for(outcome);

        tokio::spawn(async move {
            if let Err(e) = run_player(&player, &sound).await {
                warn!(sound = %sound.display(), "Failed to play sound: {}", e);
            }
        });
    }
}

async fn run_player(player: &Path, sound: &Path) -> std::io::Result<()> {
    let status = Command::new(player)
        .arg("-q")
        .arg(sound)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        debug!(%status, "WAV player exited unsuccessfully");
    }
    Ok(())
}

/// USB status light driven through its HTTP daemon.
#[derive(Debug, Clone)]
pub struct Orb {
    client: reqwest::Client,
    base_url: String,
}

impl Orb {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Color and duration of the flash for `outcome`.
    pub fn flash_for(outcome: TapOutcome) -> (LedColor, Duration) {
        match outcome {
            TapOutcome::Recognized => (LedColor::Green, Duration::from_millis(RECOGNIZED_FLASH_MS)),
            TapOutcome::Unrecognized => {
                (LedColor::Red, Duration::from_millis(UNRECOGNIZED_FLASH_MS))
            }
        }
    }

    /// URL that sets the orb to `color`.
    pub fn color_url(&self, color: LedColor) -> String {
        format!("{}/set?c={}", self.base_url, color.to_hex())
    }

    /// Flash the orb in the background, then switch it off.
    pub fn flash(&self, outcome: TapOutcome) {
        let (color, duration) = Self::flash_for(outcome);
        let orb = self.clone();

        tokio::spawn(async move {
            if let Err(e) = orb.set(color).await {
                // The orb is optional hardware; a missing daemon is routine.
                debug!("Orb unavailable: {}", e);
                return;
            }
            tokio::time::sleep(duration).await;
            if let Err(e) = orb.set(LedColor::Off).await {
                debug!("Failed to switch orb off: {}", e);
            }
        });
    }

    async fn set(&self, color: LedColor) -> reqwest::Result<()> {
        self.client
            .get(self.color_url(color))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// The station's tap feedback: any combination of sound and light.
#[derive(Debug, Clone, Default)]
pub struct Feedback {
    chime: Option<Chime>,
    orb: Option<Orb>,
}

impl Feedback {
    /// Feedback with no channels enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chime(mut self, chime: Chime) -> Self {
        self.chime = Some(chime);
        self
    }

    pub fn with_orb(mut self, orb: Orb) -> Self {
        self.orb = Some(orb);
        self
    }

    pub fn chime(&self) -> Option<&Chime> {
        self.chime.as_ref()
    }

    pub fn orb(&self) -> Option<&Orb> {
        self.orb.as_ref()
    }
}

impl Indicator for Feedback {
    fn trigger(&self, outcome: TapOutcome) {
        if let Some(chime) = &self.chime {
            chime.play(outcome);
        }
        if let Some(orb) = &self.orb {
            orb.flash(outcome);
        }
    }
}
