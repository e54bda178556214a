//! Command-line flags and the file layout derived from them.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tagin_core::constants::{
    DASHBOARD_PAGE, DEFAULT_WATCHDOG_TIMEOUT_MS, MEMBER_CHANGELOG_FILE, MEMBER_STORE_FILE,
    SOUND_DIR, TAG_LOG_DIR,
};
use tagin_hardware::indicator::{DEFAULT_ORB_URL, DEFAULT_WAV_PLAYER};
use tagin_storage::RegistryConfig;
use tagin_web::{DEFAULT_BIND_ADDR, WebConfig};

/// tagin - workshop card tap-in station
#[derive(Parser, Debug, Clone)]
#[command(name = "tagin")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listen address for the dashboard
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind_address: String,

    /// Directory holding the member store, tap log and changelog
    #[arg(long, default_value = "/home/pi")]
    pub data: PathBuf,

    /// Directory holding sounds and the dashboard template
    #[arg(long, default_value = "/home/pi")]
    pub resources: PathBuf,

    /// Terminate if the card reader has not been polled for this long
    #[arg(long, default_value_t = DEFAULT_WATCHDOG_TIMEOUT_MS)]
    pub watchdog_timeout_ms: u64,

    /// Base URL of the status light
    #[arg(long, default_value = DEFAULT_ORB_URL)]
    pub orb_url: String,

    /// Don't drive the status light
    #[arg(long)]
    pub no_orb: bool,

    /// Don't play sounds
    #[arg(long)]
    pub no_sound: bool,

    /// WAV player invoked for feedback sounds
    #[arg(long, default_value = DEFAULT_WAV_PLAYER)]
    pub wav_player: PathBuf,

    /// Start with an empty member store if none exists yet
    #[arg(long)]
    pub create_store: bool,
}

impl Args {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(self.data.join(MEMBER_STORE_FILE))
            .changelog(self.data.join(MEMBER_CHANGELOG_FILE))
            .create_if_missing(self.create_store)
    }

    pub fn tag_log_dir(&self) -> PathBuf {
        self.data.join(TAG_LOG_DIR)
    }

    pub fn sound_dir(&self) -> PathBuf {
        self.resources.join(SOUND_DIR)
    }

    pub fn web_config(&self) -> WebConfig {
        WebConfig::new(self.bind_address.clone(), self.resources.join(DASHBOARD_PAGE))
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn wav_player(&self) -> &Path {
        &self.wav_player
    }
}
