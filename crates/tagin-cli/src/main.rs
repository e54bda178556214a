//! tagin - workshop card tap-in station
//!
//! Wires the card reader, member registry, tap log, feedback devices and
//! dashboard together and runs until the reader fails. Every fatal
//! condition ends the process with a non-zero status so a supervisor can
//! restart it.

mod args;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use tagin_hardware::{CardReader, Chime, Feedback, Indicator, Orb, TagReader, Watchdog};
use tagin_station::{Station, TapOrchestrator};
use tagin_storage::{AuditSink, DailyCsvLog, MemberRegistry};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting tagin");

    let audit = DailyCsvLog::open(args.tag_log_dir())
        .await
        .context("Failed to open the tap log directory")?;

    let registry = MemberRegistry::open(args.registry_config())
        .await
        .context("Failed to load the member store")?;
    info!(members = registry.len(), "Member store loaded");
    let station = Station::with_registry(registry);

    let web_config = args.web_config();
    let listener = tagin_web::bind(&web_config).await?;
    let served = station.clone();
    tokio::spawn(async move {
        if let Err(e) = tagin_web::serve_on(listener, &web_config, served).await {
            error!("Dashboard stopped: {}", e);
        }
    });

    let orchestrator = TapOrchestrator::new(station, feedback(&args), audit);

    #[cfg(feature = "hardware-pcsc")]
    let device = tagin_hardware::pcsc_reader::PcscTagReader::open_first()
        .context("Failed to open the card reader")?;
    #[cfg(not(feature = "hardware-pcsc"))]
    let device = tagin_hardware::KeyboardWedgeReader::new(tokio::io::BufReader::new(
        tokio::io::stdin(),
    ));

    let timeout = args.watchdog_timeout();
    let reader = prepare_reader(device, || Watchdog::arm(timeout)).await?;
    drive(&orchestrator, reader).await
}

/// Report the opened device and attach the watchdog.
///
/// Arming happens last, so the timer covers polling only and never a slow
/// startup.
async fn prepare_reader<R, W>(device: R, arm: W) -> Result<CardReader<R>>
where
    R: TagReader,
    W: FnOnce() -> tagin_hardware::Result<Watchdog>,
{
    match device.get_reader_info().await {
        Ok(reader) => info!(%reader, "Card reader ready"),
        Err(e) => warn!("Could not query card reader: {}", e),
    }

    let watchdog = arm().context("Failed to arm the reader watchdog")?;
    Ok(CardReader::new(device).with_watchdog(watchdog))
}

fn feedback(args: &Args) -> Feedback {
    let mut feedback = Feedback::new();
    if !args.no_sound {
        feedback = feedback.with_chime(Chime::new(args.wav_player(), args.sound_dir()));
    }
    if !args.no_orb {
        feedback = feedback.with_orb(Orb::new(args.orb_url.clone()));
    }
    feedback
}

async fn drive<R, I, A>(
    orchestrator: &TapOrchestrator<I, A>,
    mut reader: CardReader<R>,
) -> Result<()>
where
    R: TagReader,
    I: Indicator,
    A: AuditSink,
{
    let error = orchestrator.run(&mut reader).await;
    Err(error).context("Card reader failed")
}
