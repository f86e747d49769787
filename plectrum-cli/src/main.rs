//! # Plectrum CLI
//!
//! Terminal consumer for the plectrum note detector: starts a detection
//! session on the chosen input device and prints every note change with its
//! raw frequency and cents deviation from the ideal pitch. Optionally
//! highlights whether each note belongs to a practice scale.
//!
//! ## Architecture
//! - **Audio thread**: driven by the capture stream inside `plectrum-core`
//! - **Processing thread**: owned by the detector session
//! - **Main thread**: drains the note-event channel and watches stdin for
//!   the stop signal

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, select, unbounded};
use plectrum_core::{audio, note, DetectorConfig, NoteEvent, PitchDetector, Scale, ScaleKind};

#[derive(Parser)]
#[command(name = "plectrum")]
#[command(version)]
#[command(about = "Real-time guitar note detector")]
struct Cli {
    /// Audio input device name (default input device when omitted)
    #[arg(short = 'D', long)]
    device: Option<String>,

    /// Input gain applied before normalization
    #[arg(short, long)]
    gain: Option<f32>,

    /// Path to a JSON detector configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the practice scale, e.g. "A" or "F#"
    #[arg(long, requires = "scale")]
    key: Option<String>,

    /// Mark detected notes against this scale shape
    #[arg(long, requires = "key")]
    scale: Option<ScaleArg>,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScaleArg {
    Major,
    Minor,
    MajorPentatonic,
    MinorPentatonic,
}

impl From<ScaleArg> for ScaleKind {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Major => ScaleKind::Major,
            ScaleArg::Minor => ScaleKind::NaturalMinor,
            ScaleArg::MajorPentatonic => ScaleKind::MajorPentatonic,
            ScaleArg::MinorPentatonic => ScaleKind::MinorPentatonic,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        for name in audio::input_device_names()? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => {
            let config = load_config(path)?;
            tracing::info!("loaded detector config from {}", path.display());
            config
        }
        None => DetectorConfig::default(),
    };
    if let Some(device) = cli.device {
        config.device = Some(device);
    }
    if let Some(gain) = cli.gain {
        config.gain = gain;
    }

    let practice_scale = match (&cli.key, cli.scale) {
        (Some(key), Some(kind)) => Some(
            Scale::new(key, kind.into())
                .with_context(|| format!("unknown scale root {key:?}"))?,
        ),
        _ => None,
    };

    let (event_tx, event_rx) = unbounded::<NoteEvent>();
    let mut detector = PitchDetector::new(config);
    detector.start(event_tx)?;

    println!("Listening... press Enter to stop.");

    // Stdin watcher so the event loop can select over both channels.
    let (stop_tx, stop_rx) = bounded::<()>(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        let _ = stop_tx.send(());
    });

    loop {
        select! {
            recv(event_rx) -> msg => match msg {
                Ok(event) => print_event(&event, practice_scale.as_ref()),
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        }
    }

    detector.stop();
    Ok(())
}

fn print_event(event: &NoteEvent, practice_scale: Option<&Scale>) {
    let cents = note::cents_deviation(event.frequency_hz, event.note.frequency());
    let marker = match practice_scale {
        Some(scale) if scale.contains_note(&event.note) => "  in scale",
        Some(_) => "  out of scale",
        None => "",
    };
    println!(
        "{:<4} {:7.2} Hz  {:+6.1} cents{}",
        event.note.to_string(),
        event.frequency_hz,
        cents,
        marker
    );
}

fn load_config(path: &Path) -> Result<DetectorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("invalid detector config in {}", path.display()))
}
