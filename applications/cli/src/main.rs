/// gainstage CLI - loudness and RMS normalization for WAV files
use anyhow::Context;
use clap::{Parser, Subcommand};
use gainstage_core::{Selection, Track};
use gainstage_loudness::{normalize_tracks, TrackOutcome};
use gainstage_cli::{analyze_track, read_wav, write_wav, CliConfig, NormalizeOverrides};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gainstage-cli")]
#[command(about = "Loudness and RMS normalization for WAV files", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./gainstage.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a WAV file to a loudness or RMS target
    Normalize {
        /// Input WAV file
        input: PathBuf,
        /// Output WAV file (32-bit float)
        output: PathBuf,
        /// Target integrated loudness in LUFS
        #[arg(long, allow_negative_numbers = true, conflicts_with = "rms")]
        lufs: Option<f64>,
        /// Target RMS level in dBFS
        #[arg(long, allow_negative_numbers = true)]
        rms: Option<f64>,
        /// Measure and correct each channel on its own
        #[arg(long)]
        independent: bool,
        /// Selection start in seconds
        #[arg(long)]
        start: Option<f64>,
        /// Selection end in seconds
        #[arg(long)]
        end: Option<f64>,
    },
    /// Print loudness, RMS and peak of a WAV file
    Analyze {
        /// Input WAV file
        input: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gainstage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Normalize {
            input,
            output,
            lufs,
            rms,
            independent,
            start,
            end,
        } => {
            let overrides = NormalizeOverrides {
                lufs,
                rms,
                independent,
            };
            let selection = Selection::new(
                start.unwrap_or(f64::NEG_INFINITY),
                end.unwrap_or(f64::INFINITY),
            );
            normalize(&config, overrides, selection, &input, &output)?;
        }
        Commands::Analyze { input, json } => {
            analyze(&config, &input, json)?;
        }
    }

    Ok(())
}

fn normalize(
    config: &CliConfig,
    overrides: NormalizeOverrides,
    selection: Selection,
    input: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let mut settings = config.normalize;
    overrides.apply(&mut settings);
    settings.validate()?;

    let track = read_wav(input, config.block_size)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    tracing::info!(
        "Normalizing {} to {:.1} {} ({} channels, {} Hz)",
        track.name(),
        settings.active_level_db(),
        settings.normalize_to.unit(),
        track.channel_count(),
        track.sample_rate()
    );

    let mut next_report = 0.0;
    let mut progress = |fraction: f64, message: &str| {
        if fraction >= next_report {
            tracing::info!("{:>3.0}% {}", fraction * 100.0, message.replace('\n', " "));
            next_report = fraction + 0.1;
        }
        true
    };

    let mut tracks = [track];
    let report = normalize_tracks(&settings, &mut tracks, selection, &mut progress)?;

    for track in &report.tracks {
        match &track.outcome {
            TrackOutcome::Success { corrections } => {
                let gains: Vec<String> = corrections
                    .iter()
                    .map(|factor| format!("{:+.2} dB", gainstage_loudness::linear_to_db(*factor)))
                    .collect();
                println!("{}: applied {}", track.name, gains.join(", "));
            }
            TrackOutcome::Skipped => println!("{}: outside selection, unchanged", track.name),
        }
    }

    let [track] = tracks;
    write_wav(output, &track).with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {}", output.display());
    Ok(())
}

fn analyze(config: &CliConfig, input: &Path, json: bool) -> anyhow::Result<()> {
    let track = read_wav(input, config.block_size)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let levels = analyze_track(&track, config.normalize.dual_mono)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
    } else {
        println!("{}: {}", track.name(), levels);
    }
    Ok(())
}
