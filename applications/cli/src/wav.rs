//! WAV files to and from in-memory tracks

use crate::error::{CliError, Result};
use gainstage_core::{MemoryTrack, Track};
use std::path::Path;
use tracing::debug;

/// Load a WAV file as a track named after the file stem
///
/// Integer samples are scaled to [-1.0, 1.0).
pub fn read_wav(path: &Path, block_size: usize) -> Result<MemoryTrack> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !(1..=32).contains(&bits) {
                return Err(CliError::UnsupportedFormat(format!(
                    "{bits}-bit integer samples"
                )));
            }
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if samples.is_empty() {
        return Err(CliError::EmptyInput(path.display().to_string()));
    }

    let name = path
        .file_stem()
        .map_or_else(|| "track".to_string(), |s| s.to_string_lossy().into_owned());

    debug!(
        path = %path.display(),
        channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        frames = samples.len() / channels.max(1),
        "Read WAV"
    );

    Ok(
        MemoryTrack::from_interleaved(name, spec.sample_rate, channels, &samples)
            .with_block_size(block_size),
    )
}

/// Write a track as 32-bit float WAV
pub fn write_wav(path: &Path, track: &MemoryTrack) -> Result<()> {
    let channels = u16::try_from(track.channel_count()).map_err(|_| {
        CliError::UnsupportedFormat(format!("{} channels", track.channel_count()))
    })?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: track.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in track.interleaved() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    debug!(path = %path.display(), frames = track.len(), "Wrote WAV");
    Ok(())
}
