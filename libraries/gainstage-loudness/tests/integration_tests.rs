//! Integration tests for gainstage-loudness
//!
//! Tests include:
//! - Property-based tests with proptest
//! - Whole-run behaviour of the two-pass processor (commit, skip, cancel)
//! - Accuracy of loudness and RMS normalization on synthetic signals

use gainstage_core::{CancellationToken, MemoryTrack, NoProgress, SampleRange, Selection, Track};
use gainstage_loudness::{
    compute_correction, linear_to_db, normalize_tracks, Blocks, LevelAnalyzer, LoudnessError,
    LoudnessSettings, NormalizeTarget, SampleBuffer, TrackOutcome, TwoPassEffect,
    TwoPassProcessor,
};
use proptest::prelude::*;
use std::sync::Once;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ========== Helper Functions ==========

/// Generate one channel of a sine wave
fn generate_sine(sample_rate: u32, frequency: f32, amplitude: f32, duration_secs: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn measure(target: NormalizeTarget, track: &MemoryTrack) -> f64 {
    let mut analyzer =
        LevelAnalyzer::new(target, track.channel_count(), track.sample_rate(), false).unwrap();
    let channels: Vec<Vec<f32>> = (0..track.channel_count())
        .map(|c| track.channel_samples(c))
        .collect();
    let planes: Vec<&[f32]> = channels.iter().map(Vec::as_slice).collect();
    analyzer.add_planar(&planes).unwrap();
    analyzer.measured_db().unwrap()
}

/// Effect that leaves every group as it is
struct Unity;

impl TwoPassEffect for Unity {
    fn description(&self) -> &str {
        "Unity"
    }
    fn independent(&self) -> bool {
        false
    }
    fn begin_group(
        &mut self,
        _group: &gainstage_core::ChannelGroup,
        _sample_rate: u32,
    ) -> gainstage_loudness::Result<()> {
        Ok(())
    }
    fn analyse_block(&mut self, _buffer: &SampleBuffer) -> gainstage_loudness::Result<()> {
        Ok(())
    }
    fn finish_analysis(&mut self) -> gainstage_loudness::Result<f64> {
        Ok(1.0)
    }
}

/// Stereo track whose right channel ends early
#[derive(Clone)]
struct ShortRightChannel {
    inner: MemoryTrack,
    right_len: u64,
}

impl Track for ShortRightChannel {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }
    fn channel_count(&self) -> usize {
        2
    }
    fn start_time(&self) -> f64 {
        self.inner.start_time()
    }
    fn end_time(&self) -> f64 {
        self.inner.end_time()
    }
    fn best_block_size(&self, position: u64) -> usize {
        self.inner.best_block_size(position)
    }
    fn max_block_size(&self) -> usize {
        self.inner.max_block_size()
    }
    fn read(&self, channel: usize, position: u64, out: &mut [f32]) -> gainstage_core::Result<usize> {
        let read = self.inner.read(channel, position, out)?;
        if channel == 1 {
            let in_range = self.right_len.saturating_sub(position) as usize;
            return Ok(read.min(in_range));
        }
        Ok(read)
    }
    fn write(&mut self, channel: usize, position: u64, samples: &[f32]) -> gainstage_core::Result<()> {
        self.inner.write(channel, position, samples)
    }
}

// ========== Property-Based Tests ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Blocks cover the range exactly once, in order, within every bound
    #[test]
    fn blocks_cover_range_exactly(
        len in 1usize..2000,
        block_size in 1usize..300,
        capacity in 1usize..400,
        start in 0u64..2000,
        span in 0u64..2000,
    ) {
        let track = MemoryTrack::from_channels("t", 8000, vec![vec![0.0; len]])
            .with_block_size(block_size);
        let range = SampleRange::new(start, start + span);

        let mut expected = range.start;
        for block in Blocks::new(&track, range, capacity) {
            prop_assert_eq!(block.position, expected);
            prop_assert!(block.len >= 1);
            prop_assert!(block.len <= capacity);
            prop_assert!(block.len <= track.best_block_size(block.position));
            expected += block.len as u64;
        }
        prop_assert_eq!(expected, range.end);
    }

    /// Any level above 0 dB behaves exactly like 0 dB
    #[test]
    fn levels_above_zero_clamp(
        level in 0.0_f64..200.0,
        extent in 1e-6_f64..1.0,
        rms in any::<bool>(),
    ) {
        let target = if rms { NormalizeTarget::Rms } else { NormalizeTarget::Loudness };
        prop_assert_eq!(
            compute_correction(target, level, extent),
            compute_correction(target, 0.0, extent)
        );
    }

    /// A unit correction leaves every sample bit-identical
    #[test]
    fn unit_factor_is_identity(
        samples in prop::collection::vec(-1.0_f32..1.0, 1..500),
        block_size in 1usize..64,
    ) {
        let original = MemoryTrack::from_channels("t", 8000, vec![samples.clone(), samples])
            .with_block_size(block_size);
        let mut tracks = vec![original.clone()];
        TwoPassProcessor::new(Unity)
            .process(&mut tracks, Selection::whole(), &mut NoProgress)
            .unwrap();

        prop_assert_eq!(tracks[0].interleaved(), original.interleaved());
    }

    /// RMS normalization reaches the target for any constant level
    #[test]
    fn rms_target_reached(
        amplitude in 0.001_f32..1.0,
        level in -60.0_f64..0.0,
    ) {
        let mut tracks = vec![MemoryTrack::from_channels("c", 8000, vec![vec![amplitude; 1000]])
            .with_block_size(128)];
        let settings = LoudnessSettings {
            normalize_to: NormalizeTarget::Rms,
            rms_level: level,
            ..LoudnessSettings::default()
        };
        normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress).unwrap();

        let measured = measure(NormalizeTarget::Rms, &tracks[0]);
        prop_assert!((measured - level).abs() < 0.01, "measured {} target {}", measured, level);
    }
}

// ========== Integration Tests ==========

#[test]
fn test_loudness_normalization_of_sine() {
    init_tracing();

    let tone = generate_sine(48000, 1000.0, 0.05, 5.0);
    let mut tracks = vec![
        MemoryTrack::from_channels("tone", 48000, vec![tone.clone(), tone]).with_block_size(4096),
    ];
    let before = measure(NormalizeTarget::Loudness, &tracks[0]);

    let report = normalize_tracks(
        &LoudnessSettings::default(),
        &mut tracks,
        Selection::whole(),
        &mut NoProgress,
    )
    .unwrap();

    let after = measure(NormalizeTarget::Loudness, &tracks[0]);
    assert!((after - (-23.0)).abs() < 0.1, "before {before:.2}, after {after:.2} LUFS");

    let TrackOutcome::Success { corrections } = &report.tracks[0].outcome else {
        panic!("track not processed");
    };
    assert!((linear_to_db(corrections[0]) - (-23.0 - before)).abs() < 0.01);
}

#[test]
fn test_independent_channels_normalized_separately() {
    let loud = generate_sine(48000, 1000.0, 0.5, 3.0);
    let quiet = generate_sine(48000, 1000.0, 0.01, 3.0);
    let mut tracks = vec![MemoryTrack::from_channels("pair", 48000, vec![loud, quiet])];
    let settings = LoudnessSettings {
        stereo_independent: true,
        normalize_to: NormalizeTarget::Rms,
        rms_level: -20.0,
        ..LoudnessSettings::default()
    };

    normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress).unwrap();

    for channel in 0..2 {
        let mono = MemoryTrack::from_channels("c", 48000, vec![tracks[0].channel_samples(channel)]);
        let level = measure(NormalizeTarget::Rms, &mono);
        assert!((level - (-20.0)).abs() < 0.01, "channel {channel}: {level:.3}");
    }
}

#[test]
fn test_mismatched_linked_channels_abort_everything() {
    init_tracing();

    let good = MemoryTrack::from_channels("good", 8000, vec![vec![0.3; 400]; 2]);
    let broken = ShortRightChannel {
        inner: MemoryTrack::from_channels("broken", 8000, vec![vec![0.3; 400]; 2])
            .with_block_size(100),
        right_len: 250,
    };
    let good_copy = good.clone();

    // Both tracks go through the same generic run
    let mut tracks = vec![
        ShortRightChannel {
            inner: good,
            right_len: u64::MAX,
        },
        broken,
    ];
    let err = TwoPassProcessor::new(Unity)
        .process(&mut tracks, Selection::whole(), &mut NoProgress)
        .unwrap_err();

    match err {
        LoudnessError::DataIntegrity {
            track,
            channel,
            position,
            expected,
            actual,
        } => {
            assert_eq!(track, "broken");
            assert_eq!(channel, 1);
            assert_eq!(position, 200);
            assert_eq!(expected, 100);
            assert_eq!(actual, 50);
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(tracks[0].inner.interleaved(), good_copy.interleaved());
}

#[test]
fn test_track_outside_selection_is_skipped() {
    let inside = MemoryTrack::from_channels("inside", 8000, vec![vec![0.3; 1000]]);
    let outside =
        MemoryTrack::from_channels("outside", 8000, vec![vec![0.1; 1000]]).with_start_sample(40000);
    let mut tracks = vec![inside, outside.clone()];
    let settings = LoudnessSettings {
        normalize_to: NormalizeTarget::Rms,
        ..LoudnessSettings::default()
    };

    let report =
        normalize_tracks(&settings, &mut tracks, Selection::new(0.0, 2.0), &mut NoProgress)
            .unwrap();

    assert_eq!(report.processed(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.tracks[1].outcome, TrackOutcome::Skipped);
    assert_eq!(tracks[1].interleaved(), outside.interleaved());
    // 0.3 constant is about -10.5 dBFS RMS, corrected down to -20
    assert!((tracks[0].channel_samples(0)[0] - 0.1).abs() < 1e-4);
}

#[test]
fn test_progress_is_monotone_and_completes() {
    let mut tracks = vec![
        MemoryTrack::from_channels("mono", 8000, vec![vec![0.2; 3000]]).with_block_size(512),
        MemoryTrack::from_channels("stereo", 8000, vec![vec![0.2; 1700]; 2]).with_block_size(256),
    ];
    let settings = LoudnessSettings {
        normalize_to: NormalizeTarget::Rms,
        ..LoudnessSettings::default()
    };

    let mut fractions = Vec::new();
    let mut reporter = |fraction: f64, _message: &str| {
        fractions.push(fraction);
        true
    };
    normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut reporter).unwrap();

    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(fractions.last().copied(), Some(1.0));

    // Block increments alone already add up to completion
    let before_last = fractions[fractions.len() - 2];
    assert!((before_last - 1.0).abs() < 1e-9);
}

#[test]
fn test_cancellation_leaves_tracks_untouched() {
    init_tracing();

    let original = MemoryTrack::from_channels("long", 8000, vec![vec![0.2; 8000]; 2])
        .with_block_size(500);
    let mut tracks = vec![original.clone(), original.clone()];
    let settings = LoudnessSettings {
        normalize_to: NormalizeTarget::Rms,
        ..LoudnessSettings::default()
    };

    let token = CancellationToken::new();
    let trigger = token.clone();
    let mut calls = 0;
    let mut reporter = token.reporter(move |_fraction: f64, _message: &str| {
        calls += 1;
        if calls == 40 {
            trigger.cancel();
        }
        true
    });

    let err = normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut reporter)
        .unwrap_err();

    assert!(matches!(err, LoudnessError::Cancelled { ref track } if track == "long"));
    for track in &tracks {
        assert_eq!(track.interleaved(), original.interleaved());
    }
}

#[test]
fn test_levels_above_zero_clamp_end_to_end() {
    init_tracing();
    let run = |rms_level: f64| {
        let mut tracks = vec![MemoryTrack::from_channels("t", 8000, vec![vec![0.1; 4000]])];
        let settings = LoudnessSettings {
            rms_level,
            normalize_to: NormalizeTarget::Rms,
            ..LoudnessSettings::default()
        };
        normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress).unwrap();
        tracks[0].channel_samples(0)
    };

    let clamped = run(6.0);
    assert_eq!(clamped, run(0.0));
    assert!(clamped.iter().all(|&s| (s - 1.0).abs() < 1e-5));
}

#[test]
fn test_renormalizing_is_stable() {
    let tone = generate_sine(48000, 440.0, 0.3, 4.0);
    let mut tracks = vec![MemoryTrack::from_channels("tone", 48000, vec![tone])];
    let settings = LoudnessSettings {
        lufs_level: -16.0,
        ..LoudnessSettings::default()
    };

    normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress).unwrap();
    let report =
        normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress).unwrap();

    let TrackOutcome::Success { corrections } = &report.tracks[0].outcome else {
        panic!("track not processed");
    };
    assert!((corrections[0] - 1.0).abs() < 1e-3, "second pass factor {}", corrections[0]);
}
