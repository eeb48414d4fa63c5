//! Property tests for the in-memory track host

use gainstage_core::{MemoryTrack, Selection, Track};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Reads report exactly the overlap with the track and zero-fill the rest
    #[test]
    fn read_counts_overlap(
        len in 0usize..600,
        block_size in 1usize..128,
        start_sample in 0u64..200,
        position in 0u64..1000,
        request in 0usize..300,
    ) {
        let samples: Vec<f32> = (0..len).map(|i| i as f32 + 1.0).collect();
        let track = MemoryTrack::from_channels("t", 1000, vec![samples])
            .with_block_size(block_size)
            .with_start_sample(start_sample);

        let mut out = vec![f32::NAN; request];
        let read = track.read(0, position, &mut out).unwrap();

        let end = start_sample + len as u64;
        let expected = (position + request as u64).min(end).saturating_sub(position.max(start_sample));
        prop_assert_eq!(read as u64, expected);
        prop_assert!(read <= request);

        for (i, &sample) in out.iter().enumerate() {
            let absolute = position + i as u64;
            if absolute >= start_sample && absolute < end {
                prop_assert_eq!(sample, (absolute - start_sample) as f32 + 1.0);
            } else {
                prop_assert_eq!(sample, 0.0);
            }
        }
    }

    /// Writes never change the length and clones never see them
    #[test]
    fn writes_stay_inside_and_copy_on_write(
        len in 1usize..400,
        block_size in 1usize..64,
        position in 0u64..500,
        count in 0usize..200,
    ) {
        let original = MemoryTrack::from_channels("t", 1000, vec![vec![0.5; len]])
            .with_block_size(block_size);
        let mut edited = original.clone();
        edited.write(0, position, &vec![-1.0; count]).unwrap();

        prop_assert_eq!(edited.len(), original.len());
        prop_assert!(original.channel_samples(0).iter().all(|&s| s == 0.5));
    }

    /// Clipped selections always lie inside the track
    #[test]
    fn clipped_selection_within_track(
        len in 1usize..1000,
        start_sample in 0u64..1000,
        t0 in -1.0_f64..3.0,
        width in 0.0_f64..3.0,
    ) {
        let track = MemoryTrack::from_channels("t", 1000, vec![vec![0.0; len]])
            .with_start_sample(start_sample);

        if let Some(range) = Selection::new(t0, t0 + width).clip(&track) {
            prop_assert!(range.start >= start_sample);
            prop_assert!(range.end <= start_sample + len as u64);
            prop_assert!(!range.is_empty());
        }
    }
}
