//! Cutting a set of tracks to a time span.
//!
//! Decoding can only start at a sync sample, so the requested times are first
//! moved to sync sample boundaries of the (single) track having them. Every
//! track is then cropped to the samples covering the corrected span.

use crate::{CroppedTrack, Error, Result, SampleRange, Track};
use log::{debug, info};
use std::sync::Arc;

/// Elapsed seconds before every sync sample of `track`.
fn sync_sample_times(track: &dyn Track) -> Vec<f64> {
    let Some(sync_samples) = track.sync_samples() else {
        return Vec::new();
    };

    let timescale = track.timescale() as f64;
    let mut times = Vec::with_capacity(sync_samples.len());
    let mut current_time = 0.0;

    for (i, duration) in track.sample_durations().iter().enumerate() {
        if sync_samples.binary_search(&(i as u64 + 1)).is_ok() {
            times.push(current_time);
        }
        current_time += *duration as f64 / timescale;
    }

    times
}

/// Move `cut` (seconds) to the start of the first sync sample strictly
/// after it, or to the last sync sample when there is none after it.
///
/// Returns `None` when the track has no sync samples.
pub fn correct_time_to_next_sync_sample(track: &dyn Track, cut: f64) -> Option<f64> {
    let times = sync_sample_times(track);
    times
        .iter()
        .copied()
        .find(|&time| time > cut)
        .or_else(|| times.last().copied())
}

/// Samples of `track` covering `start_time..end_time` (seconds).
///
/// Starts at the last sample beginning at or before `start_time` and ends
/// before the last sample beginning at or before `end_time`.
pub fn sample_range_for(track: &dyn Track, start_time: f64, end_time: f64) -> SampleRange {
    let timescale = track.timescale() as f64;
    let mut current_time = 0.0;
    let mut start = None;
    let mut end = None;

    for (i, duration) in track.sample_durations().iter().enumerate() {
        if current_time > end_time {
            end.get_or_insert(i);
            break;
        }
        if current_time <= start_time {
            start = Some(i);
        }
        end = Some(i);
        current_time += *duration as f64 / timescale;
    }

    let end = end.unwrap_or(0);
    start.unwrap_or(0).min(end)..end
}

fn has_sync_samples(track: &dyn Track) -> bool {
    track.sync_samples().is_some_and(|x| !x.is_empty())
}

/// Crop every track to the span `from..to` (seconds).
///
/// ```
/// use std::sync::Arc;
/// use mp4_authoring::{MemoryTrack, Track, boxes::{FourCc, VisualSampleEntry}, trim_tracks};
///
/// let mut builder = MemoryTrack::builder("video", VisualSampleEntry::new(FourCc::AVC1, 640, 360));
/// for _ in 0..10 {
///     builder = builder.sample(vec![0u8; 4], 1000);
/// }
/// let video: Arc<dyn Track> = Arc::new(builder.sync_samples(vec![1, 4, 7]).build()?);
///
/// let tracks = trim_tracks(&[video], 2.5, 6.5)?;
/// assert_eq!(tracks[0].range(), &(3..6));
/// # Ok::<(), mp4_authoring::Error>(())
/// ```
pub fn trim_tracks(tracks: &[Arc<dyn Track>], from: f64, to: f64) -> Result<Vec<CroppedTrack>> {
    if !from.is_finite() || !to.is_finite() || from < 0.0 || to < from {
        return Err(Error::InvalidTrimRange { from, to });
    }

    let mut start_time = from;
    let mut end_time = to;
    let mut time_corrected = false;

    for track in tracks.iter().filter(|&x| has_sync_samples(x.as_ref())) {
        if time_corrected {
            return Err(Error::AmbiguousSyncCorrection);
        }

        if let Some(time) = correct_time_to_next_sync_sample(track.as_ref(), from) {
            start_time = time;
        }
        if let Some(time) = correct_time_to_next_sync_sample(track.as_ref(), to) {
            end_time = time;
        }
        info!("corrected start time from {from}s to {start_time}s");
        info!("corrected end time from {to}s to {end_time}s");
        time_corrected = true;
    }

    tracks
        .iter()
        .map(|track| {
            let range = sample_range_for(track.as_ref(), start_time, end_time);
            debug!(
                "{}: samples {}..{} of {}",
                track.name(),
                range.start,
                range.end,
                track.sample_count()
            );
            CroppedTrack::new(track.clone(), range.start, range.end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        MemoryTrack,
        boxes::{AudioSampleEntry, FourCc, VisualSampleEntry},
    };

    fn video(durations: &[u64], sync_samples: Option<Vec<u64>>) -> Arc<dyn Track> {
        let mut builder =
            MemoryTrack::builder("video", VisualSampleEntry::new(FourCc::AVC1, 640, 360))
                .timescale(1000);
        for &duration in durations {
            builder = builder.sample(vec![0], duration);
        }
        if let Some(sync_samples) = sync_samples {
            builder = builder.sync_samples(sync_samples);
        }
        Arc::new(builder.build().unwrap())
    }

    fn audio(count: usize) -> Arc<dyn Track> {
        let mut builder =
            MemoryTrack::builder("audio", AudioSampleEntry::new(FourCc::MP4A, 2, 48000))
                .timescale(48000);
        for _ in 0..count {
            builder = builder.sample(vec![0], 24000);
        }
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_sync_sample_times() {
        let track = video(&[1000; 4], Some(vec![1, 3]));
        assert_eq!(sync_sample_times(track.as_ref()), vec![0.0, 2.0]);
    }

    #[test]
    fn test_sync_sample_times_include_last_sample() {
        let track = video(&[1000; 4], Some(vec![1, 4]));
        assert_eq!(sync_sample_times(track.as_ref()), vec![0.0, 3.0]);
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 0.5), Some(3.0));
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 3.5), Some(3.0));

        let track = video(&[1000; 4], Some(vec![4]));
        assert_eq!(sync_sample_times(track.as_ref()), vec![3.0]);
    }

    #[test]
    fn test_correct_time_to_next_sync_sample() {
        let track = video(&[1000; 4], Some(vec![1, 3]));
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 0.5), Some(2.0));
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 1.0), Some(2.0));
        // nothing after the cut, falls back to the last sync sample
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 10.0), Some(2.0));
        // strictly greater
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 0.0), Some(2.0));
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), -1.0), Some(0.0));
    }

    #[test]
    fn test_correct_time_without_sync_samples() {
        let track = video(&[1000; 4], None);
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 1.0), None);
        let track = video(&[1000; 4], Some(vec![]));
        assert_eq!(correct_time_to_next_sync_sample(track.as_ref(), 1.0), None);
    }

    #[test]
    fn test_sample_range_for() {
        let track = video(&[1000; 10], None);
        assert_eq!(sample_range_for(track.as_ref(), 2.0, 5.0), 2..5);
        assert_eq!(sample_range_for(track.as_ref(), 2.5, 5.5), 2..5);
        assert_eq!(sample_range_for(track.as_ref(), 0.0, 0.0), 0..0);
    }

    #[test]
    fn test_sample_range_boundaries() {
        let track = video(&[1000; 10], None);
        // end beyond the track stops before the last sample
        assert_eq!(sample_range_for(track.as_ref(), 0.0, 100.0), 0..9);
        // start past every sample
        assert_eq!(sample_range_for(track.as_ref(), 50.0, 100.0), 9..9);

        let empty = video(&[], None);
        assert_eq!(sample_range_for(empty.as_ref(), 1.0, 2.0), 0..0);
    }

    #[test]
    fn test_trim_tracks_aligns_to_sync_samples() {
        let tracks = vec![video(&[1000; 10], Some(vec![1, 4, 7])), audio(20)];
        let trimmed = trim_tracks(&tracks, 2.5, 6.5).unwrap();

        // 2.5s moves to 3.0s, 6.5s falls back to the last sync sample at 6.0s
        assert_eq!(trimmed[0].range(), &(3..6));
        assert_eq!(trimmed[0].sync_samples(), Some(&[1][..]));
        assert_eq!(trimmed[1].range(), &(6..12));
        assert_eq!(trimmed[1].name(), "crop(audio)");
    }

    #[test]
    fn test_trim_tracks_without_sync_samples() {
        let trimmed = trim_tracks(&[audio(20)], 1.0, 2.0).unwrap();
        assert_eq!(trimmed[0].range(), &(2..4));
    }

    #[test]
    fn test_trim_tracks_rejects_second_sync_track() {
        let tracks = vec![
            video(&[1000; 4], Some(vec![1])),
            video(&[1000; 4], Some(vec![1, 3])),
        ];
        assert!(matches!(
            trim_tracks(&tracks, 0.0, 1.0),
            Err(Error::AmbiguousSyncCorrection)
        ));
    }

    #[test]
    fn test_trim_tracks_invalid_range() {
        let tracks = vec![audio(4)];
        assert!(matches!(
            trim_tracks(&tracks, -1.0, 1.0),
            Err(Error::InvalidTrimRange { .. })
        ));
        assert!(trim_tracks(&tracks, 2.0, 1.0).is_err());
        assert!(trim_tracks(&tracks, 0.0, f64::NAN).is_err());
    }
}
