//! Tracks and the decorators deriving new tracks from existing ones.

mod cenc;
mod cropped;

pub use cenc::CencEncryptingTrack;
pub use cropped::{CroppedTrack, SampleRange};

use crate::{Error, Result, boxes::SampleEntry};
use bytes::Bytes;
use std::ops::Range;

/// A track as seen by the muxer.
///
/// Implementations never change once constructed.
pub trait Track: Send + Sync {
    fn name(&self) -> String;

    /// Handler type, e.g. `vide` or `soun`.
    fn handler(&self) -> &str;

    fn timescale(&self) -> u32;

    fn sample_count(&self) -> usize {
        self.sample_durations().len()
    }

    /// Coded data of the sample at `index` (0-based).
    fn sample(&self, index: usize) -> Result<Bytes>;

    fn samples(&self) -> Result<Vec<Bytes>> {
        (0..self.sample_count()).map(|i| self.sample(i)).collect()
    }

    /// Duration of every sample in timescale units.
    fn sample_durations(&self) -> &[u64];

    fn duration(&self) -> u64 {
        self.sample_durations().iter().sum()
    }

    /// Sorted 1-based numbers of the sync samples, `None` when every
    /// sample is a sync sample.
    fn sync_samples(&self) -> Option<&[u64]>;

    fn composition_offsets(&self) -> &[CompositionOffset];

    fn sample_dependencies(&self) -> &[SampleDependency];

    fn sample_entry(&self) -> Result<&SampleEntry>;
}

/// Run of samples sharing a composition time offset (`ctts` entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionOffset {
    pub count: u32,
    pub offset: i32,
}

impl CompositionOffset {
    pub fn new(count: u32, offset: i32) -> Self {
        Self { count, offset }
    }

    /// Entries covering the samples in `range`, adjacent runs with equal
    /// offsets merged.
    ///
    /// Empty when `range` is empty or the entries end before it does.
    pub fn slice(entries: &[Self], range: Range<usize>) -> Vec<Self> {
        let (start, end) = (range.start as u64, range.end as u64);
        let total: u64 = entries.iter().map(|x| x.count as u64).sum();
        if start >= end || total < end {
            return Vec::new();
        }

        let mut sliced: Vec<Self> = Vec::new();
        let mut first = 0u64;

        for entry in entries {
            let last = first + entry.count as u64;
            // bounded by entry.count
            let count = (last.min(end).saturating_sub(first.max(start))) as u32;

            if count > 0 {
                let merged = match sliced.last_mut() {
                    Some(prev) if prev.offset == entry.offset => prev.count.checked_add(count),
                    _ => None,
                };
                match (merged, sliced.last_mut()) {
                    (Some(sum), Some(prev)) => prev.count = sum,
                    _ => sliced.push(Self::new(count, entry.offset)),
                }
            }

            if last >= end {
                break;
            }
            first = last;
        }

        sliced
    }
}

/// Dependency flags of one sample (`sdtp` entry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleDependency {
    pub is_leading: u8,
    pub sample_depends_on: u8,
    pub sample_is_depended_on: u8,
    pub sample_has_redundancy: u8,
}

/// Track held in memory, the usual source of decorated tracks.
///
/// ```
/// use bytes::Bytes;
/// use mp4_authoring::{MemoryTrack, Track, boxes::{FourCc, VisualSampleEntry}};
///
/// let track = MemoryTrack::builder("video", VisualSampleEntry::new(FourCc::AVC1, 640, 360))
///     .timescale(90000)
///     .sample(Bytes::from_static(&[0, 0, 0, 1, 0x65]), 3000)
///     .sync_samples(vec![1])
///     .build()?;
///
/// assert_eq!(track.handler(), "vide");
/// assert_eq!(track.duration(), 3000);
/// # Ok::<(), mp4_authoring::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTrack {
    name: String,
    handler: String,
    timescale: u32,
    samples: Vec<Bytes>,
    durations: Vec<u64>,
    sync_samples: Option<Vec<u64>>,
    composition_offsets: Vec<CompositionOffset>,
    dependencies: Vec<SampleDependency>,
    sample_entry: SampleEntry,
}

impl MemoryTrack {
    pub fn builder<E: Into<SampleEntry>>(name: &str, sample_entry: E) -> MemoryTrackBuilder {
        let sample_entry = sample_entry.into();
        let handler = match sample_entry {
            SampleEntry::Visual(_) => "vide",
            SampleEntry::Audio(_) => "soun",
            SampleEntry::Other(_) => "meta",
        };

        MemoryTrackBuilder {
            track: Self {
                name: name.to_owned(),
                handler: handler.to_owned(),
                timescale: 1000,
                samples: Vec::new(),
                durations: Vec::new(),
                sync_samples: None,
                composition_offsets: Vec::new(),
                dependencies: Vec::new(),
                sample_entry,
            },
        }
    }
}

impl Track for MemoryTrack {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn handler(&self) -> &str {
        &self.handler
    }

    fn timescale(&self) -> u32 {
        self.timescale
    }

    fn sample(&self, index: usize) -> Result<Bytes> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(Error::SampleIndexOutOfRange {
                index,
                count: self.samples.len(),
            })
    }

    fn sample_durations(&self) -> &[u64] {
        &self.durations
    }

    fn sync_samples(&self) -> Option<&[u64]> {
        self.sync_samples.as_deref()
    }

    fn composition_offsets(&self) -> &[CompositionOffset] {
        &self.composition_offsets
    }

    fn sample_dependencies(&self) -> &[SampleDependency] {
        &self.dependencies
    }

    fn sample_entry(&self) -> Result<&SampleEntry> {
        Ok(&self.sample_entry)
    }
}

/// Builder for [`MemoryTrack`].
pub struct MemoryTrackBuilder {
    track: MemoryTrack,
}

impl MemoryTrackBuilder {
    pub fn handler(mut self, handler: &str) -> Self {
        self.track.handler = handler.to_owned();
        self
    }

    pub fn timescale(mut self, timescale: u32) -> Self {
        self.track.timescale = timescale;
        self
    }

    /// Append a sample lasting `duration` timescale units.
    pub fn sample<B: Into<Bytes>>(mut self, data: B, duration: u64) -> Self {
        self.track.samples.push(data.into());
        self.track.durations.push(duration);
        self
    }

    /// Sorted 1-based sync sample numbers.
    pub fn sync_samples(mut self, sync_samples: Vec<u64>) -> Self {
        self.track.sync_samples = Some(sync_samples);
        self
    }

    pub fn composition_offsets(mut self, entries: Vec<CompositionOffset>) -> Self {
        self.track.composition_offsets = entries;
        self
    }

    pub fn sample_dependencies(mut self, dependencies: Vec<SampleDependency>) -> Self {
        self.track.dependencies = dependencies;
        self
    }

    pub fn build(self) -> Result<MemoryTrack> {
        let track = self.track;
        let count = track.samples.len();

        if track.timescale == 0 {
            return Err(Error::InvalidTrack("timescale must not be zero".to_owned()));
        }

        if let Some(sync_samples) = &track.sync_samples {
            if !sync_samples.windows(2).all(|x| x[0] < x[1]) {
                return Err(Error::InvalidTrack(
                    "sync samples must be strictly increasing".to_owned(),
                ));
            }
            if let Some(&s) = sync_samples.iter().find(|&&s| s == 0 || s > count as u64) {
                return Err(Error::InvalidTrack(format!(
                    "sync sample {s} outside 1..={count}"
                )));
            }
        }

        let offsets: u64 = track.composition_offsets.iter().map(|x| x.count as u64).sum();
        if !track.composition_offsets.is_empty() && offsets != count as u64 {
            return Err(Error::InvalidTrack(format!(
                "composition offsets cover {offsets} samples, track has {count}"
            )));
        }

        if !track.dependencies.is_empty() && track.dependencies.len() != count {
            return Err(Error::InvalidTrack(format!(
                "{} sample dependencies for {count} samples",
                track.dependencies.len()
            )));
        }

        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{AudioSampleEntry, FourCc};

    fn audio_track() -> MemoryTrackBuilder {
        MemoryTrack::builder("audio", AudioSampleEntry::new(FourCc::MP4A, 2, 48000))
            .timescale(48000)
            .sample(vec![1, 2, 3], 1024)
            .sample(vec![4, 5], 1024)
    }

    #[test]
    fn test_memory_track() {
        let track = audio_track().build().unwrap();
        assert_eq!(track.name(), "audio");
        assert_eq!(track.handler(), "soun");
        assert_eq!(track.sample_count(), 2);
        assert_eq!(track.duration(), 2048);
        assert_eq!(&track.sample(1).unwrap()[..], &[4, 5]);
        assert!(track.sync_samples().is_none());
    }

    #[test]
    fn test_sample_out_of_range() {
        let track = audio_track().build().unwrap();
        assert!(matches!(
            track.sample(2),
            Err(Error::SampleIndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_build_rejects_bad_sync_samples() {
        assert!(audio_track().sync_samples(vec![2, 1]).build().is_err());
        assert!(audio_track().sync_samples(vec![0]).build().is_err());
        assert!(audio_track().sync_samples(vec![3]).build().is_err());
    }

    #[test]
    fn test_build_rejects_bad_tables() {
        assert!(
            audio_track()
                .composition_offsets(vec![CompositionOffset::new(3, 0)])
                .build()
                .is_err()
        );
        assert!(
            audio_track()
                .sample_dependencies(vec![SampleDependency::default()])
                .build()
                .is_err()
        );
        assert!(audio_track().timescale(0).build().is_err());
    }

    #[test]
    fn test_composition_offsets_slice() {
        let entries = [
            CompositionOffset::new(2, 0),
            CompositionOffset::new(3, 512),
            CompositionOffset::new(1, 0),
        ];

        assert_eq!(
            CompositionOffset::slice(&entries, 1..6),
            vec![
                CompositionOffset::new(1, 0),
                CompositionOffset::new(3, 512),
                CompositionOffset::new(1, 0),
            ]
        );
        assert_eq!(
            CompositionOffset::slice(&entries, 3..4),
            vec![CompositionOffset::new(1, 512)]
        );
        assert_eq!(CompositionOffset::slice(&entries, 0..6), entries.to_vec());
        assert!(CompositionOffset::slice(&entries, 2..2).is_empty());
        // table shorter than the range
        assert!(CompositionOffset::slice(&entries, 0..7).is_empty());
        assert!(CompositionOffset::slice(&[], 0..1).is_empty());
    }

    #[test]
    fn test_composition_offsets_slice_merges_equal_runs() {
        let entries = [
            CompositionOffset::new(2, 0),
            CompositionOffset::new(2, 0),
            CompositionOffset::new(2, 1),
        ];
        assert_eq!(
            CompositionOffset::slice(&entries, 1..5),
            vec![CompositionOffset::new(3, 0), CompositionOffset::new(1, 1)]
        );
    }

    #[test]
    fn test_composition_offsets_slice_long_run() {
        // a single run far longer than anything that could be expanded
        let entries = [CompositionOffset::new(u32::MAX, 5), CompositionOffset::new(1, 7)];

        assert_eq!(
            CompositionOffset::slice(&entries, 10..20),
            vec![CompositionOffset::new(10, 5)]
        );
        let end = u32::MAX as usize + 1;
        assert_eq!(
            CompositionOffset::slice(&entries, end - 2..end),
            vec![CompositionOffset::new(1, 5), CompositionOffset::new(1, 7)]
        );
    }
}
