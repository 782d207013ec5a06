use super::{CompositionOffset, SampleDependency, Track};
use crate::{Error, Result, boxes::SampleEntry};
use bytes::Bytes;
use std::{ops::Range, sync::Arc};

/// Half-open range of 0-based sample indices.
pub type SampleRange = Range<usize>;

/// Exposes a contiguous range of another track's samples.
///
/// Samples are renumbered from zero. Timing tables are sliced on construction,
/// sample data is fetched from the source on demand.
pub struct CroppedTrack {
    source: Arc<dyn Track>,
    range: SampleRange,
    durations: Vec<u64>,
    sync_samples: Option<Vec<u64>>,
    composition_offsets: Vec<CompositionOffset>,
    dependencies: Vec<SampleDependency>,
}

impl CroppedTrack {
    /// Crop `source` to samples `start..end`.
    pub fn new(source: Arc<dyn Track>, start: usize, end: usize) -> Result<Self> {
        let count = source.sample_count();
        if start > end || end > count {
            return Err(Error::InvalidSampleRange { start, end, count });
        }

        let durations = source.sample_durations()[start..end].to_vec();

        // 1-based numbers in (start, end] shift down by start
        let sync_samples = source.sync_samples().map(|x| {
            x.iter()
                .filter(|&&s| s > start as u64 && s <= end as u64)
                .map(|&s| s - start as u64)
                .collect()
        });

        let composition_offsets = CompositionOffset::slice(source.composition_offsets(), start..end);

        let dependencies = source
            .sample_dependencies()
            .get(start..end)
            .map(|x| x.to_vec())
            .unwrap_or_default();

        Ok(Self {
            source,
            range: start..end,
            durations,
            sync_samples,
            composition_offsets,
            dependencies,
        })
    }

    /// Range of the source samples exposed by this track.
    pub fn range(&self) -> &SampleRange {
        &self.range
    }

    pub fn source(&self) -> &Arc<dyn Track> {
        &self.source
    }
}

impl Track for CroppedTrack {
    fn name(&self) -> String {
        format!("crop({})", self.source.name())
    }

    fn handler(&self) -> &str {
        self.source.handler()
    }

    fn timescale(&self) -> u32 {
        self.source.timescale()
    }

    fn sample(&self, index: usize) -> Result<Bytes> {
        if index >= self.range.len() {
            return Err(Error::SampleIndexOutOfRange {
                index,
                count: self.range.len(),
            });
        }

        self.source.sample(self.range.start + index)
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
        self.source.sample_entry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        MemoryTrack,
        boxes::{FourCc, VisualSampleEntry},
    };

    fn source() -> Arc<dyn Track> {
        let mut builder =
            MemoryTrack::builder("video", VisualSampleEntry::new(FourCc::AVC1, 320, 240))
                .timescale(25);
        for i in 0..6u8 {
            builder = builder.sample(vec![i], 1);
        }

        Arc::new(
            builder
                .sync_samples(vec![1, 4])
                .composition_offsets(vec![
                    CompositionOffset::new(2, 0),
                    CompositionOffset::new(3, 2),
                    CompositionOffset::new(1, 0),
                ])
                .sample_dependencies(
                    (0..6)
                        .map(|i| SampleDependency {
                            sample_depends_on: if i % 3 == 0 { 2 } else { 1 },
                            ..Default::default()
                        })
                        .collect(),
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_crop_renumbers_samples() {
        let track = CroppedTrack::new(source(), 2, 5).unwrap();

        assert_eq!(track.name(), "crop(video)");
        assert_eq!(track.sample_count(), 3);
        assert_eq!(&track.sample(0).unwrap()[..], &[2]);
        assert_eq!(&track.sample(2).unwrap()[..], &[4]);
        assert!(matches!(
            track.sample(3),
            Err(Error::SampleIndexOutOfRange { index: 3, count: 3 })
        ));
        assert_eq!(track.timescale(), 25);
        assert_eq!(track.sample_entry().unwrap().box_type(), FourCc::AVC1);
    }

    #[test]
    fn test_crop_rebases_sync_samples() {
        let track = CroppedTrack::new(source(), 2, 5).unwrap();
        // source sample 4 (index 3) becomes the second cropped sample
        assert_eq!(track.sync_samples(), Some(&[2][..]));

        let track = CroppedTrack::new(source(), 0, 3).unwrap();
        assert_eq!(track.sync_samples(), Some(&[1][..]));
    }

    #[test]
    fn test_crop_keeps_last_sync_sample() {
        let mut builder =
            MemoryTrack::builder("video", VisualSampleEntry::new(FourCc::AVC1, 320, 240));
        for i in 0..6u8 {
            builder = builder.sample(vec![i], 1);
        }
        let source: Arc<dyn Track> = Arc::new(builder.sync_samples(vec![1, 6]).build().unwrap());

        // sync sample number equal to the sample count sits on the end bound
        let track = CroppedTrack::new(source.clone(), 3, 6).unwrap();
        assert_eq!(track.sync_samples(), Some(&[3][..]));

        let track = CroppedTrack::new(source.clone(), 0, 6).unwrap();
        assert_eq!(track.sync_samples(), Some(&[1, 6][..]));

        let track = CroppedTrack::new(source.clone(), 5, 6).unwrap();
        assert_eq!(track.sync_samples(), Some(&[1][..]));

        let track = CroppedTrack::new(source, 0, 5).unwrap();
        assert_eq!(track.sync_samples(), Some(&[1][..]));
    }

    #[test]
    fn test_crop_without_sync_in_range() {
        let track = CroppedTrack::new(source(), 4, 6).unwrap();
        assert_eq!(track.sync_samples(), Some(&[][..]));
    }

    #[test]
    fn test_crop_slices_tables() {
        let track = CroppedTrack::new(source(), 1, 6).unwrap();
        assert_eq!(
            track.composition_offsets(),
            &[
                CompositionOffset::new(1, 0),
                CompositionOffset::new(3, 2),
                CompositionOffset::new(1, 0),
            ]
        );
        assert_eq!(track.sample_dependencies().len(), 5);
        assert_eq!(track.sample_dependencies()[2].sample_depends_on, 2);
        assert_eq!(track.duration(), 5);
    }

    #[test]
    fn test_crop_empty_range() {
        let track = CroppedTrack::new(source(), 3, 3).unwrap();
        assert_eq!(track.sample_count(), 0);
        assert!(track.composition_offsets().is_empty());
        assert!(track.sample_dependencies().is_empty());
    }

    #[test]
    fn test_crop_invalid_range() {
        assert!(matches!(
            CroppedTrack::new(source(), 4, 2),
            Err(Error::InvalidSampleRange { .. })
        ));
        assert!(matches!(
            CroppedTrack::new(source(), 0, 7),
            Err(Error::InvalidSampleRange { count: 6, .. })
        ));
    }

    #[test]
    fn test_crop_full_range_is_identity() {
        let source = source();
        let track = CroppedTrack::new(source.clone(), 0, 6).unwrap();

        assert_eq!(track.sample_durations(), source.sample_durations());
        assert_eq!(track.sync_samples(), source.sync_samples());
        assert_eq!(track.composition_offsets(), source.composition_offsets());
        assert_eq!(track.sample_dependencies(), source.sample_dependencies());
    }
}
