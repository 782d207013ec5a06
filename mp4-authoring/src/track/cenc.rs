use super::{CompositionOffset, SampleDependency, Track};
use crate::{
    CencEncryptOptions, ContentKey, Error, RangeStartMap, Reader, Result, SampleAuxiliaryData,
    Scheme, SubsampleEntry,
    boxes::{FourCc, SampleEntry, SchmBox, SinfBox, TencBox},
    cipher, sample_group,
};
use bytes::Bytes;
use log::{debug, trace};
use once_cell::sync::OnceCell;
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;
use uuid::Uuid;

/// Presents another track as common encrypted.
///
/// Keys are resolved per sample through the sample groups of the options,
/// every keyed sample gets the next IV of a per track counter. For AVC and
/// HEVC tracks each NAL unit becomes one subsample whose header stays clear.
/// Samples of other tracks are described by a single clear subsample.
pub struct CencEncryptingTrack {
    source: Arc<dyn Track>,
    scheme: Scheme,
    default_kid: Option<Uuid>,
    key_table: RangeStartMap<usize, Option<ContentKey>>,
    aux_data: Vec<SampleAuxiliaryData>,
    nal_length_size: Option<u8>,
    sample_entry: OnceCell<SampleEntry>,
}

impl CencEncryptingTrack {
    /// Wrap `source`, drawing the first IV from the operating system.
    pub fn new(source: Arc<dyn Track>, options: &CencEncryptOptions) -> Result<Self> {
        Self::with_rng(source, options, &mut OsRng)
    }

    /// Wrap `source`, drawing the first IV from `rng`.
    pub fn with_rng<R: RngCore + ?Sized>(
        source: Arc<dyn Track>,
        options: &CencEncryptOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let sample_count = source.sample_count();
        let key_table = sample_group::build_key_table(
            &options.groups,
            sample_count,
            options.default_kid,
            &options.keys,
        )?;

        let nal_length_size = source.sample_entry()?.nal_length_size();
        match nal_length_size {
            Some(size) => debug!(
                "{}: subsample encryption with {size} byte NAL length prefixes",
                source.name()
            ),
            None => debug!("{}: no NAL structure, samples stay clear", source.name()),
        }

        let mut iv = if options.dummy_ivs { 0 } else { rng.next_u64() };
        let mut aux_data = Vec::with_capacity(sample_count);

        for index in 0..sample_count {
            if key_table.get(index).copied().flatten().is_none() {
                aux_data.push(SampleAuxiliaryData::default());
                continue;
            }

            let data = source.sample(index)?;
            trace!("sample {index}: iv {iv:016x}");

            let subsamples = match nal_length_size {
                Some(size) if !options.encrypt_but_all_clear => {
                    nal_subsamples(index, &data, size)?
                }
                // one clear run over the whole sample
                _ => vec![SubsampleEntry::new(sample_size(index, &data)?, 0)],
            };

            aux_data.push(SampleAuxiliaryData {
                iv: Some(iv.to_be_bytes()),
                subsamples,
            });
            iv = iv.wrapping_add(1);
        }

        Ok(Self {
            source,
            scheme: options.scheme,
            default_kid: options.default_kid,
            key_table,
            aux_data,
            nal_length_size,
            sample_entry: OnceCell::new(),
        })
    }

    /// Auxiliary information (IV and subsamples) of every sample.
    pub fn aux_data(&self) -> &[SampleAuxiliaryData] {
        &self.aux_data
    }

    /// Sample index to key map, `None` values mark clear ranges.
    pub fn key_table(&self) -> &RangeStartMap<usize, Option<ContentKey>> {
        &self.key_table
    }

    pub fn key(&self, index: usize) -> Option<ContentKey> {
        self.key_table.get(index).copied().flatten()
    }

    pub fn default_kid(&self) -> Option<Uuid> {
        self.default_kid
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Whether samples are split into subsamples along NAL units.
    pub fn is_subsample_encrypted(&self) -> bool {
        self.nal_length_size.is_some()
    }
}

impl Track for CencEncryptingTrack {
    fn name(&self) -> String {
        format!("enc({})", self.source.name())
    }

    fn handler(&self) -> &str {
        self.source.handler()
    }

    fn timescale(&self) -> u32 {
        self.source.timescale()
    }

    fn sample(&self, index: usize) -> Result<Bytes> {
        let data = self.source.sample(index)?;

        match (self.key(index), self.aux_data.get(index).and_then(|x| x.iv)) {
            (Some(key), Some(iv)) => Ok(Bytes::from(cipher::encrypt_sample(
                self.scheme,
                &key,
                &iv,
                &self.aux_data[index].subsamples,
                &data,
            ))),
            _ => Ok(data),
        }
    }

    fn sample_durations(&self) -> &[u64] {
        self.source.sample_durations()
    }

    fn sync_samples(&self) -> Option<&[u64]> {
        self.source.sync_samples()
    }

    fn composition_offsets(&self) -> &[CompositionOffset] {
        self.source.composition_offsets()
    }

    fn sample_dependencies(&self) -> &[SampleDependency] {
        self.source.sample_dependencies()
    }

    /// Protected copy of the source sample entry, created on first use.
    fn sample_entry(&self) -> Result<&SampleEntry> {
        self.sample_entry.get_or_try_init(|| {
            let mut entry = self.source.sample_entry()?.clone();
            let original_format = entry.box_type();

            match &mut entry {
                SampleEntry::Visual(x) => x.box_type = FourCc::ENCV,
                SampleEntry::Audio(x) => x.box_type = FourCc::ENCA,
                SampleEntry::Other(x) => return Err(Error::UnsupportedCodec(x.box_type)),
            }

            entry.add_box(SinfBox::new(
                original_format,
                SchmBox::new(self.scheme.scheme_type()),
                TencBox::new(self.default_kid),
            ));

            debug!(
                "{}: protected sample entry {} (original format {original_format})",
                self.source.name(),
                entry.box_type()
            );
            Ok(entry)
        })
    }
}

fn sample_size(index: usize, data: &[u8]) -> Result<u32> {
    u32::try_from(data.len()).map_err(|_| Error::malformed(index, "sample larger than 4 GiB"))
}

/// Split a sample of length prefixed NAL units into subsamples.
///
/// Small NAL units stay entirely clear. Larger ones keep 96 bytes plus
/// enough to make the protected part a whole number of AES blocks clear.
fn nal_subsamples(index: usize, data: &Bytes, nal_length_size: u8) -> Result<Vec<SubsampleEntry>> {
    let mut reader = Reader::new(data.clone());
    let mut subsamples = Vec::new();

    while reader.has_more_data() {
        if reader.remaining() < nal_length_size as u64 {
            return Err(Error::malformed(
                index,
                format!(
                    "{} trailing bytes cannot hold a {nal_length_size} byte NAL length",
                    reader.remaining()
                ),
            ));
        }

        let nal_length = reader.read_uint(nal_length_size)?;
        if nal_length > reader.remaining() {
            return Err(Error::malformed(
                index,
                format!(
                    "NAL unit of {nal_length} bytes at offset {} overruns the sample",
                    reader.get_position()
                ),
            ));
        }
        reader.skip(nal_length)?;

        let gross = nal_length + nal_length_size as u64;
        let clear = if gross >= 112 { 96 + gross % 16 } else { gross };
        let encrypted = u32::try_from(gross - clear)
            .map_err(|_| Error::malformed(index, "NAL unit larger than 4 GiB"))?;

        subsamples.push(SubsampleEntry::new(clear as u32, encrypted));
    }

    Ok(subsamples)
}
