use super::{FourCc, Mp4Box, SinfBox};
use crate::{
    Error, Reader, Result,
    parser::{self, Mp4Parser},
};
use bytes::Bytes;
use std::sync::{Arc, Mutex};

const VISUAL_TYPES: &[&[u8; 4]] = &[
    b"avc1", b"avc2", b"avc3", b"avc4", b"hvc1", b"hev1", b"dvh1", b"dvhe", b"vp08", b"vp09",
    b"av01", b"mp4v", b"s263", b"encv",
];

const AUDIO_TYPES: &[&[u8; 4]] = &[
    b"mp4a", b"ac-3", b"ec-3", b"ac-4", b"Opus", b"fLaC", b"alac", b"samr", b"sawb", b"enca",
];

/// One entry of the sample description box (stsd).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleEntry {
    Visual(VisualSampleEntry),
    Audio(AudioSampleEntry),
    Other(OtherSampleEntry),
}

impl SampleEntry {
    pub fn box_type(&self) -> FourCc {
        match self {
            Self::Visual(x) => x.box_type,
            Self::Audio(x) => x.box_type,
            Self::Other(x) => x.box_type,
        }
    }

    pub fn children(&self) -> &[Mp4Box] {
        match self {
            Self::Visual(x) => &x.children,
            Self::Audio(x) => &x.children,
            Self::Other(x) => &x.children,
        }
    }

    /// Append a child box after the existing ones.
    pub fn add_box<B: Into<Mp4Box>>(&mut self, b: B) {
        let children = match self {
            Self::Visual(x) => &mut x.children,
            Self::Audio(x) => &mut x.children,
            Self::Other(x) => &mut x.children,
        };
        children.push(b.into());
    }

    /// NAL unit length size declared by an `avcC` or `hvcC` child.
    ///
    /// When both are present the later box wins.
    pub fn nal_length_size(&self) -> Option<u8> {
        self.children().iter().fold(None, |size, b| match b {
            Mp4Box::Avcc(x) => Some(x.nal_length_size()),
            Mp4Box::Hvcc(x) => Some(x.nal_length_size()),
            _ => size,
        })
    }

    pub fn sinf(&self) -> Option<&SinfBox> {
        self.children().iter().find_map(|b| match b {
            Mp4Box::Sinf(x) => Some(x),
            _ => None,
        })
    }

    /// Sample entry type before any protection was applied.
    pub fn original_format(&self) -> FourCc {
        self.sinf()
            .map(|x| x.frma.data_format)
            .unwrap_or_else(|| self.box_type())
    }

    /// Parse a sample entry from its type and payload.
    pub fn parse(box_type: FourCc, payload: Bytes) -> Result<Self> {
        let mut reader = Reader::new(payload);

        if VISUAL_TYPES.contains(&box_type.as_bytes()) {
            Ok(Self::Visual(VisualSampleEntry::parse(box_type, &mut reader)?))
        } else if AUDIO_TYPES.contains(&box_type.as_bytes()) {
            Ok(Self::Audio(AudioSampleEntry::parse(box_type, &mut reader)?))
        } else {
            let payload = reader.read_bytes(reader.remaining() as usize)?;
            Ok(Self::Other(OtherSampleEntry {
                box_type,
                payload,
                children: Vec::new(),
            }))
        }
    }

    /// Parse all sample entries of an `stsd` box (header included).
    pub fn parse_stsd(data: &[u8]) -> Result<Vec<Self>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let entries_c = entries.clone();

        Mp4Parser::new()
            .full_box(FourCc::STSD, Arc::new(parser::sample_description))
            .any_box(Arc::new(move |mut box_| {
                let box_type = box_.box_type;
                let payload = box_.reader.read_bytes(box_.reader.remaining() as usize)?;
                let entry = SampleEntry::parse(box_type, payload)?;
                entries_c
                    .lock()
                    .map_err(|_| Error::parse("stsd entries (lock poisoned)"))?
                    .push(entry);
                Ok(())
            }))
            .parse(data)?;

        let entries = entries
            .lock()
            .map_err(|_| Error::parse("stsd entries (lock poisoned)"))?;
        Ok(entries.clone())
    }
}

impl From<VisualSampleEntry> for SampleEntry {
    fn from(value: VisualSampleEntry) -> Self {
        Self::Visual(value)
    }
}

impl From<AudioSampleEntry> for SampleEntry {
    fn from(value: AudioSampleEntry) -> Self {
        Self::Audio(value)
    }
}

impl From<OtherSampleEntry> for SampleEntry {
    fn from(value: OtherSampleEntry) -> Self {
        Self::Other(value)
    }
}

/// Visual sample entry, e.g. `avc1` or `hev1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSampleEntry {
    pub box_type: FourCc,
    pub data_reference_index: u16,
    pub width: u16,
    pub height: u16,
    /// 16.16 fixed point pixels per inch.
    pub horizresolution: u32,
    pub vertresolution: u32,
    pub frame_count: u16,
    pub compressor_name: [u8; 32],
    pub depth: u16,
    pub children: Vec<Mp4Box>,
}

impl VisualSampleEntry {
    pub fn new(box_type: FourCc, width: u16, height: u16) -> Self {
        Self {
            box_type,
            data_reference_index: 1,
            width,
            height,
            horizresolution: 0x0048_0000,
            vertresolution: 0x0048_0000,
            frame_count: 1,
            compressor_name: [0; 32],
            depth: 0x0018,
            children: Vec::new(),
        }
    }

    fn parse(box_type: FourCc, reader: &mut Reader) -> Result<Self> {
        // 6 bytes reserved
        reader.skip(6)?;
        let data_reference_index = reader.read_u16()?;
        // 2 bytes pre defined
        // 2 bytes reserved
        // 12 bytes pre defined
        reader.skip(16)?;
        let width = reader.read_u16()?;
        let height = reader.read_u16()?;
        let horizresolution = reader.read_u32()?;
        let vertresolution = reader.read_u32()?;
        // 4 bytes reserved
        reader.skip(4)?;
        let frame_count = reader.read_u16()?;
        let mut compressor_name = [0; 32];
        compressor_name.copy_from_slice(&reader.read_bytes_u8(32)?);
        let depth = reader.read_u16()?;
        // 2 bytes pre defined (-1)
        reader.skip(2)?;

        Ok(Self {
            box_type,
            data_reference_index,
            width,
            height,
            horizresolution,
            vertresolution,
            frame_count,
            compressor_name,
            depth,
            children: Mp4Box::parse_all(reader)?,
        })
    }
}

/// Audio sample entry, e.g. `mp4a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSampleEntry {
    pub box_type: FourCc,
    pub data_reference_index: u16,
    pub version: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    /// 16.16 fixed point.
    pub sample_rate: u32,
    /// Version 1 (16 bytes) or version 2 (36 bytes) trailing fields.
    pub extension: Bytes,
    pub children: Vec<Mp4Box>,
}

impl AudioSampleEntry {
    pub fn new(box_type: FourCc, channel_count: u16, sample_rate: u16) -> Self {
        Self {
            box_type,
            data_reference_index: 1,
            version: 0,
            channel_count,
            sample_size: 16,
            sample_rate: (sample_rate as u32) << 16,
            extension: Bytes::new(),
            children: Vec::new(),
        }
    }

    fn parse(box_type: FourCc, reader: &mut Reader) -> Result<Self> {
        // 6 bytes reserved
        reader.skip(6)?;
        let data_reference_index = reader.read_u16()?;
        let version = reader.read_u16()?;
        // 2 bytes revision
        // 4 bytes vendor
        reader.skip(6)?;
        let channel_count = reader.read_u16()?;
        let sample_size = reader.read_u16()?;
        // 2 bytes compression id
        // 2 bytes packet size
        reader.skip(4)?;
        let sample_rate = reader.read_u32()?;

        let extension = match version {
            1 => reader.read_bytes(16)?,
            2 => reader.read_bytes(36)?,
            _ => Bytes::new(),
        };

        Ok(Self {
            box_type,
            data_reference_index,
            version,
            channel_count,
            sample_size,
            sample_rate,
            extension,
            children: Mp4Box::parse_all(reader)?,
        })
    }
}

/// Sample entry of any other media kind, kept as raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherSampleEntry {
    pub box_type: FourCc,
    pub payload: Bytes,
    pub children: Vec<Mp4Box>,
}
