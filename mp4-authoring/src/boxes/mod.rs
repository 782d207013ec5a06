//! In-memory mp4 boxes read from, or filled in for, a track's sample description.
//!
//! These are plain values. Writing them out as bytes is left to the muxer.

mod codec;
mod sample_entry;
mod schm;
mod sinf;
mod tenc;

pub use codec::{AvcConfigurationBox, HevcConfigurationBox};
pub use sample_entry::{AudioSampleEntry, OtherSampleEntry, SampleEntry, VisualSampleEntry};
pub use schm::SchmBox;
pub use sinf::{FrmaBox, SchiBox, SinfBox};
pub use tenc::TencBox;

use crate::{Reader, Result, parser};
use bytes::Bytes;
use std::fmt;

/// Four character code identifying a box or sample entry type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const AVC1: Self = Self(*b"avc1");
    pub const AVC3: Self = Self(*b"avc3");
    pub const AVCC: Self = Self(*b"avcC");
    pub const ENCA: Self = Self(*b"enca");
    pub const ENCV: Self = Self(*b"encv");
    pub const FRMA: Self = Self(*b"frma");
    pub const HEV1: Self = Self(*b"hev1");
    pub const HVC1: Self = Self(*b"hvc1");
    pub const HVCC: Self = Self(*b"hvcC");
    pub const MP4A: Self = Self(*b"mp4a");
    pub const SCHI: Self = Self(*b"schi");
    pub const SCHM: Self = Self(*b"schm");
    pub const SINF: Self = Self(*b"sinf");
    pub const STSD: Self = Self(*b"stsd");
    pub const TENC: Self = Self(*b"tenc");

    pub const fn new(code: [u8; 4]) -> Self {
        Self(code)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for FourCc {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<&[u8; 4]> for FourCc {
    fn from(value: &[u8; 4]) -> Self {
        Self(*value)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}

/// A child box of a sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mp4Box {
    Avcc(AvcConfigurationBox),
    Hvcc(HevcConfigurationBox),
    Sinf(SinfBox),
    Unknown(UnknownBox),
}

impl Mp4Box {
    pub fn box_type(&self) -> FourCc {
        match self {
            Self::Avcc(_) => FourCc::AVCC,
            Self::Hvcc(_) => FourCc::HVCC,
            Self::Sinf(_) => FourCc::SINF,
            Self::Unknown(x) => x.box_type,
        }
    }

    /// Build a box from its type and payload (the bytes after the header).
    pub fn from_payload(box_type: FourCc, payload: Bytes) -> Result<Self> {
        Ok(match box_type {
            FourCc::AVCC => Self::Avcc(AvcConfigurationBox::parse(payload)?),
            FourCc::HVCC => Self::Hvcc(HevcConfigurationBox::parse(payload)?),
            FourCc::SINF => Self::Sinf(SinfBox::parse(payload)?),
            _ => Self::Unknown(UnknownBox { box_type, payload }),
        })
    }

    /// Parse every box left in `reader`.
    pub(crate) fn parse_all(reader: &mut Reader) -> Result<Vec<Self>> {
        parser::child_boxes(reader)?
            .into_iter()
            .map(|(box_type, payload)| Self::from_payload(box_type, payload))
            .collect()
    }
}

impl From<SinfBox> for Mp4Box {
    fn from(value: SinfBox) -> Self {
        Self::Sinf(value)
    }
}

impl From<AvcConfigurationBox> for Mp4Box {
    fn from(value: AvcConfigurationBox) -> Self {
        Self::Avcc(value)
    }
}

impl From<HevcConfigurationBox> for Mp4Box {
    fn from(value: HevcConfigurationBox) -> Self {
        Self::Hvcc(value)
    }
}

/// Box kept as its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBox {
    pub box_type: FourCc,
    pub payload: Bytes,
}
