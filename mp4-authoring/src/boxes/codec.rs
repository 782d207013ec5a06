use crate::{Error, Reader, Result};
use bytes::Bytes;

/// AVC decoder configuration record (`avcC`).
///
/// Only the NAL unit length size is interpreted, the rest of the record is
/// kept untouched in `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcConfigurationBox {
    pub length_size_minus_one: u8,
    pub payload: Bytes,
}

impl AvcConfigurationBox {
    /// Minimal record without parameter sets.
    pub fn new(nal_length_size: u8) -> Self {
        let length_size_minus_one = nal_length_size.saturating_sub(1) & 0x03;
        Self {
            length_size_minus_one,
            payload: Bytes::from(vec![
                1,    // configuration version
                0x64, // profile indication (high)
                0,    // profile compatibility
                0x1f, // level indication
                0xfc | length_size_minus_one,
                0xe0, // 0 sequence parameter sets
                0,    // 0 picture parameter sets
            ]),
        }
    }

    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut reader = Reader::new(payload.clone());

        // 1 byte configuration version
        // 1 byte profile indication
        // 1 byte profile compatibility
        // 1 byte level indication
        reader
            .skip(4)
            .map_err(|_| Error::parse("avcC box header fields (4 bytes)"))?;

        // 6 bits reserved + 2 bits length size minus one
        let length_size_minus_one = reader
            .read_u8()
            .map_err(|_| Error::parse("avcC box length size (u8)"))?
            & 0x03;

        Ok(Self {
            length_size_minus_one,
            payload,
        })
    }

    /// Width of the length prefix in front of every NAL unit.
    pub fn nal_length_size(&self) -> u8 {
        self.length_size_minus_one + 1
    }
}

/// HEVC decoder configuration record (`hvcC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcConfigurationBox {
    pub length_size_minus_one: u8,
    pub payload: Bytes,
}

impl HevcConfigurationBox {
    const LENGTH_SIZE_OFFSET: usize = 21;

    /// Minimal record without parameter set arrays.
    pub fn new(nal_length_size: u8) -> Self {
        let length_size_minus_one = nal_length_size.saturating_sub(1) & 0x03;
        let mut payload = vec![0; Self::LENGTH_SIZE_OFFSET + 2];
        payload[0] = 1;
        payload[Self::LENGTH_SIZE_OFFSET] = length_size_minus_one;
        Self {
            length_size_minus_one,
            payload: Bytes::from(payload),
        }
    }

    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut reader = Reader::new(payload.clone());

        // 1 byte configuration version
        // 1 byte profile space, tier flag and profile idc
        // 4 bytes profile compatibility flags
        // 6 bytes constraint indicator flags
        // 1 byte level idc
        // 2 bytes min spatial segmentation idc
        // 1 byte parallelism type
        // 1 byte chroma format
        // 1 byte bit depth luma
        // 1 byte bit depth chroma
        // 2 bytes average frame rate
        // 21 bytes total.
        reader
            .skip(Self::LENGTH_SIZE_OFFSET as u64)
            .map_err(|_| Error::parse("hvcC box header fields (21 bytes)"))?;

        // 2 bits constant frame rate
        // 3 bits num temporal layers
        // 1 bit temporal id nested
        // 2 bits length size minus one
        let length_size_minus_one = reader
            .read_u8()
            .map_err(|_| Error::parse("hvcC box length size (u8)"))?
            & 0x03;

        Ok(Self {
            length_size_minus_one,
            payload,
        })
    }

    pub fn nal_length_size(&self) -> u8 {
        self.length_size_minus_one + 1
    }
}
