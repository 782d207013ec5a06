use super::FourCc;
use crate::{Error, Reader, Result};
use bytes::Bytes;

/// Scheme Type Box (schm) - identifies the protection scheme.
///
/// - `cenc` (0x63656E63) - AES-CTR
/// - `cbc1` (0x63626331) - AES-CBC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchmBox {
    pub scheme_type: FourCc,
    pub scheme_version: u32,
    /// Present when flags & 0x000001.
    pub scheme_uri: Option<String>,
}

impl SchmBox {
    /// Version written for common encryption schemes (1.0).
    pub const CENC_VERSION: u32 = 0x0001_0000;

    pub fn new(scheme_type: FourCc) -> Self {
        Self {
            scheme_type,
            scheme_version: Self::CENC_VERSION,
            scheme_uri: None,
        }
    }

    /// Parse the payload of a schm box (version and flags included).
    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut reader = Reader::new(payload);
        let flags = reader
            .read_u32()
            .map_err(|_| Error::parse("schm box version and flags (u32)"))?
            & 0xFFFFFF;

        let scheme_type = reader
            .read_u32()
            .map_err(|_| Error::parse("schm box scheme type (u32)"))?
            .into();
        let scheme_version = reader
            .read_u32()
            .map_err(|_| Error::parse("schm box scheme version (u32)"))?;

        let scheme_uri = if flags & 0x000001 != 0 && reader.has_more_data() {
            let bytes = reader.read_bytes_u8(reader.remaining() as usize)?;
            let s = String::from_utf8_lossy(&bytes);
            Some(s.trim_end_matches('\0').to_owned())
        } else {
            None
        };

        Ok(Self {
            scheme_type,
            scheme_version,
            scheme_uri,
        })
    }

    pub fn is_cenc(&self) -> bool {
        self.scheme_type.as_u32() == 0x63656E63
    }

    pub fn is_cbc1(&self) -> bool {
        self.scheme_type.as_u32() == 0x63626331
    }
}
