use crate::{Error, Reader, Result};
use bytes::Bytes;
use uuid::Uuid;

/// Track Encryption Box (tenc) - default encryption parameters of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TencBox {
    pub default_is_protected: u8,
    pub default_per_sample_iv_size: u8,
    pub default_kid: Uuid,
}

impl TencBox {
    /// Defaults for a track protected with `default_kid`, or for a track
    /// whose samples all get their key through sample groups when `None`.
    pub fn new(default_kid: Option<Uuid>) -> Self {
        match default_kid {
            Some(kid) => Self {
                default_is_protected: 1,
                default_per_sample_iv_size: 8,
                default_kid: kid,
            },
            None => Self {
                default_is_protected: 0,
                default_per_sample_iv_size: 0,
                default_kid: Uuid::nil(),
            },
        }
    }

    /// Parse the payload of a tenc box (version and flags included).
    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut reader = Reader::new(payload);

        // 4 bytes version and flags
        // 1 byte reserved
        // 1 byte reserved (version 0) or crypt/skip byte blocks (version 1)
        reader
            .skip(6)
            .map_err(|_| Error::parse("tenc box header (6 bytes)"))?;

        let default_is_protected = reader
            .read_u8()
            .map_err(|_| Error::parse("tenc box is protected (u8)"))?;
        let default_per_sample_iv_size = reader
            .read_u8()
            .map_err(|_| Error::parse("tenc box per sample iv size (u8)"))?;
        let kid = reader
            .read_bytes_u8(16)
            .map_err(|_| Error::parse("tenc box default kid (16 bytes)"))?;

        Ok(Self {
            default_is_protected,
            default_per_sample_iv_size,
            default_kid: Uuid::from_slice(&kid).map_err(|e| Error::parse(e.to_string()))?,
        })
    }
}
