//! Error types for track transformations.

use crate::boxes::FourCc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while deriving a cropped or encrypted track.
#[derive(Debug, Error)]
pub enum Error {
    /// More than one track carries sync samples in a multi-track trim.
    #[error(
        "start time has already been corrected by another track with sync samples - only one sync-bearing track is supported"
    )]
    AmbiguousSyncCorrection,

    /// A key id referenced by a sample group or as default has no key.
    #[error("key not found for KID: {kid} - ensure the key was supplied for encryption")]
    MissingKey { kid: Uuid },

    /// Sample entry kind has no encrypted counterpart.
    #[error("cannot apply common encryption to '{0}' sample entries")]
    UnsupportedCodec(FourCc),

    /// Sample could not be split into length prefixed NAL units.
    #[error("malformed sample {index}: {reason}")]
    MalformedSample { index: usize, reason: String },

    /// Crop range does not fit the source track.
    #[error("invalid sample range {start}..{end} for track with {count} samples")]
    InvalidSampleRange {
        start: usize,
        end: usize,
        count: usize,
    },

    /// Requested trim times are unusable.
    #[error("invalid trim range: from {from}s to {to}s")]
    InvalidTrimRange { from: f64, to: f64 },

    /// Track metadata is inconsistent.
    #[error("invalid track: {0}")]
    InvalidTrack(String),

    /// Sample index out of range.
    #[error(
        "sample index out of range: requested index {index} but only {count} samples available"
    )]
    SampleIndexOutOfRange { index: usize, count: usize },

    /// Invalid hex string.
    #[error("invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Hex string has wrong length.
    #[error("hex string has wrong length: expected 16 bytes (32 hex chars), got {0} bytes")]
    HexWrongLength(usize),

    /// Box data could not be parsed.
    #[error("cannot parse {0}")]
    Parse(String),

    /// I/O error while reading box data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse<T: Into<String>>(reason: T) -> Self {
        Self::Parse(reason.into())
    }

    pub(crate) fn malformed<T: Into<String>>(index: usize, reason: T) -> Self {
        Self::MalformedSample {
            index,
            reason: reason.into(),
        }
    }
}

/// Result type for track transformations.
pub type Result<T> = std::result::Result<T, Error>;
