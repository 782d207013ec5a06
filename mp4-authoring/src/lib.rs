#![cfg_attr(docsrs, feature(doc_cfg))]

//! Track level transformations for authoring ISO-BMFF (mp4) files.
//!
//! Tracks are exposed through the [`Track`] trait and shared as
//! `Arc<dyn Track>`. Decorators derive new tracks without copying media:
//!
//! - [`CroppedTrack`] exposes a contiguous range of samples.
//! - [`CencEncryptingTrack`] presents a track as common encrypted (`cenc` or
//!   `cbc1`), with key rotation through sample groups.
//! - [`trim_tracks`] crops a set of tracks to a time span aligned to sync
//!   samples.
//!
//! Logging goes through the [`log`](https://docs.rs/log) facade, the crate
//! never installs a logger.

pub mod boxes;
pub mod parser;
pub mod sample_group;

mod aux_info;
mod cipher;
mod error;
mod options;
mod range_map;
mod reader;
mod track;
mod trim;

pub use aux_info::{SampleAuxiliaryData, SubsampleEntry};
pub use error::{Error, Result};
pub use options::{CencEncryptOptions, CencEncryptOptionsBuilder, ContentKey, KeyTable, Scheme};
pub use range_map::RangeStartMap;
pub use reader::Reader;
pub use sample_group::{CencSampleEncryptionGroupEntry, SampleGroupExtension};
pub use track::{
    CencEncryptingTrack, CompositionOffset, CroppedTrack, MemoryTrack, MemoryTrackBuilder,
    SampleDependency, SampleRange, Track,
};
pub use trim::{correct_time_to_next_sync_sample, sample_range_for, trim_tracks};
