//! Foundation types for the blobcache engine.
//!
//! This crate provides the identifiers, the blob token wire format, and the
//! engine configuration shared by every other blobcache crate.
//!
//! # Key Types
//!
//! - [`ShardId`] — Holder instance id, one per deployment machine
//! - [`UnitId`] — Id of one storage unit (a binary/index/manifest triplet)
//! - [`BlobId`] — Short id of one immutable byte payload within a unit
//! - [`Token`] — Opaque external blob address, `tr_<unit>_bb_<blob>`
//! - [`CacheConfig`] — Explicit engine configuration, passed into constructors

pub mod config;
pub mod error;
pub mod ids;
pub mod token;

pub use config::{CacheConfig, GIB, KIB, MIB};
pub use error::TypeError;
pub use ids::{BlobId, ShardId, UnitId};
pub use token::{Token, LARGE_OBJECT_PREFIX};
