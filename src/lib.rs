//! Restores playable audio files from encrypted ncm music containers:
//! recovers the per-file key, decrypts the payload with the derived
//! substitution-box keystream, and writes back tags and cover art.

pub mod batch;
pub mod container;
pub mod crypto;
pub mod error;
pub mod meta;
pub mod pipeline;
pub mod reader;
pub mod tag;

pub use container::{AudioKind, NcmContainer};
pub use error::{NcmError, Result};
pub use meta::{CoverImage, ImageMime, Metadata};
