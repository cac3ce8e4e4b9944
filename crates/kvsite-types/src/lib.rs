//! Foundation types for kvsite.
//!
//! kvsite publishes a directory tree into a key-value store and hands an
//! edge worker enough information to put large files back together. This
//! crate holds the types every other kvsite crate agrees on.
//!
//! # Key Types
//!
//! - [`StoreKey`] -- Normalized key a file (or one of its chunks) is stored under
//! - [`ChunkSize`] -- Positive threshold above which files are split into chunks
//! - [`Manifest`] -- Small-file keys plus the ordered chunk keys of each large file
//! - [`ManifestEntry`] -- Result of looking a request key up in a manifest

pub mod error;
pub mod key;
pub mod manifest;
pub mod size;

pub use error::TypeError;
pub use key::{chunk_index, chunk_key, derive_key, StoreKey};
pub use manifest::{Manifest, ManifestEntry};
pub use size::ChunkSize;
