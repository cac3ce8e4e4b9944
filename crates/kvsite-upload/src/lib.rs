//! Publish pipeline for kvsite.
//!
//! Walks a source directory, uploads every regular file through an
//! [`Uploader`](kvsite_store::Uploader) and records what was written in a
//! [`Manifest`](kvsite_types::Manifest). Files larger than the configured
//! [`ChunkSize`](kvsite_types::ChunkSize) are split into chunks stored under
//! `<key>`, `<key>_1`, `<key>_2`, ...
//!
//! # Architecture
//!
//! - [`ChunkReader`] -- reads one file as a sequence of fixed-size chunks
//! - [`split_file`] -- drives a `ChunkReader` and uploads each chunk in order
//! - [`Walker`] -- traverses the tree and builds the manifest
//! - [`publish`] -- walk + render, all or nothing
//!
//! Uploads are strictly sequential: a file's chunks are written in index
//! order and a file is finished before the walk moves on.

pub mod chunker;
pub mod error;
pub mod publish;
pub mod walker;

pub use chunker::{split_file, Chunk, ChunkReader};
pub use error::{UploadError, UploadResult};
pub use publish::{publish, Publication, PublishOptions};
pub use walker::{WalkStats, Walker};
