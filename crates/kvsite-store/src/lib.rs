//! Key-value store capabilities for kvsite.
//!
//! The publish pipeline never talks to a concrete service. It is handed an
//! [`Uploader`], the single `put(key, bytes)` capability, and the serving side
//! is handed a [`KvStore`], which adds `get` and a streaming `get_stream`.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - [`DirectoryKvStore`] -- one file per key under a root directory
//!
//! # Design Rules
//!
//! 1. Keys are opaque to the store; normalization happens before a key gets here.
//! 2. A `put` to an existing key overwrites it. Publishing is not idempotent.
//! 3. Missing keys are `Ok(None)`, never an error.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod directory;
pub mod error;
pub mod memory;
pub mod traits;

pub use directory::DirectoryKvStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use traits::{ByteStream, KvStore, Uploader};
