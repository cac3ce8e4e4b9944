//! Serving side of kvsite.
//!
//! [`Reconstructor`] answers a request key from a manifest and a [`KvStore`]:
//! small files come back whole, large files as a lazy [`ChunkStream`] that
//! fetches one chunk at a time in index order, and everything else is not
//! found without a store call. [`PreviewServer`] puts an HTTP front on it so
//! a published tree can be checked locally before the worker is deployed.
//!
//! [`KvStore`]: kvsite_store::KvStore

pub mod config;
pub mod error;
pub mod reconstruct;
pub mod router;
pub mod server;

pub use config::{PreviewConfig, DEFAULT_PORT};
pub use error::{ServeError, ServeResult};
pub use reconstruct::{request_key, ChunkStream, Reconstructor, Resolution};
pub use router::{build_router, CONTENT_TYPE, NOT_FOUND_BODY};
pub use server::PreviewServer;
