use std::path::PathBuf;

use kvsite_types::{StoreKey, TypeError};
use thiserror::Error;

/// Errors that abort a publish run.
///
/// Every variant names the offending path or key. No run is retried and no
/// partial manifest is returned once one of these occurs.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The directory walk could not continue.
    #[error("cannot traverse {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A zero-byte regular file was found.
    #[error("refusing to upload empty file {}", path.display())]
    EmptyFile { path: PathBuf },

    /// Reading a chunk failed before the end of the file.
    #[error("failed to read {} at offset {offset}: {source}", path.display())]
    ChunkRead {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The uploader rejected a value.
    #[error("failed to store {key}: {source}")]
    StoreWrite {
        key: StoreKey,
        #[source]
        source: kvsite_store::StoreError,
    },

    /// Two files in one run map to the same store key.
    #[error("{} maps to key {key}, which this run already wrote", path.display())]
    KeyCollision { path: PathBuf, key: StoreKey },

    /// The manifest rejected an entry.
    #[error("manifest error: {0}")]
    Manifest(#[from] TypeError),

    /// The worker script could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] kvsite_render::RenderError),
}

/// Convenience alias for upload results.
pub type UploadResult<T> = Result<T, UploadError>;
