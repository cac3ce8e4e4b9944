use kvsite_store::StoreError;
use kvsite_types::{StoreKey, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to read {key} from the store: {source}")]
    StoreRead {
        key: StoreKey,
        #[source]
        source: StoreError,
    },

    #[error("chunk {key} is listed in the manifest but missing from the store")]
    MissingChunk { key: StoreKey },

    #[error("invalid manifest: {0}")]
    Manifest(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServeResult<T> = Result<T, ServeError>;
