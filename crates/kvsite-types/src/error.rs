use thiserror::Error;

use crate::key::StoreKey;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("key {0} appears more than once in the manifest")]
    DuplicateKey(StoreKey),

    #[error("chunk key {chunk} does not belong to {base}")]
    ForeignChunk { base: StoreKey, chunk: StoreKey },

    #[error("chunk list for {base} is not contiguous: expected index {expected}, found {found}")]
    ChunkGap {
        base: StoreKey,
        expected: usize,
        found: usize,
    },

    #[error("chunk list for {0} is empty")]
    NoChunks(StoreKey),
}
