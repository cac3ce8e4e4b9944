use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Threshold, in bytes, above which a file is split into chunks.
///
/// Also the size of every chunk except possibly the last. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ChunkSize(u64);

impl ChunkSize {
    /// Default threshold used when none is configured.
    pub const DEFAULT: ChunkSize = ChunkSize(1024);

    pub fn new(bytes: u64) -> Result<Self, TypeError> {
        if bytes == 0 {
            return Err(TypeError::ZeroChunkSize);
        }
        Ok(Self(bytes))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Number of chunks a file of `size` bytes is split into.
    pub fn chunks_for(self, size: u64) -> u64 {
        size.div_ceil(self.0)
    }

    /// Whether a file of `size` bytes must be chunked.
    pub fn is_exceeded_by(self, size: u64) -> bool {
        size > self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u64> for ChunkSize {
    type Error = TypeError;

    fn try_from(bytes: u64) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<ChunkSize> for u64 {
    fn from(size: ChunkSize) -> Self {
        size.0
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}
