use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};

/// Character every path separator is rewritten to.
pub const SEPARATOR_REPLACEMENT: char = '_';

/// Key under which a value is written to, and read from, the key-value store.
///
/// A `StoreKey` is derived from a file path by replacing every path separator
/// with [`SEPARATOR_REPLACEMENT`], so it never contains `/`. Chunk keys are the
/// file's base key followed by `_<index>` for every chunk after the first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    /// Normalize a raw address into a key.
    ///
    /// Both `/` and the platform separator become `_`; every other character
    /// is kept as-is.
    pub fn normalize(raw: &str) -> Self {
        Self(
            raw.chars()
                .map(|c| {
                    if c == '/' || c == MAIN_SEPARATOR {
                        SEPARATOR_REPLACEMENT
                    } else {
                        c
                    }
                })
                .collect(),
        )
    }

    /// Wrap an already-normalized key verbatim.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({:?})", self.0)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StoreKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StoreKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StoreKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Derive the store key for a file path.
///
/// Pure function of the path text: no filesystem access, so the same path
/// always yields the same key.
pub fn derive_key(path: impl AsRef<Path>) -> StoreKey {
    StoreKey::normalize(&path.as_ref().to_string_lossy())
}

/// Key of chunk `index` of the file stored under `base`.
///
/// Chunk 0 is stored under the base key itself so that files which fit in a
/// single chunk and the first chunk of large files share one naming rule.
pub fn chunk_key(base: &StoreKey, index: usize) -> StoreKey {
    if index == 0 {
        base.clone()
    } else {
        StoreKey(format!("{base}{SEPARATOR_REPLACEMENT}{index}"))
    }
}

/// Recover the chunk index encoded in `chunk`, if it is a chunk of `base`.
///
/// Inverse of [`chunk_key`]: suffixes with leading zeros, signs or a zero
/// index are rejected because `chunk_key` never produces them.
pub fn chunk_index(base: &StoreKey, chunk: &StoreKey) -> Option<usize> {
    if chunk == base {
        return Some(0);
    }
    let suffix = chunk
        .as_str()
        .strip_prefix(base.as_str())?
        .strip_prefix(SEPARATOR_REPLACEMENT)?;
    if suffix.is_empty() || suffix.starts_with('0') || !suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    suffix.parse().ok()
}
