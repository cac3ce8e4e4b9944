//! The record a publish run hands to the worker generator.
//!
//! A [`Manifest`] lists every key written during one run. Small files map to
//! a single value stored under their own key; large files map to the ordered
//! list of chunk keys that, fetched and concatenated, reproduce the file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::{chunk_index, StoreKey};

/// Small-file keys and large-file chunk lists produced by one publish run.
///
/// Invariants upheld by the mutating methods (and checked by [`Manifest::validate`]
/// for manifests loaded from elsewhere):
/// - a key is either small or large, never both, and appears once;
/// - every chunk list is non-empty and holds exactly the chunks `0..n` of its
///   base key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    small_files: Vec<StoreKey>,
    large_files: BTreeMap<StoreKey, Vec<StoreKey>>,
}

/// How a key is stored, as recorded in a [`Manifest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestEntry<'a> {
    /// Stored as one value under the key itself.
    Small,
    /// Stored as chunks; the slice is in manifest order.
    Large(&'a [StoreKey]),
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of files stored as a single value, in walk order.
    pub fn small_files(&self) -> &[StoreKey] {
        &self.small_files
    }

    /// Chunk lists of files stored in pieces, keyed by file key.
    pub fn large_files(&self) -> &BTreeMap<StoreKey, Vec<StoreKey>> {
        &self.large_files
    }

    /// Total number of files recorded.
    pub fn len(&self) -> usize {
        self.small_files.len() + self.large_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.small_files.is_empty() && self.large_files.is_empty()
    }

    /// Total number of values written to the store for this manifest.
    pub fn value_count(&self) -> usize {
        self.small_files.len() + self.large_files.values().map(Vec::len).sum::<usize>()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.large_files.contains_key(key) || self.small_files.iter().any(|k| k == key)
    }

    pub fn lookup(&self, key: &str) -> Option<ManifestEntry<'_>> {
        if let Some(chunks) = self.large_files.get(key) {
            return Some(ManifestEntry::Large(chunks));
        }
        if self.small_files.iter().any(|k| k == key) {
            return Some(ManifestEntry::Small);
        }
        None
    }

    /// Record a file stored as a single value.
    pub fn push_small(&mut self, key: StoreKey) -> Result<(), TypeError> {
        if self.contains(key.as_str()) {
            return Err(TypeError::DuplicateKey(key));
        }
        self.small_files.push(key);
        Ok(())
    }

    /// Record a file stored as the given chunks.
    ///
    /// The chunk list is checked with the same rules as [`Manifest::ordered_chunks`]
    /// but stored in the order given.
    pub fn insert_large(&mut self, key: StoreKey, chunks: Vec<StoreKey>) -> Result<(), TypeError> {
        if self.contains(key.as_str()) {
            return Err(TypeError::DuplicateKey(key));
        }
        order_chunks(&key, &chunks)?;
        self.large_files.insert(key, chunks);
        Ok(())
    }

    /// The chunk keys of a large file sorted by chunk index.
    ///
    /// Returns `Ok(None)` when `key` is not a large file. The recorded order is
    /// never trusted: keys are sorted by the index encoded in their suffix
    /// (so `_10` follows `_9`) and the result must be exactly chunks `0..n`.
    pub fn ordered_chunks(&self, key: &str) -> Result<Option<Vec<StoreKey>>, TypeError> {
        match self.large_files.get_key_value(key) {
            Some((base, chunks)) => order_chunks(base, chunks).map(Some),
            None => Ok(None),
        }
    }

    /// Check the invariants of a manifest that was not built through this API.
    pub fn validate(&self) -> Result<(), TypeError> {
        let mut seen = std::collections::HashSet::new();
        for key in self.small_files.iter().chain(self.large_files.keys()) {
            if !seen.insert(key) {
                return Err(TypeError::DuplicateKey(key.clone()));
            }
        }
        for (base, chunks) in &self.large_files {
            order_chunks(base, chunks)?;
        }
        Ok(())
    }
}

fn order_chunks(base: &StoreKey, chunks: &[StoreKey]) -> Result<Vec<StoreKey>, TypeError> {
    if chunks.is_empty() {
        return Err(TypeError::NoChunks(base.clone()));
    }
    let mut indexed = chunks
        .iter()
        .map(|chunk| {
            chunk_index(base, chunk)
                .map(|index| (index, chunk.clone()))
                .ok_or_else(|| TypeError::ForeignChunk {
                    base: base.clone(),
                    chunk: chunk.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(index, _)| *index);

    for (expected, (found, _)) in indexed.iter().enumerate() {
        if *found != expected {
            return Err(TypeError::ChunkGap {
                base: base.clone(),
                expected,
                found: *found,
            });
        }
    }
    Ok(indexed.into_iter().map(|(_, chunk)| chunk).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::chunk_key;
    use proptest::prelude::*;

    fn key(raw: &str) -> StoreKey {
        StoreKey::from_raw(raw)
    }

    fn chunks_of(base: &str, n: usize) -> Vec<StoreKey> {
        (0..n).map(|i| chunk_key(&key(base), i)).collect()
    }

    #[test]
    fn empty_manifest() {
        let manifest = Manifest::new();
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
        assert_eq!(manifest.lookup("anything"), None);
    }

    #[test]
    fn small_and_large_lookup() {
        let mut manifest = Manifest::new();
        manifest.push_small(key("small")).unwrap();
        manifest.insert_large(key("big"), chunks_of("big", 2)).unwrap();

        assert_eq!(manifest.lookup("small"), Some(ManifestEntry::Small));
        assert_eq!(
            manifest.lookup("big"),
            Some(ManifestEntry::Large(&[key("big"), key("big_1")][..]))
        );
        assert_eq!(manifest.lookup("big_1"), None);
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.value_count(), 3);
    }

    #[test]
    fn small_files_keep_insertion_order() {
        let mut manifest = Manifest::new();
        for raw in ["b", "a", "c"] {
            manifest.push_small(key(raw)).unwrap();
        }
        assert_eq!(manifest.small_files(), &[key("b"), key("a"), key("c")]);
    }

    #[test]
    fn key_sets_stay_disjoint() {
        let mut manifest = Manifest::new();
        manifest.push_small(key("x")).unwrap();
        assert_eq!(
            manifest.insert_large(key("x"), chunks_of("x", 2)),
            Err(TypeError::DuplicateKey(key("x")))
        );
        manifest.insert_large(key("y"), chunks_of("y", 2)).unwrap();
        assert_eq!(manifest.push_small(key("y")), Err(TypeError::DuplicateKey(key("y"))));
        assert_eq!(manifest.push_small(key("x")), Err(TypeError::DuplicateKey(key("x"))));
    }

    #[test]
    fn ordered_chunks_sorts_numerically() {
        let mut manifest = Manifest::new();
        let mut chunks = chunks_of("f", 12);
        chunks.reverse();
        manifest.insert_large(key("f"), chunks).unwrap();

        let ordered = manifest.ordered_chunks("f").unwrap().unwrap();
        assert_eq!(ordered, chunks_of("f", 12));
        assert_eq!(ordered[10], "f_10");
    }

    #[test]
    fn ordered_chunks_for_small_or_missing_key() {
        let mut manifest = Manifest::new();
        manifest.push_small(key("s")).unwrap();
        assert_eq!(manifest.ordered_chunks("s"), Ok(None));
        assert_eq!(manifest.ordered_chunks("missing"), Ok(None));
    }

    #[test]
    fn insert_large_rejects_gaps_and_strangers() {
        let mut manifest = Manifest::new();
        assert_eq!(
            manifest.insert_large(key("g"), vec![key("g"), key("g_2")]),
            Err(TypeError::ChunkGap { base: key("g"), expected: 1, found: 2 })
        );
        assert_eq!(
            manifest.insert_large(key("g"), vec![key("g"), key("h_1")]),
            Err(TypeError::ForeignChunk { base: key("g"), chunk: key("h_1") })
        );
        assert_eq!(
            manifest.insert_large(key("g"), vec![]),
            Err(TypeError::NoChunks(key("g")))
        );
        assert!(manifest.is_empty());
    }

    #[test]
    fn validate_catches_tampered_json() {
        let json = r#"{"small_files":["a"],"large_files":{"a":["a","a_1"]}}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.validate(), Err(TypeError::DuplicateKey(key("a"))));

        let json = r#"{"small_files":[],"large_files":{"b":["b_1","b"]}}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.validate(), Ok(()));
    }

    #[test]
    fn json_shape() {
        let mut manifest = Manifest::new();
        manifest.push_small(key("s")).unwrap();
        manifest.insert_large(key("l"), chunks_of("l", 2)).unwrap();
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"small_files":["s"],"large_files":{"l":["l","l_1"]}}"#);
    }

    proptest! {
        #[test]
        fn ordered_chunks_recovers_any_permutation(
            n in 1usize..40,
            seed in any::<u64>(),
        ) {
            let expected = chunks_of("p", n);
            let mut shuffled = expected.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }
            let mut manifest = Manifest::new();
            manifest.insert_large(key("p"), shuffled).unwrap();
            prop_assert_eq!(manifest.ordered_chunks("p").unwrap().unwrap(), expected);
        }
    }
}
