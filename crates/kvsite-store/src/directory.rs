//! Directory-backed key-value store.
//!
//! Stores one file per key directly under a root directory:
//! `{root}/{key}`. Keys produced by [`kvsite_types::derive_key`] never contain
//! a separator, so the layout is flat.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use kvsite_types::StoreKey;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ByteStream, KvStore, Uploader};

/// Size of the frames yielded by [`DirectoryKvStore::get_stream`].
const READ_FRAME_SIZE: usize = 64 * 1024;

const TEMP_SUFFIX: &str = ".kvsite-tmp";

/// File-per-key store rooted at a directory.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place, so a reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct DirectoryKvStore {
    root: PathBuf,
}

impl DirectoryKvStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the file path for a key, rejecting keys that would escape the root.
    fn key_path(&self, key: &StoreKey) -> StoreResult<PathBuf> {
        let raw = key.as_str();
        let reason = if raw.is_empty() {
            Some("empty key")
        } else if raw == "." || raw == ".." {
            Some("reserved name")
        } else if raw.contains(['/', '\\', '\0']) {
            Some("contains a path separator")
        } else if raw.ends_with(TEMP_SUFFIX) {
            Some("reserved suffix")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StoreError::InvalidKey {
                key: key.clone(),
                reason,
            }),
            None => Ok(self.root.join(raw)),
        }
    }
}

#[async_trait]
impl Uploader for DirectoryKvStore {
    async fn put(&self, key: &StoreKey, value: Bytes) -> StoreResult<()> {
        let path = self.key_path(key)?;
        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(TEMP_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, &value).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(%key, path = %path.display(), size = value.len(), "stored value to file");
        Ok(())
    }
}

#[async_trait]
impl KvStore for DirectoryKvStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Bytes>> {
        let path = self.key_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn get_stream(&self, key: &StoreKey) -> StoreResult<Option<ByteStream>> {
        let path = self.key_path(key)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let frames: ByteStream = Box::pin(stream::try_unfold(file, next_frame));
        Ok(Some(frames))
    }
}

async fn next_frame(mut file: tokio::fs::File) -> StoreResult<Option<(Bytes, tokio::fs::File)>> {
    let mut buf = vec![0u8; READ_FRAME_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((Bytes::from(buf), file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn key(raw: &str) -> StoreKey {
        StoreKey::from_raw(raw)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKvStore::new(dir.path()).unwrap();
        store.put(&key("site_index.html"), Bytes::from_static(b"<html>")).await.unwrap();

        assert!(dir.path().join("site_index.html").exists());
        let value = store.get(&key("site_index.html")).await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"<html>")));
    }

    #[tokio::test]
    async fn put_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKvStore::new(dir.path()).unwrap();
        store.put(&key("a"), Bytes::from_static(b"x")).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a")]);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKvStore::new(dir.path()).unwrap();
        assert!(store.get(&key("nope")).await.unwrap().is_none());
        assert!(store.get_stream(&key("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_reads_in_frames() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKvStore::new(dir.path()).unwrap();
        let data: Vec<u8> = (0..READ_FRAME_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        store.put(&key("big"), Bytes::from(data.clone())).await.unwrap();

        let frames: Vec<Bytes> = store
            .get_stream(&key("big"))
            .await
            .unwrap()
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(frames.len() >= 3);
        assert!(frames.iter().all(|f| f.len() <= READ_FRAME_SIZE));
        assert_eq!(frames.concat(), data);
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKvStore::new(dir.path()).unwrap();
        for raw in ["", ".", "..", "a/b", "a\\b", "x.kvsite-tmp"] {
            let err = store.put(&key(raw), Bytes::new()).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "{raw}");
        }
    }

    #[test]
    fn new_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("store");
        let store = DirectoryKvStore::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }
}
