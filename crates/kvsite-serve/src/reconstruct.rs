//! Request key resolution and ordered chunk streaming.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use kvsite_store::{ByteStream, KvStore};
use kvsite_types::{Manifest, ManifestEntry, StoreKey};
use tracing::{debug, warn};

use crate::error::{ServeError, ServeResult};

/// Body of a large file, yielded chunk by chunk.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ServeResult<Bytes>> + Send>>;

/// Outcome of resolving one request key.
pub enum Resolution {
    /// The key is not in the manifest (or its value is gone).
    NotFound,
    /// A small file, read in one `get`.
    Whole(Bytes),
    /// A large file, fetched lazily in chunk order.
    Streamed(ChunkStream),
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("NotFound"),
            Self::Whole(bytes) => f.debug_tuple("Whole").field(&bytes.len()).finish(),
            Self::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// Turn a request path into the store key it addresses.
///
/// The leading `/` is dropped, the rest is percent-decoded and then
/// normalized exactly like a file path below the published root, so
/// `/docs/a%20b.html` becomes `docs_a b.html`. Paths that do not decode to
/// UTF-8 are used as sent.
pub fn request_key(path: &str) -> StoreKey {
    let path = path.strip_prefix('/').unwrap_or(path);
    let decoded = urlencoding::decode(path).unwrap_or_else(|_| path.into());
    StoreKey::normalize(&decoded)
}

/// Serves files back out of a store using the manifest of the run that wrote them.
#[derive(Clone)]
pub struct Reconstructor {
    manifest: Arc<Manifest>,
    store: Arc<dyn KvStore>,
}

impl fmt::Debug for Reconstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconstructor")
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl Reconstructor {
    /// Build a reconstructor, rejecting manifests whose chunk lists are
    /// inconsistent.
    pub fn new(manifest: Manifest, store: Arc<dyn KvStore>) -> ServeResult<Self> {
        manifest.validate()?;
        Ok(Self {
            manifest: Arc::new(manifest),
            store,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Resolve `key` against the manifest.
    ///
    /// Keys outside the manifest are answered without touching the store.
    /// A large file is returned as a stream that has not fetched anything
    /// yet; the first chunk is requested on first poll.
    pub async fn resolve(&self, key: &StoreKey) -> ServeResult<Resolution> {
        match self.manifest.lookup(key.as_str()) {
            None => {
                debug!(%key, "key not in manifest");
                Ok(Resolution::NotFound)
            }
            Some(ManifestEntry::Large(_)) => {
                let chunks = self
                    .manifest
                    .ordered_chunks(key.as_str())?
                    .ok_or_else(|| ServeError::Internal(format!("{key} vanished from manifest")))?;
                debug!(%key, chunks = chunks.len(), "streaming large file");
                Ok(Resolution::Streamed(stream_chunks(self.store.clone(), chunks)))
            }
            Some(ManifestEntry::Small) => {
                let value = self
                    .store
                    .get(key)
                    .await
                    .map_err(|source| ServeError::StoreRead {
                        key: key.clone(),
                        source,
                    })?;
                match value {
                    Some(bytes) => Ok(Resolution::Whole(bytes)),
                    None => {
                        warn!(%key, "small file listed in manifest but missing from store");
                        Ok(Resolution::NotFound)
                    }
                }
            }
        }
    }
}

struct ChunkCursor {
    store: Arc<dyn KvStore>,
    pending: VecDeque<StoreKey>,
    current: Option<(StoreKey, ByteStream)>,
}

/// Concatenate `chunks` in the order given.
///
/// Only one chunk is open at a time and the next one is not requested until
/// every frame of the current one has been yielded. The first failure ends
/// the stream.
fn stream_chunks(store: Arc<dyn KvStore>, chunks: Vec<StoreKey>) -> ChunkStream {
    let cursor = ChunkCursor {
        store,
        pending: chunks.into(),
        current: None,
    };
    Box::pin(stream::try_unfold(cursor, next_frame))
}

async fn next_frame(mut cursor: ChunkCursor) -> ServeResult<Option<(Bytes, ChunkCursor)>> {
    loop {
        if let Some((key, frames)) = cursor.current.as_mut() {
            let frame = frames.next().await;
            match frame {
                Some(Ok(bytes)) => return Ok(Some((bytes, cursor))),
                Some(Err(source)) => {
                    warn!(%key, error = %source, "chunk stream aborted");
                    return Err(ServeError::StoreRead {
                        key: key.clone(),
                        source,
                    });
                }
                None => {
                    cursor.current = None;
                    continue;
                }
            }
        }

        let Some(key) = cursor.pending.pop_front() else {
            return Ok(None);
        };
        match cursor.store.get_stream(&key).await {
            Ok(Some(frames)) => cursor.current = Some((key, frames)),
            Ok(None) => {
                warn!(%key, "chunk stream aborted: chunk missing");
                return Err(ServeError::MissingChunk { key });
            }
            Err(source) => {
                warn!(%key, error = %source, "chunk stream aborted");
                return Err(ServeError::StoreRead { key, source });
            }
        }
    }
}
