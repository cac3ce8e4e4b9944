use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use kvsite_types::StoreKey;

use crate::error::{StoreError, StoreResult};

/// Incrementally readable value returned by [`KvStore::get_stream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = StoreResult<Bytes>> + Send>>;

/// Write capability handed to the publish pipeline.
///
/// This is the only thing the walker knows about the store, so the whole
/// chunking pipeline runs against any implementation, including test doubles.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    async fn put(&self, key: &StoreKey, value: Bytes) -> StoreResult<()>;
}

/// Full key-value store as seen by the serving side.
#[async_trait]
pub trait KvStore: Uploader {
    /// Read the whole value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Bytes>>;

    /// Read the value stored under `key` as a stream of frames.
    ///
    /// Default implementation reads the whole value and yields it as a single
    /// frame. Backends that can read incrementally should override it.
    async fn get_stream(&self, key: &StoreKey) -> StoreResult<Option<ByteStream>> {
        Ok(self
            .get(key)
            .await?
            .map(|value| Box::pin(stream::iter([Ok::<_, StoreError>(value)])) as ByteStream))
    }
}

#[async_trait]
impl<T: Uploader + ?Sized> Uploader for Arc<T> {
    async fn put(&self, key: &StoreKey, value: Bytes) -> StoreResult<()> {
        (**self).put(key, value).await
    }
}

#[async_trait]
impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn get_stream(&self, key: &StoreKey) -> StoreResult<Option<ByteStream>> {
        (**self).get_stream(key).await
    }
}
