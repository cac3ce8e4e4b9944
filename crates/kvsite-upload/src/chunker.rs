//! Fixed-size chunking and per-file upload.

use std::io;
use std::path::Path;

use bytes::Bytes;
use kvsite_store::Uploader;
use kvsite_types::{chunk_key, ChunkSize, StoreKey};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{UploadError, UploadResult};

/// One contiguous byte range of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk within the file, starting at 0.
    pub index: usize,
    /// Byte offset of the chunk within the file.
    pub offset: u64,
    /// The chunk bytes. Only the last chunk may be shorter than the chunk size.
    pub data: Bytes,
}

/// Reads a file of known size as a sequence of fixed-size chunks.
///
/// Exactly `total_size` bytes are consumed. Reaching end of input at the end
/// of the last chunk is the normal way to finish; reaching it any earlier
/// means the file shrank after it was measured and is reported as
/// [`io::ErrorKind::UnexpectedEof`].
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: u64,
    total_size: u64,
    offset: u64,
    index: usize,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, total_size: u64, chunk_size: ChunkSize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.get(),
            total_size,
            offset: 0,
            index: 0,
        }
    }

    /// Offset the next chunk starts at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next chunk, or `None` once `total_size` bytes have been read.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        if self.offset >= self.total_size {
            return Ok(None);
        }

        let want = (self.total_size - self.offset).min(self.chunk_size) as usize;
        let mut buf = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled < want {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "file ended at byte {} of {}",
                    self.offset + filled as u64,
                    self.total_size
                ),
            ));
        }

        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data: Bytes::from(buf),
        };
        self.index += 1;
        self.offset += want as u64;
        Ok(Some(chunk))
    }
}

/// Upload the file at `path` under `base_key`, split into chunks.
///
/// Returns the chunk keys in upload order: `base_key` alone for files of at
/// most one chunk, otherwise `base_key`, `base_key_1`, `base_key_2`, ...
/// Each `put` completes before the next chunk is read. The file handle is
/// closed when this returns, on success or error.
pub async fn split_file(
    path: &Path,
    base_key: &StoreKey,
    size: u64,
    chunk_size: ChunkSize,
    uploader: &dyn Uploader,
) -> UploadResult<Vec<StoreKey>> {
    if size == 0 {
        return Err(UploadError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| UploadError::ChunkRead {
            path: path.to_path_buf(),
            offset: 0,
            source,
        })?;
    let mut chunks = ChunkReader::new(file, size, chunk_size);
    let mut keys = Vec::with_capacity(chunk_size.chunks_for(size) as usize);

    loop {
        let offset = chunks.offset();
        let chunk = match chunks.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(source) => {
                return Err(UploadError::ChunkRead {
                    path: path.to_path_buf(),
                    offset,
                    source,
                })
            }
        };

        let key = chunk_key(base_key, chunk.index);
        debug!(%key, offset = chunk.offset, len = chunk.data.len(), "uploading chunk");
        if let Err(source) = uploader.put(&key, chunk.data).await {
            return Err(UploadError::StoreWrite { key, source });
        }
        keys.push(key);
    }

    Ok(keys)
}
