use std::collections::HashSet;
use std::path::Path;

use kvsite_store::Uploader;
use kvsite_types::{chunk_key, derive_key, ChunkSize, Manifest, StoreKey};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::chunker::split_file;
use crate::error::{UploadError, UploadResult};

/// Counters collected during one walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub small_files: usize,
    pub large_files: usize,
    /// Values written, one per chunk (a small file is one chunk).
    pub values: usize,
    pub bytes: u64,
}

/// Walks a source tree and uploads every regular file.
///
/// Keys are derived from each file's path relative to the walk root, so
/// `site/docs/a.html` is stored as `docs_a.html` however the root is spelled.
///
/// The walker is the only writer of the manifest it builds. Entries are
/// visited in file-name order and each file is fully uploaded before the
/// next entry is read, so chunk keys are always written in index order.
pub struct Walker<'a> {
    chunk_size: ChunkSize,
    uploader: &'a dyn Uploader,
}

impl<'a> Walker<'a> {
    pub fn new(chunk_size: ChunkSize, uploader: &'a dyn Uploader) -> Self {
        Self {
            chunk_size,
            uploader,
        }
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Upload everything under `source_root` and return the manifest.
    ///
    /// The first error aborts the walk and is returned as-is; values already
    /// uploaded stay in the store but no manifest is produced.
    pub async fn run(&self, source_root: &Path) -> UploadResult<Manifest> {
        self.run_with_stats(source_root)
            .await
            .map(|(manifest, _)| manifest)
    }

    /// Like [`Walker::run`], also returning counters for reporting.
    pub async fn run_with_stats(&self, source_root: &Path) -> UploadResult<(Manifest, WalkStats)> {
        let mut manifest = Manifest::new();
        let mut written: HashSet<StoreKey> = HashSet::new();
        let mut stats = WalkStats::default();

        let entries = WalkDir::new(source_root)
            .follow_links(true)
            .sort_by_file_name();
        for entry in entries {
            let entry = entry.map_err(|e| traversal_error(source_root, e))?;
            if entry.file_type().is_dir() {
                stats.directories += 1;
                continue;
            }
            let metadata = entry
                .metadata()
                .map_err(|e| traversal_error(source_root, e))?;
            let path = entry.path();
            if !metadata.is_file() {
                debug!(path = %path.display(), "skipping non-regular file");
                continue;
            }

            let size = metadata.len();
            let key = derive_key(relative_to(source_root, path));
            let taken = (0..self.chunk_size.chunks_for(size).max(1))
                .map(|i| chunk_key(&key, i as usize))
                .find(|k| written.contains(k));
            if let Some(taken) = taken {
                return Err(UploadError::KeyCollision {
                    path: path.to_path_buf(),
                    key: taken,
                });
            }

            let chunks = split_file(path, &key, size, self.chunk_size, self.uploader).await?;
            stats.values += chunks.len();
            stats.bytes += size;
            written.extend(chunks.iter().cloned());

            if self.chunk_size.is_exceeded_by(size) {
                debug!(%key, chunks = chunks.len(), size, "uploaded large file");
                manifest.insert_large(key, chunks)?;
                stats.large_files += 1;
            } else {
                debug!(%key, size, "uploaded small file");
                manifest.push_small(key)?;
                stats.small_files += 1;
            }
        }

        info!(
            root = %source_root.display(),
            small = stats.small_files,
            large = stats.large_files,
            values = stats.values,
            bytes = stats.bytes,
            "walk complete"
        );
        Ok((manifest, stats))
    }
}

/// Path of `path` below the walk root; a root that is itself a file keeps
/// its file name.
fn relative_to<'p>(root: &Path, path: &'p Path) -> &'p Path {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path.file_name().map(Path::new).unwrap_or(path),
    }
}

fn traversal_error(root: &Path, source: walkdir::Error) -> UploadError {
    let path = source
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    UploadError::Traversal { path, source }
}
