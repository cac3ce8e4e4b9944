use std::path::PathBuf;

use kvsite_store::Uploader;
use kvsite_types::{ChunkSize, Manifest};
use tracing::info;

use crate::error::UploadResult;
use crate::walker::{WalkStats, Walker};

/// Everything a publish run needs from its caller.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    /// Directory tree to publish.
    pub source: PathBuf,
    /// Name of the store binding in the generated worker.
    pub namespace: String,
    /// Files larger than this are split into chunks of this size.
    pub chunk_size: ChunkSize,
}

/// Output of a successful publish run.
#[derive(Clone, Debug)]
pub struct Publication {
    pub manifest: Manifest,
    pub worker_source: String,
    pub stats: WalkStats,
}

/// Upload `options.source` and render the worker script for it.
///
/// All or nothing: if the walk or the rendering fails, the error is returned
/// and neither a manifest nor a script is produced. The namespace is checked
/// before anything is uploaded.
pub async fn publish(options: &PublishOptions, uploader: &dyn Uploader) -> UploadResult<Publication> {
    kvsite_render::validate_namespace(&options.namespace)?;

    let walker = Walker::new(options.chunk_size, uploader);
    let (manifest, stats) = walker.run_with_stats(&options.source).await?;
    let worker_source = kvsite_render::render(&options.namespace, &manifest)?;

    info!(
        source = %options.source.display(),
        namespace = %options.namespace,
        files = manifest.len(),
        "publish complete"
    );
    Ok(Publication {
        manifest,
        worker_source,
        stats,
    })
}
