use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use kvsite_serve::{PreviewServer, Reconstructor};
use kvsite_store::DirectoryKvStore;
use kvsite_types::{ChunkSize, Manifest};
use kvsite_upload::{publish, Publication, PublishOptions};

use crate::cli::*;
use crate::config::KvsiteConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = KvsiteConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded config");
    match cli.command {
        Command::Publish(args) => {
            args.apply(&mut config)?;
            cmd_publish(&config).await
        }
        Command::Render(args) => {
            args.apply(&mut config);
            cmd_render(&config).await
        }
        Command::Serve(args) => {
            args.apply(&mut config);
            cmd_serve(&config).await
        }
    }
}

impl PublishArgs {
    fn apply(self, config: &mut KvsiteConfig) -> anyhow::Result<()> {
        if let Some(source) = self.source {
            config.source = Some(source);
        }
        if let Some(namespace) = self.namespace {
            config.namespace = Some(namespace);
        }
        if let Some(bytes) = self.chunk_size {
            config.chunk_size = ChunkSize::new(bytes).context("invalid --chunk-size")?;
        }
        if let Some(store_dir) = self.store_dir {
            config.store_dir = store_dir;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(manifest) = self.manifest {
            config.manifest = manifest;
        }
        Ok(())
    }
}

impl RenderArgs {
    fn apply(self, config: &mut KvsiteConfig) {
        if let Some(namespace) = self.namespace {
            config.namespace = Some(namespace);
        }
        if let Some(manifest) = self.manifest {
            config.manifest = manifest;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
    }
}

impl ServeArgs {
    fn apply(self, config: &mut KvsiteConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(store_dir) = self.store_dir {
            config.store_dir = store_dir;
        }
        if let Some(manifest) = self.manifest {
            config.manifest = manifest;
        }
    }
}

async fn cmd_publish(config: &KvsiteConfig) -> anyhow::Result<()> {
    let publication = publish_site(config).await?;
    let stats = publication.stats;
    println!(
        "{} Published {} ({} small, {} large, {} values, {} bytes)",
        "✓".green().bold(),
        config.source()?.display().to_string().bold(),
        stats.small_files,
        stats.large_files,
        stats.values,
        stats.bytes
    );
    println!("  Store:    {}", config.store_dir.display().to_string().cyan());
    println!("  Worker:   {}", config.output.display().to_string().yellow());
    println!("  Manifest: {}", config.manifest.display().to_string().yellow());
    Ok(())
}

async fn cmd_render(config: &KvsiteConfig) -> anyhow::Result<()> {
    let manifest = render_worker(config).await?;
    println!(
        "{} Rendered {} for {} files",
        "✓".green().bold(),
        config.output.display().to_string().yellow(),
        manifest.len()
    );
    Ok(())
}

async fn cmd_serve(config: &KvsiteConfig) -> anyhow::Result<()> {
    let server = preview_server(config).await?;
    println!(
        "Previewing {} on {}",
        config.store_dir.display().to_string().cyan(),
        format!("http://{}", config.bind).bold()
    );
    server.serve().await.context("preview server stopped")
}

/// Upload the source tree into the directory store, then write the worker
/// script and manifest. Nothing is written unless the whole run succeeds.
pub async fn publish_site(config: &KvsiteConfig) -> anyhow::Result<Publication> {
    let options = PublishOptions {
        source: config.source()?.to_path_buf(),
        namespace: config.namespace()?.to_string(),
        chunk_size: config.chunk_size,
    };
    let store = open_store(&config.store_dir)?;
    let publication = publish(&options, &store)
        .await
        .with_context(|| format!("failed to publish {}", options.source.display()))?;

    let manifest_json = serde_json::to_string_pretty(&publication.manifest)?;
    write_output(&config.manifest, manifest_json).await?;
    write_output(&config.output, publication.worker_source.clone()).await?;
    Ok(publication)
}

/// Render the worker script for the saved manifest and write it out.
pub async fn render_worker(config: &KvsiteConfig) -> anyhow::Result<Manifest> {
    let manifest = read_manifest(&config.manifest).await?;
    let worker = kvsite_render::render(config.namespace()?, &manifest)?;
    write_output(&config.output, worker).await?;
    Ok(manifest)
}

pub async fn preview_server(config: &KvsiteConfig) -> anyhow::Result<PreviewServer> {
    let manifest = read_manifest(&config.manifest).await?;
    let store = open_store(&config.store_dir)?;
    let reconstructor = Reconstructor::new(manifest, Arc::new(store))
        .with_context(|| format!("inconsistent manifest {}", config.manifest.display()))?;
    Ok(PreviewServer::new(config.preview(), reconstructor))
}

fn open_store(dir: &Path) -> anyhow::Result<DirectoryKvStore> {
    DirectoryKvStore::new(dir).with_context(|| format!("failed to open store at {}", dir.display()))
}

async fn read_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
    manifest
        .validate()
        .with_context(|| format!("inconsistent manifest {}", path.display()))?;
    Ok(manifest)
}

async fn write_output(path: &Path, contents: String) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::PathBuf;
    use tower::util::ServiceExt;

    fn config(work: &Path, source: PathBuf) -> KvsiteConfig {
        KvsiteConfig {
            source: Some(source),
            namespace: Some("SITE".into()),
            chunk_size: ChunkSize::new(49).unwrap(),
            store_dir: work.join("store"),
            output: work.join("out/worker.js"),
            manifest: work.join("out/manifest.json"),
            ..KvsiteConfig::default()
        }
    }

    fn site(root: &Path) -> PathBuf {
        let source = root.join("site");
        std::fs::create_dir_all(source.join("nested")).unwrap();
        std::fs::write(source.join("one"), vec![b'1'; 50]).unwrap();
        std::fs::write(source.join("two"), vec![b'2'; 49]).unwrap();
        std::fs::write(source.join("nested/three"), vec![b'3'; 30]).unwrap();
        source
    }

    #[tokio::test]
    async fn publish_writes_worker_and_manifest() {
        let work = tempfile::tempdir().unwrap();
        let config = config(work.path(), site(work.path()));

        let publication = publish_site(&config).await.unwrap();

        assert_eq!(publication.stats.values, 4);
        let worker = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(worker, publication.worker_source);
        let saved: Manifest =
            serde_json::from_str(&std::fs::read_to_string(&config.manifest).unwrap()).unwrap();
        assert_eq!(saved, publication.manifest);
        assert_eq!(std::fs::read_dir(&config.store_dir).unwrap().count(), 4);
    }

    #[tokio::test]
    async fn failed_publish_writes_nothing() {
        let work = tempfile::tempdir().unwrap();
        let source = site(work.path());
        std::fs::write(source.join("zz_empty"), b"").unwrap();
        let config = config(work.path(), source);

        assert!(publish_site(&config).await.is_err());
        assert!(!config.output.exists());
        assert!(!config.manifest.exists());
    }

    #[tokio::test]
    async fn render_matches_publish_output() {
        let work = tempfile::tempdir().unwrap();
        let mut config = config(work.path(), site(work.path()));
        let publication = publish_site(&config).await.unwrap();

        config.output = work.path().join("rerendered.js");
        render_worker(&config).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&config.output).unwrap(),
            publication.worker_source
        );
    }

    #[tokio::test]
    async fn render_requires_namespace() {
        let work = tempfile::tempdir().unwrap();
        let mut config = config(work.path(), site(work.path()));
        publish_site(&config).await.unwrap();
        config.namespace = None;
        assert!(render_worker(&config).await.is_err());
    }

    async fn fetch(app: axum::Router, path: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn preview_serves_files_at_their_paths() {
        let work = tempfile::tempdir().unwrap();
        let config = config(work.path(), site(work.path()));
        publish_site(&config).await.unwrap();
        let app = preview_server(&config).await.unwrap().router();

        assert_eq!(fetch(app.clone(), "/one").await, (StatusCode::OK, vec![b'1'; 50]));
        assert_eq!(fetch(app.clone(), "/two").await, (StatusCode::OK, vec![b'2'; 49]));
        assert_eq!(
            fetch(app.clone(), "/nested/three").await,
            (StatusCode::OK, vec![b'3'; 30])
        );
        assert_eq!(fetch(app, "/site/one").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dot_segment_in_root_serves_the_same_paths() {
        let work = tempfile::tempdir().unwrap();
        site(work.path());
        let config = config(work.path(), work.path().join("./site"));
        publish_site(&config).await.unwrap();
        let app = preview_server(&config).await.unwrap().router();

        assert_eq!(fetch(app, "/nested/three").await, (StatusCode::OK, vec![b'3'; 30]));
    }

    #[test]
    fn flags_override_config() {
        let mut config = KvsiteConfig::default();
        PublishArgs {
            source: Some("www".into()),
            chunk_size: Some(10),
            ..PublishArgs::default()
        }
        .apply(&mut config)
        .unwrap();
        assert_eq!(config.source().unwrap(), Path::new("www"));
        assert_eq!(config.chunk_size.get(), 10);
        assert_eq!(config.output, PathBuf::from("worker.js"));

        let err = PublishArgs {
            chunk_size: Some(0),
            ..PublishArgs::default()
        }
        .apply(&mut config);
        assert!(err.is_err());
    }
}
