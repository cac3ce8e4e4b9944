use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use kvsite_serve::PreviewConfig;
use kvsite_types::ChunkSize;
use serde::{Deserialize, Serialize};

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "kvsite.toml";

/// Settings for every kvsite command.
///
/// Read from `kvsite.toml`; flags given on the command line replace the
/// matching field afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KvsiteConfig {
    /// Directory tree to publish.
    pub source: Option<PathBuf>,
    /// Store binding name in the generated worker.
    pub namespace: Option<String>,
    pub chunk_size: ChunkSize,
    /// Root of the directory-backed store.
    pub store_dir: PathBuf,
    /// Where the worker script is written.
    pub output: PathBuf,
    /// Where the manifest JSON is written and read back from.
    pub manifest: PathBuf,
    /// Preview server address.
    pub bind: SocketAddr,
}

impl Default for KvsiteConfig {
    fn default() -> Self {
        Self {
            source: None,
            namespace: None,
            chunk_size: ChunkSize::default(),
            store_dir: PathBuf::from(".kvsite/store"),
            output: PathBuf::from("worker.js"),
            manifest: PathBuf::from("manifest.json"),
            bind: PreviewConfig::default().bind_addr,
        }
    }
}

impl KvsiteConfig {
    /// Load settings from `explicit`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn source(&self) -> anyhow::Result<&Path> {
        self.source
            .as_deref()
            .context("no source directory given (pass one or set `source` in kvsite.toml)")
    }

    pub fn namespace(&self) -> anyhow::Result<&str> {
        self.namespace
            .as_deref()
            .context("no namespace given (pass --namespace or set `namespace` in kvsite.toml)")
    }

    pub fn preview(&self) -> PreviewConfig {
        PreviewConfig {
            bind_addr: self.bind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = KvsiteConfig::default();
        assert_eq!(c.chunk_size.get(), 1024);
        assert_eq!(c.store_dir, PathBuf::from(".kvsite/store"));
        assert_eq!(c.output, PathBuf::from("worker.js"));
        assert_eq!(c.manifest, PathBuf::from("manifest.json"));
        assert_eq!(c.bind, "127.0.0.1:8787".parse::<SocketAddr>().unwrap());
        assert!(c.source().is_err());
        assert!(c.namespace().is_err());
    }

    #[test]
    fn parse_full_file() {
        let c = KvsiteConfig::from_toml(
            r#"
            source = "public"
            namespace = "SITE"
            chunk_size = 49
            store_dir = "out/store"
            output = "out/worker.js"
            manifest = "out/manifest.json"
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        assert_eq!(c.source().unwrap(), Path::new("public"));
        assert_eq!(c.namespace().unwrap(), "SITE");
        assert_eq!(c.chunk_size.get(), 49);
        assert_eq!(c.store_dir, PathBuf::from("out/store"));
        assert_eq!(c.bind.port(), 9000);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c = KvsiteConfig::from_toml("namespace = \"KV\"").unwrap();
        assert_eq!(c.namespace().unwrap(), "KV");
        assert_eq!(c.chunk_size, ChunkSize::default());
        assert_eq!(c.output, PathBuf::from("worker.js"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(KvsiteConfig::from_toml("chunk_size = 0").is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(KvsiteConfig::from_toml("chunk = 10").is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "source = \"www\"\n").unwrap();
        let c = KvsiteConfig::load(Some(&path)).unwrap();
        assert_eq!(c.source().unwrap(), Path::new("www"));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(KvsiteConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
