use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kvsite",
    about = "kvsite: publish a directory tree to a key-value store and generate the worker that serves it",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./kvsite.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a directory tree and write the worker script and manifest
    Publish(PublishArgs),
    /// Re-render the worker script from a saved manifest
    Render(RenderArgs),
    /// Serve published files locally the way the worker would
    Serve(ServeArgs),
}

#[derive(Args, Default)]
pub struct PublishArgs {
    /// Directory to publish
    pub source: Option<PathBuf>,
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Files larger than this many bytes are split into chunks
    #[arg(long)]
    pub chunk_size: Option<u64>,
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
    /// Worker script path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Manifest JSON path
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args, Default)]
pub struct RenderArgs {
    #[arg(short, long)]
    pub namespace: Option<String>,
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_publish() {
        let cli = Cli::try_parse_from(["kvsite", "publish", "public", "-n", "SITE"]).unwrap();
        if let Command::Publish(args) = cli.command {
            assert_eq!(args.source, Some(PathBuf::from("public")));
            assert_eq!(args.namespace.as_deref(), Some("SITE"));
            assert!(args.chunk_size.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_publish_all_flags() {
        let cli = Cli::try_parse_from([
            "kvsite",
            "publish",
            "--chunk-size",
            "49",
            "--store-dir",
            "s",
            "-o",
            "w.js",
            "-m",
            "m.json",
        ])
        .unwrap();
        if let Command::Publish(args) = cli.command {
            assert!(args.source.is_none());
            assert_eq!(args.chunk_size, Some(49));
            assert_eq!(args.store_dir, Some(PathBuf::from("s")));
            assert_eq!(args.output, Some(PathBuf::from("w.js")));
            assert_eq!(args.manifest, Some(PathBuf::from("m.json")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_render() {
        let cli = Cli::try_parse_from(["kvsite", "render", "--namespace", "KV"]).unwrap();
        assert!(matches!(cli.command, Command::Render(ref a) if a.namespace.as_deref() == Some("KV")));
    }

    #[test]
    fn parse_serve_bind() {
        let cli = Cli::try_parse_from(["kvsite", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["kvsite", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from(["kvsite", "render", "-v", "--config", "site.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
    }
}
