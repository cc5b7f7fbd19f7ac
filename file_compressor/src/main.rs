use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use file_compressor::config::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_SERVER_URL, DEFAULT_UPLOAD_LIMIT};
use file_compressor::{gzip, server, ClientConfig, CompressionSession, SelectedFile, ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Compress files through a /compress endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the compression server and its upload page
    Serve {
        #[arg(long, env = "COMPRESSOR_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// Largest accepted upload in bytes
        #[arg(long, default_value_t = DEFAULT_UPLOAD_LIMIT)]
        upload_limit: u64,
        /// gzip level (0-9)
        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: u32,
    },
    /// Upload one file and save the compressed result as <name>.gz
    Compress(CompressArgs),
    /// Decompress a local .gz file, dropping the suffix
    Decompress {
        file: PathBuf,
        /// Directory the decompressed file is written into
        #[arg(long, env = "COMPRESSOR_OUT_DIR", default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CompressArgs {
    file: PathBuf,
    #[arg(long, env = "COMPRESSOR_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,
    /// Directory the .gz is written into
    #[arg(long, env = "COMPRESSOR_OUT_DIR", default_value = ".")]
    out: PathBuf,
    /// Request timeout in seconds (none by default)
    #[arg(long)]
    timeout: Option<u64>,
    /// Send the literal placeholder value instead of the file content
    #[arg(long)]
    placeholder: bool,
}

impl CompressArgs {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.timeout.map(Duration::from_secs),
            placeholder: self.placeholder,
            ..ClientConfig::default().with_server_url(self.server.clone())
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn ensure_dir(out: &Path) -> Result<()> {
    if !out.is_dir() {
        bail!("output path {} is not a directory", out.display());
    }
    Ok(())
}

// One select -> compress -> download cycle
async fn compress_command(args: CompressArgs) -> Result<PathBuf> {
    ensure_dir(&args.out)?;

    let session = CompressionSession::connect(&args.client_config())?;
    session.select_file(SelectedFile::from_path(&args.file));
    session.compress().await?;
    Ok(session.download(&args.out).await?)
}

async fn decompress_command(file: &Path, out: &Path) -> Result<PathBuf> {
    ensure_dir(out)?;
    gzip::decompress_file(file, out)
        .await
        .with_context(|| format!("failed to decompress {}", file.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            upload_limit,
            level,
        } => {
            let config = ServerConfig {
                bind,
                upload_limit,
                compression_level: level,
            };
            server::run(config).await.context("server failed")?;
        }
        Commands::Compress(args) => {
            let path = compress_command(args).await?;
            info!("Done");
            println!("{}", path.display());
        }
        Commands::Decompress { file, out } => {
            let path = decompress_command(&file, &out).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
