use detantic::{Config, Detantic, FileApi, ItemReader, ItemWriter, ListFilesRequest, QueryRequest, UploadFile};
use detantic::storage::MAX_SMALL_FILE_SIZE;
use clap::{Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project key; defaults to the DETA_PROJECT_KEY environment variable.
    #[arg(short, long, env = "DETA_PROJECT_KEY", hide_env_values = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Fetch one item from a base.
    Get { base: String, key: String },
    /// Store a JSON item in a base, replacing any item with the same key.
    Put { base: String, item: String },
    /// Query a base with a JSON filter.
    Query {
        base: String,
        #[arg(default_value = "{}")]
        filter: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete one item from a base.
    Del { base: String, key: String },
    /// Upload a local file to a drive.
    Upload {
        drive: String,
        path: PathBuf,
        #[arg(short, long, default_value = "")]
        dir: String,
    },
    /// Download a file from a drive.
    Download {
        drive: String,
        name: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List files in a drive.
    Ls {
        drive: String,
        #[arg(short, long)]
        prefix: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete files from a drive.
    Rm { drive: String, names: Vec<String> },
}

fn parse_object(raw: &str) -> anyhow::Result<detantic::Item> {
    match serde_json::from_str(raw)? {
        Value::Object(item) => Ok(item),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let deta = Detantic::new(Config::load(cli.key.as_deref())?)?;

    match cli.command {
        Commands::Get { base, key } => {
            match deta.base(&base)?.get_item(&key).await? {
                Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
                None => anyhow::bail!("item {} not found", key),
            }
        }
        Commands::Put { base, item } => {
            let item = parse_object(&item)?;
            let resp = deta.base(&base)?.put_items(&[item]).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Query { base, filter, limit } => {
            let filter = parse_object(&filter)?;
            let req = QueryRequest {
                query: if filter.is_empty() { Vec::new() } else { vec![filter] },
                limit,
                last: None,
            };
            let resp = deta.base(&base)?.query_items(&req).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Del { base, key } => {
            deta.base(&base)?.delete_item(&key).await?;
            println!("OK");
        }
        Commands::Upload { drive, path, dir } => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))?
                .to_string();
            let data = tokio::fs::read(&path).await?;
            let size = data.len();
            let file = UploadFile::new(name, data).in_directory(dir);

            let storage = deta.storage(&drive)?;
            let stored = if size <= MAX_SMALL_FILE_SIZE {
                storage.upload_small_file(file).await?
            } else {
                info!("{} is {} bytes, using chunked upload", path.display(), size);
                storage.upload_file(file).await?
            };
            println!("{}", stored);
        }
        Commands::Download { drive, name, out } => {
            let Some(data) = deta.drive(&drive)?.download_file(&name).await? else {
                anyhow::bail!("file {} not found", name);
            };
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &data).await?;
                    info!("Wrote {} bytes to {}", data.len(), path.display());
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Commands::Ls { drive, prefix, limit } => {
            let req = ListFilesRequest { limit, prefix, last: None };
            let resp = deta.drive(&drive)?.list_files(&req).await?;
            for name in resp.names {
                println!("{}", name);
            }
        }
        Commands::Rm { drive, names } => {
            let resp = deta.storage(&drive)?.delete_files_detailed(&names).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
    }

    Ok(())
}
