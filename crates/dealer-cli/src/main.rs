//! media-dealer: command-line front end for the configured media storage.
//!
//! Backend and credentials come from the environment (or `.env`): set
//! MEDIA_MANAGER=AWS with the AWS_* variables for S3, anything else for the
//! local filesystem.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dealer_core::{Config, DeletedFile, MediaDescriptor};
use dealer_storage::{create_media_manager, MediaManager, NamingParams};
use serde::Serialize;
use std::path::PathBuf;

/// Naming parameter holding an explicit relative name.
const NAME_PARAM: &str = "name";

#[derive(Parser)]
#[command(name = "media-dealer", about = "Store and fetch media on local disk or S3")]
struct Cli {
    /// Folder every key is placed under
    #[arg(long, global = true, default_value = "")]
    root_folder: String,

    /// Do not prefix keys with the ENVIRONMENT name
    #[arg(long, global = true)]
    no_env_prefix: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Relative name to store under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// MIME type recorded with the object
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download an object by key
    Download {
        key: String,
        /// Destination file (defaults to the key's last segment)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete an object by key
    Delete { key: String },
    /// Print where an object can be reached
    Location { key: String },
    /// List a folder
    List { prefix: String },
    /// Delete everything in a folder
    DeleteFolder { prefix: String },
    /// Mint a one-hour signed GET URL (S3 only)
    SignedUrl {
        key: String,
        /// Fail if the object does not exist
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Serialize)]
struct UploadOutput {
    key: String,
    location: String,
}

#[derive(Serialize)]
struct DownloadOutput {
    key: String,
    output: PathBuf,
    size_bytes: usize,
}

#[derive(Serialize)]
struct DeleteFolderOutput {
    prefix: String,
    deleted: Vec<DeletedFile>,
}

fn relative_name(media: &MediaDescriptor, params: &NamingParams) -> String {
    params
        .get(NAME_PARAM)
        .cloned()
        .unwrap_or_else(|| media.filename().to_string())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn build_manager(cli: &Cli) -> anyhow::Result<MediaManager> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let manager = create_media_manager(&config, relative_name)
        .context("Failed to create media manager")?
        .with_root_folder(cli.root_folder.clone())
        .environment_prefix(!cli.no_env_prefix);
    Ok(manager)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dealer_infra::init_telemetry("dealer_storage=info,dealer_cli=info") {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let cli = Cli::parse();
    let manager = build_manager(&cli)?;

    match cli.command {
        Commands::Upload {
            file,
            name,
            content_type,
        } => {
            let mut media = MediaDescriptor::from_path(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            if let Some(content_type) = content_type {
                media = media.with_content_type(content_type);
            }

            let mut params = NamingParams::new();
            if let Some(name) = name {
                params.insert(NAME_PARAM.to_string(), name);
            }

            let key = manager.upload(media, &params).await?;
            let location = manager.location(&key);
            print_json(&UploadOutput { key, location })?;
        }
        Commands::Download { key, output } => {
            let output = match output {
                Some(path) => path,
                None => PathBuf::from(key.rsplit('/').next().unwrap_or(key.as_str())),
            };
            let data = manager.download(&key).await?.into_inner();
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&DownloadOutput {
                key,
                output,
                size_bytes: data.len(),
            })?;
        }
        Commands::Delete { key } => {
            let deleted = manager.delete(&key).await?;
            print_json(&deleted)?;
        }
        Commands::Location { key } => {
            print_json(&serde_json::json!({ "key": key, "location": manager.location(&key) }))?;
        }
        Commands::List { prefix } => {
            let entries = manager.list_folder(&prefix).await?;
            print_json(&entries)?;
        }
        Commands::DeleteFolder { prefix } => {
            let deleted = manager.delete_folder(&prefix).await?;
            print_json(&DeleteFolderOutput { prefix, deleted })?;
        }
        Commands::SignedUrl { key, verify } => {
            let url = manager.signed_url(&key, verify).await?;
            print_json(&serde_json::json!({ "key": key, "signed_url": url }))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "media-dealer",
            "list",
            "reports",
            "--root-folder",
            "documents",
            "--no-env-prefix",
        ])
        .unwrap();

        assert_eq!(cli.root_folder, "documents");
        assert!(cli.no_env_prefix);
        assert!(matches!(cli.command, Commands::List { prefix } if prefix == "reports"));
    }

    #[test]
    fn test_explicit_name_overrides_file_name() {
        let media = MediaDescriptor::from_bytes("scan.png", &b""[..]);
        let mut params = NamingParams::new();
        assert_eq!(relative_name(&media, &params), "scan.png");

        params.insert(NAME_PARAM.to_string(), "receipts/2024/scan.png".to_string());
        assert_eq!(relative_name(&media, &params), "receipts/2024/scan.png");
    }
}
