//! b2 - command line front end for the B2 client library
//!
//! Every command authorizes first, performs one operation and prints the
//! JSON result to stdout.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use b2_client::{B2Client, ClientConfig, Credentials, FileMeta};

/// CLI command
#[derive(Debug, PartialEq)]
enum Command {
    /// Authorize and print the session endpoints
    Authorize,
    ListBuckets,
    CreateBucket { name: String, public: bool },
    DeleteBucket { bucket_id: String },
    UpdateBucket { bucket_id: String, public: bool },
    ListFiles { bucket_id: String, start: Option<String> },
    ListVersions { bucket_id: String },
    FileInfo { file_id: String },
    Hide { bucket_id: String, file_name: String },
    DeleteVersion { file_id: String, file_name: String },
    Upload {
        bucket_id: String,
        local_path: PathBuf,
        file_name: String,
        content_type: String,
        meta: FileMeta,
    },
    DownloadById { file_id: String, output: PathBuf },
    DownloadByName { bucket_name: String, file_name: String, output: PathBuf },
    /// Show help
    Help,
}

/// Content type used when `upload` is not given one
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Log filter used when RUST_LOG is unset or invalid
const DEFAULT_LOG_FILTER: &str = "info";

fn print_help() {
    eprintln!(
        r#"b2 - Backblaze B2 command line client

USAGE:
    b2 authorize
    b2 list-buckets
    b2 create-bucket <name> [public|private]
    b2 delete-bucket <bucket_id>
    b2 update-bucket <bucket_id> <public|private>
    b2 list-files <bucket_id> [start_file_name]
    b2 list-versions <bucket_id>
    b2 file-info <file_id>
    b2 hide <bucket_id> <file_name>
    b2 delete-version <file_id> <file_name>
    b2 upload <bucket_id> <local_path> <file_name> [content_type] [key=value ...]
    b2 download-id <file_id> <output_path>
    b2 download <bucket_name> <file_name> <output_path>
    b2 help

ENVIRONMENT:
    B2_ACCOUNT_ID        Account or application key ID (B2_KEY_ID also accepted)
    B2_APPLICATION_KEY   Application key (B2_KEY also accepted)
    B2_AUTH_URL          Override the authorization endpoint
    B2_TIMEOUT_SECS      Per-request timeout (default: none)
    RUST_LOG             Log filter (default: info)
"#
    );
}

fn parse_visibility(value: &str) -> Result<bool> {
    match value {
        "public" => Ok(true),
        "private" => Ok(false),
        other => Err(anyhow!("Expected 'public' or 'private', got '{}'", other)),
    }
}

/// Content types always carry a '/' ahead of any parameter, while file info
/// is `key=value` with the '=' first
fn is_content_type(arg: &str) -> bool {
    match (arg.find('/'), arg.find('=')) {
        (Some(slash), Some(eq)) => slash < eq,
        (Some(_), None) => true,
        _ => false,
    }
}

fn parse_meta(pairs: &[String]) -> Result<FileMeta> {
    let mut meta = FileMeta::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("File info must be key=value, got '{}'", pair))?;
        meta.insert(key, value);
    }
    Ok(meta)
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(name) = args.get(1) else {
        return Ok(Command::Help);
    };
    let rest = &args[2..];

    let need = |count: usize, usage: &str| -> Result<()> {
        if rest.len() < count {
            bail!("Usage: b2 {}", usage);
        }
        Ok(())
    };

    let command = match name.as_str() {
        "authorize" => Command::Authorize,
        "list-buckets" => Command::ListBuckets,
        "create-bucket" => {
            need(1, "create-bucket <name> [public|private]")?;
            Command::CreateBucket {
                name: rest[0].clone(),
                public: rest.get(1).map(|v| parse_visibility(v)).transpose()?.unwrap_or(false),
            }
        }
        "delete-bucket" => {
            need(1, "delete-bucket <bucket_id>")?;
            Command::DeleteBucket {
                bucket_id: rest[0].clone(),
            }
        }
        "update-bucket" => {
            need(2, "update-bucket <bucket_id> <public|private>")?;
            Command::UpdateBucket {
                bucket_id: rest[0].clone(),
                public: parse_visibility(&rest[1])?,
            }
        }
        "list-files" => {
            need(1, "list-files <bucket_id> [start_file_name]")?;
            Command::ListFiles {
                bucket_id: rest[0].clone(),
                start: rest.get(1).cloned(),
            }
        }
        "list-versions" => {
            need(1, "list-versions <bucket_id>")?;
            Command::ListVersions {
                bucket_id: rest[0].clone(),
            }
        }
        "file-info" => {
            need(1, "file-info <file_id>")?;
            Command::FileInfo {
                file_id: rest[0].clone(),
            }
        }
        "hide" => {
            need(2, "hide <bucket_id> <file_name>")?;
            Command::Hide {
                bucket_id: rest[0].clone(),
                file_name: rest[1].clone(),
            }
        }
        "delete-version" => {
            need(2, "delete-version <file_id> <file_name>")?;
            Command::DeleteVersion {
                file_id: rest[0].clone(),
                file_name: rest[1].clone(),
            }
        }
        "upload" => {
            need(3, "upload <bucket_id> <local_path> <file_name> [content_type] [key=value ...]")?;
            let (content_type, meta_args) = match rest.get(3) {
                Some(ct) if is_content_type(ct) => (ct.clone(), &rest[4..]),
                _ => (DEFAULT_CONTENT_TYPE.to_string(), &rest[3..]),
            };
            Command::Upload {
                bucket_id: rest[0].clone(),
                local_path: PathBuf::from(&rest[1]),
                file_name: rest[2].clone(),
                content_type,
                meta: parse_meta(meta_args)?,
            }
        }
        "download-id" => {
            need(2, "download-id <file_id> <output_path>")?;
            Command::DownloadById {
                file_id: rest[0].clone(),
                output: PathBuf::from(&rest[1]),
            }
        }
        "download" => {
            need(3, "download <bucket_name> <file_name> <output_path>")?;
            Command::DownloadByName {
                bucket_name: rest[0].clone(),
                file_name: rest[1].clone(),
                output: PathBuf::from(&rest[2]),
            }
        }
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("Unknown command: {}", other),
    };

    Ok(command)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), size = bytes.len(), "Saved download");
    Ok(())
}

fn run(command: Command, client: &B2Client) -> Result<()> {
    match command {
        Command::Authorize => print_json(&serde_json::json!({
            "accountId": client.account_id(),
            "apiUrl": client.api_url(),
            "downloadUrl": client.download_url(),
        })),
        Command::ListBuckets => print_json(&client.list_buckets()?),
        Command::CreateBucket { name, public } => print_json(&client.create_bucket(&name, public)?),
        Command::DeleteBucket { bucket_id } => print_json(&client.delete_bucket(&bucket_id)?),
        Command::UpdateBucket { bucket_id, public } => {
            print_json(&client.update_bucket(&bucket_id, public)?)
        }
        Command::ListFiles { bucket_id, start } => {
            let request = b2_client::b2::ListFileNamesRequest {
                start_file_name: start,
                ..b2_client::b2::ListFileNamesRequest::new(bucket_id)
            };
            print_json(&client.list_file_names_with(&request)?)
        }
        Command::ListVersions { bucket_id } => print_json(&client.list_file_versions(&bucket_id)?),
        Command::FileInfo { file_id } => print_json(&client.get_file_info(&file_id)?),
        Command::Hide { bucket_id, file_name } => {
            print_json(&client.hide_file(&bucket_id, &file_name)?)
        }
        Command::DeleteVersion { file_id, file_name } => {
            print_json(&client.delete_file_version(&file_id, &file_name)?)
        }
        Command::Upload {
            bucket_id,
            local_path,
            file_name,
            content_type,
            meta,
        } => print_json(&client.upload_file(
            &file_name,
            &local_path,
            &bucket_id,
            &content_type,
            &meta,
        )?),
        Command::DownloadById { file_id, output } => {
            write_output(&output, &client.download_file_by_id(&file_id)?)
        }
        Command::DownloadByName {
            bucket_name,
            file_name,
            output,
        } => write_output(&output, &client.download_file_by_name(&bucket_name, &file_name)?),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging (stderr; stdout carries command output)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = env::args().collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let credentials = Credentials::from_env()
        .ok_or_else(|| anyhow!("Set B2_ACCOUNT_ID and B2_APPLICATION_KEY"))?;

    let client = match B2Client::authorize_account(ClientConfig::from_env(), &credentials) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to authorize with B2");
            return Err(e.into());
        }
    };

    run(command, &client)
}
