//! Docvault CLI: validate, store and inspect documents in a local vault.
//!
//! Configuration comes from the environment (see `Config::from_env`).
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docvault_cli::{error_report, init_tracing, read_input, App, ListArgs};
use docvault_core::models::NewDocument;
use docvault_core::{AppError, Config, ErrorMetadata};
use docvault_services::{owner_key, storage_error, DocumentStorage};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docvault", about = "Secure document storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one or more files without storing them
    Validate {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Detailed security report per file, including files that fail validation
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the accepted MIME types and upload size limits
    AllowedTypes,
    /// Validate and store a file for an owner
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Owner UUID
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Always encrypt, even when encryption is disabled by default
        #[arg(long)]
        sensitive: bool,
    },
    /// List an owner's documents (records live in memory unless DATABASE_URL is set)
    List(ListArgs),
    /// Read a stored file back as plaintext
    Retrieve {
        /// Storage path, relative to the documents directory
        path: String,
        #[arg(long)]
        owner: Uuid,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a stored file
    Delete {
        path: String,
        #[arg(long)]
        owner: Uuid,
    },
    /// Check a stored file against its SHA-256 hash
    Verify {
        path: String,
        #[arg(long)]
        owner: Uuid,
        /// Expected hex SHA-256 of the plaintext
        #[arg(long)]
        hash: String,
    },
    /// Show size on disk and modification time of a stored file
    Info { path: String },
    /// Storage totals, plus document usage when an owner is given
    Stats {
        #[arg(long)]
        owner: Option<Uuid>,
    },
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    path: &'a str,
    deleted: bool,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    path: &'a str,
    valid: bool,
}

#[derive(Serialize)]
struct RetrieveOutput<'a> {
    path: &'a str,
    size: usize,
    output: String,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    tracing::debug!(config = ?config, "Configuration loaded");
    let production = config.is_production();

    let result = match App::build(config).await {
        Ok(app) => run(cli.command, &app).await,
        Err(e) => Err(e),
    };

    if let Err(err) = result {
        let app_err = err.downcast::<AppError>().unwrap_or_else(AppError::from);
        let report = error_report(&app_err, production);
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
        std::process::exit(app_err.exit_code());
    }

    Ok(())
}

async fn run(command: Commands, app: &App) -> anyhow::Result<()> {
    match command {
        Commands::Validate { files } => {
            let mut inputs = Vec::with_capacity(files.len());
            for path in &files {
                inputs.push(read_input(path).await?);
            }
            let batch = app.service.validate_batch(&inputs)?;
            print_json(&batch)?;
        }
        Commands::Check { files } => {
            let mut reports = Vec::with_capacity(files.len());
            for path in &files {
                let (filename, content) = read_input(path).await?;
                reports.push(app.service.analyze_file(&content, &filename));
            }
            print_json(&reports)?;
        }
        Commands::AllowedTypes => print_json(&app.service.upload_policy())?,
        Commands::List(args) => {
            let page = app.service.list_documents(args.owner, args.query()).await?;
            print_json(&page)?;
        }
        Commands::Upload {
            file,
            owner,
            title,
            description,
            sensitive,
        } => {
            let (filename, content) = read_input(&file).await?;
            let document = app
                .service
                .create_document(
                    owner,
                    content,
                    &filename,
                    NewDocument {
                        title,
                        description,
                        is_sensitive: sensitive,
                    },
                )
                .await?;
            print_json(&document)?;
        }
        Commands::Retrieve {
            path,
            owner,
            output,
        } => {
            let content = app
                .storage
                .retrieve(&path, &owner_key(owner))
                .await
                .map_err(storage_error)?;
            match output {
                Some(target) => {
                    tokio::fs::write(&target, &content)
                        .await
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                    print_json(&RetrieveOutput {
                        path: &path,
                        size: content.len(),
                        output: target.display().to_string(),
                    })?;
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&content).await?;
                    stdout.flush().await?;
                }
            }
        }
        Commands::Delete { path, owner } => {
            let deleted = app
                .storage
                .delete(&path, &owner_key(owner))
                .await
                .map_err(storage_error)?;
            print_json(&DeleteOutput {
                path: &path,
                deleted,
            })?;
        }
        Commands::Verify { path, owner, hash } => {
            let valid = app
                .storage
                .verify_integrity(&path, &hash, &owner_key(owner))
                .await;
            print_json(&VerifyOutput { path: &path, valid })?;
        }
        Commands::Info { path } => {
            let info = app.storage.file_info(&path).await.map_err(storage_error)?;
            print_json(&info)?;
        }
        Commands::Stats { owner } => {
            let stats = app.storage.stats().await.map_err(storage_error)?;
            match owner {
                Some(owner) => {
                    let usage = app.service.storage_stats(owner).await?;
                    print_json(&serde_json::json!({ "storage": stats, "usage": usage }))?;
                }
                None => print_json(&stats)?,
            }
        }
    }

    Ok(())
}
