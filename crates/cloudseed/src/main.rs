mod commands;
mod console;
mod family;

use clap::{Parser, Subcommand, ValueEnum};
use cloudseed_cloud::{
    BlobService, CleanupPolicy, DocumentService, MemoryBlobService, MemoryDocumentService,
};
use cloudseed_cloud_azure::{AzureBlobService, CosmosAccount, CosmosDocumentService};
use cloudseed_config::Settings;
use colored::Colorize;
use commands::blob::BlobOptions;
use commands::documents::DocumentOptions;
use console::Console;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudseed")]
#[command(about = "Provision cloud storage and seed a document database, one step at a time", long_about = None)]
struct Cli {
    /// Config file (skips discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Azure Blob Storage / Cosmos DB
    Azure,
    /// In-process store, nothing leaves the machine
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to a public container, download it back, delete the container
    Blob {
        /// File to upload
        source: PathBuf,
        /// Where to write the downloaded copy
        destination: PathBuf,
        #[arg(long, value_enum, default_value_t = Backend::Azure, env = "CLOUDSEED_BACKEND")]
        backend: Backend,
        /// Container name (default from config: photos)
        #[arg(long)]
        container: Option<String>,
        /// Blob name (default: the source file name)
        #[arg(long)]
        blob_name: Option<String>,
        /// Leave the container in place at the end
        #[arg(long)]
        keep_container: bool,
        /// Delete the container if this run created it and a later step fails
        #[arg(long)]
        cleanup_on_failure: bool,
        /// Do not wait for a key press between steps
        #[arg(long)]
        no_pause: bool,
    },
    /// Create the family registry, seed two families, query them three ways
    Documents {
        #[arg(long, value_enum, default_value_t = Backend::Azure, env = "CLOUDSEED_BACKEND")]
        backend: Backend,
        /// Database id (default from config: FamilyRegistry)
        #[arg(long)]
        database: Option<String>,
        /// Collection id (default from config: FamilyCollection)
        #[arg(long)]
        collection: Option<String>,
        /// Leave the database in place at the end
        #[arg(long)]
        keep_database: bool,
        /// Delete the database if this run created it and a later step fails
        #[arg(long)]
        cleanup_on_failure: bool,
        /// Do not wait for a key press between steps
        #[arg(long)]
        no_pause: bool,
    },
    /// Show the resolved configuration (keys masked)
    Config,
    /// Show version information
    Version,
}

fn cleanup_policy(cleanup_on_failure: bool) -> CleanupPolicy {
    if cleanup_on_failure {
        CleanupPolicy::RemoveCreated
    } else {
        CleanupPolicy::Leave
    }
}

fn blob_service(backend: Backend, settings: &Settings) -> anyhow::Result<Box<dyn BlobService>> {
    Ok(match backend {
        Backend::Azure => Box::new(AzureBlobService::from_connection_string(
            settings.storage.connection_string()?,
        )?),
        Backend::Memory => Box::new(MemoryBlobService::new()),
    })
}

fn document_service(
    backend: Backend,
    settings: &Settings,
) -> anyhow::Result<Box<dyn DocumentService>> {
    Ok(match backend {
        Backend::Azure => {
            let account =
                CosmosAccount::new(settings.documents.endpoint()?, settings.documents.key()?)?;
            Box::new(CosmosDocumentService::new(account)?)
        }
        Backend::Memory => Box::new(MemoryDocumentService::new()),
    })
}

/// `Error: {message}, Message: {root cause}`
fn error_line(err: &anyhow::Error) -> String {
    format!("Error: {}, Message: {}", err, err.root_cause())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Version => {
            println!("cloudseed {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Config => {
            let settings = Settings::load(cli.config.as_deref())?;
            commands::config::handle(&settings);
        }
        Commands::Blob {
            source,
            destination,
            backend,
            container,
            blob_name,
            keep_container,
            cleanup_on_failure,
            no_pause,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let blobs = blob_service(backend, &settings)?;
            tracing::debug!(backend = blobs.name(), "Blob service ready");

            let options = BlobOptions {
                container: container.unwrap_or(settings.storage.container),
                blob_name,
                source,
                destination,
                keep_container,
                cleanup: cleanup_policy(cleanup_on_failure),
            };
            commands::blob::handle(blobs.as_ref(), &Console::stdout(!no_pause), &options).await?;
        }
        Commands::Documents {
            backend,
            database,
            collection,
            keep_database,
            cleanup_on_failure,
            no_pause,
        } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let docs = document_service(backend, &settings)?;
            tracing::debug!(backend = docs.name(), "Document service ready");

            let options = DocumentOptions {
                database: database.unwrap_or(settings.documents.database),
                collection: collection.unwrap_or(settings.documents.collection),
                keep_database,
                cleanup: cleanup_policy(cleanup_on_failure),
            };
            commands::documents::handle(docs.as_ref(), &Console::stdout(!no_pause), &options)
                .await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the walkthrough
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{}", error_line(&err).red());
        std::process::exit(1);
    }
}
