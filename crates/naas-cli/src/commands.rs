//! CLI argument definitions and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use url::Url;

use naas_api::{ApiClientConfig, DEFAULT_BASE_URL, NaasApiClient};
use naas_credentials::CredentialStore;
use naas_storage::{S3StorageProvider, StorageOrchestrator};

/// Workspace storage CLI.
#[derive(Debug, Parser)]
#[command(name = "naas", version, about, propagate_version = true)]
pub struct Cli {
    /// Control-plane API base URL.
    #[arg(long = "api-url", env = "NAAS_API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: Option<Url>,

    /// Bearer token for API authentication.
    #[arg(long, env = "NAAS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Credential cache file (defaults to ~/.naas/credentials).
    #[arg(long = "credentials-file", env = "NAAS_CREDENTIALS_FILE", global = true)]
    credentials_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a workspace storage.
    Create(ContainerArgs),
    /// Delete a workspace storage.
    Delete(ContainerArgs),
    /// List the workspace's storages.
    List(WorkspaceArgs),
    /// List objects in a storage.
    ListObject(ListObjectArgs),
    /// Upload a local file into a storage.
    PutObject(PutObjectArgs),
    /// Download an object from a storage.
    GetObject(GetObjectArgs),
    /// Delete an object from a storage.
    DeleteObject(ObjectArgs),
    /// Issue and cache storage credentials.
    Connect(ContainerArgs),
}

#[derive(Debug, Args)]
struct WorkspaceArgs {
    /// ID of the workspace.
    #[arg(long = "workspace", short = 'w')]
    workspace_id: String,
}

#[derive(Debug, Args)]
struct ContainerArgs {
    #[command(flatten)]
    workspace: WorkspaceArgs,

    /// Name of the storage.
    #[arg(long = "storage", short = 's')]
    storage_name: String,
}

#[derive(Debug, Args)]
struct ListObjectArgs {
    #[command(flatten)]
    container: ContainerArgs,

    /// Key prefix to list under.
    #[arg(long, short = 'p', default_value = "")]
    prefix: String,
}

#[derive(Debug, Args)]
struct PutObjectArgs {
    #[command(flatten)]
    container: ContainerArgs,

    /// Local file to upload.
    #[arg(long)]
    source: PathBuf,

    /// Destination key; a trailing `/` or `.` keeps the source basename.
    #[arg(long, default_value = ".")]
    destination: String,
}

#[derive(Debug, Args)]
struct GetObjectArgs {
    #[command(flatten)]
    container: ContainerArgs,

    /// Key of the object to download.
    #[arg(long)]
    object: String,

    /// Local destination path; `.` keeps the object's basename.
    #[arg(long, default_value = ".")]
    destination: String,
}

#[derive(Debug, Args)]
struct ObjectArgs {
    #[command(flatten)]
    container: ContainerArgs,

    /// Key of the object.
    #[arg(long)]
    object: String,
}

impl Cli {
    /// Runs the selected subcommand against a freshly wired orchestrator.
    pub async fn execute(self) -> anyhow::Result<()> {
        let orchestrator = self.build_orchestrator()?;

        match &self.command {
            Command::Create(args) => {
                orchestrator
                    .create_container(&args.workspace.workspace_id, &args.storage_name)
                    .await?;
                println!("Storage '{}' created", args.storage_name);
            }
            Command::Delete(args) => {
                orchestrator
                    .delete_container(&args.workspace.workspace_id, &args.storage_name)
                    .await?;
                println!("Storage '{}' deleted", args.storage_name);
            }
            Command::List(args) => {
                let containers = orchestrator.list_containers(&args.workspace_id).await?;
                for container in containers {
                    println!("{}", container.name);
                }
            }
            Command::ListObject(args) => {
                let entries = orchestrator
                    .list_objects(
                        &args.container.workspace.workspace_id,
                        &args.container.storage_name,
                        &args.prefix,
                    )
                    .await?;
                for entry in entries {
                    println!("{}", entry.key);
                }
            }
            Command::PutObject(args) => {
                let key = orchestrator
                    .put_object(
                        &args.container.workspace.workspace_id,
                        &args.container.storage_name,
                        &args.source,
                        &args.destination,
                    )
                    .await?;
                println!("Uploaded '{}' to '{key}'", args.source.display());
            }
            Command::GetObject(args) => {
                let path = orchestrator
                    .get_object(
                        &args.container.workspace.workspace_id,
                        &args.container.storage_name,
                        &args.object,
                        &args.destination,
                    )
                    .await?;
                println!("Downloaded '{}' to '{}'", args.object, path.display());
            }
            Command::DeleteObject(args) => {
                orchestrator
                    .delete_object(
                        &args.container.workspace.workspace_id,
                        &args.container.storage_name,
                        &args.object,
                    )
                    .await?;
                println!("Deleted '{}'", args.object);
            }
            Command::Connect(args) => {
                let bundle = orchestrator
                    .connect(&args.workspace.workspace_id, &args.storage_name)
                    .await?;
                println!("Credentials issued for '{}'", bundle.endpoint);
            }
        }

        Ok(())
    }

    /// Wires the API client, credential store, and S3 provider together.
    fn build_orchestrator(&self) -> anyhow::Result<StorageOrchestrator> {
        let mut config = ApiClientConfig::default();
        if let Some(api_url) = &self.api_url {
            config = config.with_base_url(api_url.clone());
        }
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }

        let client = NaasApiClient::new(config).context("failed to create API client")?;

        let store = match &self.credentials_file {
            Some(path) => CredentialStore::new(path),
            None => CredentialStore::with_default_path(),
        };
        let provider = Arc::new(S3StorageProvider::new(Arc::new(store)));

        let registry = Arc::new(client.clone());
        let issuer = Arc::new(client);
        Ok(StorageOrchestrator::new(registry, issuer).with_provider(provider))
    }
}
