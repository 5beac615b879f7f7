//! Control-plane ports and the types they exchange.
//!
//! The orchestrator talks to the control plane through these traits only;
//! the HTTP implementation lives in the `naas-api` crate. This keeps the
//! domain core free of transport details and lets tests substitute mocks.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use naas_core::Result;
use naas_credentials::CredentialBundle;

/// A logical storage container owned by a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Container name, unique within the workspace.
    pub name: String,
    /// Owning workspace id.
    #[serde(default)]
    pub workspace_id: String,
}

/// One object listed inside a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Slash-delimited object key.
    pub key: String,
    /// Object size in bytes, when the control plane reports it.
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification instant, when reported.
    #[serde(default)]
    pub last_modified: Option<Timestamp>,
}

/// Container lifecycle operations served by the control plane.
///
/// These are plain request/response proxies and never require provider
/// credentials.
#[async_trait::async_trait]
pub trait ContainerRegistry: Send + Sync {
    /// Creates a container in the workspace.
    async fn create_container(&self, workspace_id: &str, name: &str) -> Result<()>;

    /// Deletes a container from the workspace.
    async fn delete_container(&self, workspace_id: &str, name: &str) -> Result<()>;

    /// Lists the workspace's containers.
    async fn list_containers(&self, workspace_id: &str) -> Result<Vec<Container>>;

    /// Lists objects in a container under `prefix`.
    async fn list_objects(
        &self,
        workspace_id: &str,
        name: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectEntry>>;
}

/// Mints short-lived provider credentials for a `(workspace, container)`
/// pair.
#[async_trait::async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Requests a fresh credential bundle from the control plane.
    async fn issue(&self, workspace_id: &str, container: &str) -> Result<CredentialBundle>;
}
