//! Storage orchestrator: credential lifecycle around every object
//! operation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use naas_core::{Error, ErrorKind, Result, resolve_download_path};
use naas_credentials::CredentialBundle;

use crate::provider::ProviderAdaptor;
use crate::registry::{Container, ContainerRegistry, CredentialIssuer, ObjectEntry};

/// Tracing target for orchestrator operations.
pub const TRACING_TARGET: &str = "naas_storage::orchestrator";

/// Provider id every container maps to today.
///
/// Provider selection is deliberately funneled through
/// [`StorageOrchestrator::resolve_provider`] so a per-container tag
/// recorded at creation time can replace the constant without touching the
/// operation paths.
const DEFAULT_PROVIDER_ID: &str = "s3";

/// Coordinates credential issuance and dispatches object operations to the
/// provider backing each container.
///
/// Object operations follow one fixed pass: resolve the provider, issue
/// and persist fresh credentials if the cached ones are invalid, then
/// delegate. A provider-reported expiry after a fresh issuance surfaces as
/// an error rather than a retry loop. Container-level operations bypass
/// provider credentials entirely and proxy to the control plane.
pub struct StorageOrchestrator {
    registry: Arc<dyn ContainerRegistry>,
    issuer: Arc<dyn CredentialIssuer>,
    providers: BTreeMap<&'static str, Arc<dyn ProviderAdaptor>>,
    default_provider_id: &'static str,
}

impl StorageOrchestrator {
    /// Creates an orchestrator over the control-plane ports with no
    /// providers registered.
    pub fn new(registry: Arc<dyn ContainerRegistry>, issuer: Arc<dyn CredentialIssuer>) -> Self {
        Self {
            registry,
            issuer,
            providers: BTreeMap::new(),
            default_provider_id: DEFAULT_PROVIDER_ID,
        }
    }

    /// Registers a provider adaptor under its own id.
    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdaptor>) -> Self {
        self.providers.insert(provider.provider_id(), provider);
        self
    }

    /// Overrides the provider id containers resolve to.
    pub fn with_default_provider_id(mut self, provider_id: &'static str) -> Self {
        self.default_provider_id = provider_id;
        self
    }

    /// Resolves the provider backing `(workspace, container)`.
    ///
    /// Currently a fixed mapping; fails with
    /// [`ErrorKind::UnknownProvider`] before any network or disk IO when
    /// no adaptor is registered for the resolved id.
    fn resolve_provider(
        &self,
        _workspace_id: &str,
        _container: &str,
    ) -> Result<&Arc<dyn ProviderAdaptor>> {
        let provider_id = self.default_provider_id;
        self.providers.get(provider_id).ok_or_else(|| {
            Error::unknown_provider()
                .with_message(format!("no adaptor registered for provider '{provider_id}'"))
        })
    }

    /// Issues and persists fresh credentials when the cached ones are
    /// invalid. Exactly one issuance attempt per call.
    async fn ensure_credentials(
        &self,
        provider: &Arc<dyn ProviderAdaptor>,
        workspace_id: &str,
        container: &str,
    ) -> Result<()> {
        if provider.is_credential_valid(workspace_id, container).await {
            return Ok(());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            provider = provider.provider_id(),
            "cached credentials invalid, requesting issuance"
        );

        let bundle = self
            .issuer
            .issue(workspace_id, container)
            .await
            .map_err(as_issuance_error)?;
        provider
            .save_credential(workspace_id, container, bundle)
            .await
    }

    /// Uploads a local file into a container. Returns the stored key.
    ///
    /// A missing source file is rejected with `FileNotFound` before any
    /// credential issuance.
    pub async fn put_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_path: &Path,
        dst_key: &str,
    ) -> Result<String> {
        let provider = self.resolve_provider(workspace_id, container)?;
        if tokio::fs::metadata(src_path).await.is_err() {
            return Err(Error::file_not_found()
                .with_message(format!("no such file: '{}'", src_path.display())));
        }
        self.ensure_credentials(provider, workspace_id, container)
            .await?;
        provider
            .put_object(workspace_id, container, src_path, dst_key)
            .await
    }

    /// Downloads an object to a local path. Returns the written path.
    ///
    /// A folder-style key (trailing `/`) is rejected with `BadRequest`
    /// before any credential issuance.
    pub async fn get_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_key: &str,
        dst_path: &str,
    ) -> Result<PathBuf> {
        let provider = self.resolve_provider(workspace_id, container)?;
        resolve_download_path(dst_path, src_key)?;
        self.ensure_credentials(provider, workspace_id, container)
            .await?;
        provider
            .get_object(workspace_id, container, src_key, dst_path)
            .await
    }

    /// Removes an object from a container.
    pub async fn delete_object(&self, workspace_id: &str, container: &str, key: &str) -> Result<()> {
        let provider = self.resolve_provider(workspace_id, container)?;
        self.ensure_credentials(provider, workspace_id, container)
            .await?;
        provider.delete_object(workspace_id, container, key).await
    }

    /// Eagerly issues and persists credentials for a container, returning
    /// the issued bundle. Backs the CLI `connect` verb.
    pub async fn connect(&self, workspace_id: &str, container: &str) -> Result<CredentialBundle> {
        let provider = self.resolve_provider(workspace_id, container)?;
        let bundle = self
            .issuer
            .issue(workspace_id, container)
            .await
            .map_err(as_issuance_error)?;
        provider
            .save_credential(workspace_id, container, bundle.clone())
            .await?;
        Ok(bundle)
    }

    /// Creates a container in the workspace.
    pub async fn create_container(&self, workspace_id: &str, name: &str) -> Result<()> {
        self.registry.create_container(workspace_id, name).await
    }

    /// Deletes a container from the workspace.
    pub async fn delete_container(&self, workspace_id: &str, name: &str) -> Result<()> {
        self.registry.delete_container(workspace_id, name).await
    }

    /// Lists the workspace's containers.
    pub async fn list_containers(&self, workspace_id: &str) -> Result<Vec<Container>> {
        self.registry.list_containers(workspace_id).await
    }

    /// Lists objects in a container under `prefix`.
    pub async fn list_objects(
        &self,
        workspace_id: &str,
        name: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectEntry>> {
        self.registry.list_objects(workspace_id, name, prefix).await
    }
}

impl std::fmt::Debug for StorageOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageOrchestrator")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("default_provider_id", &self.default_provider_id)
            .finish_non_exhaustive()
    }
}

/// Wraps a failed issuance call as a credential issuance error, keeping an
/// already-classified issuance failure untouched.
fn as_issuance_error(err: Error) -> Error {
    if err.kind() == ErrorKind::CredentialIssuance {
        return err;
    }
    Error::credential_issuance()
        .with_message("credential issuance failed")
        .with_source(err)
}
