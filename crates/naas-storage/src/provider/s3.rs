//! S3 provider adaptor using [`object_store::aws::AmazonS3Builder`].
//!
//! Works with AWS S3 and any S3-compatible service. The runtime client is
//! rebuilt from the most recently saved credential bundle, never from
//! process-global state, so a fresh bundle takes effect immediately and
//! the adaptor is safe to instantiate multiple times in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, ObjectStore, PutOptions};
use tokio::sync::RwLock;
use url::Url;

use naas_core::{
    Error, Result, content_type_for, normalize_key, resolve_download_path, resolve_upload_key,
};
use naas_credentials::{CredentialBundle, CredentialStore};

use super::ProviderAdaptor;

/// Tracing target for S3 provider operations.
pub const TRACING_TARGET: &str = "naas_storage::provider::s3";

/// Stable cache-key identifier for this provider.
const PROVIDER_ID: &str = "s3";

/// Runtime configuration derived from one credential bundle.
struct S3Runtime {
    workspace_id: String,
    container: String,
    bundle: CredentialBundle,
    client: Arc<AmazonS3>,
}

/// S3-backed [`ProviderAdaptor`].
///
/// Objects are stored under `{workspace}/{container}/{key}` in the bucket
/// named by the issued endpoint (`s3://bucket/...`). Credentials come from
/// the shared [`CredentialStore`]; the adaptor itself never calls the
/// issuer.
pub struct S3StorageProvider {
    store: Arc<CredentialStore>,
    runtime: RwLock<Option<S3Runtime>>,
}

impl S3StorageProvider {
    /// Creates an adaptor backed by the given credential store.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            runtime: RwLock::new(None),
        }
    }

    /// Returns the most recently saved bundle for the pair, consulting the
    /// in-memory runtime before falling back to the on-disk cache.
    async fn cached_bundle(&self, workspace_id: &str, container: &str) -> Option<CredentialBundle> {
        {
            let runtime = self.runtime.read().await;
            if let Some(runtime) = runtime.as_ref()
                && runtime.workspace_id == workspace_id
                && runtime.container == container
            {
                return Some(runtime.bundle.clone());
            }
        }

        self.store
            .load(workspace_id, container, PROVIDER_ID)
            .await
            .ok()
            .flatten()
    }

    /// Returns a client built from the freshest usable bundle.
    async fn client_for(&self, workspace_id: &str, container: &str) -> Result<Arc<AmazonS3>> {
        {
            let runtime = self.runtime.read().await;
            if let Some(runtime) = runtime.as_ref()
                && runtime.workspace_id == workspace_id
                && runtime.container == container
                && runtime.bundle.is_usable(jiff::Timestamp::now())
            {
                return Ok(Arc::clone(&runtime.client));
            }
        }

        let bundle = self
            .cached_bundle(workspace_id, container)
            .await
            .ok_or_else(|| {
                Error::bad_credentials().with_message("unable to locate credentials")
            })?;
        if !bundle.is_usable(jiff::Timestamp::now()) {
            return Err(Error::bad_credentials()
                .with_message("cached credentials are expired or incomplete"));
        }

        let client = Arc::new(build_client(&bundle)?);
        let mut runtime = self.runtime.write().await;
        *runtime = Some(S3Runtime {
            workspace_id: workspace_id.to_owned(),
            container: container.to_owned(),
            bundle,
            client: Arc::clone(&client),
        });
        Ok(client)
    }
}

#[async_trait::async_trait]
impl ProviderAdaptor for S3StorageProvider {
    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn is_credential_valid(&self, workspace_id: &str, container: &str) -> bool {
        match self.cached_bundle(workspace_id, container).await {
            Some(bundle) => bundle.is_usable(jiff::Timestamp::now()),
            None => false,
        }
    }

    async fn save_credential(
        &self,
        workspace_id: &str,
        container: &str,
        bundle: CredentialBundle,
    ) -> Result<()> {
        self.store
            .save(workspace_id, container, PROVIDER_ID, &bundle)
            .await?;

        let client = Arc::new(build_client(&bundle)?);
        let mut runtime = self.runtime.write().await;
        *runtime = Some(S3Runtime {
            workspace_id: workspace_id.to_owned(),
            container: container.to_owned(),
            bundle,
            client,
        });

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            "refreshed runtime credentials"
        );
        Ok(())
    }

    async fn put_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_path: &Path,
        dst_key: &str,
    ) -> Result<String> {
        if tokio::fs::metadata(src_path).await.is_err() {
            return Err(Error::file_not_found()
                .with_message(format!("no such file: '{}'", src_path.display())));
        }

        let key = resolve_upload_key(dst_key, src_path)?;
        let object_key = full_object_key(workspace_id, container, &key);
        let client = self.client_for(workspace_id, container).await?;

        let data = tokio::fs::read(src_path)
            .await
            .map_err(|e| Error::file_not_found().with_source(e))?;

        let mut opts = PutOptions::default();
        if let Some(content_type) = content_type_for(src_path) {
            opts.attributes
                .insert(Attribute::ContentType, content_type.into());
        }

        client
            .put_opts(&ObjectPath::from(object_key.as_str()), Bytes::from(data).into(), opts)
            .await
            .map_err(map_object_store_err)?;

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            key = %object_key,
            "uploaded object"
        );
        Ok(object_key)
    }

    async fn get_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_key: &str,
        dst_path: &str,
    ) -> Result<PathBuf> {
        let dst = resolve_download_path(dst_path, src_key)?;
        let object_key = full_object_key(workspace_id, container, src_key);
        let client = self.client_for(workspace_id, container).await?;

        let result = client
            .get(&ObjectPath::from(object_key.as_str()))
            .await
            .map_err(map_object_store_err)?;
        let data = result.bytes().await.map_err(map_object_store_err)?;

        if let Some(parent) = dst.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::file_not_found().with_source(e))?;
        }
        tokio::fs::write(&dst, &data)
            .await
            .map_err(|e| Error::file_not_found().with_source(e))?;

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            key = %object_key,
            dst = %dst.display(),
            "downloaded object"
        );
        Ok(dst)
    }

    async fn delete_object(&self, workspace_id: &str, container: &str, key: &str) -> Result<()> {
        let object_key = full_object_key(workspace_id, container, key);
        let client = self.client_for(workspace_id, container).await?;

        client
            .delete(&ObjectPath::from(object_key.as_str()))
            .await
            .map_err(map_object_store_err)?;

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            key = %object_key,
            "deleted object"
        );
        Ok(())
    }
}

impl std::fmt::Debug for S3StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageProvider")
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}

/// Builds the full storage key `{workspace}/{container}/{key}`.
fn full_object_key(workspace_id: &str, container: &str, key: &str) -> String {
    normalize_key(&format!("{workspace_id}/{container}/{key}"))
}

/// Builds an [`AmazonS3`] client from a credential bundle.
fn build_client(bundle: &CredentialBundle) -> Result<AmazonS3> {
    let (bucket, endpoint) = parse_endpoint(&bundle.endpoint)?;

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(&bundle.region)
        .with_access_key_id(&bundle.access_key_id)
        .with_secret_access_key(&bundle.secret_key);

    if !bundle.session_token.is_empty() {
        builder = builder.with_token(&bundle.session_token);
    }
    if let Some(endpoint) = endpoint {
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
        builder = builder.with_endpoint(endpoint);
    }

    builder.build().map_err(map_object_store_err)
}

/// Derives the bucket (and an HTTP endpoint override, for S3-compatible
/// services) from the issued endpoint URL.
///
/// `s3://bucket/workspace/container` names the bucket in its host;
/// `http(s)://host/bucket/...` names an alternative endpoint with the
/// bucket as the first path segment.
fn parse_endpoint(raw: &str) -> Result<(String, Option<String>)> {
    let url = Url::parse(raw).map_err(|e| {
        Error::bad_credentials()
            .with_message(format!("invalid storage endpoint '{raw}'"))
            .with_source(e)
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| {
            Error::bad_credentials().with_message(format!("storage endpoint '{raw}' has no host"))
        })?
        .to_owned();

    match url.scheme() {
        "s3" => Ok((host, None)),
        "http" | "https" => {
            let bucket = url
                .path_segments()
                .and_then(|mut segments| segments.next())
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| {
                    Error::bad_credentials()
                        .with_message(format!("storage endpoint '{raw}' has no bucket segment"))
                })?
                .to_owned();
            let origin = format!("{}://{}", url.scheme(), url.authority());
            Ok((bucket, Some(origin)))
        }
        other => Err(Error::bad_credentials()
            .with_message(format!("unsupported storage endpoint scheme '{other}'"))),
    }
}

/// Translates an [`object_store::Error`] into the domain taxonomy.
///
/// Typed variants are matched first; message inspection is the last resort
/// for expired-token responses the SDK reports generically.
fn map_object_store_err(err: object_store::Error) -> Error {
    use object_store::Error as StoreError;

    match &err {
        StoreError::NotFound { .. } => Error::file_not_found()
            .with_message("object not found")
            .with_source(err),
        StoreError::PermissionDenied { .. } => Error::forbidden()
            .with_message("access denied, try issuing new credentials")
            .with_source(err),
        StoreError::Unauthenticated { .. } => Error::bad_credentials()
            .with_message("provider rejected the credentials")
            .with_source(err),
        StoreError::InvalidPath { .. } | StoreError::Precondition { .. } => Error::bad_request()
            .with_message("malformed storage request")
            .with_source(err),
        _ => {
            let text = err.to_string();
            if text.contains("ExpiredToken") || text.contains("TokenRefreshRequired") {
                Error::expired_token()
                    .with_message("the session token has expired")
                    .with_source(err)
            } else {
                Error::connection()
                    .with_message("storage request failed")
                    .with_source(err)
            }
        }
    }
}
