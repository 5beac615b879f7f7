//! Storage provider adaptors.
//!
//! A [`ProviderAdaptor`] performs object transfers against one backing
//! store using locally cached credentials. Adaptors never talk to the
//! credential issuer — the orchestrator detects invalid credentials and
//! hands freshly issued bundles to [`save_credential`], which keeps
//! provider code free of control-plane knowledge and the orchestrator free
//! of provider-SDK knowledge.
//!
//! [`save_credential`]: ProviderAdaptor::save_credential

mod s3;

use std::path::{Path, PathBuf};

pub use s3::S3StorageProvider;

use naas_core::Result;
use naas_credentials::CredentialBundle;

/// An object-storage provider bound to a credential cache.
#[async_trait::async_trait]
pub trait ProviderAdaptor: Send + Sync {
    /// Stable identifier used as the cache key segment, e.g. `"s3"`.
    fn provider_id(&self) -> &'static str;

    /// Reports whether usable credentials are cached for the pair.
    ///
    /// Purely a local inspection of the in-memory runtime and the on-disk
    /// cache: `false` when no bundle exists, required fields are empty, or
    /// the expiry has passed. Never performs network calls.
    async fn is_credential_valid(&self, workspace_id: &str, container: &str) -> bool;

    /// Persists a freshly issued bundle and refreshes the adaptor's
    /// runtime configuration so subsequent calls use it without
    /// re-reading disk.
    async fn save_credential(
        &self,
        workspace_id: &str,
        container: &str,
        bundle: CredentialBundle,
    ) -> Result<()>;

    /// Uploads a local file to `{workspace}/{container}/{dst_key}`.
    ///
    /// A `dst_key` that is empty, `.`, or ends in `/` defaults the
    /// destination basename to the source file's basename. Returns the
    /// stored object key.
    async fn put_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_path: &Path,
        dst_key: &str,
    ) -> Result<String>;

    /// Downloads the object at `src_key` to a local path, with the same
    /// basename-defaulting rule as uploads. Returns the written path.
    async fn get_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_key: &str,
        dst_path: &str,
    ) -> Result<PathBuf>;

    /// Removes the object at `key`.
    async fn delete_object(&self, workspace_id: &str, container: &str, key: &str) -> Result<()>;
}
