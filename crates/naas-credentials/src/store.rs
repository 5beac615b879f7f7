//! Disk-backed credential store.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use naas_core::{Error, Result};

use crate::TRACING_TARGET;
use crate::bundle::CredentialBundle;
use crate::document::{CachedCredential, CredentialCacheDocument};

/// Cache file location relative to the user's home directory.
const DEFAULT_RELATIVE_PATH: &str = ".naas/credentials";

/// Reads and writes the on-disk credential cache document.
///
/// The store is pure data access: no networking and no provider-specific
/// knowledge. Every save is a read-merge-write of the whole document
/// followed by an atomic rename, so entries for other triples and foreign
/// top-level keys are preserved and a crash mid-write never leaves a
/// half-written file. Writers within one process are serialized by an
/// internal lock.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Creates a store backed by the given file path.
    ///
    /// The path is injectable so tests can run against temporary files
    /// instead of the user's real cache.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store at the default per-user location
    /// (`~/.naas/credentials`).
    pub fn with_default_path() -> Self {
        Self::new(Self::default_path())
    }

    /// Returns the default per-user cache path.
    pub fn default_path() -> PathBuf {
        std::env::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_RELATIVE_PATH)
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached bundle for a `(workspace, container, provider)`
    /// triple.
    ///
    /// A missing file, malformed JSON, or absent key path all return
    /// `Ok(None)`: a unreadable cache is not an error, only the trigger
    /// for re-issuance, which rewrites the document and heals it.
    pub async fn load(
        &self,
        workspace: &str,
        container: &str,
        provider: &str,
    ) -> Result<Option<CredentialBundle>> {
        let document = self.read_document().await;
        let bundle = document
            .get(workspace, container, provider)
            .and_then(|entry| entry.to_bundle(provider));

        tracing::debug!(
            target: TRACING_TARGET,
            workspace,
            container,
            provider,
            cached = bundle.is_some(),
            "loaded credential cache entry"
        );

        Ok(bundle)
    }

    /// Saves a bundle for a `(workspace, container, provider)` triple,
    /// replacing any previous entry for that triple.
    ///
    /// # Errors
    ///
    /// Fails only on IO or serialization problems while rewriting the
    /// document; the merge itself is total.
    pub async fn save(
        &self,
        workspace: &str,
        container: &str,
        provider: &str,
        bundle: &CredentialBundle,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await;
        document.insert(workspace, container, provider, CachedCredential::from(bundle));
        self.write_document(&document).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            workspace,
            container,
            provider,
            access_key = %bundle.access_key_masked(),
            "saved credential cache entry"
        );

        Ok(())
    }

    /// Reads the document, treating missing or malformed files as empty.
    async fn read_document(&self) -> CredentialCacheDocument {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return CredentialCacheDocument::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    path = %self.path.display(),
                    error = %error,
                    "credential cache is malformed, treating as empty"
                );
                CredentialCacheDocument::default()
            }
        }
    }

    /// Writes the document to a sibling temp file, then renames it over
    /// the cache path.
    async fn write_document(&self, document: &CredentialCacheDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create cache directory", e))?;
        }

        let bytes = serde_json::to_vec(document)
            .map_err(|e| Error::serialization().with_source(e))?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| io_error("write cache temp file", e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| io_error("replace cache file", e))?;

        Ok(())
    }
}

fn io_error(action: &str, source: std::io::Error) -> Error {
    Error::internal()
        .with_message(format!("failed to {action}"))
        .with_source(source)
}
