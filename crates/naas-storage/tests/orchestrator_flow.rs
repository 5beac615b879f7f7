//! End-to-end orchestrator flow against an in-memory provider.
//!
//! The provider mirrors the S3 adaptor's key handling and credential
//! checks (same normalization helpers, same credential store) but keeps
//! object bytes in memory, so the full upload/download/refresh flow runs
//! without a backing service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use naas_core::{Result, normalize_key, resolve_download_path, resolve_upload_key};
use naas_credentials::{CredentialBundle, CredentialStore};
use naas_storage::{
    Container, ContainerRegistry, CredentialIssuer, ObjectEntry, ProviderAdaptor,
    StorageOrchestrator,
};

struct InMemoryProvider {
    store: Arc<CredentialStore>,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryProvider {
    fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            objects: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdaptor for InMemoryProvider {
    fn provider_id(&self) -> &'static str {
        "s3"
    }

    async fn is_credential_valid(&self, workspace_id: &str, container: &str) -> bool {
        match self.store.load(workspace_id, container, "s3").await {
            Ok(Some(bundle)) => bundle.is_usable(jiff::Timestamp::now()),
            _ => false,
        }
    }

    async fn save_credential(
        &self,
        workspace_id: &str,
        container: &str,
        bundle: CredentialBundle,
    ) -> Result<()> {
        self.store.save(workspace_id, container, "s3", &bundle).await
    }

    async fn put_object(
        &self,
        workspace_id: &str,
        container: &str,
        src_path: &Path,
        dst_key: &str,
    ) -> Result<String> {
        let key = resolve_upload_key(dst_key, src_path)?;
        let object_key = normalize_key(&format!("{workspace_id}/{container}/{key}"));
        let data = std::fs::read(src_path).expect("source file exists");
        self.objects.lock().await.insert(object_key.clone(), data);
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
        let object_key = normalize_key(&format!("{workspace_id}/{container}/{src_key}"));
        let objects = self.objects.lock().await;
        let data = objects.get(&object_key).expect("object exists");
        std::fs::write(&dst, data).expect("destination is writable");
        Ok(dst)
    }

    async fn delete_object(&self, workspace_id: &str, container: &str, key: &str) -> Result<()> {
        let object_key = normalize_key(&format!("{workspace_id}/{container}/{key}"));
        self.objects.lock().await.remove(&object_key);
        Ok(())
    }
}

struct StaticRegistry;

#[async_trait::async_trait]
impl ContainerRegistry for StaticRegistry {
    async fn create_container(&self, _workspace_id: &str, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_container(&self, _workspace_id: &str, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn list_containers(&self, workspace_id: &str) -> Result<Vec<Container>> {
        Ok(vec![Container {
            name: "reports".to_owned(),
            workspace_id: workspace_id.to_owned(),
        }])
    }

    async fn list_objects(
        &self,
        _workspace_id: &str,
        _name: &str,
        _prefix: &str,
    ) -> Result<Vec<ObjectEntry>> {
        Ok(Vec::new())
    }
}

struct CountingIssuer {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CredentialIssuer for CountingIssuer {
    async fn issue(&self, workspace_id: &str, container: &str) -> Result<CredentialBundle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CredentialBundle {
            provider_id: "s3".to_owned(),
            endpoint: format!("s3://workspace-storage/{workspace_id}/{container}"),
            region: "eu-west-3".to_owned(),
            access_key_id: "AKIAFRESH00001".to_owned(),
            secret_key: "secret".to_owned(),
            session_token: "token".to_owned(),
            expires_at: Some(jiff::Timestamp::now() + jiff::Span::new().hours(1)),
        })
    }
}

struct Setup {
    _dir: tempfile::TempDir,
    work_dir: tempfile::TempDir,
    store: Arc<CredentialStore>,
    issuer: Arc<CountingIssuer>,
    orchestrator: StorageOrchestrator,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CredentialStore::new(dir.path().join("credentials")));
    let issuer = Arc::new(CountingIssuer {
        calls: AtomicUsize::new(0),
    });
    let provider = Arc::new(InMemoryProvider::new(store.clone()));
    let orchestrator =
        StorageOrchestrator::new(Arc::new(StaticRegistry), issuer.clone()).with_provider(provider);
    Setup {
        _dir: dir,
        work_dir,
        store,
        issuer,
        orchestrator,
    }
}

#[tokio::test]
async fn upload_then_download_round_trips_through_folder_key() {
    let setup = setup();
    let src = setup.work_dir.path().join("invoice.pdf");
    std::fs::write(&src, b"%PDF-1.7 test").unwrap();

    let key = setup
        .orchestrator
        .put_object("w1", "reports", &src, "2024/")
        .await
        .unwrap();
    assert_eq!(key, "w1/reports/2024/invoice.pdf");

    let dst_dir = setup.work_dir.path().join("downloads");
    std::fs::create_dir_all(&dst_dir).unwrap();
    let dst = setup
        .orchestrator
        .get_object(
            "w1",
            "reports",
            "2024/invoice.pdf",
            &format!("{}/", dst_dir.display()),
        )
        .await
        .unwrap();

    assert_eq!(dst.file_name().unwrap(), "invoice.pdf");
    assert_eq!(std::fs::read(&dst).unwrap(), b"%PDF-1.7 test");
}

#[tokio::test]
async fn expired_cache_triggers_exactly_one_reissue() {
    let setup = setup();
    let expired = CredentialBundle {
        provider_id: "s3".to_owned(),
        endpoint: "s3://workspace-storage/w1/reports".to_owned(),
        region: "eu-west-3".to_owned(),
        access_key_id: "AKIASTALE00001".to_owned(),
        secret_key: "secret".to_owned(),
        session_token: "token".to_owned(),
        expires_at: Some(jiff::Timestamp::now() - jiff::Span::new().hours(1)),
    };
    setup
        .store
        .save("w1", "reports", "s3", &expired)
        .await
        .unwrap();

    let src = setup.work_dir.path().join("data.csv");
    std::fs::write(&src, b"a,b\n1,2\n").unwrap();

    setup
        .orchestrator
        .put_object("w1", "reports", &src, ".")
        .await
        .unwrap();

    assert_eq!(setup.issuer.calls.load(Ordering::SeqCst), 1);
    let cached = setup
        .store
        .load("w1", "reports", "s3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.access_key_id, "AKIAFRESH00001");
}

#[tokio::test]
async fn valid_cache_is_reused_across_operations() {
    let setup = setup();
    let src = setup.work_dir.path().join("a.txt");
    std::fs::write(&src, b"hello").unwrap();

    setup
        .orchestrator
        .put_object("w1", "reports", &src, ".")
        .await
        .unwrap();
    setup
        .orchestrator
        .delete_object("w1", "reports", "a.txt")
        .await
        .unwrap();

    assert_eq!(setup.issuer.calls.load(Ordering::SeqCst), 1);
}
