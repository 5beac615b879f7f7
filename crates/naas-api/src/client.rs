//! Control-plane HTTP client.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use naas_core::{Error, Result};
use naas_credentials::CredentialBundle;
use naas_storage::{Container, ContainerRegistry, CredentialIssuer, ObjectEntry};

use crate::TRACING_TARGET;
use crate::config::ApiClientConfig;

/// Inner client that holds the HTTP client and configuration.
struct ApiClientInner {
    http: Client,
    config: ApiClientConfig,
}

impl std::fmt::Debug for ApiClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientInner")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// HTTP client for the Naas control-plane storage API.
///
/// Implements both [`ContainerRegistry`] and [`CredentialIssuer`], so one
/// instance serves container lifecycle calls and credential issuance.
#[derive(Clone, Debug)]
pub struct NaasApiClient {
    inner: Arc<ApiClientInner>,
}

impl NaasApiClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                Error::internal()
                    .with_message("failed to create HTTP client")
                    .with_source(e)
            })?;

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %config.base_url,
            "created control-plane client"
        );

        Ok(Self {
            inner: Arc::new(ApiClientInner { http, config }),
        })
    }

    /// Creates a new client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ApiClientConfig::default())
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ApiClientConfig {
        &self.inner.config
    }

    /// Builds an endpoint URL from path segments under the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::bad_request().with_message("base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request with the bearer token attached when configured.
    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let mut builder = self.inner.http.request(method, url);
        if let Some(token) = &self.inner.config.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait::async_trait]
impl ContainerRegistry for NaasApiClient {
    async fn create_container(&self, workspace_id: &str, name: &str) -> Result<()> {
        let url = self.endpoint(&["workspace", workspace_id, "storage"])?;
        let body = CreateStorageRequest {
            storage: StorageName { name },
        };

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;
        check_status(response, "create storage").await?;
        Ok(())
    }

    async fn delete_container(&self, workspace_id: &str, name: &str) -> Result<()> {
        let mut url = self.endpoint(&["workspace", workspace_id, "storage", ""])?;
        url.query_pairs_mut().append_pair("storage_name", name);

        let response = self
            .request(reqwest::Method::DELETE, url)
            .send()
            .await
            .map_err(transport_err)?;
        check_status(response, "delete storage").await?;
        Ok(())
    }

    async fn list_containers(&self, workspace_id: &str) -> Result<Vec<Container>> {
        let url = self.endpoint(&["workspace", workspace_id, "storage"])?;

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(transport_err)?;
        let response = check_status(response, "list storage").await?;
        let parsed: ListStorageResponse = response.json().await.map_err(decode_err)?;

        Ok(parsed
            .storage
            .into_iter()
            .map(|entry| Container {
                name: entry.name,
                workspace_id: workspace_id.to_owned(),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        workspace_id: &str,
        name: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectEntry>> {
        let mut url = self.endpoint(&["workspace", workspace_id, "storage", name])?;
        url.query_pairs_mut().append_pair("prefix", prefix);

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(transport_err)?;
        let response = check_status(response, "list storage objects").await?;
        let parsed: ListObjectResponse = response.json().await.map_err(decode_err)?;

        Ok(parsed
            .object
            .into_iter()
            .filter_map(ObjectWire::into_entry)
            .collect())
    }
}

#[async_trait::async_trait]
impl CredentialIssuer for NaasApiClient {
    async fn issue(&self, workspace_id: &str, container: &str) -> Result<CredentialBundle> {
        let url = self.endpoint(&["workspace", workspace_id, "storage", "credentials"])?;
        let body = IssueCredentialsRequest { name: container };

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id,
            container,
            "requesting storage credentials"
        );

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::credential_issuance()
                    .with_message("control plane unreachable")
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::credential_issuance()
                .with_message(issuance_failure_message(status, &detail)));
        }

        let parsed: IssueCredentialsResponse = response.json().await.map_err(decode_err)?;
        parsed.credentials.s3.into_bundle()
    }
}

/// Maps a transport-level failure to a connection error.
fn transport_err(err: reqwest::Error) -> Error {
    Error::connection()
        .with_message("control plane unreachable")
        .with_source(err)
}

/// Maps a response-decoding failure to a serialization error.
fn decode_err(err: reqwest::Error) -> Error {
    Error::serialization()
        .with_message("unexpected control-plane response body")
        .with_source(err)
}

/// Maps a non-success status to the domain taxonomy.
async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    let message = format!("{context} failed with {status}: {}", truncate(&detail, 256));

    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::forbidden(),
        StatusCode::NOT_FOUND => Error::storage_not_found(),
        s if s.is_client_error() => Error::bad_request(),
        _ => Error::connection(),
    };
    Err(error.with_message(message))
}

fn issuance_failure_message(status: StatusCode, detail: &str) -> String {
    format!(
        "credential issuance failed with {status}: {}",
        truncate(detail, 256)
    )
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Debug, Serialize)]
struct CreateStorageRequest<'a> {
    storage: StorageName<'a>,
}

#[derive(Debug, Serialize)]
struct StorageName<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueCredentialsRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ListStorageResponse {
    #[serde(default)]
    storage: Vec<StorageWire>,
}

#[derive(Debug, Deserialize)]
struct StorageWire {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListObjectResponse {
    #[serde(default)]
    object: Vec<ObjectWire>,
}

#[derive(Debug, Deserialize)]
struct ObjectWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    last_modified: Option<String>,
}

impl ObjectWire {
    /// Converts a wire entry to an [`ObjectEntry`], dropping entries with
    /// no usable key.
    fn into_entry(self) -> Option<ObjectEntry> {
        let key = self.name.or(self.prefix).filter(|key| !key.is_empty())?;
        Some(ObjectEntry {
            key,
            size: self.size,
            last_modified: self
                .last_modified
                .as_deref()
                .and_then(|raw| raw.parse::<jiff::Timestamp>().ok()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IssueCredentialsResponse {
    credentials: CredentialsEnvelope,
}

#[derive(Debug, Deserialize)]
struct CredentialsEnvelope {
    s3: S3CredentialsWire,
}

/// Issued S3 credentials as returned by the control plane.
#[derive(Debug, Deserialize)]
struct S3CredentialsWire {
    endpoint_url: String,
    region_name: String,
    access_key_id: String,
    secret_key: String,
    session_token: String,
    #[serde(default)]
    expiration: Option<String>,
}

impl S3CredentialsWire {
    fn into_bundle(self) -> Result<CredentialBundle> {
        let expires_at = match self.expiration.as_deref() {
            Some(raw) => Some(CredentialBundle::parse_expiry(raw).ok_or_else(|| {
                Error::serialization()
                    .with_message(format!("unparseable credential expiry '{raw}'"))
            })?),
            None => None,
        };
        Ok(CredentialBundle {
            provider_id: "s3".to_owned(),
            endpoint: self.endpoint_url,
            region: self.region_name,
            access_key_id: self.access_key_id,
            secret_key: self.secret_key,
            session_token: self.session_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_builds_nested_path() {
        let client = NaasApiClient::with_defaults().unwrap();
        let url = client
            .endpoint(&["workspace", "w1", "storage", "credentials"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.naas.ai/workspace/w1/storage/credentials"
        );
    }

    #[test]
    fn test_issued_credentials_parse_into_bundle() {
        let raw = r#"{
            "credentials": {
                "s3": {
                    "endpoint_url": "s3://workspace-storage/w1/reports",
                    "region_name": "eu-west-3",
                    "access_key_id": "AKIATEST12345",
                    "secret_key": "secret",
                    "session_token": "token",
                    "expiration": "2026-01-01T00:00:00Z"
                }
            }
        }"#;
        let parsed: IssueCredentialsResponse = serde_json::from_str(raw).unwrap();
        let bundle = parsed.credentials.s3.into_bundle().unwrap();
        assert_eq!(bundle.provider_id, "s3");
        assert_eq!(bundle.endpoint, "s3://workspace-storage/w1/reports");
        assert_eq!(bundle.expires_at, Some("2026-01-01T00:00:00Z".parse().unwrap()));
    }

    #[test]
    fn test_garbage_expiry_is_a_serialization_error() {
        let wire = S3CredentialsWire {
            endpoint_url: "s3://bucket/w1/reports".to_owned(),
            region_name: "eu-west-3".to_owned(),
            access_key_id: "AKIATEST12345".to_owned(),
            secret_key: "secret".to_owned(),
            session_token: "token".to_owned(),
            expiration: Some("soon".to_owned()),
        };
        let err = wire.into_bundle().unwrap_err();
        assert_eq!(err.kind(), naas_core::ErrorKind::Serialization);
    }

    #[test]
    fn test_object_listing_tolerates_prefix_entries() {
        let raw = r#"{"object":[{"name":"2024/invoice.pdf","size":1024},{"prefix":"2024/"},{}]}"#;
        let parsed: ListObjectResponse = serde_json::from_str(raw).unwrap();
        let entries: Vec<_> = parsed
            .object
            .into_iter()
            .filter_map(ObjectWire::into_entry)
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "2024/invoice.pdf");
        assert_eq!(entries[0].size, Some(1024));
        assert_eq!(entries[1].key, "2024/");
    }
}
