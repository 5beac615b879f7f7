//! On-disk layout of the credential cache document.
//!
//! The document is a single JSON object. Cached credentials live under the
//! top-level `storage` key, nested `workspace -> container -> provider`.
//! Any other top-level key (the long-lived bearer token, for one) is owned
//! by other tooling and must survive every rewrite, so it is carried
//! through a flattened map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bundle::CredentialBundle;

/// Wire form of one cached credential entry.
///
/// Field names are fixed by the cache file format and shared with other
/// clients; do not rename them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCredential {
    /// Provider region.
    #[serde(rename = "REGION_NAME")]
    pub region: String,
    /// Access key ID.
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: String,
    /// Session token.
    #[serde(rename = "AWS_SESSION_TOKEN")]
    pub session_token: String,
    /// Expiry timestamp, ISO-8601 (legacy entries use
    /// `%Y-%m-%d %H:%M:%S%z` and are accepted on read).
    #[serde(
        rename = "AWS_SESSION_EXPIRATION_TOKEN",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration: Option<String>,
    /// Storage endpoint, e.g. `s3://bucket/workspace/container`.
    #[serde(rename = "ENDPOINT_URL", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl CachedCredential {
    /// Converts the wire entry into a [`CredentialBundle`].
    ///
    /// Returns `None` when the expiry string is present but unparseable;
    /// the caller treats that entry as absent so re-issuance can heal the
    /// document.
    pub fn to_bundle(&self, provider_id: &str) -> Option<CredentialBundle> {
        let expires_at = match &self.expiration {
            Some(raw) => Some(CredentialBundle::parse_expiry(raw)?),
            None => None,
        };
        Some(CredentialBundle {
            provider_id: provider_id.to_owned(),
            endpoint: self.endpoint.clone().unwrap_or_default(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_key: self.secret_key.clone(),
            session_token: self.session_token.clone(),
            expires_at,
        })
    }
}

impl From<&CredentialBundle> for CachedCredential {
    fn from(bundle: &CredentialBundle) -> Self {
        Self {
            region: bundle.region.clone(),
            access_key_id: bundle.access_key_id.clone(),
            secret_key: bundle.secret_key.clone(),
            session_token: bundle.session_token.clone(),
            expiration: bundle.expires_at.map(|ts| ts.to_string()),
            endpoint: (!bundle.endpoint.is_empty()).then(|| bundle.endpoint.clone()),
        }
    }
}

/// The whole cache document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CredentialCacheDocument {
    /// Cached credentials, keyed `workspace -> container -> provider`.
    #[serde(default)]
    pub storage: BTreeMap<String, BTreeMap<String, BTreeMap<String, CachedCredential>>>,
    /// Foreign top-level keys, preserved verbatim across rewrites.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CredentialCacheDocument {
    /// Looks up the entry for a `(workspace, container, provider)` triple.
    pub fn get(&self, workspace: &str, container: &str, provider: &str) -> Option<&CachedCredential> {
        self.storage.get(workspace)?.get(container)?.get(provider)
    }

    /// Inserts or replaces the entry for a triple.
    pub fn insert(
        &mut self,
        workspace: &str,
        container: &str,
        provider: &str,
        entry: CachedCredential,
    ) {
        self.storage
            .entry(workspace.to_owned())
            .or_default()
            .entry(container.to_owned())
            .or_default()
            .insert(provider.to_owned(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CachedCredential {
        CachedCredential {
            region: "eu-west-3".to_owned(),
            access_key_id: "AKIATEST12345".to_owned(),
            secret_key: "secret".to_owned(),
            session_token: "token".to_owned(),
            expiration: Some("2026-01-01T00:00:00Z".to_owned()),
            endpoint: Some("s3://bucket/w1/reports".to_owned()),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(entry()).unwrap();
        assert!(json.get("REGION_NAME").is_some());
        assert!(json.get("AWS_ACCESS_KEY_ID").is_some());
        assert!(json.get("AWS_SECRET_ACCESS_KEY").is_some());
        assert!(json.get("AWS_SESSION_TOKEN").is_some());
        assert!(json.get("AWS_SESSION_EXPIRATION_TOKEN").is_some());
    }

    #[test]
    fn test_legacy_expiry_is_accepted() {
        let mut legacy = entry();
        legacy.expiration = Some("2026-01-01 00:00:00+0000".to_owned());
        let bundle = legacy.to_bundle("s3").unwrap();
        assert_eq!(
            bundle.expires_at,
            Some("2026-01-01T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_garbage_expiry_yields_none() {
        let mut broken = entry();
        broken.expiration = Some("not-a-timestamp".to_owned());
        assert!(broken.to_bundle("s3").is_none());
    }

    #[test]
    fn test_foreign_keys_round_trip() {
        let raw = r#"{"jwt_token":"abc.def","storage":{}}"#;
        let doc: CredentialCacheDocument = serde_json::from_str(raw).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json.get("jwt_token").unwrap(), "abc.def");
    }

    #[test]
    fn test_insert_replaces_existing_triple() {
        let mut doc = CredentialCacheDocument::default();
        doc.insert("w1", "reports", "s3", entry());
        let mut newer = entry();
        newer.access_key_id = "AKIANEWER00000".to_owned();
        doc.insert("w1", "reports", "s3", newer.clone());
        assert_eq!(doc.get("w1", "reports", "s3"), Some(&newer));
    }
}
