//! Short-lived provider credentials.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Legacy expiry layout written by older clients.
const LEGACY_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// A short-lived credential set issued for one `(workspace, container,
/// provider)` triple.
///
/// The bundle is opaque to the orchestrator beyond [`provider_id`] and
/// [`expires_at`]; only the provider adaptor that requested it reads the
/// key material. It is a capability token and is never logged whole — use
/// [`access_key_masked`](Self::access_key_masked) in trace output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Stable provider identifier, e.g. `"s3"`.
    pub provider_id: String,
    /// Storage endpoint issued by the control plane,
    /// e.g. `s3://bucket/workspace/container`.
    pub endpoint: String,
    /// Provider region.
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default, skip_serializing)]
    pub secret_key: String,
    /// Session token for temporary credentials.
    pub session_token: String,
    /// Expiry instant; `None` means the bundle never expires.
    pub expires_at: Option<Timestamp>,
}

impl CredentialBundle {
    /// Parses an expiry string, accepting ISO-8601 with timezone and the
    /// legacy `%Y-%m-%d %H:%M:%S%z` layout.
    ///
    /// Returns `None` for unparseable input; callers treat such a bundle
    /// as absent so re-issuance can replace it.
    pub fn parse_expiry(raw: &str) -> Option<Timestamp> {
        if let Ok(ts) = raw.parse::<Timestamp>() {
            return Some(ts);
        }
        jiff::fmt::strtime::parse(LEGACY_EXPIRY_FORMAT, raw)
            .ok()?
            .to_timestamp()
            .ok()
    }

    /// Returns true if the bundle is past its expiry at `now`.
    ///
    /// A bundle without an expiry never expires.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Returns true if every field required to build a client is present.
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_key.is_empty() && !self.region.is_empty()
    }

    /// Returns true if the bundle is complete and unexpired at `now`.
    pub fn is_usable(&self, now: Timestamp) -> bool {
        self.is_complete() && !self.is_expired(now)
    }

    /// Returns a masked version of the access key for logging.
    ///
    /// Shows only the first 4 characters followed by asterisks.
    pub fn access_key_masked(&self) -> String {
        if self.access_key_id.len() <= 4 {
            "*".repeat(self.access_key_id.len())
        } else {
            format!("{}***", &self.access_key_id[..4])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(expires_at: Option<Timestamp>) -> CredentialBundle {
        CredentialBundle {
            provider_id: "s3".to_owned(),
            endpoint: "s3://bucket/w1/reports".to_owned(),
            region: "eu-west-3".to_owned(),
            access_key_id: "AKIATEST12345".to_owned(),
            secret_key: "secret".to_owned(),
            session_token: "token".to_owned(),
            expires_at,
        }
    }

    #[test]
    fn test_expired_in_the_past() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let expired = bundle(Some(Timestamp::from_second(1_600_000_000).unwrap()));
        assert!(expired.is_expired(now));
        assert!(!expired.is_usable(now));
    }

    #[test]
    fn test_valid_in_the_future() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let fresh = bundle(Some(Timestamp::from_second(1_800_000_000).unwrap()));
        assert!(!fresh.is_expired(now));
        assert!(fresh.is_usable(now));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        assert!(!bundle(None).is_expired(now));
    }

    #[test]
    fn test_incomplete_bundle_is_unusable() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let mut b = bundle(None);
        b.access_key_id.clear();
        assert!(!b.is_usable(now));
    }

    #[test]
    fn test_access_key_masking() {
        assert_eq!(bundle(None).access_key_masked(), "AKIA***");
        let mut short = bundle(None);
        short.access_key_id = "ABC".to_owned();
        assert_eq!(short.access_key_masked(), "***");
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let json = serde_json::to_string(&bundle(None)).unwrap();
        assert!(!json.contains("secret"));
    }
}
