#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod bundle;
mod document;
mod store;

pub use bundle::CredentialBundle;
pub use document::{CachedCredential, CredentialCacheDocument};
pub use store::CredentialStore;

/// Tracing target for credential cache operations.
pub const TRACING_TARGET: &str = "naas_credentials::store";
