#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;

pub use client::NaasApiClient;
pub use config::{ApiClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Tracing target for control-plane client operations.
pub const TRACING_TARGET: &str = "naas_api::client";
