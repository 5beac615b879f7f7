#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod orchestrator;
pub mod provider;
mod registry;

pub use orchestrator::StorageOrchestrator;
pub use provider::{ProviderAdaptor, S3StorageProvider};
pub use registry::{Container, ContainerRegistry, CredentialIssuer, ObjectEntry};

pub use naas_core::{Error, ErrorKind, Result};
