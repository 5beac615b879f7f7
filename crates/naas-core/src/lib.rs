#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

//! # Naas Core
//!
//! Foundation types shared by every naas client crate: the storage error
//! taxonomy, object-key normalization rules, and content-type inference.
//! Nothing in this crate performs network or disk IO.

mod content;
mod error;
mod key;

pub use content::content_type_for;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use key::{normalize_key, resolve_download_path, resolve_upload_key};
