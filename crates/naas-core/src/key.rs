//! Object-key normalization and destination defaulting.
//!
//! Storage keys are slash-delimited paths supplied by users, so they arrive
//! with stray quote characters (shell escaping artifacts) and doubled
//! slashes. Every key crosses through [`normalize_key`] before it is used
//! against a backing store.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Normalizes a slash-delimited object key.
///
/// Strips `"` characters, collapses runs of `/` into a single one, and
/// removes a leading `/`. A trailing `/` is preserved because it marks a
/// folder-style destination for [`resolve_upload_key`]. Idempotent.
pub fn normalize_key(raw: &str) -> String {
    let cleaned = raw.replace('"', "");
    let trailing = cleaned.ends_with('/');
    let mut key = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if trailing && !key.is_empty() {
        key.push('/');
    }
    key
}

/// Resolves the final object key for an upload.
///
/// If `dst_key` is empty, `.`, or ends with `/`, the destination defaults
/// to the source file's basename inside that folder, mirroring `cp` into a
/// directory.
///
/// # Errors
///
/// Returns [`ErrorKind::FileNotFound`](crate::ErrorKind::FileNotFound) if
/// the source path has no file name to default to.
pub fn resolve_upload_key(dst_key: &str, src_path: &Path) -> Result<String> {
    let key = normalize_key(dst_key);

    if !key.is_empty() && key != "." && !key.ends_with('/') {
        return Ok(key);
    }

    let basename = file_name(src_path)?;
    if key.is_empty() || key == "." {
        Ok(basename)
    } else {
        Ok(format!("{key}{basename}"))
    }
}

/// Resolves the local destination path for a download.
///
/// `.`, an empty destination, or a trailing separator all default to the
/// object key's basename, placed inside the named directory when one was
/// given.
///
/// # Errors
///
/// Returns [`ErrorKind::BadRequest`](crate::ErrorKind::BadRequest) if the
/// object key itself ends with `/` (a folder marker, not an object).
pub fn resolve_download_path(dst_path: &str, src_key: &str) -> Result<PathBuf> {
    let key = normalize_key(src_key);
    if key.is_empty() || key.ends_with('/') {
        return Err(Error::bad_request().with_message(format!("'{src_key}' is not an object")));
    }

    let basename = key.rsplit('/').next().unwrap_or(&key).to_owned();

    if dst_path.is_empty() || dst_path == "." {
        return Ok(PathBuf::from(basename));
    }
    if dst_path.ends_with('/') || dst_path.ends_with(std::path::MAIN_SEPARATOR) {
        return Ok(Path::new(dst_path).join(basename));
    }
    Ok(PathBuf::from(dst_path))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::file_not_found().with_message(format!("'{}' has no file name", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_slashes() {
        assert_eq!(normalize_key("a//b///c"), "a/b/c");
        assert_eq!(normalize_key("a/b/c"), "a/b/c");
    }

    #[test]
    fn test_normalize_strips_quotes() {
        assert_eq!(normalize_key("\"a/b\""), "a/b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_key("//a//\"b\"//");
        assert_eq!(normalize_key(&once), once);
    }

    #[test]
    fn test_normalize_keeps_trailing_slash() {
        assert_eq!(normalize_key("folder//"), "folder/");
    }

    #[test]
    fn test_upload_key_explicit_destination() {
        let key = resolve_upload_key("2024/report.csv", Path::new("/tmp/data.csv")).unwrap();
        assert_eq!(key, "2024/report.csv");
    }

    #[test]
    fn test_upload_key_defaults_into_folder() {
        let key = resolve_upload_key("folder/", Path::new("/tmp/report.csv")).unwrap();
        assert_eq!(key, "folder/report.csv");
    }

    #[test]
    fn test_upload_key_dot_defaults_to_basename() {
        let key = resolve_upload_key(".", Path::new("/tmp/report.csv")).unwrap();
        assert_eq!(key, "report.csv");
        let key = resolve_upload_key("", Path::new("/tmp/report.csv")).unwrap();
        assert_eq!(key, "report.csv");
    }

    #[test]
    fn test_upload_key_requires_source_basename() {
        let err = resolve_upload_key(".", Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FileNotFound);
    }

    #[test]
    fn test_download_path_defaults_to_basename() {
        let path = resolve_download_path(".", "2024/invoice.pdf").unwrap();
        assert_eq!(path, PathBuf::from("invoice.pdf"));
    }

    #[test]
    fn test_download_path_into_directory() {
        let path = resolve_download_path("out/", "2024/invoice.pdf").unwrap();
        assert_eq!(path, PathBuf::from("out/invoice.pdf"));
    }

    #[test]
    fn test_download_path_explicit_file() {
        let path = resolve_download_path("copy.pdf", "2024/invoice.pdf").unwrap();
        assert_eq!(path, PathBuf::from("copy.pdf"));
    }

    #[test]
    fn test_download_rejects_folder_keys() {
        let err = resolve_download_path(".", "2024/").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BadRequest);
    }
}
