//! Checks applied to data leaving the application
//!
//! Internal URLs must not be offered to other applications as links, and
//! promised file names must not escape the directory they are written to.

use crate::error::{Error, Result};

/// URL schemes that only make sense inside this application
const INTERNAL_ONLY_SCHEMES: &[&str] = &[
    "about",
    "blob",
    "chrome",
    "imap",
    "javascript",
    "mailbox",
    "moz-anno",
    "news",
    "page-icon",
    "resource",
    "view-source",
    "moz-extension",
];

/// Check whether a URL may be exported to another application as a link
pub fn can_export_as_url(url: &str) -> bool {
    let url = url.trim_start();
    let Some((scheme, _)) = url.split_once(':') else {
        return true;
    };
    let scheme = scheme.to_ascii_lowercase();
    if INTERNAL_ONLY_SCHEMES.contains(&scheme.as_str()) {
        tracing::debug!("rejected URL scheme {}", scheme);
        return false;
    }
    true
}

/// Validate a promised file name before it is joined to a directory
pub fn validate_file_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::UnsafeFileName(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        tracing::warn!("rejected promised file name with path separator: {}", name);
        return Err(Error::UnsafeFileName(name.to_string()));
    }
    Ok(name)
}
