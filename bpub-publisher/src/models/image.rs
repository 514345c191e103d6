//! Locally staged image files referenced by image markers
//!
//! Staging and cleanup of the files is the producer's job; this module only
//! resolves a reference into a path + MIME type.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Image reference as supplied by the producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub path: PathBuf,
    /// Sniffed from the file content when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

/// Resolved image: file path plus MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub mime: String,
}

impl ImageAsset {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime: mime.into(),
        }
    }

    /// Resolve a producer reference, sniffing the MIME type if needed
    ///
    /// Never fails: an unreadable or unrecognised file gets the generic
    /// binary MIME type and is reported later, at upload time.
    pub fn resolve(spec: &ImageSpec) -> Self {
        let mime = match &spec.mime {
            Some(mime) if !mime.trim().is_empty() => mime.clone(),
            _ => sniff_mime(&spec.path),
        };
        Self::new(spec.path.clone(), mime)
    }

    /// True when the file is present on disk
    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// True when the MIME type denotes an image
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

fn sniff_mime(path: &Path) -> String {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.mime_type().to_string(),
        Ok(None) => {
            tracing::warn!(path = %path.display(), "Unrecognised image content");
            FALLBACK_MIME.to_string()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not read image for MIME sniffing"
            );
            FALLBACK_MIME.to_string()
        }
    }
}
