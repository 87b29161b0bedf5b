//! File metadata probe

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::FileError;
use crate::http::date::truncate_to_seconds;

/// A file selected for delivery, as seen at the start of the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Path as the client named it
    pub requested_path: String,
    pub canonical_path: PathBuf,
    pub size: u64,
    /// Modification time, whole seconds
    pub last_modified: DateTime<Utc>,
    pub is_regular_file: bool,
}

/// Stat `canonical_path`
///
/// A path that vanished since it was resolved is reported as not found.
/// Directories and special files cannot be served.
pub async fn probe(canonical_path: PathBuf, requested_path: &str) -> Result<Resource, FileError> {
    let resource = stat(canonical_path, requested_path).await?;
    if !resource.is_regular_file {
        return Err(FileError::NotAFile(resource.canonical_path));
    }
    Ok(resource)
}

/// Stat without judging the file type
pub async fn stat(canonical_path: PathBuf, requested_path: &str) -> Result<Resource, FileError> {
    let Ok(metadata) = fs::metadata(&canonical_path).await else {
        return Err(FileError::NotFound(requested_path.to_string()));
    };

    // Platforms without mtime support report the epoch
    let last_modified = metadata
        .modified()
        .map(truncate_to_seconds)
        .unwrap_or_default();

    Ok(Resource {
        requested_path: requested_path.to_string(),
        canonical_path,
        size: metadata.len(),
        last_modified,
        is_regular_file: metadata.is_file(),
    })
}

impl Resource {
    /// File name used for display and content type lookup
    pub fn file_name(&self) -> &Path {
        self.canonical_path
            .file_name()
            .map_or(self.canonical_path.as_path(), Path::new)
    }
}
