//! File-based content collection (e.g. a directory of Markdown posts).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use super::ContentSource;
use crate::config::default_extensions;
use crate::error::ContentSourceError;
use crate::types::Fingerprint;

/// Fingerprints every matching file under a root directory.
///
/// The digest covers each file's path relative to the root and its bytes,
/// in file-name order, so adding, removing, renaming or editing a post all
/// change the fingerprint. Files with other extensions are ignored.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    name: String,
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    /// Watches `root` with the default extensions (`md`, `mdx`, `json`,
    /// `yaml`, `yml`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extensions(root, default_extensions())
    }

    /// Watches `root`, counting only files whose extension is in
    /// `extensions` (compared case-insensitively, without the dot).
    pub fn with_extensions(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let root = root.into();
        Self {
            name: format!("dir:{}", root.display()),
            root,
            extensions: extensions
                .into_iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fingerprint(&self) -> Result<Fingerprint, ContentSourceError> {
        let root = self.root.clone();
        let extensions = self.extensions.clone();
        tokio::task::spawn_blocking(move || digest_directory(&root, &extensions))
            .await
            .map_err(|e| ContentSourceError::unavailable(format!("digest task failed: {e}")))?
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|wanted| *wanted == ext)
        })
        .unwrap_or(false)
}

fn digest_directory(root: &Path, extensions: &[String]) -> Result<Fingerprint, ContentSourceError> {
    let meta = std::fs::metadata(root)?;
    if !meta.is_dir() {
        return Err(ContentSourceError::unavailable(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut hasher = Sha256::new();
    let mut files = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = std::fs::read(entry.path())?;

        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
        files += 1;
    }

    debug!(root = %root.display(), files, "Digested content directory");
    Ok(Fingerprint::new(hex::encode(hasher.finalize())))
}
