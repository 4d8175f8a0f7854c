//! Runtime-asset provisioning.
//!
//! The engine expects its data files in a private writable location before
//! startup. `start()` runs the provider once per launch; shipped assets are
//! copied only where the destination file does not already exist, so user
//! edits survive restarts.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Host-provided hook that materializes a named asset directory into `dest`.
pub trait AssetProvider: Send + Sync + 'static {
    fn ensure(&self, name: &str, dest: &Path) -> Result<()>;
}

/// Filesystem provider: copies `source_root/<name>` into `dest/<name>`,
/// skipping files that already exist.
pub struct DirAssetProvider {
    source_root: std::path::PathBuf,
}

impl DirAssetProvider {
    pub fn new(source_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }
}

impl AssetProvider for DirAssetProvider {
    fn ensure(&self, name: &str, dest: &Path) -> Result<()> {
        let src = self.source_root.join(name);
        copy_if_missing(&src, &dest.join(name))
    }
}

fn copy_if_missing(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)
            .with_context(|| format!("creating asset dir {}", dest.display()))?;
        for entry in
            fs::read_dir(src).with_context(|| format!("reading asset dir {}", src.display()))?
        {
            let entry = entry?;
            copy_if_missing(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else if !dest.exists() {
        debug!(src = %src.display(), dest = %dest.display(), "copying asset");
        fs::copy(src, dest)
            .with_context(|| format!("copying asset {} -> {}", src.display(), dest.display()))?;
    }
    Ok(())
}
