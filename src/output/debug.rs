//! Filesystem debug capture

use crate::output::traits::DebugCapture;
use std::path::{Path, PathBuf};

/// Writes captured pages to `<dir>/<key>.html`
#[derive(Debug, Clone)]
pub struct FsDebugCapture {
    dir: PathBuf,
}

impl FsDebugCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.html", safe))
    }

    fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, content)
    }
}

impl DebugCapture for FsDebugCapture {
    fn store(&self, key: &str, content: &str) {
        let path = self.path_for(key);
        match self.write(&path, content) {
            Ok(()) => tracing::info!("Saved debug page to {}", path.display()),
            Err(e) => tracing::warn!("Failed to save debug page {}: {}", path.display(), e),
        }
    }
}
