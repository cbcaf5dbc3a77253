//! In-memory output tree, flushed to disk only where content changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Generated files keyed by path relative to the output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    files: BTreeMap<PathBuf, String>,
}

/// What a flush did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushStats {
    /// Files created or rewritten, relative to the output directory.
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
}

impl OutputFiles {
    /// Append text to a file, creating it empty first.
    pub fn append(&mut self, path: impl Into<PathBuf>, text: &str) {
        self.files.entry(path.into()).or_default().push_str(text);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file below `dir` whose on-disk content differs.
    pub fn write_to(&self, dir: &Path) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        for (rel, text) in &self.files {
            let path = dir.join(rel);
            if std::fs::read(&path).is_ok_and(|old| old == text.as_bytes()) {
                debug!(path = %path.display(), "unchanged");
                stats.unchanged += 1;
                continue;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = text.len(), "updated");
            stats.written.push(rel.clone());
        }
        Ok(stats)
    }
}
