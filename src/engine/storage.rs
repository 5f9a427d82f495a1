//! Transient artifact storage: output root lifecycle, path derivation, write and delete.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use crate::ItemDescriptor;

/// Reference to a freshly fetched payload on local storage.
///
/// Inert once [`remove`](Self::remove) has succeeded: a second removal is an error.
#[derive(Debug)]
pub struct ArtifactHandle {
    path: PathBuf,
    name: String,
    category: String,
    removed: AtomicBool,
}

impl ArtifactHandle {
    pub fn new(path: PathBuf, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            path,
            name: name.into(),
            category: category.into(),
            removed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the descriptor this artifact was fetched for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Delete the backing file. Fails if this handle already removed it.
    pub fn remove(&self) -> Result<()> {
        if self.removed.swap(true, Ordering::AcqRel) {
            anyhow::bail!("artifact already removed: {}", self.path.display());
        }
        if let Err(e) = fs::remove_file(&self.path) {
            // Allow a retry after a failed delete.
            self.removed.store(false, Ordering::Release);
            return Err(e).with_context(|| format!("remove artifact {}", self.path.display()));
        }
        Ok(())
    }
}

/// Owns the output root. All fetch tasks write under it; only the cleanup consumer deletes.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    extension: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the output root if present and create it empty.
    pub fn prepare(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("clear output root {}", self.root.display()))?;
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create output root {}", self.root.display()))
    }

    /// `root/<category>/<name>.<ext>`. Deterministic per descriptor; components cannot escape the root.
    pub fn path_for(&self, item: &ItemDescriptor) -> PathBuf {
        let file = if self.extension.is_empty() {
            sanitize_component(&item.name)
        } else {
            format!("{}.{}", sanitize_component(&item.name), self.extension)
        };
        self.root.join(sanitize_component(&item.category)).join(file)
    }

    /// Write `bytes` to the descriptor's path, creating intermediate directories.
    pub fn persist(&self, item: &ItemDescriptor, bytes: &[u8]) -> Result<ArtifactHandle> {
        let path = self.path_for(item);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create artifact dir {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("write artifact {}", path.display()))?;
        Ok(ArtifactHandle::new(path, &item.name, &item.category))
    }

    /// Files (not directories) currently under the root.
    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        if !self.root.exists() {
            return Vec::new();
        }
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }
}

/// Make a single path component from arbitrary text: separators and parent refs are replaced.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}
