//! Tree walk: pre-order, name-sorted list of [`FileEntry`] under a root.
//!
//! Hidden and excluded directories are pruned, oversized files are dropped. Hidden files are kept here
//! and filtered by pagination so the walk stays a faithful listing.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::FileEntry;
use crate::engine::tools::{is_excluded_dir, is_hidden, path_relative_to};
use crate::utils::config::{PackagePaths, SizeConsts};

/// Single-threaded, depth-first walker. Ordering is an invariant consumed by pagination and the index.
#[derive(Clone, Debug)]
pub struct TreeWalker {
    exclude: Vec<String>,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl TreeWalker {
    /// Walker excluding the package defaults (`node_modules`, `vendor`) plus `extra` patterns.
    pub fn new(extra: &[String]) -> Self {
        let mut exclude = PackagePaths::get().default_exclude_patterns();
        exclude.extend(extra.iter().cloned());
        Self { exclude }
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude
    }

    /// True when the walk descends into (or lists) `entry`. Patterns see the path relative to `root`.
    fn keep_dir(&self, entry: &DirEntry, root: &Path) -> bool {
        // The root itself may well be a dot-dir (temp dirs are).
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let rel = path_relative_to(entry.path(), root).unwrap_or_else(|| entry.path().to_path_buf());
        !is_hidden(entry.path()) && !is_excluded_dir(&rel, &self.exclude)
    }

    /// List everything under `root`. Any unreadable entry aborts the walk.
    pub fn walk(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let iter = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.keep_dir(e, root));

        for result in iter {
            let entry = result.map_err(|err| {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                anyhow::anyhow!("cannot read {}: {}", path, err)
            })?;
            if let Some(file_entry) = self.to_file_entry(&entry)? {
                entries.push(file_entry);
            }
        }
        debug!("walk: {} entries under {}", entries.len(), root.display());
        Ok(entries)
    }

    fn to_file_entry(&self, entry: &DirEntry) -> Result<Option<FileEntry>> {
        let depth = entry.depth() - 1;
        let path: PathBuf = entry.path().to_path_buf();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            return Ok(Some(FileEntry {
                path,
                depth,
                is_dir: true,
            }));
        }

        let meta = if file_type.is_symlink() {
            // Unfollowed link: only keep it when it points at a regular file.
            match std::fs::metadata(&path) {
                Ok(m) if m.is_file() => m,
                _ => {
                    debug!("walk: skipping link {}", path.display());
                    return Ok(None);
                }
            }
        } else {
            entry
                .metadata()
                .with_context(|| format!("read metadata of {}", path.display()))?
        };

        if SizeConsts::is_oversized(meta.len()) {
            debug!(
                "walk: skipping {} ({} bytes over the file ceiling)",
                path.display(),
                meta.len()
            );
            return Ok(None);
        }
        Ok(Some(FileEntry {
            path,
            depth,
            is_dir: false,
        }))
    }
}

/// Walk `root` with the default exclusions plus `exclude`.
pub fn walk_tree(root: &Path, exclude: &[String]) -> Result<Vec<FileEntry>> {
    TreeWalker::new(exclude).walk(root)
}
