//! Path and filter utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Stable, forward-slash id for a path under `root`. Used as anchor and section header.
pub fn path_to_id(path: &Path, root: &Path) -> String {
    let rel = path_relative_to(path, root).unwrap_or_else(|| path.to_path_buf());
    rel.to_string_lossy().replace('\\', "/")
}

/// Base name of `path`, or empty when it has none.
pub fn base_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Hidden means the base name starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    base_name(path).starts_with('.')
}

/// Extension without the dot, or None for `Makefile`, `.bashrc`, `dir.`.
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Returns true if a directory at `path` matches any exclusion pattern.
/// Plain patterns match as substrings of the full path; `*`/`?` patterns are globs against the name or the path.
pub fn is_excluded_dir(path: &Path, exclude_patterns: &[String]) -> bool {
    let name = base_name(path);
    let path_str = path.to_string_lossy();
    exclude_patterns.iter().any(|pattern| {
        if pattern.contains(['*', '?']) {
            glob_match(pattern, name) || glob_match(pattern, &path_str)
        } else {
            !pattern.is_empty() && path_str.contains(pattern.as_str())
        }
    })
}

/// Simple glob pattern matching (supports * and ?)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_chars(&pattern, &text)
}

fn glob_match_chars(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => {
            // trailing * matches everything
            rest.is_empty() || (0..=text.len()).any(|i| glob_match_chars(rest, &text[i..]))
        }
        Some(('?', rest)) => !text.is_empty() && glob_match_chars(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && glob_match_chars(rest, &text[1..]),
    }
}

/// Split a comma-separated extension list, dropping blanks and leading dots.
pub fn split_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Path of part `part_number` derived from `base`: `book.pdf` → `book-2.pdf`. 0 keeps `base`.
pub fn numbered_path(base: &Path, part_number: usize, ext: &str) -> PathBuf {
    let base = base.with_extension(ext);
    if part_number == 0 {
        return base;
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.with_file_name(format!("{stem}-{part_number}.{ext}"))
}

/// Default artifact base: the root directory's name in the working directory.
pub fn default_output_for(root: &Path, ext: &str) -> PathBuf {
    let name = root
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    PathBuf::from(format!("{name}.{ext}"))
}

/// Default title: the root directory's name.
pub fn default_title_for(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .map(base_name)
        .filter(|n| !n.is_empty())
        .unwrap_or("repobook")
        .to_string()
}

pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("canonicalize {}", path.display()))?;
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }
    Ok(path)
}
