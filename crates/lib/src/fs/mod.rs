//! Filesystem primitives used by discovery.
//!
//! Absence is never an error here: listing a directory that does not exist
//! yields an empty sequence. Entries are returned sorted by name and hidden
//! entries (leading `.`) are skipped so that every run sees the same order.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::consts::HIDDEN_MARKER;

#[derive(Debug, Error)]
pub enum FsError {
  #[error("failed to read directory {}: {source}", path.display())]
  ReadDir { path: PathBuf, source: std::io::Error },

  #[error("failed to walk {}: {source}", path.display())]
  Walk { path: PathBuf, source: walkdir::Error },
}

pub fn path_exists(path: &Path) -> bool {
  path.exists()
}

fn is_hidden(name: &str) -> bool {
  name.starts_with(HIDDEN_MARKER)
}

fn list_entries(dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>, FsError> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let read = fs::read_dir(dir).map_err(|source| FsError::ReadDir {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut entries = Vec::new();
  for entry in read {
    let entry = entry.map_err(|source| FsError::ReadDir {
      path: dir.to_path_buf(),
      source,
    })?;
    let name = entry.file_name();
    if is_hidden(&name.to_string_lossy()) {
      continue;
    }
    let path = entry.path();
    // Follow symlinks so linked component dirs are discovered like real ones.
    if path.is_dir() == want_dirs {
      entries.push(path);
    }
  }

  entries.sort();
  Ok(entries)
}

/// Immediate, non-hidden subdirectories of `dir`.
pub fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
  list_entries(dir, true)
}

/// Immediate, non-hidden files of `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
  list_entries(dir, false)
}

/// Keep only paths whose file name ends in `.{ext}`.
pub fn files_with_suffix(paths: Vec<PathBuf>, ext: &str) -> Vec<PathBuf> {
  paths
    .into_iter()
    .filter(|p| p.extension().is_some_and(|e| e == ext))
    .collect()
}

/// File name without its extension.
pub fn stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// File or directory name.
pub fn base_name(path: &Path) -> String {
  path
    .file_name()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Recursively find subdirectories of `dir` (excluding `dir` itself) that
/// contain a file named `marker`. Hidden directories are not descended into.
pub fn find_dirs_containing(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, FsError> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let walker = WalkDir::new(dir)
    .min_depth(1)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| !is_hidden(&e.file_name().to_string_lossy()));

  let mut found = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|source| FsError::Walk {
      path: dir.to_path_buf(),
      source,
    })?;
    if entry.file_type().is_dir() && entry.path().join(marker).is_file() {
      found.push(entry.into_path());
    }
  }
  Ok(found)
}
