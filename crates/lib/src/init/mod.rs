//! Scaffold a new project.
//!
//! `fhs init` writes a `flake.lua` entrypoint, one example component per
//! class and a `.luarc.json` for LuaLS. Nothing is ever overwritten: if any
//! target file exists the whole scaffold is refused before writing.

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use templates::{LUARC_JSON_TEMPLATE, SCAFFOLD_FILES};

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {}", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to canonicalize path {}: {source}", path.display())]
  Canonicalize { path: PathBuf, source: std::io::Error },
}

/// Result of a successful initialization.
#[derive(Debug)]
pub struct InitResult {
  /// The project directory (canonicalized)
  pub project_dir: PathBuf,
  /// Every file written, in write order
  pub files: Vec<PathBuf>,
}

fn write_file(path: &Path, content: &str) -> Result<(), InitError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| InitError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, content).map_err(|source| InitError::WriteFile {
    path: path.to_path_buf(),
    source,
  })
}

/// Initialize a project in `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`InitError::PathExists`] if any scaffold file is already present.
pub fn init(dir: &Path) -> Result<InitResult, InitError> {
  fs::create_dir_all(dir).map_err(|source| InitError::CreateDir {
    path: dir.to_path_buf(),
    source,
  })?;
  let project_dir = dunce::canonicalize(dir).map_err(|source| InitError::Canonicalize {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut targets: Vec<(PathBuf, &str)> = SCAFFOLD_FILES
    .iter()
    .map(|(rel, content)| (project_dir.join(rel), *content))
    .collect();
  targets.push((project_dir.join(".luarc.json"), LUARC_JSON_TEMPLATE));

  if let Some((path, _)) = targets.iter().find(|(path, _)| path.exists()) {
    return Err(InitError::PathExists { path: path.clone() });
  }

  let mut files = Vec::with_capacity(targets.len());
  for (path, content) in targets {
    write_file(&path, content)?;
    debug!(path = %path.display(), "wrote scaffold file");
    files.push(path);
  }

  Ok(InitResult { project_dir, files })
}
