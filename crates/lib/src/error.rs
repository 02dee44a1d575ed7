//! Composition errors.
//!
//! Absent directories are not errors; they never reach this type. Everything
//! here aborts the category being composed.

use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;

use crate::discover::ComponentClass;
use crate::fs::FsError;

#[derive(Debug, Error)]
pub enum ComposeError {
  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),

  /// The component's file failed to load or produced an unexpected shape.
  #[error("malformed {class} component '{name}' ({}): {reason}", path.display())]
  Malformed {
    class: ComponentClass,
    name: String,
    path: PathBuf,
    reason: String,
  },

  /// A file the component's layout requires does not exist.
  #[error("{class} component '{name}' is missing {}", path.display())]
  MissingFile {
    class: ComponentClass,
    name: String,
    path: PathBuf,
  },

  /// Invoking a loaded component raised an error.
  #[error("{class} component '{name}' failed: {source}")]
  Invocation {
    class: ComponentClass,
    name: String,
    source: LuaError,
  },

  /// A utility tier needs a handle the composition cannot provide.
  #[error("{} needs `{capability}` but no {capability} handle is configured", path.display())]
  MissingCapability { capability: &'static str, path: PathBuf },

  /// The configured stdlib or package source is unusable.
  #[error("invalid `{handle}` handle ({}): {reason}", path.display())]
  InvalidHandle {
    handle: &'static str,
    path: PathBuf,
    reason: String,
  },

  #[error("platform '{0}' is not among the supported systems")]
  UnsupportedPlatform(String),

  /// The configuration evaluator rejected a profile.
  #[error("evaluating profile '{profile}' failed: {reason}")]
  Evaluator { profile: String, reason: String },
}
