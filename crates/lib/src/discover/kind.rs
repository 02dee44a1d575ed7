use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::{ENTRY_FILE, MODULE_LOGIC_FILE, MODULE_SCHEMA_FILE};

/// Authoring style of a module directory, decided once from its marker files.
///
/// An entry file takes precedence over a schema file when both exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModuleKind {
  /// `default.lua` is a complete module.
  Unguarded { entry: PathBuf },
  /// `options.lua` only: contributes option declarations.
  SchemaOnly { schema: PathBuf },
  /// `options.lua` plus `config.lua` guarded by the enable flag.
  SchemaAndLogic { schema: PathBuf, logic: PathBuf },
  /// No marker file; contributes nothing.
  Empty,
}

impl ModuleKind {
  pub fn detect(dir: &Path) -> Self {
    let entry = dir.join(ENTRY_FILE);
    if entry.is_file() {
      return Self::Unguarded { entry };
    }

    let schema = dir.join(MODULE_SCHEMA_FILE);
    if !schema.is_file() {
      return Self::Empty;
    }

    let logic = dir.join(MODULE_LOGIC_FILE);
    if logic.is_file() {
      Self::SchemaAndLogic { schema, logic }
    } else {
      Self::SchemaOnly { schema }
    }
  }

  /// Files this module contributes, in load order.
  pub fn imports(&self) -> Vec<PathBuf> {
    match self {
      Self::Unguarded { entry } => vec![entry.clone()],
      Self::SchemaOnly { schema } => vec![schema.clone()],
      Self::SchemaAndLogic { schema, logic } => vec![schema.clone(), logic.clone()],
      Self::Empty => Vec::new(),
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Empty)
  }
}
