//! Check composer.
//!
//! `checks/<name>.lua` files and any `checks/**/` directory holding a
//! `default.lua` are both checks. Each mode is gathered across all roots
//! with the later root winning a name, then a directory check is dropped
//! whenever any file check claims its name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::{debug, info};

use super::invoke_component;
use crate::consts::{CHECKS_DIR, ENTRY_FILE, LUA_EXT};
use crate::context::PlatformContext;
use crate::discover::ComponentClass;
use crate::error::ComposeError;
use crate::fs::{self, FsError};
use crate::namespace::Namespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSource {
  pub name: String,
  /// File that is imported and invoked.
  pub entry: PathBuf,
}

fn file_mode(dir: &Path) -> Result<Vec<CheckSource>, FsError> {
  Ok(
    fs::files_with_suffix(fs::list_files(dir)?, LUA_EXT)
      .into_iter()
      .filter(|f| fs::base_name(f) != ENTRY_FILE)
      .map(|entry| CheckSource {
        name: fs::stem(&entry),
        entry,
      })
      .collect(),
  )
}

fn relative_name(base: &Path, dir: &Path) -> String {
  dir
    .strip_prefix(base)
    .unwrap_or(dir)
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join("/")
}

fn dir_mode(dir: &Path) -> Result<Vec<CheckSource>, FsError> {
  Ok(
    fs::find_dirs_containing(dir, ENTRY_FILE)?
      .into_iter()
      .map(|found| CheckSource {
        name: relative_name(dir, &found),
        entry: found.join(ENTRY_FILE),
      })
      .collect(),
  )
}

fn gather(
  roots: &[PathBuf],
  mode: fn(&Path) -> Result<Vec<CheckSource>, FsError>,
) -> Result<BTreeMap<String, CheckSource>, FsError> {
  let mut by_name = BTreeMap::new();
  for root in roots {
    for check in mode(&root.join(CHECKS_DIR))? {
      by_name.insert(check.name.clone(), check);
    }
  }
  Ok(by_name)
}

/// Effective checks across roots: file checks first, then the directory
/// checks whose names no file check claimed.
pub fn discover_checks(roots: &[PathBuf]) -> Result<Vec<CheckSource>, FsError> {
  let files = gather(roots, file_mode)?;
  let dirs = gather(roots, dir_mode)?;

  let mut kept = Vec::with_capacity(dirs.len());
  for (name, check) in dirs {
    if files.contains_key(&name) {
      debug!(%name, entry = %check.entry.display(), "directory check shadowed by file check");
      continue;
    }
    kept.push(check);
  }

  let checks = files.into_values().chain(kept).collect();
  Ok(checks)
}

pub fn compose_checks(lua: &Lua, ctx: &PlatformContext) -> Result<Namespace, ComposeError> {
  let mut out = Namespace::new();
  for check in discover_checks(&ctx.roots)? {
    let artifact = invoke_component(lua, ComponentClass::Checks, &check.name, &check.entry, ctx.args(lua)?)?;
    out.insert(check.name, artifact);
  }
  info!(system = %ctx.platform, count = out.len(), "composed checks");
  Ok(out)
}
