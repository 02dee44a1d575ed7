//! Staged utility loader.
//!
//! Utility namespaces are built in three tiers per utilities root:
//!
//! - Tier0 `utils/*.lua`: plain tables, no arguments.
//! - Tier1 `utils/more/*.lua`: functions called with `{ lib }`.
//! - Tier2 `utils/more/more/*.lua`: functions called with `{ lib, pkgs }`.
//!
//! Each tier's files see the names merged by earlier tiers of the same root
//! as an enclosing scope. Tiers only ever move forward: a [`BaseUtilities`]
//! must be given a stdlib to become [`StdlibUtilities`], which must be given
//! a package resolver to become [`ResolvedUtilities`]. Every root runs its
//! own pipeline; the per-root namespaces are merged in root order with the
//! later root winning.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::debug;

use crate::consts::{LUA_EXT, MORE_DIR, UTILITIES_DIR};
use crate::discover::ComponentClass;
use crate::error::ComposeError;
use crate::fs;
use crate::lua::loaders;
use crate::namespace::{self, Namespace, merge_over, union_for};

/// One utilities root and everything its pipeline has merged so far.
#[derive(Debug, Clone)]
struct RootStage {
  dir: PathBuf,
  namespace: Namespace,
}

fn tier_dir(dir: &Path, tier: usize) -> PathBuf {
  (0..tier).fold(dir.to_path_buf(), |d, _| d.join(MORE_DIR))
}

fn tier_files(dir: &Path, tier: usize) -> Result<Vec<PathBuf>, ComposeError> {
  Ok(fs::files_with_suffix(fs::list_files(&tier_dir(dir, tier))?, LUA_EXT))
}

fn malformed(path: &Path, reason: String) -> ComposeError {
  ComposeError::Malformed {
    class: ComponentClass::Utilities,
    name: fs::stem(path),
    path: path.to_path_buf(),
    reason,
  }
}

fn table_namespace(path: &Path, value: LuaValue, tier: usize) -> Result<Namespace, ComposeError> {
  match value {
    LuaValue::Table(t) => Ok(namespace::from_table(&t)?),
    other => Err(malformed(
      path,
      format!("tier {} utility must produce a table, got {}", tier, other.type_name()),
    )),
  }
}

fn load_tier0(lua: &Lua, dir: &Path) -> Result<Namespace, ComposeError> {
  union_for(tier_files(dir, 0)?, |file| -> Result<Namespace, ComposeError> {
    debug!(path = %file.display(), "loading tier 0 utility");
    let value = loaders::import_file(lua, &file).map_err(|e| malformed(&file, e.to_string()))?;
    table_namespace(&file, value, 0)
  })
}

/// Run one function tier of a root and merge it over what the root has so far.
fn advance(lua: &Lua, stage: RootStage, tier: usize, args: &LuaTable) -> Result<RootStage, ComposeError> {
  let scope = namespace::to_table(lua, &stage.namespace)?;

  let added = union_for(tier_files(&stage.dir, tier)?, |file| -> Result<Namespace, ComposeError> {
    debug!(path = %file.display(), tier, "loading utility");
    let value = loaders::import_scoped(lua, &file, &scope).map_err(|e| malformed(&file, e.to_string()))?;
    let f = match value {
      LuaValue::Function(f) => f,
      other => {
        return Err(malformed(
          &file,
          format!("tier {} utility must be a function, got {}", tier, other.type_name()),
        ));
      }
    };
    let produced = f.call::<LuaValue>(args.clone()).map_err(|source| ComposeError::Invocation {
      class: ComponentClass::Utilities,
      name: fs::stem(&file),
      source,
    })?;
    table_namespace(&file, produced, tier)
  })?;

  Ok(RootStage {
    namespace: merge_over(&stage.namespace, &added),
    dir: stage.dir,
  })
}

/// Merge per-root namespaces; each root overrides everything before it.
fn merge_stages(stages: &[RootStage]) -> Namespace {
  match stages {
    [] => Namespace::new(),
    [earlier @ .., last] => merge_over(&merge_stages(earlier), &last.namespace),
  }
}

/// Tier0 utilities of every root.
#[derive(Debug, Clone)]
pub struct BaseUtilities {
  stages: Vec<RootStage>,
}

impl BaseUtilities {
  /// Load `<root>/utils/*.lua` for each root. Roots without a utilities
  /// directory contribute nothing.
  pub fn load(lua: &Lua, roots: &[PathBuf]) -> Result<Self, ComposeError> {
    let mut stages = Vec::with_capacity(roots.len());
    for root in roots {
      let dir = root.join(UTILITIES_DIR);
      let namespace = load_tier0(lua, &dir)?;
      stages.push(RootStage { dir, namespace });
    }
    Ok(Self { stages })
  }

  pub fn namespace(&self) -> Namespace {
    merge_stages(&self.stages)
  }

  /// Run Tier1 with `{ lib = stdlib }`.
  pub fn with_stdlib(self, lua: &Lua, stdlib: &LuaTable) -> Result<StdlibUtilities, ComposeError> {
    let args = lua.create_table()?;
    args.set("lib", stdlib.clone())?;

    let stages = self
      .stages
      .into_iter()
      .map(|stage| advance(lua, stage, 1, &args))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(StdlibUtilities {
      stages,
      stdlib: stdlib.clone(),
    })
  }
}

/// Tier0 + Tier1 utilities.
#[derive(Debug, Clone)]
pub struct StdlibUtilities {
  stages: Vec<RootStage>,
  stdlib: LuaTable,
}

impl StdlibUtilities {
  pub fn namespace(&self) -> Namespace {
    merge_stages(&self.stages)
  }

  /// Run Tier2 with `{ lib, pkgs = package_resolver }`.
  pub fn with_package_resolver(self, lua: &Lua, package_resolver: &LuaTable) -> Result<ResolvedUtilities, ComposeError> {
    let args = lua.create_table()?;
    args.set("lib", self.stdlib.clone())?;
    args.set("pkgs", package_resolver.clone())?;

    let stages = self
      .stages
      .into_iter()
      .map(|stage| advance(lua, stage, 2, &args))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedUtilities { stages })
  }

  /// Finish without a package resolver. Fails if any root has Tier2 files,
  /// since those cannot be built without one.
  pub fn without_package_resolver(self) -> Result<Namespace, ComposeError> {
    for stage in &self.stages {
      if let Some(file) = tier_files(&stage.dir, 2)?.into_iter().next() {
        return Err(ComposeError::MissingCapability {
          capability: "pkgs",
          path: file,
        });
      }
    }
    Ok(self.namespace())
  }
}

/// All three tiers.
#[derive(Debug, Clone)]
pub struct ResolvedUtilities {
  stages: Vec<RootStage>,
}

impl ResolvedUtilities {
  pub fn namespace(&self) -> Namespace {
    merge_stages(&self.stages)
  }
}
