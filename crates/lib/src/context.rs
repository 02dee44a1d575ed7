//! Per-platform context construction.
//!
//! A [`PlatformContext`] is everything a component invocation sees for one
//! platform: the stdlib handle, the package resolver, the injected utility
//! namespace, the roots and the raw inputs. It is fully determined by
//! `(platform, roots, inputs)` and never changes once built.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::debug;

use crate::error::ComposeError;
use crate::namespace::{self, Namespace};
use crate::platform::Platform;
use crate::utilities::BaseUtilities;

#[derive(Debug, Clone)]
pub struct PlatformContext {
  pub platform: Platform,
  pub stdlib: LuaTable,
  pub package_resolver: Option<LuaTable>,
  pub utilities: Namespace,
  pub roots: Vec<PathBuf>,
  pub inputs: LuaTable,
  pub self_dir: PathBuf,
}

impl PlatformContext {
  pub fn system(&self) -> String {
    self.platform.triple()
  }

  /// Fresh argument table for one invocation:
  /// `{ system, lib, pkgs, utils, roots, inputs, self }`.
  pub fn args(&self, lua: &Lua) -> LuaResult<LuaTable> {
    let args = lua.create_table()?;
    args.set("system", self.system())?;
    args.set("lib", self.stdlib.clone())?;
    args.set("pkgs", self.package_resolver.clone())?;
    args.set("utils", namespace::to_table(lua, &self.utilities)?)?;
    let roots: Vec<String> = self.roots.iter().map(|r| r.to_string_lossy().into_owned()).collect();
    args.set("roots", lua.create_sequence_from(roots)?)?;
    args.set("inputs", self.inputs.clone())?;
    args.set("self", self.self_dir.to_string_lossy().into_owned())?;
    Ok(args)
  }

  /// [`PlatformContext::args`] with `extra` layered on top.
  pub fn args_with(&self, lua: &Lua, extra: &LuaTable) -> LuaResult<LuaTable> {
    let args = self.args(lua)?;
    for pair in extra.pairs::<LuaValue, LuaValue>() {
      let (k, v) = pair?;
      args.set(k, v)?;
    }
    Ok(args)
  }
}

/// Builds [`PlatformContext`]s from the platform-independent pieces of a
/// composition. Cheap to clone; it only holds handles.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
  pub(crate) self_dir: PathBuf,
  pub(crate) roots: Vec<PathBuf>,
  pub(crate) stdlib: LuaTable,
  pub(crate) inputs: LuaTable,
  pub(crate) package_source: Option<(PathBuf, LuaValue)>,
  pub(crate) package_config: LuaValue,
}

impl ContextBuilder {
  pub fn new(self_dir: &Path, roots: Vec<PathBuf>, stdlib: LuaTable, inputs: LuaTable) -> Self {
    Self {
      self_dir: self_dir.to_path_buf(),
      roots,
      stdlib,
      inputs,
      package_source: None,
      package_config: LuaValue::Nil,
    }
  }

  /// Use `source` (loaded from `path`) to produce package resolvers.
  pub fn with_package_source(mut self, path: &Path, source: LuaValue, config: LuaValue) -> Self {
    self.package_source = Some((path.to_path_buf(), source));
    self.package_config = config;
    self
  }

  pub fn roots(&self) -> &[PathBuf] {
    &self.roots
  }

  pub fn stdlib(&self) -> &LuaTable {
    &self.stdlib
  }

  /// Instantiate the package source for `platform`.
  ///
  /// A table source is shared by every platform; a function source is called
  /// with `{ system, config }`.
  pub fn resolve_packages(&self, lua: &Lua, platform: Platform) -> Result<Option<LuaTable>, ComposeError> {
    let Some((path, source)) = &self.package_source else {
      return Ok(None);
    };

    let invalid = |reason: String| ComposeError::InvalidHandle {
      handle: "pkgs",
      path: path.clone(),
      reason,
    };

    let resolved = match source {
      LuaValue::Table(t) => LuaValue::Table(t.clone()),
      LuaValue::Function(f) => {
        let args = lua.create_table()?;
        args.set("system", platform.triple())?;
        args.set("config", self.package_config.clone())?;
        f.call::<LuaValue>(args).map_err(|e| invalid(e.to_string()))?
      }
      other => return Err(invalid(format!("expected a table or function, got {}", other.type_name()))),
    };

    match resolved {
      LuaValue::Table(t) => Ok(Some(t)),
      other => Err(invalid(format!("resolver must be a table, got {}", other.type_name()))),
    }
  }

  /// Build the context for `platform`. `resolver` replaces the configured
  /// package source when given.
  pub fn build(
    &self,
    lua: &Lua,
    platform: Platform,
    resolver: Option<LuaTable>,
  ) -> Result<PlatformContext, ComposeError> {
    let package_resolver = match resolver {
      Some(r) => Some(r),
      None => self.resolve_packages(lua, platform)?,
    };

    let with_lib = BaseUtilities::load(lua, &self.roots)?.with_stdlib(lua, &self.stdlib)?;
    let utilities = match &package_resolver {
      Some(pkgs) => with_lib.with_package_resolver(lua, pkgs)?.namespace(),
      None => with_lib.without_package_resolver()?,
    };
    debug!(%platform, utilities = utilities.len(), "built platform context");

    Ok(PlatformContext {
      platform,
      stdlib: self.stdlib.clone(),
      package_resolver,
      utilities,
      roots: self.roots.clone(),
      inputs: self.inputs.clone(),
      self_dir: self.self_dir.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::arch::Arch;
  use crate::platform::os::Os;
  use std::fs;
  use tempfile::TempDir;

  const LINUX: Platform = Platform {
    arch: Arch::X86_64,
    os: Os::Linux,
  };

  fn builder(lua: &Lua, root: &Path) -> ContextBuilder {
    ContextBuilder::new(
      root,
      vec![root.to_path_buf()],
      lua.create_table().unwrap(),
      lua.create_table().unwrap(),
    )
  }

  #[test]
  fn function_source_receives_system_and_config() -> Result<(), ComposeError> {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let source: LuaValue = lua
      .load("return function(a) return { system = a.system, unfree = a.config.unfree } end")
      .eval()?;
    let config: LuaValue = lua.load("return { unfree = true }").eval()?;

    let ctx = builder(&lua, root.path())
      .with_package_source(&root.path().join("pkgs.lua"), source, config)
      .build(&lua, LINUX, None)?;

    let pkgs = ctx.package_resolver.expect("resolver");
    assert_eq!(pkgs.get::<String>("system")?, "x86_64-linux");
    assert!(pkgs.get::<bool>("unfree")?);
    Ok(())
  }

  #[test]
  fn no_source_means_no_resolver() -> Result<(), ComposeError> {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let ctx = builder(&lua, root.path()).build(&lua, LINUX, None)?;
    assert!(ctx.package_resolver.is_none());
    let args = ctx.args(&lua)?;
    assert!(args.get::<LuaValue>("pkgs")?.is_nil());
    assert_eq!(args.get::<String>("system")?, "x86_64-linux");
    Ok(())
  }

  #[test]
  fn args_are_fresh_per_invocation() -> Result<(), ComposeError> {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let ctx = builder(&lua, root.path()).build(&lua, LINUX, None)?;

    let first = ctx.args(&lua)?;
    first.set("system", "tampered")?;
    let second = ctx.args(&lua)?;
    assert_eq!(second.get::<String>("system")?, "x86_64-linux");
    Ok(())
  }

  #[test]
  fn extra_args_override_context() -> Result<(), ComposeError> {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let ctx = builder(&lua, root.path()).build(&lua, LINUX, None)?;
    let extra: LuaTable = lua.load("return { name = 'web', system = 'override' }").eval()?;
    let args = ctx.args_with(&lua, &extra)?;
    assert_eq!(args.get::<String>("name")?, "web");
    assert_eq!(args.get::<String>("system")?, "override");
    Ok(())
  }

  #[test]
  fn non_table_resolver_is_rejected() {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let source: LuaValue = lua.load("return function() return 1 end").eval().unwrap();
    let err = builder(&lua, root.path())
      .with_package_source(&root.path().join("pkgs.lua"), source, LuaValue::Nil)
      .build(&lua, LINUX, None)
      .unwrap_err();
    assert!(matches!(err, ComposeError::InvalidHandle { handle: "pkgs", .. }));
  }

  #[test]
  fn utilities_are_injected() -> Result<(), ComposeError> {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("utils")).unwrap();
    fs::write(root.path().join("utils/u.lua"), "return { answer = 42 }").unwrap();
    let lua = Lua::new();
    let ctx = builder(&lua, root.path()).build(&lua, LINUX, None)?;
    let args = ctx.args(&lua)?;
    let utils: LuaTable = args.get("utils")?;
    assert_eq!(utils.get::<i64>("answer")?, 42);
    Ok(())
  }
}
