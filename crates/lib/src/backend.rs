//! Collaborator seams: the package-build executor and the module evaluator.
//!
//! Composition only decides *which* components exist and *what* they are
//! handed; turning a package directory into an artifact and evaluating a
//! module list are delegated to an [`ArtifactBuilder`] and a
//! [`ConfigEvaluator`]. Errors from either are propagated unchanged.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::trace;

use crate::compose::{import_component, invoke_component};
use crate::consts::ENTRY_FILE;
use crate::context::PlatformContext;
use crate::discover::ComponentClass;
use crate::error::ComposeError;

/// Turns a component directory into a build artifact.
pub trait ArtifactBuilder {
  fn build_artifact(
    &self,
    lua: &Lua,
    name: &str,
    dir: &Path,
    ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError>;
}

/// Calls `<dir>/default.lua` with the context arguments overlaid by `extra`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LuaPackageBuilder;

impl ArtifactBuilder for LuaPackageBuilder {
  fn build_artifact(
    &self,
    lua: &Lua,
    name: &str,
    dir: &Path,
    ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError> {
    let args = ctx.args_with(lua, extra)?;
    invoke_component(lua, ComponentClass::Packages, name, &dir.join(ENTRY_FILE), args)
  }
}

/// One entry of a module list handed to a [`ConfigEvaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
  /// Stub supplying `config.system.build.toplevel` so evaluation can
  /// proceed without a real system build.
  Placeholder,
  File(PathBuf),
}

/// Evaluates a module list into one artifact.
pub trait ConfigEvaluator {
  fn evaluate(
    &self,
    lua: &Lua,
    name: &str,
    modules: &[ModuleSource],
    ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError>;
}

/// Minimal module evaluator.
///
/// Modules are tables (or functions of the argument table returning one)
/// with optional `options` and `config` fields. Option declarations are
/// tables carrying a `default`; their defaults sit underneath every
/// explicit `config`, and explicit configs merge with the later module
/// winning. Each function module receives the configuration merged so far
/// as `config`, which lets a logic file test its enable flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct LuaModuleEvaluator;

fn is_sequence(t: &LuaTable) -> bool {
  t.raw_len() > 0
}

/// `over` merged into a copy of `base`; nested non-sequence tables merge
/// recursively, anything else is replaced.
pub fn deep_merge(lua: &Lua, base: &LuaTable, over: &LuaTable) -> LuaResult<LuaTable> {
  let out = lua.create_table()?;
  for pair in base.pairs::<LuaValue, LuaValue>() {
    let (k, v) = pair?;
    out.raw_set(k, v)?;
  }
  for pair in over.pairs::<LuaValue, LuaValue>() {
    let (k, v) = pair?;
    let merged = match (out.raw_get::<LuaValue>(k.clone())?, v) {
      (LuaValue::Table(a), LuaValue::Table(b)) if !is_sequence(&a) && !is_sequence(&b) => {
        LuaValue::Table(deep_merge(lua, &a, &b)?)
      }
      (_, v) => v,
    };
    out.raw_set(k, merged)?;
  }
  Ok(out)
}

fn is_declaration(t: &LuaTable) -> LuaResult<bool> {
  t.contains_key("default")
}

/// Defaults of every option declaration in an options tree.
fn option_defaults(lua: &Lua, options: &LuaTable) -> LuaResult<LuaTable> {
  let out = lua.create_table()?;
  for pair in options.pairs::<LuaValue, LuaValue>() {
    let (k, v) = pair?;
    if let LuaValue::Table(t) = v {
      if is_declaration(&t)? {
        out.raw_set(k, t.get::<LuaValue>("default")?)?;
      } else {
        out.raw_set(k, option_defaults(lua, &t)?)?;
      }
    }
  }
  Ok(out)
}

fn placeholder_module(lua: &Lua, name: &str) -> LuaResult<LuaTable> {
  let toplevel = format!("<placeholder:{}>", name);
  lua
    .load(r#"local toplevel = ...; return { config = { system = { build = { toplevel = toplevel } } } }"#)
    .call::<LuaTable>(toplevel)
}

impl ConfigEvaluator for LuaModuleEvaluator {
  fn evaluate(
    &self,
    lua: &Lua,
    name: &str,
    modules: &[ModuleSource],
    ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError> {
    let fail = |reason: String| ComposeError::Evaluator {
      profile: name.to_string(),
      reason,
    };

    let mut options = lua.create_table()?;
    let mut explicit = lua.create_table()?;

    for source in modules {
      let module = match source {
        ModuleSource::Placeholder => placeholder_module(lua, name)?,
        ModuleSource::File(path) => {
          trace!(profile = name, path = %path.display(), "evaluating module");
          let value = match import_component(lua, ComponentClass::Profiles, name, path)? {
            LuaValue::Function(f) => {
              let current = deep_merge(lua, &option_defaults(lua, &options)?, &explicit)?;
              let args = ctx.args_with(lua, extra)?;
              args.set("config", current)?;
              f.call::<LuaValue>(args)
                .map_err(|e| fail(format!("{}: {}", path.display(), e)))?
            }
            other => other,
          };
          match value {
            LuaValue::Table(t) => t,
            other => {
              return Err(fail(format!(
                "{} must produce a table, got {}",
                path.display(),
                other.type_name()
              )));
            }
          }
        }
      };

      if let LuaValue::Table(opts) = module.get::<LuaValue>("options")? {
        options = deep_merge(lua, &options, &opts)?;
      }
      if let LuaValue::Table(cfg) = module.get::<LuaValue>("config")? {
        explicit = deep_merge(lua, &explicit, &cfg)?;
      }
    }

    let config = deep_merge(lua, &option_defaults(lua, &options)?, &explicit)?;
    let result = lua.create_table()?;
    result.set("name", name)?;
    result.set("options", options)?;
    result.set("config", config)?;
    result.set("modules", modules.len())?;
    Ok(LuaValue::Table(result))
  }
}
