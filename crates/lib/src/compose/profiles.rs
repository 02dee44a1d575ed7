//! Profile composer: one evaluated system configuration per
//! `profiles/<name>/configuration.lua`, for the default platform only.

use std::path::PathBuf;

use mlua::prelude::*;
use tracing::{debug, info};

use super::modules::{DiscoveredModule, all_imports};
use super::{Precedence, select};
use crate::backend::{ConfigEvaluator, ModuleSource};
use crate::consts::PROFILE_ENTRY_FILE;
use crate::context::PlatformContext;
use crate::discover::{self, ComponentClass};
use crate::error::ComposeError;
use crate::namespace::Namespace;

/// Module list for one profile: placeholder, the profile's configuration,
/// then every module import.
pub fn profile_modules(configuration: PathBuf, modules: &[DiscoveredModule]) -> Vec<ModuleSource> {
  let mut list = vec![ModuleSource::Placeholder, ModuleSource::File(configuration)];
  list.extend(all_imports(modules).into_iter().map(ModuleSource::File));
  list
}

pub fn compose_profiles(
  lua: &Lua,
  ctx: &PlatformContext,
  modules: &[DiscoveredModule],
  evaluator: &dyn ConfigEvaluator,
) -> Result<Namespace, ComposeError> {
  let selected = select(discover::discover(ComponentClass::Profiles, &ctx.roots)?, Precedence::LaterRootWins);

  let mut out = Namespace::new();
  for profile in selected {
    let configuration = profile.path.join(PROFILE_ENTRY_FILE);
    if !configuration.is_file() {
      return Err(ComposeError::MissingFile {
        class: ComponentClass::Profiles,
        name: profile.name,
        path: configuration,
      });
    }

    let list = profile_modules(configuration, modules);
    debug!(profile = %profile.name, modules = list.len(), "evaluating profile");

    let extra = lua.create_table()?;
    extra.set("name", profile.name.as_str())?;
    let artifact = evaluator.evaluate(lua, &profile.name, &list, ctx, &extra)?;
    out.insert(profile.name, artifact);
  }

  info!(system = %ctx.platform, count = out.len(), "composed profiles");
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::LuaModuleEvaluator;
  use crate::compose::modules::discover_modules;
  use crate::context::ContextBuilder;
  use std::fs;
  use std::path::Path;
  use tempfile::TempDir;

  fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
  }

  fn ctx(lua: &Lua, root: &Path) -> PlatformContext {
    ContextBuilder::new(
      root,
      vec![root.to_path_buf()],
      lua.create_table().unwrap(),
      lua.create_table().unwrap(),
    )
    .build(lua, "x86_64-linux".parse().unwrap(), None)
    .unwrap()
  }

  #[test]
  fn module_list_starts_with_placeholder_and_configuration() {
    let root = TempDir::new().unwrap();
    write(root.path(), "modules/b/options.lua", "return {}");
    write(root.path(), "modules/b/config.lua", "return {}");
    write(root.path(), "modules/a/default.lua", "return {}");
    let modules = discover_modules(&[root.path().to_path_buf()]).unwrap();

    let conf = root.path().join("profiles/web/configuration.lua");
    let list = profile_modules(conf.clone(), &modules);
    let m = root.path().join("modules");
    assert_eq!(
      list,
      vec![
        ModuleSource::Placeholder,
        ModuleSource::File(conf),
        ModuleSource::File(m.join("a/default.lua")),
        ModuleSource::File(m.join("b/options.lua")),
        ModuleSource::File(m.join("b/config.lua")),
      ]
    );
  }

  #[test]
  fn profile_name_is_injected() {
    let root = TempDir::new().unwrap();
    write(
      root.path(),
      "profiles/web/configuration.lua",
      "return function(a) return { config = { host = a.name } } end",
    );

    let lua = Lua::new();
    let ctx = ctx(&lua, root.path());
    let out = compose_profiles(&lua, &ctx, &[], &LuaModuleEvaluator).unwrap();
    let config: LuaTable = out["web"].as_table().unwrap().get("config").unwrap();
    assert_eq!(config.get::<String>("host").unwrap(), "web");
  }

  #[test]
  fn no_profiles_is_empty() {
    let root = TempDir::new().unwrap();
    let lua = Lua::new();
    let ctx = ctx(&lua, root.path());
    assert!(compose_profiles(&lua, &ctx, &[], &LuaModuleEvaluator).unwrap().is_empty());
  }
}
