//! Package composer.
//!
//! Two mutually exclusive modes, chosen once for the whole composition:
//! if any root has `pkgs/default.lua` the index files control visibility,
//! otherwise every `pkgs/<name>/` directory is built.

use std::path::PathBuf;

use mlua::prelude::*;
use tracing::{debug, info, warn};

use super::{Precedence, invoke_component, select};
use crate::backend::ArtifactBuilder;
use crate::consts::{ENTRY_FILE, PACKAGES_DIR};
use crate::context::PlatformContext;
use crate::discover::{self, ComponentClass};
use crate::error::ComposeError;
use crate::namespace::{self, Namespace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageMode {
  /// Index files found under these roots, in root order.
  Controlled(Vec<PathBuf>),
  AutoDiscovery,
}

pub fn detect_mode(roots: &[PathBuf]) -> PackageMode {
  let indexes: Vec<PathBuf> = roots
    .iter()
    .map(|root| root.join(PACKAGES_DIR).join(ENTRY_FILE))
    .filter(|index| index.is_file())
    .collect();

  if indexes.is_empty() {
    PackageMode::AutoDiscovery
  } else {
    PackageMode::Controlled(indexes)
  }
}

pub fn compose_packages(
  lua: &Lua,
  ctx: &PlatformContext,
  builder: &dyn ArtifactBuilder,
) -> Result<Namespace, ComposeError> {
  let packages = match detect_mode(&ctx.roots) {
    PackageMode::Controlled(indexes) => controlled(lua, ctx, &indexes)?,
    PackageMode::AutoDiscovery => auto_discovered(lua, ctx, builder)?,
  };
  info!(system = %ctx.platform, count = packages.len(), "composed packages");
  Ok(packages)
}

fn controlled(lua: &Lua, ctx: &PlatformContext, indexes: &[PathBuf]) -> Result<Namespace, ComposeError> {
  debug!(indexes = indexes.len(), "package index files present, using controlled mode");

  namespace::union_for(indexes, |index| -> Result<Namespace, ComposeError> {
    let args = ctx.args(lua)?;
    match invoke_component(lua, ComponentClass::Packages, ENTRY_FILE, index, args)? {
      LuaValue::Table(t) => Ok(namespace::from_table(&t)?),
      other => {
        warn!(
          path = %index.display(),
          kind = other.type_name(),
          "package index did not return a table, skipping"
        );
        Ok(Namespace::new())
      }
    }
  })
}

fn auto_discovered(
  lua: &Lua,
  ctx: &PlatformContext,
  builder: &dyn ArtifactBuilder,
) -> Result<Namespace, ComposeError> {
  let found = discover::discover(ComponentClass::Packages, &ctx.roots)?;
  let discovered = found.len();
  let selected = select(found, Precedence::EarlierRootWins);
  if selected.len() < discovered {
    debug!(shadowed = discovered - selected.len(), "later package roots shadowed");
  }

  let extra = lua.create_table()?;
  let mut packages = Namespace::new();
  for component in selected {
    let artifact = builder.build_artifact(lua, &component.name, &component.path, ctx, &extra)?;
    packages.insert(component.name, artifact);
  }
  Ok(packages)
}
