//! Dev-environment and app composers. Both import `<name>/default.lua` and
//! call it with the platform context; the later root wins a name.

use mlua::prelude::*;
use tracing::info;

use super::{Precedence, invoke_component, select};
use crate::consts::ENTRY_FILE;
use crate::context::PlatformContext;
use crate::discover::{self, ComponentClass};
use crate::error::ComposeError;
use crate::namespace::Namespace;

pub fn compose_dev_environments(lua: &Lua, ctx: &PlatformContext) -> Result<Namespace, ComposeError> {
  compose_invoked(lua, ctx, ComponentClass::DevEnvironments)
}

pub fn compose_apps(lua: &Lua, ctx: &PlatformContext) -> Result<Namespace, ComposeError> {
  compose_invoked(lua, ctx, ComponentClass::Apps)
}

fn compose_invoked(lua: &Lua, ctx: &PlatformContext, class: ComponentClass) -> Result<Namespace, ComposeError> {
  let selected = select(discover::discover(class, &ctx.roots)?, Precedence::LaterRootWins);

  let mut out = Namespace::new();
  for component in selected {
    let entry = component.path.join(ENTRY_FILE);
    let artifact = invoke_component(lua, class, &component.name, &entry, ctx.args(lua)?)?;
    out.insert(component.name, artifact);
  }
  info!(%class, system = %ctx.platform, count = out.len(), "composed");
  Ok(out)
}
