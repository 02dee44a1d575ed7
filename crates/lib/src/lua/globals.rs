//! The `fhs` global table.
//!
//! - `fhs.version` - crate version
//! - `fhs.host` - platform triple of the evaluating machine, or nil
//! - `fhs.lib` - the builtin stdlib, reachable even where a custom `lib` is injected

use mlua::prelude::*;

use super::stdlib;
use crate::platform::platform_triple;

pub fn register_globals(lua: &Lua) -> LuaResult<()> {
  let fhs = lua.create_table()?;
  fhs.set("version", env!("CARGO_PKG_VERSION"))?;
  fhs.set("host", platform_triple())?;
  fhs.set("lib", stdlib::create_stdlib(lua)?)?;
  lua.globals().set("fhs", fhs)?;
  Ok(())
}
