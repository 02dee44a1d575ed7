use mlua::prelude::*;

use crate::lua::globals;

/// Create a new Lua runtime with the `fhs` global registered.
pub fn create_runtime() -> LuaResult<Lua> {
  let lua = Lua::new();
  globals::register_globals(&lua)?;
  Ok(lua)
}
