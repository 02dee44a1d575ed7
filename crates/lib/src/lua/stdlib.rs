//! Builtin stdlib handle injected as `lib` when a flake brings none.

use std::path::{Component, Path, PathBuf};

use mlua::prelude::*;

fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => {
        normalized.pop();
      }
      Component::CurDir => {}
      _ => normalized.push(component),
    }
  }
  normalized
}

fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // lib.path.join(...) - Join multiple path segments
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut result = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          result.push(s.to_string_lossy());
        }
      }
      Ok(result.to_string_lossy().into_owned())
    })?,
  )?;

  path.set(
    "dirname",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .parent()
          .map(|p| p.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "basename",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // lib.path.extname(path) - Extension including the dot
  path.set(
    "extname",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .extension()
          .map(|e| format!(".{}", e.to_string_lossy()))
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "stem",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .file_stem()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // lib.path.normalize(path) - Resolve . and .. without touching the filesystem
  path.set(
    "normalize",
    lua.create_function(|_, p: String| Ok(normalize(Path::new(&p)).to_string_lossy().into_owned()))?,
  )?;

  Ok(path)
}

/// Create the builtin stdlib table.
///
/// Besides `path`, it carries a handful of table and string helpers that
/// utility files commonly need: `merge`, `keys`, `has_prefix`, `has_suffix`.
pub fn create_stdlib(lua: &Lua) -> LuaResult<LuaTable> {
  let lib = lua.create_table()?;
  lib.set("path", create_path_helpers(lua)?)?;

  // lib.merge(a, b) - Shallow merge, b wins
  lib.set(
    "merge",
    lua.create_function(|lua, (a, b): (LuaTable, LuaTable)| {
      let out = lua.create_table()?;
      for t in [a, b] {
        for pair in t.pairs::<LuaValue, LuaValue>() {
          let (k, v) = pair?;
          out.set(k, v)?;
        }
      }
      Ok(out)
    })?,
  )?;

  // lib.keys(t) - Sorted string keys
  lib.set(
    "keys",
    lua.create_function(|lua, t: LuaTable| {
      let mut keys = Vec::new();
      for pair in t.pairs::<LuaValue, LuaValue>() {
        if let (LuaValue::String(k), _) = pair? {
          keys.push(k.to_string_lossy());
        }
      }
      keys.sort();
      lua.create_sequence_from(keys)
    })?,
  )?;

  lib.set(
    "has_prefix",
    lua.create_function(|_, (s, prefix): (String, String)| Ok(s.starts_with(&prefix)))?,
  )?;
  lib.set(
    "has_suffix",
    lua.create_function(|_, (s, suffix): (String, String)| Ok(s.ends_with(&suffix)))?,
  )?;

  Ok(lib)
}
