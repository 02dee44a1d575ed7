//! Component file loading with per-file environments.
//!
//! Every component file runs in its own environment table containing:
//! - `__dir`: the directory of the file being loaded
//! - `import(path)` / `dofile(path)`: load another file relative to `__dir`
//!
//! Lookups that miss the environment fall through to an optional enclosing
//! scope and then to `_G`. Assignments stay in the file's environment, so one
//! component can never leak globals into another.

use mlua::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn canonical(path: &Path) -> LuaResult<PathBuf> {
  dunce::canonicalize(path).map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))
}

/// Build the environment table for a file living in `dir`.
fn file_env(lua: &Lua, dir: &Path, scope: Option<&LuaTable>) -> LuaResult<LuaTable> {
  let env = lua.create_table()?;
  env.set("__dir", dir.to_string_lossy().into_owned())?;

  let base = dir.to_path_buf();
  let import = lua.create_function(move |lua, rel: String| {
    let target = Path::new(&rel);
    let path = if target.is_absolute() {
      target.to_path_buf()
    } else {
      base.join(target)
    };
    import_file(lua, &path)
  })?;
  env.set("import", import.clone())?;
  env.set("dofile", import)?;

  // Lookup chain: env -> scope -> _G
  let fallback = match scope {
    Some(scope) => {
      let layer = lua.create_table()?;
      for pair in scope.pairs::<LuaValue, LuaValue>() {
        let (k, v) = pair?;
        layer.raw_set(k, v)?;
      }
      let layer_mt = lua.create_table()?;
      layer_mt.set("__index", lua.globals())?;
      layer.set_metatable(Some(layer_mt))?;
      layer
    }
    None => lua.globals(),
  };

  let mt = lua.create_table()?;
  mt.set("__index", fallback)?;
  env.set_metatable(Some(mt))?;
  Ok(env)
}

fn load(lua: &Lua, path: &Path, scope: Option<&LuaTable>) -> LuaResult<LuaValue> {
  let canonical_path = canonical(path)?;
  let content = fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;
  let dir = canonical_path.parent().unwrap_or(Path::new(".")).to_path_buf();

  let env = file_env(lua, &dir, scope)?;
  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .set_environment(env)
    .eval::<LuaValue>()
}

/// Load and evaluate a Lua file, returning whatever the chunk returns.
pub fn import_file(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  load(lua, path, None)
}

/// Like [`import_file`], but names missing from the file's own environment
/// are looked up in `scope` before globals.
pub fn import_scoped(lua: &Lua, path: &Path, scope: &LuaTable) -> LuaResult<LuaValue> {
  load(lua, path, Some(scope))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn import_sets_dir() -> LuaResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("test.lua");
    fs::write(&file_path, "return __dir").unwrap();

    let lua = Lua::new();
    let result: String = lua.unpack(import_file(&lua, &file_path)?)?;

    let expected = dunce::canonicalize(temp_dir.path()).unwrap();
    assert_eq!(result, expected.to_string_lossy());
    Ok(())
  }

  #[test]
  fn nested_import_is_relative_to_importing_file() -> LuaResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let subdir = temp_dir.path().join("subdir");
    fs::create_dir(&subdir).unwrap();

    fs::write(temp_dir.path().join("main.lua"), "return import('./subdir/a.lua')").unwrap();
    fs::write(subdir.join("a.lua"), "return dofile('b.lua')").unwrap();
    fs::write(subdir.join("b.lua"), "return __dir").unwrap();

    let lua = Lua::new();
    let result: String = lua.unpack(import_file(&lua, &temp_dir.path().join("main.lua"))?)?;

    assert_eq!(result, dunce::canonicalize(&subdir).unwrap().to_string_lossy());
    Ok(())
  }

  #[test]
  fn assignments_do_not_leak_into_globals() -> LuaResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("leaky.lua");
    fs::write(&file_path, "leaked = 1; return leaked").unwrap();

    let lua = Lua::new();
    let result: i64 = lua.unpack(import_file(&lua, &file_path)?)?;
    assert_eq!(result, 1);
    assert!(lua.globals().get::<LuaValue>("leaked")?.is_nil());
    Ok(())
  }

  #[test]
  fn scope_is_consulted_before_globals() -> LuaResult<()> {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("scoped.lua");
    fs::write(&file_path, "return greet('x') .. type(string)").unwrap();

    let lua = Lua::new();
    let scope: LuaTable = lua.load("return { greet = function(n) return 'hi ' .. n end }").eval()?;
    let result: String = lua.unpack(import_scoped(&lua, &file_path, &scope)?)?;
    assert_eq!(result, "hi xtable");
    Ok(())
  }

  #[test]
  fn missing_file_is_an_error() {
    let lua = Lua::new();
    let result = import_file(&lua, Path::new("/nonexistent/path/file.lua"));
    assert!(result.is_err());
  }
}
