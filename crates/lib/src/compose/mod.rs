//! Class-specific composers.
//!
//! Each class has its own precedence rule when the same name is discovered
//! under several roots. The rules are not uniform and are kept that way:
//!
//! | class | rule |
//! |---|---|
//! | packages, controlled mode | later root wins |
//! | packages, auto-discovery | earlier root wins |
//! | dev environments, apps, modules, profiles, checks | later root wins |
//! | templates | every entry is described, the mapping keeps the last |
//! | utilities | later root wins |

pub mod checks;
pub mod modules;
pub mod packages;
pub mod profiles;
pub mod shells;
pub mod templates;

use std::collections::BTreeMap;
use std::path::Path;

use mlua::prelude::*;

use crate::discover::{Component, ComponentClass};
use crate::error::ComposeError;
use crate::lua::loaders;

/// Which of several same-named components survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
  EarlierRootWins,
  LaterRootWins,
}

/// Keep one component per name. Survivors stay in the order they were
/// discovered in.
pub fn select(components: Vec<Component>, precedence: Precedence) -> Vec<Component> {
  let mut winner: BTreeMap<String, usize> = BTreeMap::new();
  for (idx, component) in components.iter().enumerate() {
    match precedence {
      Precedence::EarlierRootWins => {
        winner.entry(component.name.clone()).or_insert(idx);
      }
      Precedence::LaterRootWins => {
        winner.insert(component.name.clone(), idx);
      }
    }
  }

  let mut keep: Vec<usize> = winner.into_values().collect();
  keep.sort_unstable();
  let mut slots: Vec<Option<Component>> = components.into_iter().map(Some).collect();
  keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Load a component file, turning load failures into [`ComposeError`]s that
/// name the component.
pub fn import_component(lua: &Lua, class: ComponentClass, name: &str, path: &Path) -> Result<LuaValue, ComposeError> {
  if !path.is_file() {
    return Err(ComposeError::MissingFile {
      class,
      name: name.to_string(),
      path: path.to_path_buf(),
    });
  }
  loaders::import_file(lua, path).map_err(|e| ComposeError::Malformed {
    class,
    name: name.to_string(),
    path: path.to_path_buf(),
    reason: e.to_string(),
  })
}

/// Load a component file that must evaluate to a function and call it with `args`.
pub fn invoke_component(
  lua: &Lua,
  class: ComponentClass,
  name: &str,
  path: &Path,
  args: LuaTable,
) -> Result<LuaValue, ComposeError> {
  match import_component(lua, class, name, path)? {
    LuaValue::Function(f) => f.call::<LuaValue>(args).map_err(|source| ComposeError::Invocation {
      class,
      name: name.to_string(),
      source,
    }),
    other => Err(ComposeError::Malformed {
      class,
      name: name.to_string(),
      path: path.to_path_buf(),
      reason: format!("expected a function, got {}", other.type_name()),
    }),
  }
}
