//! Template composer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mlua::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::consts::TEMPLATE_DESCRIPTOR_FILE;
use crate::discover::{self, ComponentClass};
use crate::error::ComposeError;
use crate::lua::loaders;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
  pub path: PathBuf,
  pub description: String,
}

/// Read `description` from a template's descriptor, if it has one.
pub fn read_description(lua: &Lua, name: &str, dir: &Path) -> Result<Option<String>, ComposeError> {
  let descriptor = dir.join(TEMPLATE_DESCRIPTOR_FILE);
  if !descriptor.is_file() {
    return Ok(None);
  }

  let malformed = |reason: String| ComposeError::Malformed {
    class: ComponentClass::Templates,
    name: name.to_string(),
    path: descriptor.clone(),
    reason,
  };

  match loaders::import_file(lua, &descriptor).map_err(|e| malformed(e.to_string()))? {
    LuaValue::Table(t) => match t.get::<LuaValue>("description")? {
      LuaValue::Nil => Ok(None),
      LuaValue::String(s) => Ok(Some(s.to_string_lossy())),
      other => Err(malformed(format!("description must be a string, got {}", other.type_name()))),
    },
    other => Err(malformed(format!("descriptor must return a table, got {}", other.type_name()))),
  }
}

/// Every template of every root. A name defined in several roots keeps the
/// last one.
pub fn compose_templates(lua: &Lua, roots: &[PathBuf]) -> Result<BTreeMap<String, Template>, ComposeError> {
  let mut out = BTreeMap::new();
  for component in discover::discover(ComponentClass::Templates, roots)? {
    let description = read_description(lua, &component.name, &component.path)?
      .unwrap_or_else(|| format!("Template: {}", component.name));
    if out.contains_key(&component.name) {
      debug!(name = %component.name, root = %component.root.display(), "template replaces an earlier one");
    }
    out.insert(
      component.name,
      Template {
        path: component.path,
        description,
      },
    );
  }
  info!(count = out.len(), "composed templates");
  Ok(out)
}
