//! Project entrypoint evaluation.
//!
//! A project is described by a `flake.lua` returning a table:
//!
//! ```lua
//! return {
//!   description = "my project",
//!   roots = { ".", "nix" },
//!   systems = { "x86_64-linux" },
//!   inputs = {
//!     fhs = "github:luochen1990/flake-fhs",
//!     nixpkgs = { url = "github:NixOS/nixpkgs" },
//!   },
//!   pkgs = { source = "./nixpkgs.lua", config = { allowUnfree = true } },
//!   lib = "./lib.lua",
//!   formatter = "stylua",
//! }
//! ```

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::FLAKE_FILE;
use crate::flake::FlakeOptions;
use crate::lua::{convert, loaders, runtime};
use crate::platform::Platform;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("no {} found in {}", FLAKE_FILE, .0.display())]
  NotFound(PathBuf),

  #[error("failed to evaluate {}: {source}", path.display())]
  Eval { path: PathBuf, source: LuaError },

  #[error("{} must return a table, got {found}", path.display())]
  NotATable { path: PathBuf, found: String },

  #[error("field `{field}`: {reason}")]
  InvalidField { field: String, reason: String },

  #[error("field `{field}`: unsupported system '{system}'")]
  UnsupportedSystem { field: String, system: String },

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),
}

const KNOWN_FIELDS: [&str; 8] = [
  "description",
  "roots",
  "systems",
  "default_system",
  "inputs",
  "pkgs",
  "lib",
  "formatter",
];

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
  ConfigError::InvalidField {
    field: field.to_string(),
    reason: reason.into(),
  }
}

fn opt_string(table: &LuaTable, field: &str) -> Result<Option<String>, ConfigError> {
  match table.get::<LuaValue>(field)? {
    LuaValue::Nil => Ok(None),
    LuaValue::String(s) => Ok(Some(s.to_string_lossy())),
    other => Err(invalid(field, format!("expected a string, got {}", other.type_name()))),
  }
}

fn string_list(table: &LuaTable, field: &str) -> Result<Option<Vec<String>>, ConfigError> {
  match table.get::<LuaValue>(field)? {
    LuaValue::Nil => Ok(None),
    LuaValue::Table(items) => {
      let mut out = Vec::new();
      for item in items.sequence_values::<LuaValue>() {
        match item? {
          LuaValue::String(s) => out.push(s.to_string_lossy()),
          other => return Err(invalid(field, format!("expected strings, got {}", other.type_name()))),
        }
      }
      Ok(Some(out))
    }
    other => Err(invalid(field, format!("expected a list, got {}", other.type_name()))),
  }
}

fn parse_system(field: &str, system: &str) -> Result<Platform, ConfigError> {
  system.parse().map_err(|_| ConfigError::UnsupportedSystem {
    field: field.to_string(),
    system: system.to_string(),
  })
}

/// Inputs as `name = "url"` or `name = { url = "url" }`.
fn parse_inputs(table: &LuaTable, options: &mut FlakeOptions) -> Result<(), ConfigError> {
  let inputs = match table.get::<LuaValue>("inputs")? {
    LuaValue::Nil => return Ok(()),
    LuaValue::Table(t) => t,
    other => return Err(invalid("inputs", format!("expected a table, got {}", other.type_name()))),
  };

  for pair in inputs.pairs::<String, LuaValue>() {
    let (name, value) = pair?;
    let url = match value {
      LuaValue::String(s) => s.to_string_lossy(),
      LuaValue::Table(t) => opt_string(&t, "url")
        .map_err(|_| invalid(&format!("inputs.{}", name), "url must be a string"))?
        .ok_or_else(|| invalid(&format!("inputs.{}", name), "missing url"))?,
      other => {
        return Err(invalid(
          &format!("inputs.{}", name),
          format!("expected a string or table, got {}", other.type_name()),
        ));
      }
    };
    options.inputs.insert(name, url);
  }
  Ok(())
}

/// `pkgs = "path"` or `pkgs = { source = "path", config = {...} }`.
fn parse_pkgs(table: &LuaTable, options: &mut FlakeOptions) -> Result<(), ConfigError> {
  match table.get::<LuaValue>("pkgs")? {
    LuaValue::Nil => {}
    LuaValue::String(s) => options.package_source = Some(PathBuf::from(s.to_string_lossy())),
    LuaValue::Table(t) => {
      let source = opt_string(&t, "source")
        .map_err(|_| invalid("pkgs.source", "expected a string"))?
        .ok_or_else(|| invalid("pkgs.source", "missing"))?;
      options.package_source = Some(PathBuf::from(source));
      options.package_config = match t.get::<LuaValue>("config")? {
        LuaValue::Nil => Value::Null,
        config @ LuaValue::Table(_) => convert::to_json(&config),
        other => return Err(invalid("pkgs.config", format!("expected a table, got {}", other.type_name()))),
      };
    }
    other => return Err(invalid("pkgs", format!("expected a string or table, got {}", other.type_name()))),
  }
  Ok(())
}

/// Turn an evaluated entrypoint table into options for `dir`.
pub fn options_from_table(dir: &Path, table: &LuaTable) -> Result<FlakeOptions, ConfigError> {
  let mut options = FlakeOptions::new(dir);

  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    let key = match key {
      LuaValue::String(s) => s.to_string_lossy(),
      other => format!("<{}>", other.type_name()),
    };
    if !KNOWN_FIELDS.contains(&key.as_str()) {
      warn!(field = %key, "ignoring unknown field in {}", FLAKE_FILE);
    }
  }

  options.description = opt_string(table, "description")?;
  options.formatter = opt_string(table, "formatter")?;
  options.stdlib = opt_string(table, "lib")?.map(PathBuf::from);

  if let Some(roots) = string_list(table, "roots")? {
    options.roots = roots.into_iter().map(PathBuf::from).collect();
  }
  if let Some(systems) = string_list(table, "systems")? {
    options.systems = systems
      .iter()
      .map(|s| parse_system("systems", s))
      .collect::<Result<_, _>>()?;
  }
  if let Some(system) = opt_string(table, "default_system")? {
    let platform = parse_system("default_system", &system)?;
    if !options.systems.contains(&platform) {
      return Err(ConfigError::UnsupportedSystem {
        field: "default_system".to_string(),
        system,
      });
    }
    options.default_system = Some(platform);
  }

  parse_inputs(table, &mut options)?;
  parse_pkgs(table, &mut options)?;
  Ok(options)
}

/// Evaluate `<dir>/flake.lua`.
pub fn load_options(dir: &Path) -> Result<FlakeOptions, ConfigError> {
  let path = dir.join(FLAKE_FILE);
  if !path.is_file() {
    return Err(ConfigError::NotFound(dir.to_path_buf()));
  }
  let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

  let lua = runtime::create_runtime()?;
  let value = loaders::import_file(&lua, &path).map_err(|source| ConfigError::Eval {
    path: path.clone(),
    source,
  })?;
  let table = match value {
    LuaValue::Table(t) => t,
    other => {
      return Err(ConfigError::NotATable {
        path,
        found: other.type_name().to_string(),
      });
    }
  };

  let options = options_from_table(&dir, &table)?;
  debug!(path = %path.display(), roots = options.roots.len(), "loaded {}", FLAKE_FILE);
  Ok(options)
}

/// Options for `dir`: its `flake.lua` when present, defaults otherwise.
pub fn load_or_default(dir: &Path) -> Result<FlakeOptions, ConfigError> {
  match load_options(dir) {
    Err(ConfigError::NotFound(_)) => {
      debug!(dir = %dir.display(), "no {}, using defaults", FLAKE_FILE);
      let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
      Ok(FlakeOptions::new(dir))
    }
    other => other,
  }
}
