//! Module composer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Precedence, select};
use crate::consts::DEFAULT_MODULE;
use crate::discover::{self, ComponentClass, ModuleKind};
use crate::error::ComposeError;

/// A discovered module and how it is authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredModule {
  pub name: String,
  pub dir: PathBuf,
  #[serde(flatten)]
  pub kind: ModuleKind,
}

/// A `modules` output entry: the files that make up the module, in load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
  pub imports: Vec<PathBuf>,
}

/// Effective modules across `roots`: one per name, later root winning,
/// in discovery order. Directories with no marker file contribute nothing,
/// so they never shadow an earlier root's module.
pub fn discover_modules(roots: &[PathBuf]) -> Result<Vec<DiscoveredModule>, ComposeError> {
  let candidates = discover::discover(ComponentClass::Modules, roots)?
    .into_iter()
    .filter_map(|component| {
      let kind = ModuleKind::detect(&component.path);
      if kind.is_empty() {
        debug!(name = %component.name, root = %component.root.display(), "module has no entry or schema file, skipping");
        return None;
      }
      Some((component, kind))
    });

  let mut kinds: BTreeMap<PathBuf, ModuleKind> = BTreeMap::new();
  let mut components = Vec::new();
  for (component, kind) in candidates {
    kinds.insert(component.path.clone(), kind);
    components.push(component);
  }

  Ok(
    select(components, Precedence::LaterRootWins)
      .into_iter()
      .filter_map(|component| {
        let kind = kinds.remove(&component.path)?;
        Some(DiscoveredModule {
          name: component.name,
          dir: component.path,
          kind,
        })
      })
      .collect(),
  )
}

/// Every import of every module, in discovery order.
pub fn all_imports(modules: &[DiscoveredModule]) -> Vec<PathBuf> {
  modules.iter().flat_map(|m| m.kind.imports()).collect()
}

/// `name → entry` for each module plus a synthesized `default` that imports
/// all of them.
pub fn compose_modules(roots: &[PathBuf]) -> Result<BTreeMap<String, ModuleEntry>, ComposeError> {
  let modules = discover_modules(roots)?;

  let mut out: BTreeMap<String, ModuleEntry> = modules
    .iter()
    .map(|m| (m.name.clone(), ModuleEntry { imports: m.kind.imports() }))
    .collect();

  if out.contains_key(DEFAULT_MODULE) {
    warn!("a module named '{}' is replaced by the synthesized aggregate", DEFAULT_MODULE);
  }
  out.insert(
    DEFAULT_MODULE.to_string(),
    ModuleEntry {
      imports: all_imports(&modules),
    },
  );

  info!(count = modules.len(), "composed modules");
  Ok(out)
}

impl ModuleEntry {
  pub fn contains(&self, path: &Path) -> bool {
    self.imports.iter().any(|p| p == path)
  }
}
