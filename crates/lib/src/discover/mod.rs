//! Component discovery.
//!
//! Walks every root in order and enumerates the components of one class by
//! filesystem layout alone. Discovery never deduplicates: the same name may
//! show up once per root and the class composers decide which one wins.

mod kind;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::consts::{
  APPS_DIR, CHECKS_DIR, LUA_EXT, MODULES_DIR, PACKAGES_DIR, PROFILES_DIR, SHELLS_DIR, TEMPLATES_DIR, UTILITIES_DIR,
};
use crate::fs::{self, FsError};

pub use kind::ModuleKind;

/// How a class lays out its components inside its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  /// One subdirectory per component.
  Dirs,
  /// One `.lua` file per component, named by its stem.
  Files,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentClass {
  Packages,
  DevEnvironments,
  Apps,
  Modules,
  Profiles,
  Checks,
  Templates,
  Utilities,
}

impl ComponentClass {
  /// Directory under each root that holds this class.
  pub fn dir_name(&self) -> &'static str {
    match self {
      Self::Packages => PACKAGES_DIR,
      Self::DevEnvironments => SHELLS_DIR,
      Self::Apps => APPS_DIR,
      Self::Modules => MODULES_DIR,
      Self::Profiles => PROFILES_DIR,
      Self::Checks => CHECKS_DIR,
      Self::Templates => TEMPLATES_DIR,
      Self::Utilities => UTILITIES_DIR,
    }
  }

  pub fn layout(&self) -> Layout {
    match self {
      Self::Checks | Self::Utilities => Layout::Files,
      _ => Layout::Dirs,
    }
  }

  /// Output category name.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Packages => "packages",
      Self::DevEnvironments => "devEnvironments",
      Self::Apps => "apps",
      Self::Modules => "modules",
      Self::Profiles => "profiles",
      Self::Checks => "checks",
      Self::Templates => "templates",
      Self::Utilities => "utilities",
    }
  }
}

impl fmt::Display for ComponentClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One discovered named unit of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
  pub name: String,
  pub root: PathBuf,
  pub path: PathBuf,
}

/// Enumerate `class` across `roots`, preserving root order and, within a
/// root, listing order. Files in a [`Layout::Files`] class are filtered to
/// `.lua` and named by their stem.
pub fn discover(class: ComponentClass, roots: &[PathBuf]) -> Result<Vec<Component>, FsError> {
  let mut components = Vec::new();

  for root in roots {
    let class_dir = root.join(class.dir_name());
    if !fs::path_exists(&class_dir) {
      continue;
    }
    let entries = match class.layout() {
      Layout::Dirs => fs::list_dirs(&class_dir)?,
      Layout::Files => fs::files_with_suffix(fs::list_files(&class_dir)?, LUA_EXT),
    };

    for path in entries {
      let name = match class.layout() {
        Layout::Dirs => fs::base_name(&path),
        Layout::Files => fs::stem(&path),
      };
      debug!(%class, %name, path = %path.display(), "discovered component");
      components.push(Component {
        name,
        root: root.clone(),
        path,
      });
    }
  }

  Ok(components)
}

/// Roots in the order given, each canonicalized when possible.
pub fn normalize_roots(base: &Path, roots: &[PathBuf]) -> Vec<PathBuf> {
  roots
    .iter()
    .map(|r| {
      let joined = if r.is_absolute() { r.clone() } else { base.join(r) };
      dunce::canonicalize(&joined).unwrap_or(joined)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs as stdfs;
  use tempfile::TempDir;

  fn mkdir(path: PathBuf) {
    stdfs::create_dir_all(path).unwrap();
  }

  #[test]
  fn absent_class_dir_is_empty() {
    let root = TempDir::new().unwrap();
    let found = discover(ComponentClass::Packages, &[root.path().to_path_buf()]).unwrap();
    assert!(found.is_empty());
  }

  #[test]
  fn concatenates_roots_in_order_without_dedup() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    mkdir(a.path().join("pkgs/hello"));
    mkdir(a.path().join("pkgs/cowsay"));
    mkdir(b.path().join("pkgs/hello"));
    mkdir(b.path().join("pkgs/.wip"));

    let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];
    let found = discover(ComponentClass::Packages, &roots).unwrap();
    let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(names, vec!["cowsay", "hello", "hello"]);
    assert_eq!(found[2].root, roots[1]);
    assert_eq!(found[2].path, roots[1].join("pkgs/hello"));
  }

  #[test]
  fn file_classes_use_stems() {
    let root = TempDir::new().unwrap();
    mkdir(root.path().join("utils"));
    stdfs::write(root.path().join("utils/strings.lua"), "return {}").unwrap();
    stdfs::write(root.path().join("utils/notes.md"), "").unwrap();
    mkdir(root.path().join("utils/more"));

    let found = discover(ComponentClass::Utilities, &[root.path().to_path_buf()]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "strings");
  }

  #[test]
  fn relative_roots_resolve_against_base() {
    let base = TempDir::new().unwrap();
    mkdir(base.path().join("nix"));
    let roots = normalize_roots(base.path(), &[PathBuf::from("."), PathBuf::from("nix")]);
    assert_eq!(roots.len(), 2);
    assert!(roots[1].ends_with("nix"));
  }
}
