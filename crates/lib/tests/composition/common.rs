//! Shared fixtures for composition tests.

use std::fs;
use std::path::{Path, PathBuf};

use fhs_lib::{Composer, FlakeOptions};
use tempfile::TempDir;

pub const SYSTEM: &str = "x86_64-linux";

/// A throwaway project root.
pub struct Root {
  dir: TempDir,
}

impl Root {
  pub fn new() -> Self {
    Self {
      dir: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  pub fn write(&self, rel: &str, body: &str) -> &Self {
    let path = self.dir.path().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    self
  }

  pub fn mkdir(&self, rel: &str) -> &Self {
    fs::create_dir_all(self.dir.path().join(rel)).unwrap();
    self
  }

  /// A component entry returning `value` tagged with this root's label.
  pub fn component(&self, rel: &str, label: &str) -> &Self {
    self.write(rel, &format!("return function(a) return '{}' end", label))
  }
}

pub fn options(roots: &[&Root]) -> FlakeOptions {
  FlakeOptions::new(roots[0].path())
    .with_roots(roots.iter().map(|r| r.path().to_path_buf()).collect::<Vec<PathBuf>>())
    .with_systems(vec![SYSTEM.parse().unwrap()])
}

pub fn composer(roots: &[&Root]) -> Composer {
  Composer::new(options(roots)).unwrap()
}

/// A composed value rendered as a string.
pub fn text(value: &mlua::Value) -> String {
  match value {
    mlua::Value::String(s) => s.to_string_lossy(),
    other => format!("{:?}", other),
  }
}
