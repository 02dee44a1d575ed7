//! Implementation of the `fhs eval` command.

use std::path::Path;

use anyhow::{Result, anyhow, bail};

use fhs_lib::Composer;

use super::load_project;
use crate::output::print_json;

/// Print the attribute at `attr` as JSON.
pub fn cmd_eval(dir: &Path, attr: &str) -> Result<()> {
  let composer = Composer::new(load_project(dir)?)?;
  let report = composer.compose_report();

  let category = attr.split('.').next().unwrap_or_default();
  if let Some(failure) = report.failures.iter().find(|f| f.category == category) {
    bail!("{} failed to compose: {}", category, failure.error);
  }

  let value = report
    .outputs
    .lookup(attr)
    .ok_or_else(|| anyhow!("attribute '{}' does not exist", attr))?;
  print_json(&value)
}
