//! Implementation of the `fhs init` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use fhs_lib::consts::FLAKE_FILE;
use fhs_lib::init::init;

use crate::output::{print_success, symbols};

/// Scaffold a project in `dir`. Refuses to overwrite existing files.
pub fn cmd_init(dir: &Path) -> Result<()> {
  let result = init(dir).context("Failed to initialize project")?;

  print_success(&"Initialized fhs project!".bold().to_string());
  println!();
  for file in &result.files {
    let rel = file.strip_prefix(&result.project_dir).unwrap_or(file);
    println!("  {} {}", symbols::INFO.cyan(), rel.display());
  }
  println!();
  println!("{}", "Next steps:".bold());
  println!(
    "  1. Edit {} to describe your project",
    result.project_dir.join(FLAKE_FILE).display().to_string().cyan()
  );
  println!(
    "  2. Run: {}",
    format!("fhs show {}", result.project_dir.display()).cyan()
  );

  Ok(())
}
