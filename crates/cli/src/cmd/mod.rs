mod eval;
mod info;
mod init;
mod show;
mod templates;

pub use eval::cmd_eval;
pub use info::cmd_info;
pub use init::cmd_init;
pub use show::cmd_show;
pub use templates::cmd_templates;

use std::path::Path;

use anyhow::{Context, Result};
use fhs_lib::FlakeOptions;
use fhs_lib::config;

/// Options for the project in `dir`, from its `flake.lua` when present.
pub(crate) fn load_project(dir: &Path) -> Result<FlakeOptions> {
  config::load_or_default(dir).with_context(|| format!("Failed to load project at {}", dir.display()))
}
