mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// fhs - compose project outputs from directory conventions
#[derive(Parser)]
#[command(name = "fhs")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compose a project and print its output tree
  Show {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Print the tree as JSON
    #[arg(long)]
    json: bool,

    /// Only compose for this system
    #[arg(long)]
    system: Option<String>,

    /// Include the resolved project options under `config` (with --json)
    #[arg(long, requires = "json")]
    config: bool,
  },

  /// Print one attribute of the output tree as JSON
  Eval {
    /// Dotted attribute path, e.g. packages.x86_64-linux.hello
    attr: String,

    /// Project directory
    #[arg(long, default_value = ".")]
    dir: PathBuf,
  },

  /// Scaffold a new project
  Init {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,
  },

  /// Show platform information
  Info,

  /// Validate the templates of a project
  Templates {
    /// Project directory holding `templates/`
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Validate only this template
    #[arg(long)]
    template: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Show {
      dir,
      json,
      system,
      config,
    } => cmd::cmd_show(&dir, json, config, system.as_deref()),
    Commands::Eval { attr, dir } => cmd::cmd_eval(&dir, &attr),
    Commands::Init { dir } => cmd::cmd_init(&dir),
    Commands::Info => {
      cmd::cmd_info();
      Ok(())
    }
    Commands::Templates { dir, template, format } => cmd::cmd_templates(&dir, template.as_deref(), format),
  }
}
