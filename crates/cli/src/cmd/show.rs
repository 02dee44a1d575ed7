//! Implementation of the `fhs show` command.

use std::path::Path;

use anyhow::{Result, bail};
use serde_json::Value;
use tracing::debug;

use fhs_lib::platform::Platform;
use fhs_lib::{Composer, CompositionReport, OutputTree};

use super::load_project;
use crate::output::{print_error, print_heading, print_info, print_json, print_leaf};

pub fn cmd_show(dir: &Path, json: bool, with_config: bool, system: Option<&str>) -> Result<()> {
  let mut options = load_project(dir)?;

  if let Some(system) = system {
    let platform: Platform = system.parse().map_err(anyhow::Error::msg)?;
    if !options.systems.contains(&platform) {
      bail!("system '{}' is not supported by this project", system);
    }
    options.systems = vec![platform];
    if options.default_system.is_some_and(|d| d != platform) {
      options.default_system = None;
    }
  }

  let config = with_config.then(|| serde_json::to_value(&options)).transpose()?;
  let composer = Composer::new(options)?;
  debug!(roots = ?composer.roots(), "composing");
  let report = composer.compose_report();

  if json {
    let outputs = report.outputs.to_json();
    match config {
      Some(config) => print_json(&serde_json::json!({ "config": config, "outputs": outputs }))?,
      None => print_json(&outputs)?,
    }
  } else {
    print_tree(&report.outputs);
  }

  report_failures(&report)
}

fn report_failures(report: &CompositionReport) -> Result<()> {
  if report.is_success() {
    return Ok(());
  }
  for failure in &report.failures {
    print_error(&format!("{}: {}", failure.category, failure.error));
  }
  bail!("{} output categories failed to compose", report.failures.len())
}

fn note(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Object(map) => map
      .get("name")
      .or_else(|| map.get("description"))
      .and_then(Value::as_str)
      .map(str::to_string),
    Value::Null => None,
    other => Some(other.to_string()),
  }
}

fn print_entries(depth: usize, entries: &serde_json::Map<String, Value>) {
  for (name, value) in entries {
    print_leaf(depth, name, note(value).as_deref());
  }
}

fn print_tree(tree: &OutputTree) {
  let json = tree.to_json();
  let Some(map) = json.as_object() else {
    return;
  };

  if let Some(description) = map.get("description").and_then(Value::as_str) {
    print_info(description);
  }

  for category in fhs_lib::flake::CATEGORIES {
    let Some(value) = map.get(category) else {
      continue;
    };
    print_heading(0, category);
    match (category, value) {
      ("packages" | "devEnvironments" | "apps" | "checks", Value::Object(systems)) => {
        for (system, entries) in systems {
          print_heading(1, system);
          if let Value::Object(entries) = entries {
            print_entries(2, entries);
          }
        }
      }
      ("modules", Value::Object(modules)) => {
        for (name, module) in modules {
          let count = module["imports"].as_array().map_or(0, |i| i.len());
          print_leaf(1, name, Some(&format!("({} imports)", count)));
        }
      }
      (_, Value::Object(entries)) => print_entries(1, entries),
      _ => {}
    }
  }
}
