//! Implementation of the `fhs templates` command.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};

use fhs_lib::consts::TEMPLATES_DIR;
use fhs_lib::validate::{TemplateValidation, TemplateValidator, TestStatus};

use crate::output::{OutputFormat, print_error, print_json, print_warning, symbols};

pub fn cmd_templates(dir: &Path, template: Option<&str>, format: OutputFormat) -> Result<()> {
  let project_root =
    dunce::canonicalize(dir).with_context(|| format!("Cannot resolve {}", dir.display()))?;
  let validator = TemplateValidator::new(project_root.join(TEMPLATES_DIR), &project_root);

  let results = match template {
    Some(name) => BTreeMap::from([(name.to_string(), validator.validate_template(name))]),
    None => validator.validate_all(),
  };

  if format.is_json() {
    print_json(&results)?;
  } else {
    print_text(&results);
  }

  let total = results.values().filter(|r| !r.is_error()).count();
  let passed = results
    .values()
    .filter(|r| r.overall_status == TestStatus::Passed)
    .count();
  if passed < total || results.values().any(TemplateValidation::is_error) {
    bail!("{}/{} templates passed", passed, total);
  }
  Ok(())
}

fn status_symbol(status: TestStatus) -> String {
  match status {
    TestStatus::Passed => symbols::SUCCESS
      .if_supports_color(Stream::Stdout, |s| s.green())
      .to_string(),
    TestStatus::Failed => symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    TestStatus::Skipped => symbols::SKIPPED
      .if_supports_color(Stream::Stdout, |s| s.dimmed())
      .to_string(),
  }
}

fn print_text(results: &BTreeMap<String, TemplateValidation>) {
  for (name, result) in results {
    if result.is_error() {
      print_error(result.error_message.as_deref().unwrap_or("template validation failed"));
      continue;
    }
    if let Some(message) = &result.error_message {
      print_warning(message);
    }

    println!("{} Template: {}", status_symbol(result.overall_status), name);
    for test in &result.tests {
      println!("  {} {}: {}", status_symbol(test.status), test.name, test.message);
      if let Some(details) = &test.details {
        println!("    Details: {}", details);
      }
    }
    println!();
  }

  let total = results.values().filter(|r| !r.is_error()).count();
  let passed = results
    .values()
    .filter(|r| r.overall_status == TestStatus::Passed)
    .count();
  println!("Summary: {}/{} templates passed", passed, total);
}
