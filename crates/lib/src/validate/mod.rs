//! Template validation.
//!
//! Every template under `templates/` must reference the upstream project by
//! its published URL, and must compose once that URL is pointed at a local
//! checkout. Each template is copied into a temporary directory, rewritten
//! to `path:<project root>` and composed in-process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config;
use crate::consts::TEMPLATE_DESCRIPTOR_FILE;
use crate::flake::{Composer, OutputTree};
use crate::fs as fhs_fs;

/// URL templates are expected to pull this project from.
pub const EXPECTED_UPSTREAM_URL: &str = "github:luochen1990/flake-fhs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
  Passed,
  Failed,
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
  pub name: String,
  pub status: TestStatus,
  pub message: String,
  pub details: Option<Value>,
}

impl TestResult {
  fn new(name: &str, status: TestStatus, message: impl Into<String>) -> Self {
    Self {
      name: name.to_string(),
      status,
      message: message.into(),
      details: None,
    }
  }

  fn with_details(mut self, details: Value) -> Self {
    self.details = Some(details);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateValidation {
  pub template_name: String,
  pub overall_status: TestStatus,
  pub tests: Vec<TestResult>,
  pub error_message: Option<String>,
  /// Set when the templates directory itself could not be validated.
  #[serde(skip)]
  directory_error: bool,
}

impl TemplateValidation {
  fn error(name: &str, message: String) -> Self {
    Self {
      template_name: name.to_string(),
      overall_status: TestStatus::Failed,
      tests: Vec::new(),
      error_message: Some(message),
      directory_error: false,
    }
  }

  fn directory_error(message: String) -> Self {
    Self {
      directory_error: true,
      ..Self::error("error", message)
    }
  }

  /// Whether this result stands for the whole templates directory rather
  /// than one template.
  pub fn is_error(&self) -> bool {
    self.directory_error
  }
}

/// Every `url = "..."` value in `content`.
pub fn find_urls(content: &str) -> Vec<String> {
  let mut urls = Vec::new();
  let mut rest = content;
  while let Some(idx) = rest.find("url") {
    rest = &rest[idx + 3..];
    let after_eq = match rest.trim_start().strip_prefix('=') {
      Some(s) => s.trim_start(),
      None => continue,
    };
    let Some(quoted) = after_eq.strip_prefix('"') else {
      continue;
    };
    if let Some(end) = quoted.find('"') {
      urls.push(quoted[..end].to_string());
      rest = &quoted[end + 1..];
    }
  }
  urls
}

fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
  for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(std::io::Error::other)?;
    let rel = entry.path().strip_prefix(from).map_err(std::io::Error::other)?;
    let target = to.join(rel);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}

pub struct TemplateValidator {
  templates_dir: PathBuf,
  project_root: PathBuf,
  expected_url: String,
}

impl TemplateValidator {
  pub fn new(templates_dir: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
    Self {
      templates_dir: templates_dir.into(),
      project_root: project_root.into(),
      expected_url: EXPECTED_UPSTREAM_URL.to_string(),
    }
  }

  pub fn with_expected_url(mut self, url: impl Into<String>) -> Self {
    self.expected_url = url.into();
    self
  }

  fn local_url(&self) -> String {
    format!("path:{}", self.project_root.display())
  }

  fn descriptor_check(&self, template: &Path) -> TestResult {
    const NAME: &str = "descriptor_check";
    let descriptor = template.join(TEMPLATE_DESCRIPTOR_FILE);
    if !descriptor.is_file() {
      return TestResult::new(
        NAME,
        TestStatus::Failed,
        format!("{} not found in template", TEMPLATE_DESCRIPTOR_FILE),
      );
    }

    match fs::read_to_string(&descriptor) {
      Ok(content) if content.contains(&self.expected_url) => {
        TestResult::new(NAME, TestStatus::Passed, "Template uses the upstream URL")
      }
      Ok(content) => TestResult::new(
        NAME,
        TestStatus::Failed,
        format!("Template does not use expected URL: {}", self.expected_url),
      )
      .with_details(json!({ "found_urls": find_urls(&content) })),
      Err(e) => TestResult::new(NAME, TestStatus::Failed, format!("Error reading template file: {}", e)),
    }
  }

  /// Copy `template` into `temp` and point its upstream URL at the local checkout.
  fn create_temp_template(&self, template: &Path, temp: &Path) -> Result<(), String> {
    copy_tree(template, temp).map_err(|e| format!("Error creating temporary template: {}", e))?;

    let descriptor = temp.join(TEMPLATE_DESCRIPTOR_FILE);
    if !descriptor.is_file() {
      return Err(format!("{} not found in template", TEMPLATE_DESCRIPTOR_FILE));
    }
    let content = fs::read_to_string(&descriptor).map_err(|e| e.to_string())?;
    let rewritten = content.replace(&self.expected_url, &self.local_url());
    fs::write(&descriptor, &rewritten).map_err(|e| e.to_string())?;

    if rewritten.contains("path:") && !rewritten.contains(&self.expected_url) {
      Ok(())
    } else {
      Err("Failed to replace upstream URL with local path".to_string())
    }
  }

  fn compose_check(&self, dir: &Path) -> (TestResult, Option<(OutputTree, String)>) {
    const NAME: &str = "compose_check";
    let options = match config::load_or_default(dir) {
      Ok(options) => options,
      Err(e) => return (TestResult::new(NAME, TestStatus::Failed, format!("invalid entrypoint: {}", e)), None),
    };
    let first_system = options.systems.first().map(|p| p.triple());

    match Composer::new(options).and_then(|c| c.compose()) {
      Ok(tree) => (
        TestResult::new(NAME, TestStatus::Passed, "composition succeeded"),
        first_system.map(|s| (tree, s)),
      ),
      Err(e) => (
        TestResult::new(NAME, TestStatus::Failed, format!("composition failed: {}", e)),
        None,
      ),
    }
  }

  fn outputs_check(tree: &OutputTree, system: &str) -> TestResult {
    const NAME: &str = "outputs_check";
    let count = |category: &Option<crate::flake::PerSystem>| {
      category
        .as_ref()
        .and_then(|per| per.get(system))
        .map_or(0, |ns| ns.len())
    };
    let packages = count(&tree.packages);
    let details = json!({
      "packages": packages,
      "checks": count(&tree.checks),
      "devEnvironments": count(&tree.dev_environments),
      "apps": count(&tree.apps),
    });

    if packages > 0 {
      TestResult::new(NAME, TestStatus::Passed, "Template generates expected outputs").with_details(details)
    } else {
      TestResult::new(NAME, TestStatus::Failed, "Template does not generate any packages").with_details(details)
    }
  }

  pub fn validate_template(&self, name: &str) -> TemplateValidation {
    let template = self.templates_dir.join(name);
    if !template.is_dir() {
      return TemplateValidation::error(name, format!("Template directory not found: {}", template.display()));
    }
    debug!(template = name, "validating template");

    let mut tests = vec![self.descriptor_check(&template)];

    match TempDir::new() {
      Ok(temp) => match self.create_temp_template(&template, temp.path()) {
        Err(message) => tests.push(TestResult::new("temp_template_creation", TestStatus::Failed, message)),
        Ok(()) => {
          tests.push(TestResult::new(
            "temp_template_creation",
            TestStatus::Passed,
            "Temporary template created with local path",
          ));
          let (compose, outputs) = self.compose_check(temp.path());
          tests.push(compose);
          match outputs {
            Some((tree, system)) => tests.push(Self::outputs_check(&tree, &system)),
            None => tests.push(TestResult::new(
              "outputs_check",
              TestStatus::Skipped,
              "Skipped due to composition failure",
            )),
          }
        }
      },
      Err(e) => tests.push(TestResult::new(
        "temp_template_tests",
        TestStatus::Failed,
        format!("Error in temporary template tests: {}", e),
      )),
    }

    let overall_status = if tests.iter().any(|t| t.status == TestStatus::Failed) {
      TestStatus::Failed
    } else {
      TestStatus::Passed
    };
    info!(template = name, status = ?overall_status, "validated template");

    TemplateValidation {
      template_name: name.to_string(),
      overall_status,
      tests,
      error_message: None,
      directory_error: false,
    }
  }

  pub fn validate_all(&self) -> BTreeMap<String, TemplateValidation> {
    let single_error = |message: String| BTreeMap::from([("error".to_string(), TemplateValidation::directory_error(message))]);

    if !self.templates_dir.is_dir() {
      return single_error(format!("Templates directory not found: {}", self.templates_dir.display()));
    }
    let dirs = match fhs_fs::list_dirs(&self.templates_dir) {
      Ok(dirs) => dirs,
      Err(e) => return single_error(e.to_string()),
    };
    if dirs.is_empty() {
      return single_error("No template directories found".to_string());
    }

    dirs
      .iter()
      .map(|dir| {
        let name = fhs_fs::base_name(dir);
        let result = self.validate_template(&name);
        (name, result)
      })
      .collect()
  }
}
