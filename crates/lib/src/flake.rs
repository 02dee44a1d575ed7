//! Top-level composition.
//!
//! [`Composer`] turns a set of roots into an [`OutputTree`]. Every output
//! category is an independent fold: a failure in one never prevents another
//! from being composed, which [`Composer::compose_report`] exposes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::backend::{ArtifactBuilder, ConfigEvaluator, LuaModuleEvaluator, LuaPackageBuilder};
use crate::compose::checks::compose_checks;
use crate::compose::modules::{ModuleEntry, compose_modules, discover_modules};
use crate::compose::packages::compose_packages;
use crate::compose::profiles::compose_profiles;
use crate::compose::shells::{compose_apps, compose_dev_environments};
use crate::compose::templates::{Template, compose_templates};
use crate::consts::DEFAULT_FORMATTER;
use crate::context::{ContextBuilder, PlatformContext};
use crate::discover::normalize_roots;
use crate::error::ComposeError;
use crate::lua::{convert, loaders, runtime, stdlib};
use crate::namespace::Namespace;
use crate::platform::{self, Platform};
use crate::utilities::BaseUtilities;

/// Everything a composition is parameterised by.
///
/// Relative paths are resolved against `self_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlakeOptions {
  pub self_dir: PathBuf,
  #[serde(default)]
  pub description: Option<String>,
  /// Lua file producing the package resolver.
  #[serde(default)]
  pub package_source: Option<PathBuf>,
  /// Handed to a function package source as `config`.
  #[serde(default)]
  pub package_config: Value,
  #[serde(default)]
  pub inputs: BTreeMap<String, String>,
  /// Defaults to `[self_dir]` when empty.
  #[serde(default)]
  pub roots: Vec<PathBuf>,
  /// Lua file producing the stdlib table. The builtin one is used otherwise.
  #[serde(default)]
  pub stdlib: Option<PathBuf>,
  #[serde(default = "platform::default_systems")]
  pub systems: Vec<Platform>,
  #[serde(default)]
  pub default_system: Option<Platform>,
  #[serde(default)]
  pub formatter: Option<String>,
}

impl FlakeOptions {
  pub fn new(self_dir: impl Into<PathBuf>) -> Self {
    Self {
      self_dir: self_dir.into(),
      description: None,
      package_source: None,
      package_config: Value::Null,
      inputs: BTreeMap::new(),
      roots: Vec::new(),
      stdlib: None,
      systems: platform::default_systems(),
      default_system: None,
      formatter: None,
    }
  }

  pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
    self.roots = roots;
    self
  }

  pub fn with_systems(mut self, systems: Vec<Platform>) -> Self {
    self.systems = systems;
    self
  }

  pub fn with_package_source(mut self, source: impl Into<PathBuf>, config: Value) -> Self {
    self.package_source = Some(source.into());
    self.package_config = config;
    self
  }

  pub fn with_stdlib(mut self, stdlib: impl Into<PathBuf>) -> Self {
    self.stdlib = Some(stdlib.into());
    self
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.self_dir.join(path)
    }
  }

  /// Roots in composition order, resolved and canonicalized.
  pub fn effective_roots(&self) -> Vec<PathBuf> {
    if self.roots.is_empty() {
      normalize_roots(&self.self_dir, &[PathBuf::from(".")])
    } else {
      normalize_roots(&self.self_dir, &self.roots)
    }
  }

  pub fn effective_default_system(&self) -> Option<Platform> {
    platform::pick_default(self.default_system, &self.systems)
  }

  pub fn formatter_name(&self) -> &str {
    self.formatter.as_deref().unwrap_or(DEFAULT_FORMATTER)
  }
}

/// `system → name → artifact`.
pub type PerSystem = BTreeMap<String, Namespace>;

/// Output category names, in rendering order.
pub const CATEGORIES: [&str; 10] = [
  "packages",
  "devEnvironments",
  "apps",
  "checks",
  "formatter",
  "modules",
  "profiles",
  "templates",
  "utilities",
  "overlay",
];

/// The composed outputs. Holds the Lua state its values live in.
///
/// A category is `None` only in a report whose composition of that category
/// failed.
#[derive(Debug, Clone)]
pub struct OutputTree {
  lua: Lua,
  pub description: Option<String>,
  pub packages: Option<PerSystem>,
  pub dev_environments: Option<PerSystem>,
  pub apps: Option<PerSystem>,
  pub checks: Option<PerSystem>,
  pub formatter: Option<BTreeMap<String, LuaValue>>,
  pub modules: Option<BTreeMap<String, ModuleEntry>>,
  pub profiles: Option<Namespace>,
  pub templates: Option<BTreeMap<String, Template>>,
  pub utilities: Option<Namespace>,
  pub overlay: Option<LuaFunction>,
}

fn namespace_json(ns: &Namespace) -> Value {
  Value::Object(ns.iter().map(|(k, v)| (k.clone(), convert::to_json(v))).collect())
}

fn per_system_json(tree: &PerSystem) -> Value {
  Value::Object(tree.iter().map(|(k, ns)| (k.clone(), namespace_json(ns))).collect())
}

impl OutputTree {
  fn empty(lua: &Lua, description: Option<String>) -> Self {
    Self {
      lua: lua.clone(),
      description,
      packages: None,
      dev_environments: None,
      apps: None,
      checks: None,
      formatter: None,
      modules: None,
      profiles: None,
      templates: None,
      utilities: None,
      overlay: None,
    }
  }

  pub fn lua(&self) -> &Lua {
    &self.lua
  }

  /// Call the overlay with a package resolver.
  pub fn apply_overlay(&self, pkgs: LuaTable) -> Result<LuaTable, ComposeError> {
    match &self.overlay {
      Some(overlay) => Ok(overlay.call::<LuaTable>(pkgs)?),
      None => Ok(self.lua.create_table()?),
    }
  }

  /// Render as JSON. Functions render as `"<function>"`; failed categories
  /// are left out.
  pub fn to_json(&self) -> Value {
    let mut out = Map::new();
    if let Some(description) = &self.description {
      out.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(v) = &self.packages {
      out.insert("packages".into(), per_system_json(v));
    }
    if let Some(v) = &self.dev_environments {
      out.insert("devEnvironments".into(), per_system_json(v));
    }
    if let Some(v) = &self.apps {
      out.insert("apps".into(), per_system_json(v));
    }
    if let Some(v) = &self.checks {
      out.insert("checks".into(), per_system_json(v));
    }
    if let Some(v) = &self.formatter {
      out.insert(
        "formatter".into(),
        Value::Object(v.iter().map(|(k, v)| (k.clone(), convert::to_json(v))).collect()),
      );
    }
    if let Some(v) = &self.modules {
      out.insert("modules".into(), serde_json::to_value(v).unwrap_or(Value::Null));
    }
    if let Some(v) = &self.profiles {
      out.insert("profiles".into(), namespace_json(v));
    }
    if let Some(v) = &self.templates {
      out.insert("templates".into(), serde_json::to_value(v).unwrap_or(Value::Null));
    }
    if let Some(v) = &self.utilities {
      out.insert("utilities".into(), namespace_json(v));
    }
    if self.overlay.is_some() {
      out.insert("overlay".into(), Value::String("<function>".into()));
    }
    Value::Object(out)
  }

  /// Look up a dotted attribute path such as `packages.x86_64-linux.hello`.
  pub fn lookup(&self, attr: &str) -> Option<Value> {
    let mut current = self.to_json();
    for segment in attr.split('.').filter(|s| !s.is_empty()) {
      current = match current {
        Value::Object(mut map) => map.remove(segment)?,
        Value::Array(mut items) => {
          let idx: usize = segment.parse().ok()?;
          if idx >= items.len() {
            return None;
          }
          items.swap_remove(idx)
        }
        _ => return None,
      };
    }
    Some(current)
  }
}

/// One category that failed to compose.
#[derive(Debug)]
pub struct CategoryFailure {
  pub category: &'static str,
  pub error: ComposeError,
}

/// Outputs of every category that composed, plus the failures of the rest.
#[derive(Debug)]
pub struct CompositionReport {
  pub outputs: OutputTree,
  pub failures: Vec<CategoryFailure>,
}

impl CompositionReport {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }
}

/// Owns the Lua state and the collaborators of one composition.
pub struct Composer {
  lua: Lua,
  options: FlakeOptions,
  contexts: ContextBuilder,
  builder: Rc<dyn ArtifactBuilder>,
  evaluator: Rc<dyn ConfigEvaluator>,
  cache: RefCell<BTreeMap<Platform, Rc<PlatformContext>>>,
}

fn load_handle(lua: &Lua, handle: &'static str, path: &Path) -> Result<LuaValue, ComposeError> {
  loaders::import_file(lua, path).map_err(|e| ComposeError::InvalidHandle {
    handle,
    path: path.to_path_buf(),
    reason: e.to_string(),
  })
}

impl Composer {
  pub fn new(options: FlakeOptions) -> Result<Self, ComposeError> {
    let lua = runtime::create_runtime()?;
    let roots = options.effective_roots();
    debug!(roots = ?roots, "composition roots");

    let stdlib = match &options.stdlib {
      Some(path) => {
        let path = options.resolve(path);
        match load_handle(&lua, "lib", &path)? {
          LuaValue::Table(t) => t,
          other => {
            return Err(ComposeError::InvalidHandle {
              handle: "lib",
              path,
              reason: format!("expected a table, got {}", other.type_name()),
            });
          }
        }
      }
      None => stdlib::create_stdlib(&lua)?,
    };

    let inputs = lua.create_table()?;
    for (name, url) in &options.inputs {
      inputs.set(name.as_str(), url.as_str())?;
    }

    let mut contexts = ContextBuilder::new(&options.self_dir, roots, stdlib, inputs);
    if let Some(source) = &options.package_source {
      let path = options.resolve(source);
      let value = load_handle(&lua, "pkgs", &path)?;
      let config = convert::from_json(&lua, &options.package_config)?;
      contexts = contexts.with_package_source(&path, value, config);
    }

    Ok(Self {
      lua,
      options,
      contexts,
      builder: Rc::new(LuaPackageBuilder),
      evaluator: Rc::new(LuaModuleEvaluator),
      cache: RefCell::new(BTreeMap::new()),
    })
  }

  pub fn with_artifact_builder(mut self, builder: impl ArtifactBuilder + 'static) -> Self {
    self.builder = Rc::new(builder);
    self
  }

  pub fn with_config_evaluator(mut self, evaluator: impl ConfigEvaluator + 'static) -> Self {
    self.evaluator = Rc::new(evaluator);
    self
  }

  pub fn lua(&self) -> &Lua {
    &self.lua
  }

  pub fn options(&self) -> &FlakeOptions {
    &self.options
  }

  pub fn roots(&self) -> &[PathBuf] {
    self.contexts.roots()
  }

  fn platform(&self, system: &str) -> Result<Platform, ComposeError> {
    system
      .parse::<Platform>()
      .ok()
      .filter(|p| self.options.systems.contains(p))
      .ok_or_else(|| ComposeError::UnsupportedPlatform(system.to_string()))
  }

  /// The context for `system`, built on first use.
  pub fn context(&self, system: &str) -> Result<Rc<PlatformContext>, ComposeError> {
    let platform = self.platform(system)?;
    if let Some(ctx) = self.cache.borrow().get(&platform) {
      return Ok(Rc::clone(ctx));
    }
    let ctx = Rc::new(self.contexts.build(&self.lua, platform, None)?);
    self.cache.borrow_mut().insert(platform, Rc::clone(&ctx));
    Ok(ctx)
  }

  pub fn packages(&self, system: &str) -> Result<Namespace, ComposeError> {
    compose_packages(&self.lua, &*self.context(system)?, self.builder.as_ref())
  }

  pub fn dev_environments(&self, system: &str) -> Result<Namespace, ComposeError> {
    compose_dev_environments(&self.lua, &*self.context(system)?)
  }

  pub fn apps(&self, system: &str) -> Result<Namespace, ComposeError> {
    compose_apps(&self.lua, &*self.context(system)?)
  }

  pub fn checks(&self, system: &str) -> Result<Namespace, ComposeError> {
    compose_checks(&self.lua, &*self.context(system)?)
  }

  /// The formatter package of `system`, if the resolver has one.
  pub fn formatter(&self, system: &str) -> Result<Option<LuaValue>, ComposeError> {
    let ctx = self.context(system)?;
    let Some(pkgs) = &ctx.package_resolver else {
      return Ok(None);
    };
    match pkgs.get::<LuaValue>(self.options.formatter_name())? {
      LuaValue::Nil => Ok(None),
      value => Ok(Some(value)),
    }
  }

  pub fn modules(&self) -> Result<BTreeMap<String, ModuleEntry>, ComposeError> {
    compose_modules(self.roots())
  }

  /// Profiles are evaluated for the default system only.
  pub fn profiles(&self) -> Result<Namespace, ComposeError> {
    let system = self
      .options
      .effective_default_system()
      .ok_or_else(|| ComposeError::UnsupportedPlatform("<no supported systems>".to_string()))?;
    let ctx = self.context(&system.triple())?;
    let modules = discover_modules(self.roots())?;
    compose_profiles(&self.lua, &ctx, &modules, self.evaluator.as_ref())
  }

  pub fn templates(&self) -> Result<BTreeMap<String, Template>, ComposeError> {
    compose_templates(&self.lua, self.roots())
  }

  /// Platform-independent utilities: Tier0 and Tier1.
  pub fn utilities(&self) -> Result<Namespace, ComposeError> {
    let utilities = BaseUtilities::load(&self.lua, self.roots())?.with_stdlib(&self.lua, self.contexts.stdlib())?;
    Ok(utilities.namespace())
  }

  /// A Lua function from a package resolver to this flake's packages,
  /// composed against that resolver.
  pub fn overlay(&self) -> Result<LuaFunction, ComposeError> {
    let contexts = self.contexts.clone();
    let builder = Rc::clone(&self.builder);
    let fallback = self.options.effective_default_system();

    let overlay = self.lua.create_function(move |lua, pkgs: LuaTable| {
      let platform = match pkgs.get::<Option<String>>("system")? {
        Some(system) => system.parse::<Platform>().map_err(LuaError::external)?,
        None => fallback.ok_or_else(|| LuaError::external("overlay needs pkgs.system or a default system"))?,
      };
      let ctx = contexts
        .build(lua, platform, Some(pkgs))
        .map_err(LuaError::external)?;
      let packages = compose_packages(lua, &ctx, builder.as_ref()).map_err(LuaError::external)?;
      crate::namespace::to_table(lua, &packages)
    })?;
    Ok(overlay)
  }

  fn per_system<T>(&self, mut f: impl FnMut(&str) -> Result<T, ComposeError>) -> Result<BTreeMap<String, T>, ComposeError> {
    let mut out = BTreeMap::new();
    for platform in &self.options.systems {
      let system = platform.triple();
      let value = f(&system)?;
      out.insert(system, value);
    }
    Ok(out)
  }

  fn formatters(&self) -> Result<BTreeMap<String, LuaValue>, ComposeError> {
    let all = self.per_system(|system| self.formatter(system))?;
    Ok(all.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect())
  }

  /// Compose every category, failing on the first error.
  pub fn compose(&self) -> Result<OutputTree, ComposeError> {
    let mut tree = OutputTree::empty(&self.lua, self.options.description.clone());
    tree.packages = Some(self.per_system(|s| self.packages(s))?);
    tree.dev_environments = Some(self.per_system(|s| self.dev_environments(s))?);
    tree.apps = Some(self.per_system(|s| self.apps(s))?);
    tree.checks = Some(self.per_system(|s| self.checks(s))?);
    tree.formatter = Some(self.formatters()?);
    tree.modules = Some(self.modules()?);
    tree.profiles = Some(self.profiles()?);
    tree.templates = Some(self.templates()?);
    tree.utilities = Some(self.utilities()?);
    tree.overlay = Some(self.overlay()?);
    info!(systems = self.options.systems.len(), "composition complete");
    Ok(tree)
  }

  /// Compose every category, recording failures instead of stopping.
  pub fn compose_report(&self) -> CompositionReport {
    let mut tree = OutputTree::empty(&self.lua, self.options.description.clone());
    let mut failures = Vec::new();

    fn keep<T>(category: &'static str, result: Result<T, ComposeError>, failures: &mut Vec<CategoryFailure>) -> Option<T> {
      match result {
        Ok(value) => Some(value),
        Err(error) => {
          warn!(category, %error, "category failed to compose");
          failures.push(CategoryFailure { category, error });
          None
        }
      }
    }

    tree.packages = keep("packages", self.per_system(|s| self.packages(s)), &mut failures);
    tree.dev_environments = keep("devEnvironments", self.per_system(|s| self.dev_environments(s)), &mut failures);
    tree.apps = keep("apps", self.per_system(|s| self.apps(s)), &mut failures);
    tree.checks = keep("checks", self.per_system(|s| self.checks(s)), &mut failures);
    tree.formatter = keep("formatter", self.formatters(), &mut failures);
    tree.modules = keep("modules", self.modules(), &mut failures);
    tree.profiles = keep("profiles", self.profiles(), &mut failures);
    tree.templates = keep("templates", self.templates(), &mut failures);
    tree.utilities = keep("utilities", self.utilities(), &mut failures);
    tree.overlay = keep("overlay", self.overlay(), &mut failures);

    CompositionReport { outputs: tree, failures }
  }
}
