//! Whole-tree composition.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fhs_lib::backend::ArtifactBuilder;
use fhs_lib::context::PlatformContext;
use fhs_lib::{ComposeError, Composer, FlakeOptions};
use mlua::prelude::*;
use serde_json::{Value, json};

use super::common::{Root, SYSTEM, composer};

/// Records every build request instead of evaluating the package.
#[derive(Clone, Default)]
struct RecordingBuilder {
  calls: Rc<RefCell<Vec<(String, PathBuf, usize)>>>,
}

impl ArtifactBuilder for RecordingBuilder {
  fn build_artifact(
    &self,
    lua: &Lua,
    name: &str,
    dir: &Path,
    ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError> {
    let extra_len = extra.pairs::<LuaValue, LuaValue>().count();
    self.calls.borrow_mut().push((name.to_string(), dir.to_path_buf(), extra_len));
    Ok(LuaValue::String(lua.create_string(ctx.system())?))
  }
}

#[test]
fn auto_discovered_package_gets_empty_extra_args() {
  let (a, b) = (Root::new(), Root::new());
  a.write("pkgs/a/default.lua", "return function() return 'A' end");
  b.write("pkgs/a/default.lua", "return function() return 'B' end");
  b.write("pkgs/b/default.lua", "return function() return 'B' end");

  let builder = RecordingBuilder::default();
  let composer = composer(&[&a, &b]).with_artifact_builder(builder.clone());
  let pkgs = composer.packages(SYSTEM).unwrap();
  assert_eq!(pkgs.len(), 2);

  let calls = builder.calls.borrow();
  assert_eq!(
    *calls,
    vec![
      ("a".to_string(), a.path().join("pkgs/a"), 0),
      ("b".to_string(), b.path().join("pkgs/b"), 0),
    ]
  );
}

#[test]
fn composition_is_idempotent() {
  let root = Root::new();
  root.write("pkgs/a/default.lua", "return function(a) return { n = #a.roots } end");
  root.write("shells/dev/default.lua", "return function(a) return a.system end");
  root.write("modules/m/default.lua", "return {}");
  root.write("templates/t/flake.lua", "return { description = 't' }");
  root.write("utils/u.lua", "return { f = function() end }");

  let first = composer(&[&root]).compose().unwrap().to_json();
  let second = composer(&[&root]).compose().unwrap().to_json();
  assert_eq!(first, second);
  assert_eq!(first["utilities"]["f"], Value::String("<function>".into()));
  assert_eq!(first["overlay"], Value::String("<function>".into()));
}

#[test]
fn composed_overlay_rebuilds_packages_with_given_resolver() {
  let root = Root::new();
  root.write(
    "pkgs/hello/default.lua",
    "return function(a) return (a.pkgs and a.pkgs.tag or 'none') .. ':' .. a.system end",
  );
  let tree = composer(&[&root]).compose().unwrap();

  let pkgs: LuaTable = tree
    .lua()
    .load("return { tag = 'overlay', system = 'aarch64-darwin' }")
    .eval()
    .unwrap();
  let out = tree.apply_overlay(pkgs).unwrap();
  assert_eq!(out.get::<String>("hello").unwrap(), "overlay:aarch64-darwin");
}

#[test]
fn empty_project_has_every_category() {
  let root = Root::new();
  let tree = composer(&[&root]).compose().unwrap().to_json();
  for category in fhs_lib::flake::CATEGORIES {
    if category == "formatter" || category == "overlay" {
      continue;
    }
    assert!(tree.get(category).is_some(), "missing {category}");
  }
  assert_eq!(tree["modules"]["default"]["imports"], json!([]));
  assert_eq!(tree["packages"][SYSTEM], json!({}));
}

#[test]
fn every_system_gets_its_own_context() {
  let root = Root::new();
  root.write("pkgs/a/default.lua", "return function(a) return a.system end");
  let options = FlakeOptions::new(root.path())
    .with_systems(vec!["x86_64-linux".parse().unwrap(), "aarch64-darwin".parse().unwrap()]);
  let tree = Composer::new(options).unwrap().compose().unwrap();
  assert_eq!(tree.lookup("packages.aarch64-darwin.a"), Some(json!("aarch64-darwin")));
  assert_eq!(tree.lookup("packages.x86_64-linux.a"), Some(json!("x86_64-linux")));
}

#[test]
fn components_see_inputs_and_self() {
  let root = Root::new();
  root.write(
    "apps/show/default.lua",
    "return function(a) return { fhs = a.inputs.fhs, has_self = type(a.self) == 'string' } end",
  );
  let mut options = FlakeOptions::new(root.path()).with_systems(vec![SYSTEM.parse().unwrap()]);
  options.inputs.insert("fhs".into(), "github:luochen1990/flake-fhs".into());
  let tree = Composer::new(options).unwrap().compose().unwrap();
  assert_eq!(
    tree.lookup("apps.x86_64-linux.show"),
    Some(json!({ "fhs": "github:luochen1990/flake-fhs", "has_self": true }))
  );
}

#[test]
fn report_isolates_failing_category() {
  let root = Root::new();
  root.write("checks/broken.lua", "return function() error('check exploded') end");
  root.write("pkgs/ok/default.lua", "return function() return 'ok' end");

  let report = composer(&[&root]).compose_report();
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].category, "checks");
  assert!(report.failures[0].error.to_string().contains("broken"));
  assert_eq!(report.outputs.lookup("packages.x86_64-linux.ok"), Some(json!("ok")));
  assert!(report.outputs.to_json().get("checks").is_none());
}

#[test]
fn entrypoint_roots_are_relative_to_project() {
  let root = Root::new();
  root.write(
    "flake.lua",
    r#"return { roots = { ".", "nix" }, systems = { "x86_64-linux" } }"#,
  );
  root.write("pkgs/a/default.lua", "return function() return 'top' end");
  root.write("nix/pkgs/a/default.lua", "return function() return 'nix' end");
  root.write("nix/shells/s/default.lua", "return function() return 'nix' end");

  let options = fhs_lib::config::load_options(root.path()).unwrap();
  let tree = Composer::new(options).unwrap().compose().unwrap();
  assert_eq!(tree.lookup("packages.x86_64-linux.a"), Some(json!("top")));
  assert_eq!(tree.lookup("devEnvironments.x86_64-linux.s"), Some(json!("nix")));
}
