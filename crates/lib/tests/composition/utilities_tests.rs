//! Staged utility injection.

use fhs_lib::ComposeError;
use fhs_lib::flake::FlakeOptions;
use fhs_lib::utilities::BaseUtilities;
use mlua::prelude::*;

use super::common::{Root, SYSTEM, composer, options, text};

#[test]
fn tier0_needs_no_arguments() {
  let root = Root::new();
  root.write("utils/base.lua", "return { double = function(x) return x * 2 end }");
  let lua = Lua::new();
  let base = BaseUtilities::load(&lua, &[root.path().to_path_buf()]).unwrap();
  assert!(base.namespace().contains_key("double"));
}

#[test]
fn tier2_without_resolver_fails() {
  let root = Root::new();
  root.write("utils/more/more/p.lua", "return function(a) return { p = a.pkgs.hello } end");
  let err = composer(&[&root]).context(SYSTEM).unwrap_err();
  assert!(matches!(err, ComposeError::MissingCapability { capability: "pkgs", .. }), "{err}");
}

#[test]
fn tier2_sees_resolver_and_earlier_tiers() {
  let root = Root::new();
  root.write("utils/names.lua", "return { prefix = 'pkg-' }");
  root.write("utils/more/join.lua", "return function(a) return { join = function(x) return prefix .. x end } end");
  root.write(
    "utils/more/more/hello.lua",
    "return function(a) return { hello_name = join(a.pkgs.hello) } end",
  );
  root.write("resolver.lua", "return function(a) return { hello = 'hello-' .. a.system } end");

  let options = options(&[&root]).with_package_source("resolver.lua", serde_json::Value::Null);
  let composer = fhs_lib::Composer::new(options).unwrap();
  let ctx = composer.context(SYSTEM).unwrap();
  assert_eq!(text(&ctx.utilities["hello_name"]), "pkg-hello-x86_64-linux");
}

#[test]
fn earlier_tier_cannot_see_later_tier() {
  let root = Root::new();
  root.write("utils/early.lua", "return { seen = type(late) }");
  root.write("utils/more/late.lua", "return function() return { late = 1 } end");
  let utils = composer(&[&root]).utilities().unwrap();
  assert_eq!(text(&utils["seen"]), "nil");
}

#[test]
fn roots_run_their_own_pipelines() {
  let (a, b) = (Root::new(), Root::new());
  a.write("utils/only_a.lua", "return { secret = 'a' }");
  b.write("utils/more/probe.lua", "return function() return { probe = type(secret) } end");
  let utils = composer(&[&a, &b]).utilities().unwrap();
  assert_eq!(text(&utils["probe"]), "nil");
}

#[test]
fn custom_stdlib_is_injected() {
  let root = Root::new();
  root.write("mylib.lua", "return { shout = function(s) return string.upper(s) end }");
  root.write("utils/more/loud.lua", "return function(a) return { loud = a.lib.shout('hi') } end");
  let composer = fhs_lib::Composer::new(FlakeOptions::new(root.path()).with_stdlib("mylib.lua")).unwrap();
  let utils = composer.utilities().unwrap();
  assert_eq!(text(&utils["loud"]), "HI");
}

#[test]
fn tier0_function_is_malformed() {
  let root = Root::new();
  root.write("utils/bad.lua", "return function() return {} end");
  let err = composer(&[&root]).utilities().unwrap_err();
  assert!(matches!(err, ComposeError::Malformed { .. }), "{err}");
}
