//! Module and profile composition.

use fhs_lib::backend::{ConfigEvaluator, ModuleSource};
use fhs_lib::context::PlatformContext;
use fhs_lib::ComposeError;
use mlua::prelude::*;

use super::common::{Root, composer, text};

#[test]
fn guarded_module_with_logic_imports_both() {
  let root = Root::new();
  root.write("modules/nginx/options.lua", "return {}");
  let modules = composer(&[&root]).modules().unwrap();
  assert_eq!(modules["nginx"].imports.len(), 1);

  root.write("modules/nginx/config.lua", "return {}");
  let modules = composer(&[&root]).modules().unwrap();
  let dir = root.path().join("modules/nginx");
  assert_eq!(modules["nginx"].imports, vec![dir.join("options.lua"), dir.join("config.lua")]);
}

#[test]
fn profile_enables_guarded_module() {
  let root = Root::new();
  root.write(
    "modules/motd/options.lua",
    "return { options = { motd = { enable = { default = false }, text = { default = 'hi' } } } }",
  );
  root.write(
    "modules/motd/config.lua",
    r#"return function(a)
         if not a.config.motd.enable then return {} end
         return { config = { etc = { motd = a.config.motd.text } } }
       end"#,
  );
  root.write(
    "profiles/on/configuration.lua",
    "return { config = { motd = { enable = true } } }",
  );
  root.write("profiles/off/configuration.lua", "return {}");

  let profiles = composer(&[&root]).profiles().unwrap();
  let etc = |name: &str| -> LuaValue {
    let config: LuaTable = profiles[name].as_table().unwrap().get("config").unwrap();
    config.get("etc").unwrap()
  };
  let on: LuaTable = etc("on").as_table().unwrap().clone();
  assert_eq!(text(&on.get::<LuaValue>("motd").unwrap()), "hi");
  assert!(etc("off").is_nil());
}

#[test]
fn profile_without_configuration_file_fails() {
  let root = Root::new();
  root.mkdir("profiles/empty");
  let err = composer(&[&root]).profiles().unwrap_err();
  assert!(matches!(err, ComposeError::MissingFile { .. }), "{err}");
}

struct Recording;

impl ConfigEvaluator for Recording {
  fn evaluate(
    &self,
    lua: &Lua,
    name: &str,
    modules: &[ModuleSource],
    _ctx: &PlatformContext,
    extra: &LuaTable,
  ) -> Result<LuaValue, ComposeError> {
    let out = lua.create_table()?;
    out.set("name", name)?;
    out.set("injected", extra.get::<String>("name")?)?;
    out.set("count", modules.len())?;
    out.set("first_is_placeholder", modules.first() == Some(&ModuleSource::Placeholder))?;
    Ok(LuaValue::Table(out))
  }
}

#[test]
fn evaluator_receives_full_module_list() {
  let root = Root::new();
  root.write("modules/a/default.lua", "return {}");
  root.write("modules/b/options.lua", "return {}");
  root.write("modules/b/config.lua", "return {}");
  root.mkdir("modules/empty");
  root.write("profiles/web/configuration.lua", "return {}");

  let composer = composer(&[&root]).with_config_evaluator(Recording);
  let profiles = composer.profiles().unwrap();
  let web = profiles["web"].as_table().unwrap();
  assert_eq!(web.get::<String>("injected").unwrap(), "web");
  // placeholder + configuration + a + b/options + b/config
  assert_eq!(web.get::<i64>("count").unwrap(), 5);
  assert!(web.get::<bool>("first_is_placeholder").unwrap());
}

#[test]
fn evaluator_failure_propagates() {
  let root = Root::new();
  root.write("profiles/bad/configuration.lua", "return function() error('nope') end");
  let err = composer(&[&root]).profiles().unwrap_err();
  match err {
    ComposeError::Evaluator { profile, reason } => {
      assert_eq!(profile, "bad");
      assert!(reason.contains("nope"), "{reason}");
    }
    other => panic!("unexpected error: {other}"),
  }
}
