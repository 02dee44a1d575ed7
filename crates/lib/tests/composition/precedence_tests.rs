//! Cross-root precedence of every component class.

use super::common::{Root, SYSTEM, composer, text};

mod later_root_wins {
  use super::*;

  #[test]
  fn dev_environments() {
    let (a, b) = (Root::new(), Root::new());
    a.component("shells/dev/default.lua", "A");
    b.component("shells/dev/default.lua", "B");
    let shells = composer(&[&a, &b]).dev_environments(SYSTEM).unwrap();
    assert_eq!(text(&shells["dev"]), "B");
  }

  #[test]
  fn apps() {
    let (a, b) = (Root::new(), Root::new());
    a.component("apps/run/default.lua", "A");
    b.component("apps/run/default.lua", "B");
    a.component("apps/only-a/default.lua", "A");
    let apps = composer(&[&a, &b]).apps(SYSTEM).unwrap();
    assert_eq!(text(&apps["run"]), "B");
    assert_eq!(text(&apps["only-a"]), "A");
  }

  #[test]
  fn controlled_packages() {
    let (a, b) = (Root::new(), Root::new());
    a.write("pkgs/default.lua", "return function() return { x = 'A', y = 'A' } end");
    b.write("pkgs/default.lua", "return function() return { x = 'B' } end");
    let pkgs = composer(&[&a, &b]).packages(SYSTEM).unwrap();
    assert_eq!(text(&pkgs["x"]), "B");
    assert_eq!(text(&pkgs["y"]), "A");
  }

  #[test]
  fn controlled_mode_applies_to_every_root() {
    let (a, b) = (Root::new(), Root::new());
    a.component("pkgs/auto/default.lua", "A");
    b.write("pkgs/default.lua", "return function() return { curated = 'B' } end");
    let pkgs = composer(&[&a, &b]).packages(SYSTEM).unwrap();
    assert_eq!(pkgs.keys().collect::<Vec<_>>(), vec!["curated"]);
  }

  #[test]
  fn modules() {
    let (a, b) = (Root::new(), Root::new());
    a.write("modules/users/default.lua", "return {}");
    b.write("modules/users/options.lua", "return {}");
    let modules = composer(&[&a, &b]).modules().unwrap();
    assert_eq!(modules["users"].imports, vec![b.path().join("modules/users/options.lua")]);
  }

  #[test]
  fn empty_module_dir_does_not_shadow() {
    let (a, b) = (Root::new(), Root::new());
    a.write("modules/users/default.lua", "return {}");
    std::fs::create_dir_all(b.path().join("modules/users")).unwrap();
    let modules = composer(&[&a, &b]).modules().unwrap();
    assert_eq!(modules["users"].imports, vec![a.path().join("modules/users/default.lua")]);
  }

  #[test]
  fn utilities() {
    let (a, b) = (Root::new(), Root::new());
    a.write("utils/u.lua", "return { who = 'A', a_only = true }");
    b.write("utils/u.lua", "return { who = 'B' }");
    let utils = composer(&[&a, &b]).utilities().unwrap();
    assert_eq!(text(&utils["who"]), "B");
    assert!(utils.contains_key("a_only"));
  }

  #[test]
  fn checks() {
    let (a, b) = (Root::new(), Root::new());
    a.component("checks/fmt.lua", "A");
    b.component("checks/fmt.lua", "B");
    let checks = composer(&[&a, &b]).checks(SYSTEM).unwrap();
    assert_eq!(text(&checks["fmt"]), "B");
  }
}

mod earlier_root_wins {
  use super::*;

  #[test]
  fn auto_discovered_packages() {
    let (a, b) = (Root::new(), Root::new());
    a.component("pkgs/x/default.lua", "A");
    b.component("pkgs/x/default.lua", "B");
    b.component("pkgs/only-b/default.lua", "B");
    let pkgs = composer(&[&a, &b]).packages(SYSTEM).unwrap();
    assert_eq!(text(&pkgs["x"]), "A");
    assert_eq!(text(&pkgs["only-b"]), "B");
  }

  #[test]
  fn shadowed_package_is_never_built() {
    let (a, b) = (Root::new(), Root::new());
    a.component("pkgs/x/default.lua", "A");
    b.write("pkgs/x/default.lua", "error('shadowed package was built')");
    assert!(composer(&[&a, &b]).packages(SYSTEM).is_ok());
  }
}

mod checks {
  use super::*;

  #[test]
  fn file_mode_wins_name_collision() {
    let root = Root::new();
    root.component("checks/foo.lua", "file");
    root.component("checks/foo/default.lua", "dir");
    root.component("checks/bar/default.lua", "dir");
    let checks = composer(&[&root]).checks(SYSTEM).unwrap();
    assert_eq!(text(&checks["foo"]), "file");
    assert_eq!(text(&checks["bar"]), "dir");
    assert_eq!(checks.len(), 2);
  }

  #[test]
  fn file_in_earlier_root_wins_over_later_directory() {
    let (a, b) = (Root::new(), Root::new());
    a.component("checks/foo.lua", "file-A");
    b.component("checks/foo/default.lua", "dir-B");
    let checks = composer(&[&a, &b]).checks(SYSTEM).unwrap();
    assert_eq!(text(&checks["foo"]), "file-A");
    assert_eq!(checks.len(), 1);
  }
}

mod templates {
  use super::*;

  #[test]
  fn duplicate_names_keep_the_last_root() {
    let (a, b) = (Root::new(), Root::new());
    a.write("templates/app/flake.lua", "return { description = 'from A' }");
    b.write("templates/app/flake.lua", "return { description = 'from B' }");
    let templates = composer(&[&a, &b]).templates().unwrap();
    assert_eq!(templates["app"].description, "from B");
  }
}
