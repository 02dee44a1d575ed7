//! Files written by `fhs init`, relative to the project directory.

macro_rules! scaffold {
  ($($path:literal),* $(,)?) => {
    &[$(($path, include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../lua/scaffold/", $path)))),*]
  };
}

/// `(relative path, content)` of every scaffolded component file.
pub const SCAFFOLD_FILES: &[(&str, &str)] = scaffold![
  "flake.lua",
  "pkgs/hello/default.lua",
  "shells/default/default.lua",
  "apps/hello/default.lua",
  "modules/motd/options.lua",
  "modules/motd/config.lua",
  "profiles/example/configuration.lua",
  "checks/hello.lua",
  "utils/strings.lua",
  "utils/more/paths.lua",
];

/// LuaLS configuration declaring the globals component files see.
pub const LUARC_JSON_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../lua/scaffold/luarc.json"));
