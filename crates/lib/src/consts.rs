//! Layout conventions shared by discovery and composition.

/// Extension of every component file.
pub const LUA_EXT: &str = "lua";

/// Index / entry file of a component directory.
pub const ENTRY_FILE: &str = "default.lua";

/// Project entrypoint at the root of a flake directory.
pub const FLAKE_FILE: &str = "flake.lua";

pub const PACKAGES_DIR: &str = "pkgs";
pub const SHELLS_DIR: &str = "shells";
pub const APPS_DIR: &str = "apps";
pub const MODULES_DIR: &str = "modules";
pub const PROFILES_DIR: &str = "profiles";
pub const CHECKS_DIR: &str = "checks";
pub const TEMPLATES_DIR: &str = "templates";
pub const UTILITIES_DIR: &str = "utils";

/// Subdirectory holding the next utility tier (`utils/more`, `utils/more/more`).
pub const MORE_DIR: &str = "more";

/// Option schema of a guarded module.
pub const MODULE_SCHEMA_FILE: &str = "options.lua";
/// Conditional logic of a guarded module.
pub const MODULE_LOGIC_FILE: &str = "config.lua";

pub const PROFILE_ENTRY_FILE: &str = "configuration.lua";

/// Descriptor read for a template's description.
pub const TEMPLATE_DESCRIPTOR_FILE: &str = "flake.lua";

/// Entries starting with this marker are never discovered.
pub const HIDDEN_MARKER: char = '.';

/// Synthesized module entry that imports every discovered module.
pub const DEFAULT_MODULE: &str = "default";

pub const DEFAULT_FORMATTER: &str = "stylua";

pub const DEFAULT_SYSTEMS: [&str; 4] = ["x86_64-linux", "aarch64-linux", "x86_64-darwin", "aarch64-darwin"];
