pub mod arch;
pub mod os;

use arch::Arch;
use os::Os;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SYSTEMS;

/// Platform identifier combining architecture and OS (e.g., "aarch64-darwin")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the platform triple string (e.g., "aarch64-darwin")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl FromStr for Platform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (arch, os) = s
      .split_once('-')
      .ok_or_else(|| format!("'{}' is not an <arch>-<os> triple", s))?;
    Ok(Self::new(arch.parse()?, os.parse()?))
  }
}

impl TryFrom<String> for Platform {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Platform> for String {
  fn from(value: Platform) -> Self {
    value.triple()
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

/// Returns the platform triple for the current system (e.g., "aarch64-darwin")
///
/// Returns `None` if the current platform is not supported
pub fn platform_triple() -> Option<String> {
  Platform::current().map(|p| p.triple())
}

/// The systems a flake targets when its entrypoint does not list any.
pub fn default_systems() -> Vec<Platform> {
  DEFAULT_SYSTEMS.iter().filter_map(|s| s.parse().ok()).collect()
}

/// Pick the platform used for platform-less outputs such as profiles.
///
/// An explicit choice wins; otherwise the host platform is used when the
/// flake supports it, falling back to the first supported system.
pub fn pick_default(explicit: Option<Platform>, supported: &[Platform]) -> Option<Platform> {
  if explicit.is_some() {
    return explicit;
  }
  match Platform::current() {
    Some(host) if supported.contains(&host) => Some(host),
    _ => supported.first().copied(),
  }
}
