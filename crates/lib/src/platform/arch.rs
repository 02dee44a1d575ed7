use std::fmt;
use std::str::FromStr;

/// CPU architectures a flake can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
  X86_64,
  Aarch64,
  I686,
  Riscv64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    std::env::consts::ARCH.parse().ok()
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
      Self::I686 => "i686",
      Self::Riscv64 => "riscv64",
    }
  }
}

impl FromStr for Arch {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "x86_64" => Ok(Self::X86_64),
      "aarch64" => Ok(Self::Aarch64),
      "i686" | "x86" => Ok(Self::I686),
      "riscv64" => Ok(Self::Riscv64),
      other => Err(format!("unknown architecture '{}'", other)),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
