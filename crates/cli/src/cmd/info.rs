use fhs_lib::platform::{default_systems, platform_triple};

use crate::output::print_stat;

pub fn cmd_info() {
  println!("System:");
  match platform_triple() {
    Some(triple) => print_stat("Platform", &triple),
    _ => println!("Could not detect platform."),
  }
  let systems: Vec<String> = default_systems().iter().map(|p| p.triple()).collect();
  print_stat("Default systems", &systems.join(", "));
  print_stat("Version", env!("CARGO_PKG_VERSION"));
}
