//! fhs-lib: convention-over-configuration output composition.
//!
//! Given one or more project roots, components are discovered by directory
//! layout alone and assembled into a per-platform output tree:
//! - `discover`: enumerate components of a class across roots
//! - `utilities`: the three-tier utility injection pipeline
//! - `context`: per-platform invocation contexts
//! - `compose`: class-specific precedence and invocation rules
//! - `flake`: the top-level [`Composer`] and its [`OutputTree`]

pub mod backend;
pub mod compose;
pub mod config;
pub mod consts;
pub mod context;
pub mod discover;
pub mod error;
pub mod flake;
pub mod fs;
pub mod init;
pub mod lua;
pub mod namespace;
pub mod platform;
pub mod utilities;
pub mod validate;

pub use error::ComposeError;
pub use flake::{Composer, CompositionReport, FlakeOptions, OutputTree};
