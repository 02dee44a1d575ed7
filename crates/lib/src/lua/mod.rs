//! Lua runtime and evaluation.
//!
//! Components are Lua files. This module owns the VM setup, the per-file
//! loaders, the builtin stdlib handle, and conversion of Lua values to JSON.
//!
//! # Submodules
//!
//! - [`convert`] - Lua ↔ JSON
//! - [`globals`] - The `fhs` global table
//! - [`loaders`] - File loading with `__dir` and enclosing scopes
//! - [`runtime`] - VM creation
//! - [`stdlib`] - Builtin `lib` handle

pub mod convert;
pub mod globals;
pub mod loaders;
pub mod runtime;
pub mod stdlib;
