//! ilcstack - dependency-aware installer for the Marlin/ilcsoft module stack
//!
//! This crate provides the core library functionality for ilcstack,
//! including optional-module resolution, environment composition, and
//! build sequencing.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for ilcstack unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted tool runner and installation
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{InstallError, Module, ModuleId, Stack, Warning};
pub use util::context::GlobalContext;
