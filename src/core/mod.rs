//! Core data structures for ilcstack.
//!
//! This module contains the foundational types used throughout ilcstack:
//! - Module identifiers and their built-in descriptors
//! - Per-module runtime state and build environment
//! - The stack registry and its dependency graph
//! - The stack file
//! - Lifecycle hooks

pub mod dependency;
pub mod descriptor;
pub mod env_store;
pub mod error;
pub mod hooks;
pub mod manifest;
pub mod module;
pub mod module_id;
pub mod stack;

pub use dependency::{DependencyEdge, DependencyGraph, DependencyKind};
pub use descriptor::{FileGroup, ModuleDescriptor, ModuleRole};
pub use env_store::EnvStore;
pub use error::{InstallError, Warning};
pub use manifest::{find_stack_file, StackManifest, STACK_FILE_NAME};
pub use module::{Mode, Module, ModuleStatus};
pub use module_id::ModuleId;
pub use stack::Stack;
