//! Version gates and optional-module resolution.
//!
//! Nothing here consults a package index: the set of modules is fixed by the
//! stack file, and resolution only decides what gets wired into each build.

pub mod optional;
pub mod version;

pub use optional::{resolve, ExclusionReason, Resolution};
pub use version::{evaluate, MalformedVersionPolicy, ReleaseVersion, VersionOrdering};
