//! High-level operations.
//!
//! This module contains the implementation of ilcstack commands. Every
//! command loads the stack, prepares it, and then works on the prepared
//! module states.

pub mod check;
pub mod env;
pub mod install;
pub mod link;
pub mod load;
pub mod plan;
pub mod prepare;

pub use check::{check, format_report, CheckReport};
pub use env::{environment, ModuleEnvironment};
pub use install::{install, InstallOptions, InstallReport, ModuleOutcome};
pub use link::link;
pub use load::{load_stack, LoadedStack, StackSettings};
pub use plan::{format_plan, plan, ModulePlan};
pub use prepare::{prepare, PreparedStack};
