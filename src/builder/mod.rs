//! Build orchestration for a single module.
//!
//! Backends generate commands, the sequencer runs them in order through a
//! tool runner, the linker maintains package links, and the composer writes
//! the environment files a workspace build includes.

pub mod backend;
pub mod compose;
pub mod events;
pub mod linker;
pub mod sequencer;
pub mod tool;

pub use backend::{backend_for, BackendKind, BuildBackend, ToolSettings};
pub use compose::{compose, ComposedEnvironment, EnvDocument, RunInfo};
pub use events::BuildEvent;
pub use linker::{LinkReport, PackageLinker};
pub use sequencer::{BuildSequencer, PlannedAction, PlannedStep, SequenceReport, Step};
pub use tool::{Invocation, SystemRunner, ToolRunner, ToolStatus};
