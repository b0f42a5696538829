//! Build event types for JSON output.
//!
//! These events are emitted one per line when using `--message-format=json`.
//!
//! # Event Types
//!
//! - `module-started`: a module's build sequence begins
//! - `step-finished`: a build step completed, or was skipped
//! - `warning`: a non-fatal problem, with the warning's own `kind`
//! - `module-finished`: a module's sequence ended (success or failure)
//! - `build-finished`: the whole installation run ended
//!
//! # Stability
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use serde::Serialize;

use crate::builder::sequencer::Step;
use crate::core::error::Warning;

/// An event emitted during an installation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "module-started")]
    ModuleStarted {
        module: String,
        version: String,
        backend: String,
    },

    #[serde(rename = "step-finished")]
    StepFinished {
        module: String,
        step: Step,
        skipped: bool,
    },

    #[serde(rename = "warning")]
    Warning {
        #[serde(flatten)]
        warning: Warning,
    },

    #[serde(rename = "module-finished")]
    ModuleFinished {
        module: String,
        success: bool,
        /// Step that failed, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        failed_step: Option<Step>,
    },

    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        duration_ms: u64,
        /// Modules built in this run
        modules_built: u64,
    },
}

impl BuildEvent {
    /// Create a build finished event.
    pub fn finished(success: bool, duration_ms: u64, modules_built: u64) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            modules_built,
        }
    }

    pub fn warning(warning: Warning) -> Self {
        BuildEvent::Warning { warning }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
