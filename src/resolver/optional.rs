//! Optional module resolution.
//!
//! Decides which of a module's optional modules are wired into its build.
//! The CMake backend probes the filesystem for every "build with" candidate
//! on its own, so excluded candidates must be switched off explicitly; the
//! resolution therefore keeps the exclusions, not just the inclusions.

use std::fmt;

use crate::core::descriptor::ModuleRole;
use crate::core::module::Module;
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;

/// Why an optional module was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Not part of this installation
    Absent,
    /// Switched off in the stack file
    Disabled,
    /// Present but not usable by this module's backend
    Incompatible,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Absent => write!(f, "not in stack"),
            ExclusionReason::Disabled => write!(f, "disabled"),
            ExclusionReason::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// Outcome of resolving a module's optional modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Included modules, in descriptor order
    pub included: Vec<ModuleId>,
    /// Excluded modules with the reason, in descriptor order
    pub excluded: Vec<(ModuleId, ExclusionReason)>,
}

impl Resolution {
    pub fn is_included(&self, id: ModuleId) -> bool {
        self.included.contains(&id)
    }

    pub fn is_excluded(&self, id: ModuleId) -> bool {
        self.excluded.iter().any(|(e, _)| *e == id)
    }

    /// Excluded identifiers.
    pub fn excluded_ids(&self) -> Vec<ModuleId> {
        self.excluded.iter().map(|(id, _)| *id).collect()
    }

    /// Modules that need an explicit negative switch for the CMake backend:
    /// every excluded "build with" candidate of `module`, and every excluded
    /// module that is part of the stack.
    pub fn build_without(&self, module: &Module) -> Vec<ModuleId> {
        self.excluded
            .iter()
            .filter(|(id, reason)| {
                *reason != ExclusionReason::Absent || module.descriptor.is_build_with(*id)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Included plugin packages in stack order; these get linked into the
    /// module's workspace.
    pub fn packages(&self, stack: &Stack) -> Vec<ModuleId> {
        let packages = self.included.iter().copied().filter(|id| {
            stack
                .get(*id)
                .map(|m| m.descriptor.role == ModuleRole::Package)
                .unwrap_or(false)
        });
        stack.in_stack_order(packages)
    }
}

/// Resolve the optional modules of `module` against `stack`.
pub fn resolve(module: &Module, stack: &Stack) -> Resolution {
    let mut resolution = Resolution::default();

    for &id in &module.descriptor.optional {
        let reason = match stack.get(id) {
            None => Some(ExclusionReason::Absent),
            Some(_) if module.disabled.contains(&id) => Some(ExclusionReason::Disabled),
            Some(provider) if !is_build_capable(provider, module) => {
                Some(ExclusionReason::Incompatible)
            }
            Some(_) => None,
        };

        match reason {
            Some(reason) => {
                tracing::debug!("{}: building without {} ({})", module.name(), id, reason);
                resolution.excluded.push((id, reason));
            }
            None => {
                tracing::debug!("{}: building with {}", module.name(), id);
                resolution.included.push(id);
            }
        }
    }

    resolution
}

/// Whether `provider` can be wired into the build of `consumer`.
fn is_build_capable(provider: &Module, consumer: &Module) -> bool {
    provider.is_initialized() && provider.descriptor.wireable_into(consumer.backend)
}
