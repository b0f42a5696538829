//! The ordered set of modules taking part in one installation run.

use std::collections::HashMap;

use crate::core::error::InstallError;
use crate::core::module::Module;
use crate::core::module_id::ModuleId;

/// Package registry for one run.
///
/// Modules keep the order of the stack file, which the installer treats as a
/// valid build order. Lookups are by typed identifier and return `Option`.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    modules: Vec<Module>,
    index: HashMap<ModuleId, usize>,
}

impl Stack {
    /// Build a stack, rejecting duplicate modules.
    pub fn new(modules: Vec<Module>) -> Result<Self, InstallError> {
        let mut index = HashMap::with_capacity(modules.len());
        for (i, module) in modules.iter().enumerate() {
            if index.insert(module.id(), i).is_some() {
                return Err(InstallError::DuplicateModule {
                    name: module.name().to_string(),
                });
            }
        }
        Ok(Stack { modules, index })
    }

    /// Look up a module.
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.index.get(&id).map(|&i| &self.modules[i])
    }

    /// Look up a module for mutation.
    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.modules[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of a module in stack order.
    pub fn position(&self, id: ModuleId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Modules in stack order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Identifiers in stack order.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    /// Sort a set of identifiers into stack order, dropping absent ones.
    pub fn in_stack_order(&self, ids: impl IntoIterator<Item = ModuleId>) -> Vec<ModuleId> {
        let mut present: Vec<(usize, ModuleId)> = ids
            .into_iter()
            .filter_map(|id| self.position(id).map(|pos| (pos, id)))
            .collect();
        present.sort_by_key(|(pos, _)| *pos);
        present.dedup();
        present.into_iter().map(|(_, id)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
