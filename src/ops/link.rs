//! Implementation of `ilcstack link`.

use crate::builder::linker::{LinkReport, PackageLinker};
use crate::core::error::InstallError;
use crate::core::module::Module;
use crate::core::module_id::ModuleId;
use crate::ops::prepare::PreparedStack;

/// Refresh the link directory of `id` with its resolved packages.
///
/// Returns `None` for modules that do not host packages.
pub fn link(prepared: &PreparedStack, id: ModuleId) -> Result<Option<LinkReport>, InstallError> {
    let (module, resolution) = prepared.resolved(id)?;
    if !module.descriptor.hosts_packages() {
        return Ok(None);
    }

    let packages: Vec<&Module> = resolution
        .packages(&prepared.stack)
        .into_iter()
        .filter_map(|p| prepared.stack.get(p))
        .collect();

    PackageLinker::new(module).refresh(&packages).map(Some)
}
