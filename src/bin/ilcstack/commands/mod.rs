//! Command implementations

pub mod check;
pub mod env;
pub mod install;
pub mod link;
pub mod plan;

use anyhow::Result;

use ilcstack::builder::tool::SystemRunner;
use ilcstack::core::ModuleId;
use ilcstack::ops::{load_stack, prepare, LoadedStack, PreparedStack};
use ilcstack::util::shell::Status;
use ilcstack::util::{GlobalContext, Shell};
use ilcstack::InstallError;

/// Load the stack file and initialize every module.
///
/// The returned runner appends to the stack's log file.
pub fn load_prepared(gctx: &GlobalContext, shell: &Shell) -> Result<(LoadedStack, PreparedStack, SystemRunner)> {
    let loaded = load_stack(gctx)?;
    shell.status(Status::Using, loaded.path.display());

    let runner = SystemRunner::new(&loaded.settings.log_file).echo(loaded.settings.echo);
    let prepared = prepare(loaded.stack.clone(), &loaded.settings, &runner)?;
    Ok((loaded, prepared, runner))
}

/// Parse a module name given on the command line.
pub fn parse_module(name: &str) -> Result<ModuleId> {
    name.parse::<ModuleId>().map_err(|_| {
        InstallError::UnknownModule {
            name: name.to_string(),
        }
        .into()
    })
}
