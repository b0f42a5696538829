//! `ilcstack install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use crate::commands::{load_prepared, parse_module};
use ilcstack::builder::events::BuildEvent;
use ilcstack::ops::install::{install, InstallOptions};
use ilcstack::util::shell::Status;
use ilcstack::util::{GlobalContext, Shell};

pub fn execute(args: InstallArgs, gctx: &GlobalContext, shell: &Shell) -> Result<()> {
    let modules = args
        .modules
        .iter()
        .map(|name| parse_module(name))
        .collect::<Result<Vec<_>>>()?;

    let (loaded, mut prepared, mut runner) = load_prepared(gctx, shell)?;
    let opts = InstallOptions { modules };

    let report = install(&mut prepared, &loaded.settings, &opts, &mut runner, &mut |event| {
        print_event(shell, event)
    })?;

    shell.status(
        Status::Finished,
        format!(
            "{} module(s) built in {:.2}s, log in {}",
            report.built(),
            report.duration.as_secs_f64(),
            loaded.settings.log_file.display()
        ),
    );
    Ok(())
}

fn print_event(shell: &Shell, event: &BuildEvent) {
    if shell.is_json() {
        shell.json_event(event);
        return;
    }

    match event {
        BuildEvent::ModuleStarted {
            module,
            version,
            backend,
        } => shell.status(Status::Installing, format!("{} {} ({})", module, version, backend)),
        BuildEvent::StepFinished {
            module,
            step,
            skipped: true,
        } => shell.status(Status::Skipped, format!("{}: {}", module, step)),
        BuildEvent::StepFinished { module, step, .. } => {
            if shell.is_verbose() {
                shell.status(Status::Info, format!("{}: {} done", module, step));
            }
        }
        BuildEvent::ModuleFinished {
            module,
            success: true,
            ..
        } => shell.status(Status::Finished, module),
        // warnings are already logged where they are raised
        BuildEvent::Warning { .. } | BuildEvent::ModuleFinished { .. } | BuildEvent::BuildFinished { .. } => {}
    }
}
