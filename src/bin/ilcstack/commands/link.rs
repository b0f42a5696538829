//! `ilcstack link` command

use anyhow::Result;

use crate::cli::ModuleArgs;
use crate::commands::{load_prepared, parse_module};
use ilcstack::ops::link::link;
use ilcstack::util::shell::Status;
use ilcstack::util::{GlobalContext, Shell};

pub fn execute(args: ModuleArgs, gctx: &GlobalContext, shell: &Shell) -> Result<()> {
    let id = parse_module(&args.module)?;
    let (_loaded, prepared, _runner) = load_prepared(gctx, shell)?;

    let Some(report) = link(&prepared, id)? else {
        shell.status(Status::Skipped, format!("{} does not host packages", id));
        return Ok(());
    };

    for name in &report.created {
        shell.status(Status::Linked, name);
    }
    for name in &report.kept {
        shell.status(Status::Info, format!("{} already linked", name));
    }
    for path in &report.removed {
        shell.status(Status::Info, format!("removed stale link {}", path.display()));
    }

    shell.json_event(&serde_json::json!({
        "reason": "link",
        "module": id,
        "created": report.created,
        "kept": report.kept,
        "removed": report.removed,
        "preserved": report.preserved,
        "warnings": report.warnings,
    }));
    Ok(())
}
