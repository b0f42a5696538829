//! `ilcstack check` command

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use crate::commands::load_prepared;
use ilcstack::ops::check::{check, format_report};
use ilcstack::util::shell::Status;
use ilcstack::util::{GlobalContext, Shell};

pub fn execute(_args: CheckArgs, gctx: &GlobalContext, shell: &Shell) -> Result<()> {
    let (loaded, prepared, runner) = load_prepared(gctx, shell)?;
    shell.status(Status::Checking, format!("{} modules", prepared.stack.len()));

    let report = check(&prepared, &loaded.settings, &runner);

    if shell.is_json() {
        let modules: Vec<_> = report
            .modules
            .iter()
            .map(|m| {
                serde_json::json!({
                    "module": m.module,
                    "version": m.version,
                    "mode": m.mode,
                    "complete": m.is_complete(),
                    "missing": m.missing,
                    "with": m.with,
                    "without": m.without,
                })
            })
            .collect();
        let tools: Vec<_> = report
            .tools
            .iter()
            .map(|t| serde_json::json!({ "name": t.name, "found": t.found, "required": t.required }))
            .collect();
        shell.json_event(&serde_json::json!({
            "reason": "check",
            "ok": report.is_ok(),
            "modules": modules,
            "tools": tools,
            "warnings": report.warnings,
        }));
    } else if !shell.is_quiet() {
        print!("{}", format_report(&report, shell.is_verbose()));
    }

    if !report.is_ok() {
        bail!("stack check failed");
    }
    shell.status(Status::Finished, "stack is consistent");
    Ok(())
}
