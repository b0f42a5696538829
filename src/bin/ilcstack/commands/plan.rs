//! `ilcstack plan` command

use anyhow::Result;

use crate::cli::ModuleArgs;
use crate::commands::{load_prepared, parse_module};
use ilcstack::builder::sequencer::PlannedAction;
use ilcstack::ops::plan::{format_plan, plan};
use ilcstack::util::{GlobalContext, Shell};

pub fn execute(args: ModuleArgs, gctx: &GlobalContext, shell: &Shell) -> Result<()> {
    let id = parse_module(&args.module)?;
    let (loaded, prepared, _runner) = load_prepared(gctx, shell)?;

    let plan = plan(&prepared, &loaded.settings, id)?;

    if shell.is_json() {
        let steps: Vec<_> = plan
            .steps
            .iter()
            .map(|s| {
                let command = match &s.action {
                    PlannedAction::Run(inv) | PlannedAction::RunIfAvailable { invocation: inv, .. } => {
                        Some(inv.display_command())
                    }
                    PlannedAction::Link(_) | PlannedAction::Remove(_) => None,
                };
                serde_json::json!({ "step": s.step, "command": command })
            })
            .collect();
        shell.json_event(&serde_json::json!({
            "reason": "plan",
            "module": plan.module,
            "version": plan.version,
            "backend": plan.backend,
            "with": plan.resolution.included,
            "without": plan.resolution.excluded_ids(),
            "env_files": plan.env_files,
            "steps": steps,
        }));
    } else {
        print!("{}", format_plan(&plan));
    }
    Ok(())
}
