//! `ilcstack env` command

use anyhow::Result;

use crate::cli::EnvArgs;
use crate::commands::{load_prepared, parse_module};
use ilcstack::ops::env::environment;
use ilcstack::util::shell::Status;
use ilcstack::util::{GlobalContext, Shell};

pub fn execute(args: EnvArgs, gctx: &GlobalContext, shell: &Shell) -> Result<()> {
    let id = parse_module(&args.module)?;
    let (loaded, prepared, _runner) = load_prepared(gctx, shell)?;

    let menv = environment(&prepared, &loaded.settings, id)?;

    if args.write {
        for path in menv.write()? {
            shell.status(Status::Written, path.display());
            shell.json_event(&serde_json::json!({ "reason": "env-written", "path": path }));
        }
        return Ok(());
    }

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "env",
            "module": id,
            "global": { "path": menv.global_path(), "content": menv.env.global.render() },
            "workspace": { "path": menv.workspace_path(), "content": menv.env.workspace.render() },
        }));
    } else {
        println!("# ==> {}", menv.global_path().display());
        print!("{}", menv.env.global.render());
        println!();
        println!("# ==> {}", menv.workspace_path().display());
        print!("{}", menv.env.workspace.render());
    }
    Ok(())
}
