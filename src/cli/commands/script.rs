//! script command - Run workspace scripts

use anyhow::Result;

use crate::backend::BackendRegistry;
use crate::engine::{BuildState, Context, Engine};

/// Run a named workspace script, or every defined script when none is
/// named. An explicitly named unknown script is fatal; a script's own exit
/// status is reported but does not fail the command.
pub fn script(ctx: &Context, name: Option<&str>) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;
    let registry = BackendRegistry::standard();
    let engine = Engine::new(&workspace, &registry, ctx);

    match name {
        Some(name) => {
            let mut state = BuildState::new(&ctx.workdir);
            engine.run_script(name, &mut state)?;
        }
        None => {
            for name in workspace.scripts.keys() {
                let mut state = BuildState::new(&ctx.workdir);
                engine.run_script(name, &mut state)?;
            }
        }
    }

    Ok(())
}
