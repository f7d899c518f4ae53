//! build command - Run the full build lifecycle

use anyhow::Result;

use crate::backend::BackendRegistry;
use crate::engine::{Context, Engine};
use crate::ui::output;

/// Build one project, or every project in the workspace.
///
/// An explicitly named unknown project is fatal; a build failure of a known
/// project is reported by the engine and does not fail the command.
pub fn build(ctx: &Context, project: Option<&str>) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;
    let registry = BackendRegistry::standard();
    let engine = Engine::new(&workspace, &registry, ctx);

    match project {
        Some(name) => {
            engine.build_project(name)?;
        }
        None => {
            let outcomes = engine.build_all();
            let failed = outcomes.iter().filter(|(_, o)| !o.is_success()).count();
            if failed > 0 {
                output::warn(
                    format!("{failed} of {} project(s) failed", outcomes.len()),
                    ctx.verbosity,
                );
            }
        }
    }

    Ok(())
}
