//! tidy command - Tidy dependency manifests

use anyhow::Result;

use crate::backend::BackendRegistry;
use crate::engine::{Context, Engine};

/// Tidy one project's dependency manifest, or every project's. Projects
/// whose backend has no tidy support are skipped.
pub fn tidy(ctx: &Context, project: Option<&str>) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;
    let registry = BackendRegistry::standard();
    let engine = Engine::new(&workspace, &registry, ctx);

    match project {
        Some(name) => {
            engine.tidy_project(name)?;
        }
        None => {
            engine.tidy_all();
        }
    }

    Ok(())
}
