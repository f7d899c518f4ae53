//! lint command - Run backend linters

use anyhow::Result;

use crate::backend::BackendRegistry;
use crate::engine::{Context, Engine};

/// Lint one project, or every project in the workspace.
pub fn lint(ctx: &Context, project: Option<&str>, confidence: f64) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;
    let registry = BackendRegistry::standard();
    let engine = Engine::new(&workspace, &registry, ctx);

    match project {
        Some(name) => {
            engine.lint_project(name, confidence)?;
        }
        None => {
            engine.lint_all(confidence);
        }
    }

    Ok(())
}
