//! check command - Validate project settings

use std::collections::BTreeMap;

use anyhow::Result;

use crate::backend::{BackendRegistry, CheckReport};
use crate::engine::Context;
use crate::ui::output;

/// Validate the backend-specific settings of every project and report
/// deprecations, errors, and recommendations.
pub fn check(ctx: &Context, json: bool) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;
    let registry = BackendRegistry::standard();

    let mut reports: BTreeMap<String, CheckReport> = BTreeMap::new();
    for (name, project) in &workspace.projects {
        let backend = registry.lookup(&project.plugin)?;
        reports.insert(name.clone(), backend.check(project));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for (name, report) in &reports {
        if report.is_clean() {
            output::success(format!("{name}: no findings"), ctx.verbosity);
            continue;
        }

        output::print(format!("{name}:"), ctx.verbosity);
        print_section("Deprecations", &report.deprecations, ctx);
        print_section("Errors", &report.errors, ctx);
        print_section("Recommendations", &report.recommendations, ctx);
    }

    Ok(())
}

fn print_section(title: &str, findings: &[String], ctx: &Context) {
    if findings.is_empty() {
        return;
    }
    output::print(format!("  {title} ({}):", findings.len()), ctx.verbosity);
    for finding in findings {
        output::print(format!("    - {finding}"), ctx.verbosity);
    }
}
