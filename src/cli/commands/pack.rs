//! pack command - Stage built artifacts

use std::env;
use std::fs;

use anyhow::{anyhow, Context as _, Result};
use chrono::Local;

use crate::config::Project;
use crate::engine::Context;
use crate::ui::output;

/// Stage built artifacts into a timestamped directory under the system temp
/// dir. Compression and shipping are left to external tooling.
pub fn pack(ctx: &Context, project: Option<&str>) -> Result<()> {
    let workspace = super::load_workspace(ctx)?;

    let staging = env::temp_dir().join(format!(
        "braid-{}",
        Local::now().format("%Y%m%d%H%M%S")
    ));
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;

    let selected: Vec<(&String, &Project)> = match project {
        Some(name) => {
            let entry = workspace
                .projects
                .get_key_value(name)
                .ok_or_else(|| anyhow!("{name} is not a valid project"))?;
            vec![entry]
        }
        None => workspace.projects.iter().collect(),
    };

    let mut staged = 0usize;
    for (name, p) in selected {
        if p.destination.is_empty() {
            output::warn(
                format!("{name} has no destination configured; skipping"),
                ctx.verbosity,
            );
            continue;
        }

        let artifact = ctx.workdir.join(&p.destination);
        if !artifact.exists() {
            output::warn(
                format!("{name} has not been built yet; skipping"),
                ctx.verbosity,
            );
            continue;
        }

        let file_name = artifact
            .file_name()
            .ok_or_else(|| anyhow!("{name} has an invalid destination"))?;
        fs::copy(&artifact, staging.join(file_name))
            .with_context(|| format!("failed to stage {}", artifact.display()))?;
        staged += 1;
        output::debug(
            format!("staged {}", artifact.display()),
            ctx.verbosity,
        );
    }

    output::success(
        format!("Staged {staged} artifact(s) in {}", staging.display()),
        ctx.verbosity,
    );
    Ok(())
}
