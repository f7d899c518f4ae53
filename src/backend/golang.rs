//! backend::golang
//!
//! The compiled-binary backend, wrapping the Go toolchain.
//!
//! This is the one environment-mandatory backend: it redirects the
//! toolchain's search path into the workspace-local sandbox and flattens
//! nested sources into the flat layout the legacy layout expects, so its
//! post phases must always run to restore shared global state, even when
//! compilation fails.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Backend, BackendError, CheckReport};
use crate::config::{Project, WORKSPACE_FILE};
use crate::engine::sandbox::SANDBOX_DIR;
use crate::engine::{consolidate, tool_exists, BuildState, Context, ToolCommand};
use crate::ui::output;

/// The compiled-binary backend.
pub struct GolangBackend;

impl GolangBackend {
    /// Resolve the project's source directory against the current working
    /// directory, which may or may not already be the sandbox root.
    fn resolved_source_dir(&self, project: &Project) -> PathBuf {
        if project.disable_nested_environment || currently_in_sandbox() {
            PathBuf::from(&project.source_dir)
        } else {
            Path::new(SANDBOX_DIR).join(&project.source_dir)
        }
    }

    /// Compute the effective destination for the project's artifact kind.
    fn destination(&self, ctx: &Context, project: &Project) -> PathBuf {
        let kind = effective_kind(project);

        if project.destination.is_empty() {
            return match kind {
                "package" => ctx.workdir.clone(),
                "plugin" => ctx
                    .workdir
                    .join("build")
                    .join(format!("{}.so", project.simple_name)),
                _ => ctx.workdir.join("build").join(&project.simple_name),
            };
        }

        let mut destination = PathBuf::from(&project.destination);
        if kind == "plugin" && destination.extension().map(|e| e != "so").unwrap_or(true) {
            // Append rather than replace, so "mod.v2" becomes "mod.v2.so".
            if let Some(name) = destination.file_name() {
                let mut name = name.to_os_string();
                name.push(".so");
                destination.set_file_name(name);
            }
        }
        ctx.workdir.join(destination)
    }

    /// Initialize a module manifest when modules are enabled and none
    /// exists yet.
    fn mod_init(&self, ctx: &Context, project: &Project) -> Result<(), BackendError> {
        if !project.enable_modules {
            return Ok(());
        }

        match fs::metadata("go.mod") {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let out = ToolCommand::new("go").args(["mod", "init"]).output()?;
                output::debug(out.combined(), ctx.verbosity);
                Ok(())
            }
            Err(err) => Err(BackendError::Io(err)),
        }
    }

    /// Run the formatter over every source file of the project.
    fn format(&self, ctx: &Context, project: &Project) -> Result<(), BackendError> {
        let source_dir = self.resolved_source_dir(project);
        let files = collect_files_with_ext(&source_dir, "go");

        for file in files {
            if project.is_excluded(&file.file_name().unwrap_or_default().to_string_lossy()) {
                continue;
            }
            let out = ToolCommand::new("gofmt")
                .args(["-s", "-w"])
                .arg(file.to_string_lossy())
                .output()?;
            if !out.success() {
                output::warn(
                    format!("gofmt failed for {}: {}", file.display(), out.combined()),
                    ctx.verbosity,
                );
            }
        }

        Ok(())
    }

    /// Flatten the project's own child directories (when opted in) and any
    /// nested Braid workspaces discovered in the module cache.
    fn consolidate(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError> {
        if project.consolidate_child_dirs {
            let source_dir = self.resolved_source_dir(project);
            consolidate::flatten(
                &mut state.cleanup,
                &project.simple_name,
                &source_dir,
                &source_dir,
                &project.exclude,
            )?;
        }

        if project.enable_modules && !project.disable_nested_environment {
            // Pre-cache modules before rewriting their layout.
            let out = ToolCommand::new("go").args(["mod", "download"]).output()?;
            output::debug(out.combined(), ctx.verbosity);

            let mod_cache = ctx.workdir.join(SANDBOX_DIR).join("pkg").join("mod");
            for workspace_dir in find_nested_workspaces(&mod_cache) {
                make_writable(&workspace_dir, ctx);

                let key = workspace_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "dependency".to_string());

                if let Err(err) = consolidate::flatten(
                    &mut state.cleanup,
                    &key,
                    &workspace_dir,
                    &workspace_dir,
                    &project.exclude,
                ) {
                    output::error(format!(
                        "failed to flatten {}: {err}",
                        workspace_dir.display()
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Backend for GolangBackend {
    fn check(&self, project: &Project) -> CheckReport {
        let mut report = CheckReport::default();

        if project.kind.is_empty() {
            report.recommendations.push(
                "Not setting any kind. Will default to binary. Recommend statically setting this."
                    .to_string(),
            );
        }

        if !project.source.ends_with("*.go") {
            report.recommendations.push(
                "Not using globbing for getting all Go files in this project. \
                 Recommend changing source to *.go."
                    .to_string(),
            );
        }

        report
    }

    fn lint(
        &self,
        _ctx: &Context,
        project: &Project,
        _confidence: f64,
    ) -> Result<(), BackendError> {
        let files = effective_project(project).files();

        let mut command = ToolCommand::new("go").arg("vet");
        if files.is_empty() {
            command = command.arg("./...");
        } else {
            command = command.args(files.iter().map(|f| f.to_string_lossy().into_owned()));
        }

        let out = command.output()?;
        if !out.success() {
            return Err(BackendError::Tool(consolidate::restore_nested_paths(
                &out.combined(),
            )));
        }
        Ok(())
    }

    fn pre_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError> {
        if !tool_exists("go") {
            return Err(BackendError::MissingTool {
                tool: "go".to_string(),
            });
        }

        state.sandbox.set_module_mode(project.enable_modules);
        self.mod_init(ctx, project)?;

        if !project.disable_nested_environment {
            state.sandbox.toggle_on()?;
        }

        state.sandbox.set_private_list(&project.private);

        self.format(ctx, project)?;
        self.consolidate(ctx, project, state)
    }

    fn run(&self, ctx: &Context, project: &Project) -> Result<(), BackendError> {
        let kind = effective_kind(project);
        let destination = self.destination(ctx, project);

        if kind != "package" {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let effective = effective_project(project);
        let mut args: Vec<String> = vec!["build".to_string()];
        args.extend(project.flags.iter().cloned());

        if kind == "package" {
            if !project.disable_nested_environment {
                // The sandboxed search path resolves the package by name.
                args.push(project.simple_name.clone());
            }
        } else {
            if kind == "plugin" {
                args.push("-buildmode".to_string());
                args.push("plugin".to_string());
            }
            args.push("-o".to_string());
            args.push(destination.to_string_lossy().into_owned());
            args.extend(
                effective
                    .files()
                    .iter()
                    .map(|f| f.to_string_lossy().into_owned()),
            );
        }

        let out = ToolCommand::new("go").args(args).output()?;
        if !out.success() {
            let diagnostics = if out.stderr.is_empty() {
                out.combined()
            } else {
                out.stderr.clone()
            };
            return Err(BackendError::Tool(consolidate::restore_nested_paths(
                &diagnostics,
            )));
        }
        if !out.stdout.is_empty() {
            output::debug(
                consolidate::restore_nested_paths(&out.stdout),
                ctx.verbosity,
            );
        }

        if kind == "binary" {
            let strip = ToolCommand::new("strip")
                .arg(destination.to_string_lossy())
                .output();
            if let Err(err) = strip {
                output::debug(format!("strip skipped: {err}"), ctx.verbosity);
            }
        }

        Ok(())
    }

    fn post_run(
        &self,
        _ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError> {
        state.sandbox.restore_module_mode();
        state.sandbox.restore_private_list();

        let cleanup_result = state.cleanup.cleanup_all();

        if !project.disable_nested_environment && state.sandbox.is_engaged() {
            let teardown = state.sandbox.toggle_off();
            // A cleanup failure is the more important error to surface.
            cleanup_result?;
            teardown?;
        } else {
            cleanup_result?;
        }

        Ok(())
    }

    fn requires_pre_run(
        &self,
        ctx: &Context,
        project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError> {
        let result = self.consolidate(ctx, project, state);
        // Hooks always hand the working directory back to the workspace root.
        if let Err(err) = env::set_current_dir(&ctx.workdir) {
            output::debug(
                format!("failed to return to workspace root: {err}"),
                ctx.verbosity,
            );
        }
        result
    }

    fn requires_post_run(
        &self,
        _ctx: &Context,
        _project: &Project,
        state: &mut BuildState,
    ) -> Result<(), BackendError> {
        state.cleanup.cleanup_all().map_err(Into::into)
    }

    fn env_mandatory(&self) -> bool {
        true
    }

    fn supports_tidy(&self) -> bool {
        true
    }

    fn tidy(&self, ctx: &Context, project: &Project) -> Result<(), BackendError> {
        if !project.enable_modules {
            return Err(BackendError::Tool(format!(
                "{} does not have modules enabled",
                project.simple_name
            )));
        }

        let out = ToolCommand::new("go").args(["mod", "tidy"]).output()?;
        output::debug(out.combined(), ctx.verbosity);
        if !out.success() {
            return Err(BackendError::Tool(out.combined()));
        }
        Ok(())
    }
}

/// Artifact kind with the documented default applied.
fn effective_kind(project: &Project) -> &str {
    if project.kind.is_empty() {
        "binary"
    } else {
        project.kind.as_str()
    }
}

/// Clone of the project with package-kind source defaults applied, so file
/// discovery sees the spec the build will actually use.
fn effective_project(project: &Project) -> Project {
    let mut effective = project.clone();

    if effective_kind(project) == "package" && effective.source.is_empty() {
        effective.source = if project.disable_nested_environment {
            format!("{}/*.go", project.simple_name)
        } else {
            format!("src/{}/*.go", project.simple_name)
        };
        effective.source_dir = Path::new(&effective.source)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    effective
}

/// Whether the current working directory is already the sandbox root.
fn currently_in_sandbox() -> bool {
    env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n == SANDBOX_DIR))
        .unwrap_or(false)
}

/// Recursively collect files with the given extension, skipping hidden
/// directories.
fn collect_files_with_ext(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return files,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if !name.starts_with('.') {
                files.extend(collect_files_with_ext(&path, extension));
            }
        } else if path.extension().map(|e| e == extension).unwrap_or(false) {
            files.push(path);
        }
    }

    files.sort();
    files
}

/// Find directories under `dir` that contain a nested workspace descriptor.
fn find_nested_workspaces(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return found,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.join(WORKSPACE_FILE).is_file() {
            found.push(path);
        } else {
            found.extend(find_nested_workspaces(&path));
        }
    }

    found.sort();
    found
}

/// Module-cache checkouts arrive read-only; loosen them so flattening can
/// copy into place.
#[cfg(unix)]
fn make_writable(dir: &Path, ctx: &Context) {
    use std::os::unix::fs::PermissionsExt;

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        if let Err(err) = fs::set_permissions(&current, fs::Permissions::from_mode(0o770)) {
            output::debug(
                format!("failed to change permission on {}: {err}", current.display()),
                ctx.verbosity,
            );
        }
        if let Ok(entries) = fs::read_dir(&current) {
            for entry in entries.flatten() {
                stack.push(entry.path());
            }
        }
    }
}

#[cfg(not(unix))]
fn make_writable(_dir: &Path, _ctx: &Context) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Verbosity;

    fn ctx_at(dir: &Path) -> Context {
        Context::new(dir, Verbosity::Quiet)
    }

    fn project(kind: &str, destination: &str) -> Project {
        Project {
            plugin: "go".to_string(),
            kind: kind.to_string(),
            destination: destination.to_string(),
            simple_name: "api".to_string(),
            ..Project::default()
        }
    }

    mod destinations {
        use super::*;

        #[test]
        fn binary_defaults_under_build() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("binary", ""));
            assert_eq!(dest, dir.path().join("build").join("api"));
        }

        #[test]
        fn empty_kind_behaves_as_binary() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("", ""));
            assert_eq!(dest, dir.path().join("build").join("api"));
        }

        #[test]
        fn package_defaults_to_workspace_root() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("package", ""));
            assert_eq!(dest, dir.path().to_path_buf());
        }

        #[test]
        fn plugin_default_carries_so_extension() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("plugin", ""));
            assert_eq!(dest, dir.path().join("build").join("api.so"));
        }

        #[test]
        fn explicit_plugin_destination_gains_so_extension() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("plugin", "out/mod"));
            assert_eq!(dest, dir.path().join("out").join("mod.so"));
        }

        #[test]
        fn dotted_plugin_destination_keeps_its_name() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("plugin", "out/mod.v2"));
            assert_eq!(dest, dir.path().join("out").join("mod.v2.so"));
        }

        #[test]
        fn plugin_destination_with_so_extension_is_untouched() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("plugin", "out/mod.so"));
            assert_eq!(dest, dir.path().join("out").join("mod.so"));
        }

        #[test]
        fn explicit_destination_is_joined_to_workspace() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = ctx_at(dir.path());
            let dest = GolangBackend.destination(&ctx, &project("binary", "bin/api"));
            assert_eq!(dest, dir.path().join("bin").join("api"));
        }
    }

    mod checks {
        use super::*;

        #[test]
        fn missing_kind_and_glob_are_recommended() {
            let report = GolangBackend.check(&project("", ""));
            assert_eq!(report.recommendations.len(), 2);
            assert!(report.errors.is_empty());
        }

        #[test]
        fn globbed_source_with_kind_is_quiet() {
            let mut p = project("binary", "");
            p.source = "src/api/*.go".to_string();
            let report = GolangBackend.check(&p);
            assert!(report.is_clean());
        }
    }

    mod package_defaults {
        use super::*;

        #[test]
        fn nested_package_source_defaults_under_src() {
            let p = project("package", "");
            let effective = effective_project(&p);
            assert_eq!(effective.source, "src/api/*.go");
            assert_eq!(effective.source_dir, "src/api");
        }

        #[test]
        fn unnested_package_source_defaults_to_simple_name() {
            let mut p = project("package", "");
            p.disable_nested_environment = true;
            let effective = effective_project(&p);
            assert_eq!(effective.source, "api/*.go");
        }
    }

    mod discovery {
        use super::*;

        #[test]
        fn nested_workspaces_are_found_recursively() {
            let dir = tempfile::tempdir().unwrap();
            let dep = dir.path().join("cache/example.com/dep@v1");
            fs::create_dir_all(&dep).unwrap();
            fs::write(dep.join(WORKSPACE_FILE), "name = \"dep\"").unwrap();
            fs::create_dir_all(dir.path().join("cache/other")).unwrap();

            let found = find_nested_workspaces(dir.path());
            assert_eq!(found, vec![dep]);
        }

        #[test]
        fn collect_skips_hidden_directories() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join(".hidden")).unwrap();
            fs::write(dir.path().join(".hidden/a.go"), "x").unwrap();
            fs::write(dir.path().join("b.go"), "x").unwrap();
            fs::write(dir.path().join("c.txt"), "x").unwrap();

            let files = collect_files_with_ext(dir.path(), "go");
            assert_eq!(files, vec![dir.path().join("b.go")]);
        }
    }
}
