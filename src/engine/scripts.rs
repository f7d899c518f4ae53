//! engine::scripts
//!
//! Runs a named workspace script: an arbitrary executable with arguments,
//! optionally inside the build sandbox, with its own pre/post hook passes.
//!
//! Script failures are reported, never fatal: a script exists to assist a
//! build, and a broken helper must not poison the rest of a multi-project
//! pass. The one hard error is naming a script the descriptor does not
//! define.

use std::env;
use std::fs;

use super::lifecycle::BuildError;
use super::requires::HookPhase;
use super::sandbox::SANDBOX_DIR;
use super::{restore_nested_paths, BuildState, Engine, ToolCommand};
use crate::ui::output;

impl<'a> Engine<'a> {
    /// Run the named script.
    ///
    /// Returns an error only when the name does not resolve; execution
    /// failures are logged and swallowed. The working directory is always
    /// restored to the workspace root afterwards, and a sandbox engaged for
    /// the script is always torn down, even when entering the script's
    /// directory fails.
    pub fn run_script(&self, name: &str, state: &mut BuildState) -> Result<(), BuildError> {
        let script = self
            .workspace
            .script(name)
            .ok_or_else(|| BuildError::UnknownScript(name.to_string()))?;

        if script.exec.is_empty() {
            output::warn(
                format!("No executable set for the script: {name}"),
                self.ctx.verbosity,
            );
            return Ok(());
        }

        self.run_requires(HookPhase::Pre, &script.requires, state);

        output::print(format!("Running script: {name}"), self.ctx.verbosity);

        let dir = if script.use_sandbox {
            if let Err(err) = state.sandbox.toggle_on() {
                // A failed engage still leaves a live snapshot behind.
                output::error(format!("Failed to engage the sandbox for {name}: {err}"));
                if state.sandbox.is_engaged() {
                    if let Err(err) = state.sandbox.toggle_off() {
                        output::error(format!("Failed to restore the environment: {err}"));
                    }
                }
                return Ok(());
            }
            self.ctx
                .workdir
                .join(SANDBOX_DIR)
                .join("src")
                .join(&script.directory)
        } else {
            self.ctx.workdir.join(&script.directory)
        };

        if let Err(err) = env::set_current_dir(&dir) {
            output::error(format!(
                "Failed to enter script directory {}: {err}",
                dir.display()
            ));
            if script.use_sandbox {
                if let Err(err) = state.sandbox.toggle_off() {
                    output::error(format!("Failed to restore the environment: {err}"));
                }
            }
            return Ok(());
        }

        let command = ToolCommand::new(&script.exec).args(script.arguments.iter().cloned());
        output::debug(format!("Running: {}", command.display()), self.ctx.verbosity);

        match command.output() {
            Ok(out) => {
                let text = restore_nested_paths(&out.combined());
                if !text.is_empty() {
                    output::print(&text, self.ctx.verbosity);
                }
                if !out.success() {
                    output::error(format!("{name} exited with failure"));
                }
                if script.redirect && !script.file.is_empty() {
                    let target = self.ctx.workdir.join(&script.file);
                    if let Err(err) = fs::write(&target, text.as_bytes()) {
                        output::error(format!(
                            "Failed to redirect output to {}: {err}",
                            target.display()
                        ));
                    }
                }
            }
            Err(err) => output::error(format!("Failed to run {name}: {err}")),
        }

        if script.use_sandbox {
            if let Err(err) = state.sandbox.toggle_off() {
                output::error(format!("Failed to restore the environment: {err}"));
            }
        }
        if let Err(err) = env::set_current_dir(&self.ctx.workdir) {
            output::error(format!("Failed to return to the workspace root: {err}"));
        }

        self.run_requires(HookPhase::Post, &script.requires, state);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendRegistry;
    use crate::config::{Script, Workspace};
    use crate::engine::testenv;
    use crate::engine::Context;
    use crate::ui::Verbosity;

    use std::collections::BTreeMap;

    fn workspace_with(scripts: BTreeMap<String, Script>) -> Workspace {
        Workspace {
            name: "demo".to_string(),
            scripts,
            ..Workspace::default()
        }
    }

    fn script(exec: &str, arguments: &[&str]) -> Script {
        Script {
            exec: exec.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            ..Script::default()
        }
    }

    #[test]
    fn unknown_script_is_an_error() {
        let _guard = testenv::lock();
        let workspace = workspace_with(BTreeMap::new());
        let registry = BackendRegistry::standard();
        let ctx = Context::new(env::temp_dir(), Verbosity::Quiet);
        let engine = Engine::new(&workspace, &registry, &ctx);
        let mut state = BuildState::new(&ctx.workdir);

        let err = engine.run_script("missing", &mut state).unwrap_err();
        assert!(matches!(err, BuildError::UnknownScript(name) if name == "missing"));
    }

    #[test]
    fn empty_exec_is_a_warning_not_an_error() {
        let _guard = testenv::lock();
        let mut scripts = BTreeMap::new();
        scripts.insert("noop".to_string(), script("", &[]));
        let workspace = workspace_with(scripts);
        let registry = BackendRegistry::standard();
        let ctx = Context::new(env::temp_dir(), Verbosity::Quiet);
        let engine = Engine::new(&workspace, &registry, &ctx);
        let mut state = BuildState::new(&ctx.workdir);

        assert!(engine.run_script("noop", &mut state).is_ok());
    }

    #[test]
    fn redirect_writes_combined_output_to_file() {
        let _guard = testenv::lock();
        let root = tempfile::tempdir().unwrap();
        let mut scripts = BTreeMap::new();
        scripts.insert(
            "version".to_string(),
            Script {
                redirect: true,
                file: "version.txt".to_string(),
                ..script("sh", &["-c", "echo 1.2.3"])
            },
        );
        let workspace = workspace_with(scripts);
        let registry = BackendRegistry::standard();
        let ctx = Context::new(root.path(), Verbosity::Quiet);
        let engine = Engine::new(&workspace, &registry, &ctx);
        let mut state = BuildState::new(&ctx.workdir);

        engine.run_script("version", &mut state).unwrap();

        let written = fs::read_to_string(root.path().join("version.txt")).unwrap();
        assert!(written.contains("1.2.3"));
        assert_eq!(env::current_dir().unwrap(), root.path().canonicalize().unwrap());
        env::set_current_dir(env::temp_dir()).unwrap();
    }

    #[test]
    fn failing_script_is_swallowed_and_cwd_restored() {
        let _guard = testenv::lock();
        let root = tempfile::tempdir().unwrap();
        let mut scripts = BTreeMap::new();
        scripts.insert("broken".to_string(), script("sh", &["-c", "exit 3"]));
        let workspace = workspace_with(scripts);
        let registry = BackendRegistry::standard();
        let ctx = Context::new(root.path(), Verbosity::Quiet);
        let engine = Engine::new(&workspace, &registry, &ctx);
        let mut state = BuildState::new(&ctx.workdir);

        assert!(engine.run_script("broken", &mut state).is_ok());
        assert_eq!(env::current_dir().unwrap(), root.path().canonicalize().unwrap());
        env::set_current_dir(env::temp_dir()).unwrap();
    }

    #[test]
    fn missing_directory_restores_sandbox_before_returning() {
        let _guard = testenv::lock();
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("go").join("src")).unwrap();
        let mut scripts = BTreeMap::new();
        scripts.insert(
            "sandboxed".to_string(),
            Script {
                use_sandbox: true,
                directory: "does-not-exist".to_string(),
                ..script("sh", &["-c", "true"])
            },
        );
        let workspace = workspace_with(scripts);
        let registry = BackendRegistry::standard();
        let ctx = Context::new(root.path(), Verbosity::Quiet);
        let engine = Engine::new(&workspace, &registry, &ctx);
        let mut state = BuildState::new(&ctx.workdir);

        let prev = env::var_os("GOPATH");
        assert!(engine.run_script("sandboxed", &mut state).is_ok());
        assert!(!state.sandbox.is_engaged());
        assert_eq!(env::var_os("GOPATH"), prev);
        env::set_current_dir(env::temp_dir()).unwrap();
    }
}
