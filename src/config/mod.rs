//! config
//!
//! The workspace descriptor: named projects and named scripts loaded from
//! `braid.toml` at the workspace root.
//!
//! # Design
//!
//! The descriptor is deserialized once per command invocation and is
//! read-only afterwards. The only mutation happens at load time, when
//! derived fields are filled in: the `simple_name` of each project defaults
//! to its map key, `source_dir` is computed from the source spec, and
//! compiled-binary projects receive their default exclude entries.
//!
//! Projects and scripts live in `BTreeMap`s so "all projects" iteration is
//! deterministic across runs.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name of the workspace descriptor.
pub const WORKSPACE_FILE: &str = "braid.toml";

/// Backend kind tag for the compiled-binary (Go toolchain) backend.
pub const KIND_GO: &str = "go";
/// Backend kind tag for the stylesheet (LESS) backend.
pub const KIND_LESS: &str = "less";
/// Backend kind tag for the transpiled-script (TypeScript) backend.
pub const KIND_TYPESCRIPT: &str = "typescript";

/// Errors from reading the workspace descriptor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor file does not exist.
    #[error("braid.toml does not exist in this directory")]
    Missing,

    /// The descriptor file could not be read.
    #[error("failed to read braid.toml: {0}")]
    Io(#[from] io::Error),

    /// The descriptor file is not valid TOML.
    #[error("braid.toml appears to have the following issue(s):\n{0}")]
    Parse(#[from] toml::de::Error),
}

/// The workspace descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Workspace {
    /// Workspace name.
    pub name: String,
    /// Workspace description.
    pub description: String,
    /// Workspace license identifier.
    pub license: String,
    /// Workspace version.
    pub version: String,
    /// Named build projects.
    pub projects: BTreeMap<String, Project>,
    /// Named scripts.
    pub scripts: BTreeMap<String, Script>,
}

/// A named build target: one source spec, one destination, and
/// backend-specific options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Project {
    /// Backend kind tag ("go", "less", "typescript").
    pub plugin: String,
    /// Source file, or glob-style pattern like `src/app/*.go`.
    pub source: String,
    /// Destination path, relative to the workspace root. Backends fill in a
    /// default when empty.
    pub destination: String,
    /// Artifact kind for the compiled-binary backend: "binary", "package",
    /// or "plugin". Defaults to "binary".
    pub kind: String,
    /// Compiler strictness mode for the transpiled-script backend.
    pub mode: String,
    /// Output language target for the transpiled-script backend.
    pub target: String,
    /// Minify the compiled output.
    pub compress: bool,
    /// Append a content digest to the artifact name.
    pub append_hash: bool,
    /// Flatten nested source directories before compiling.
    pub consolidate_child_dirs: bool,
    /// Skip the workspace-local environment sandbox.
    pub disable_nested_environment: bool,
    /// Enable module-mode dependency resolution.
    pub enable_modules: bool,
    /// Module paths treated as private (not fetched through public proxies).
    pub private: Vec<String>,
    /// Extra compiler flags.
    pub flags: Vec<String>,
    /// Ordered dependency references run around this project's lifecycle.
    pub requires: Vec<String>,
    /// Names and suffixes skipped during source discovery.
    pub exclude: Vec<String>,

    /// Derived: short name used for default destinations and consolidation
    /// tracking. Defaults to the project's map key.
    #[serde(skip)]
    pub simple_name: String,
    /// Derived: directory portion of the source spec.
    #[serde(skip)]
    pub source_dir: String,
}

impl Project {
    /// Whether an entry name is excluded by this project's exclude list.
    ///
    /// An entry is excluded when it equals an exclude item or ends with one,
    /// so `_test.go` style suffixes match whole file classes.
    pub fn is_excluded(&self, name: &str) -> bool {
        excluded(&self.exclude, name)
    }

    /// Resolve the source spec into concrete file paths.
    ///
    /// A glob-style spec (`*.go`) selects every file in `source_dir` with
    /// the matching extension, minus excluded entries. A literal spec
    /// selects exactly that file.
    pub fn files(&self) -> Vec<PathBuf> {
        if self.source.is_empty() {
            return Vec::new();
        }

        let file_name = Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !file_name.starts_with('*') {
            return vec![PathBuf::from(&self.source)];
        }

        let extension = Path::new(&file_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut files = Vec::new();
        let entries = match fs::read_dir(&self.source_dir) {
            Ok(entries) => entries,
            Err(_) => return files,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .map(|e| e.to_string_lossy() == extension)
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if matches && !self.is_excluded(&name) {
                files.push(path);
            }
        }

        files.sort();
        files
    }
}

/// A named external-command invocation independent of any backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Script {
    /// Executable to invoke.
    pub exec: String,
    /// Arguments passed to the executable.
    pub arguments: Vec<String>,
    /// Human-readable description.
    pub description: String,
    /// Working directory, relative to the workspace root.
    pub directory: String,
    /// Ordered dependency references run around this script.
    pub requires: Vec<String>,
    /// File the captured output is redirected to, when `redirect` is set.
    pub file: String,
    /// Redirect captured output to `file`.
    pub redirect: bool,
    /// Run inside the workspace-local environment sandbox.
    pub use_sandbox: bool,
}

impl Workspace {
    /// Load the workspace descriptor from `path`.
    ///
    /// Fills in derived project fields after deserialization. A missing file
    /// and an unparseable file are distinct errors; both are fatal to the
    /// invoking command.
    pub fn load(path: &Path) -> Result<Workspace, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing);
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };

        let mut workspace: Workspace = toml::from_str(&raw)?;
        workspace.derive_fields();
        Ok(workspace)
    }

    /// Look up a project by name.
    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Look up a script by name.
    pub fn script(&self, name: &str) -> Option<&Script> {
        self.scripts.get(name)
    }

    /// Fill in fields derived from the raw descriptor.
    fn derive_fields(&mut self) {
        for (name, project) in self.projects.iter_mut() {
            if project.simple_name.is_empty() {
                project.simple_name = name.clone();
            }

            project.source_dir = Path::new(&project.source)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            if project.plugin == KIND_GO {
                // Compiled output and test files never feed the compiler.
                for default in ["pkg", "_test.go"] {
                    if !project.exclude.iter().any(|e| e == default) {
                        project.exclude.push(default.to_string());
                    }
                }
            }
        }
    }
}

fn excluded(exclude: &[String], name: &str) -> bool {
    exclude
        .iter()
        .any(|item| name == item || name.ends_with(item.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
name = "demo"
description = "demo workspace"
license = "MIT"
version = "1.0"

[projects.api]
plugin = "go"
source = "src/api/*.go"
kind = "binary"
consolidate-child-dirs = true
requires = ["assets", "prep"]

[projects.styles]
plugin = "less"
source = "src/less/styles.less"
destination = "build/styles.css"
append-hash = true

[projects.assets]
plugin = "typescript"
source = "src/typescript/assets.ts"
compress = true
mode = "strict"
target = "ES6"

[scripts.prep]
exec = "sh"
arguments = ["-c", "true"]
directory = "tools"
"#;

    fn sample() -> Workspace {
        let mut workspace: Workspace = toml::from_str(SAMPLE).unwrap();
        workspace.derive_fields();
        workspace
    }

    mod load {
        use super::*;

        #[test]
        fn parses_projects_and_scripts() {
            let ws = sample();
            assert_eq!(ws.name, "demo");
            assert_eq!(ws.projects.len(), 3);
            assert_eq!(ws.scripts.len(), 1);
            assert_eq!(ws.project("styles").unwrap().destination, "build/styles.css");
            assert_eq!(ws.script("prep").unwrap().exec, "sh");
            assert!(ws.project("nope").is_none());
        }

        #[test]
        fn missing_file_is_distinct_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = Workspace::load(&dir.path().join(WORKSPACE_FILE)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing));
        }

        #[test]
        fn invalid_toml_is_parse_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(WORKSPACE_FILE);
            let mut file = fs::File::create(&path).unwrap();
            writeln!(file, "projects = 3").unwrap();
            let err = Workspace::load(&path).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[test]
        fn roundtrips_through_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(WORKSPACE_FILE);
            fs::write(&path, SAMPLE).unwrap();
            let ws = Workspace::load(&path).unwrap();
            assert_eq!(ws.projects.len(), 3);
        }
    }

    mod derived_fields {
        use super::*;

        #[test]
        fn simple_name_defaults_to_key() {
            let ws = sample();
            assert_eq!(ws.project("api").unwrap().simple_name, "api");
        }

        #[test]
        fn source_dir_is_parent_of_source() {
            let ws = sample();
            assert_eq!(ws.project("api").unwrap().source_dir, "src/api");
            assert_eq!(ws.project("styles").unwrap().source_dir, "src/less");
        }

        #[test]
        fn go_projects_get_default_excludes() {
            let ws = sample();
            let api = ws.project("api").unwrap();
            assert!(api.exclude.iter().any(|e| e == "pkg"));
            assert!(api.exclude.iter().any(|e| e == "_test.go"));
        }

        #[test]
        fn go_default_excludes_not_duplicated() {
            let mut ws: Workspace = toml::from_str(
                r#"
[projects.api]
plugin = "go"
source = "src/api/*.go"
exclude = ["pkg", "vendor"]
"#,
            )
            .unwrap();
            ws.derive_fields();
            let api = ws.project("api").unwrap();
            assert_eq!(
                api.exclude,
                vec!["pkg".to_string(), "vendor".to_string(), "_test.go".to_string()]
            );
        }

        #[test]
        fn non_go_projects_keep_excludes_untouched() {
            let ws = sample();
            assert!(ws.project("styles").unwrap().exclude.is_empty());
        }
    }

    mod exclusion {
        use super::*;

        #[test]
        fn matches_exact_names_and_suffixes() {
            let ws = sample();
            let api = ws.project("api").unwrap();
            assert!(api.is_excluded("pkg"));
            assert!(api.is_excluded("server_test.go"));
            assert!(!api.is_excluded("server.go"));
        }
    }

    mod files {
        use super::*;

        #[test]
        fn literal_source_is_single_file() {
            let ws = sample();
            let files = ws.project("styles").unwrap().files();
            assert_eq!(files, vec![PathBuf::from("src/less/styles.less")]);
        }

        #[test]
        fn glob_source_selects_by_extension_minus_excludes() {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src");
            fs::create_dir_all(&src).unwrap();
            fs::write(src.join("main.go"), "package main").unwrap();
            fs::write(src.join("util.go"), "package main").unwrap();
            fs::write(src.join("main_test.go"), "package main").unwrap();
            fs::write(src.join("notes.txt"), "ignore").unwrap();

            let project = Project {
                plugin: KIND_GO.to_string(),
                source: format!("{}/*.go", src.display()),
                source_dir: src.to_string_lossy().into_owned(),
                exclude: vec!["_test.go".to_string()],
                ..Project::default()
            };

            let files = project.files();
            assert_eq!(files.len(), 2);
            assert!(files.iter().all(|f| f.extension().unwrap() == "go"));
            assert!(!files.iter().any(|f| f.ends_with("main_test.go")));
        }

        #[test]
        fn empty_source_yields_no_files() {
            assert!(Project::default().files().is_empty());
        }
    }
}
