//! Config resolution.
//!
//! Turns an optional [`ConfigFile`] into a concrete [`Layout`] with every default
//! filled in and every relative path anchored at the repository root.

use std::path::{Path, PathBuf};
use testrig_domain::integration_plan;
use testrig_types::{
    ConfigFile, DEFAULT_BACKEND_DLL, DEFAULT_BACKEND_LOG, DEFAULT_BACKEND_PROJECT,
    DEFAULT_BACKEND_STDERR_LOG, DEFAULT_BACKEND_STDOUT_LOG, DEFAULT_DOTNET,
    DEFAULT_INTEGRATION_PROJECT, DEFAULT_PUBLISH_DIR, DEFAULT_SOLUTION, DEFAULT_UNIT_PROJECT,
    FailurePolicy, OutputMode, TestCategory,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config value `{key}` must not be empty")]
    Empty { key: &'static str },

    #[error("config value `{key}` must name a project file, got {value:?}")]
    NotAFile { key: &'static str, value: String },

    #[error("config value `integration.categories` selects no runnable category")]
    NoCategories,
}

/// Parse `testrig.toml` contents.
pub fn parse_config(text: &str) -> Result<ConfigFile, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Fully resolved repository layout and policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,

    /// A bare name is looked up on `PATH`; anything with a directory part is
    /// anchored at the root and made absolute, since steps run from different
    /// directories.
    pub dotnet: String,
    pub solution: PathBuf,
    pub backend_project: PathBuf,
    pub publish_dir: PathBuf,
    pub backend_dll: PathBuf,

    /// Handed to the backend untouched; it resolves it against its own cwd.
    pub backend_log: String,

    pub backend_stdout_log: PathBuf,
    pub backend_stderr_log: PathBuf,
    pub unit_project: PathBuf,
    pub integration_project: PathBuf,

    pub clean_and_build: bool,
    pub backend_output: OutputMode,
    pub categories: Option<Vec<TestCategory>>,
    pub policy: FailurePolicy,
}

impl Layout {
    /// Resolve `cfg`. `root_override` (e.g. `--root`) wins over `paths.root`.
    pub fn resolve(cfg: &ConfigFile, root_override: Option<&Path>) -> Result<Self, ConfigError> {
        let p = &cfg.paths;

        let root = match root_override {
            Some(r) => r.to_path_buf(),
            None => PathBuf::from(non_empty("paths.root", p.root.as_deref(), ".")?),
        };
        let at_root = |key, value: Option<&str>, default| -> Result<PathBuf, ConfigError> {
            Ok(root.join(non_empty(key, value, default)?))
        };

        let dotnet = non_empty("runner.dotnet", cfg.runner.dotnet.as_deref(), DEFAULT_DOTNET)?;
        let dotnet = runner_program(&root, dotnet);

        if let Some(categories) = &cfg.integration.categories
            && integration_plan(Some(categories.as_slice())).is_empty()
        {
            return Err(ConfigError::NoCategories);
        }

        let layout = Self {
            dotnet,
            solution: at_root("paths.solution", p.solution.as_deref(), DEFAULT_SOLUTION)?,
            backend_project: project_file(
                "paths.backend_project",
                at_root(
                    "paths.backend_project",
                    p.backend_project.as_deref(),
                    DEFAULT_BACKEND_PROJECT,
                )?,
            )?,
            publish_dir: at_root(
                "paths.publish_dir",
                p.publish_dir.as_deref(),
                DEFAULT_PUBLISH_DIR,
            )?,
            backend_dll: PathBuf::from(non_empty(
                "paths.backend_dll",
                p.backend_dll.as_deref(),
                DEFAULT_BACKEND_DLL,
            )?),
            backend_log: non_empty(
                "paths.backend_log",
                p.backend_log.as_deref(),
                DEFAULT_BACKEND_LOG,
            )?
            .to_string(),
            backend_stdout_log: at_root(
                "paths.backend_stdout_log",
                p.backend_stdout_log.as_deref(),
                DEFAULT_BACKEND_STDOUT_LOG,
            )?,
            backend_stderr_log: at_root(
                "paths.backend_stderr_log",
                p.backend_stderr_log.as_deref(),
                DEFAULT_BACKEND_STDERR_LOG,
            )?,
            unit_project: project_file(
                "paths.unit_project",
                at_root(
                    "paths.unit_project",
                    p.unit_project.as_deref(),
                    DEFAULT_UNIT_PROJECT,
                )?,
            )?,
            integration_project: project_file(
                "paths.integration_project",
                at_root(
                    "paths.integration_project",
                    p.integration_project.as_deref(),
                    DEFAULT_INTEGRATION_PROJECT,
                )?,
            )?,
            clean_and_build: cfg.build.clean_and_build.unwrap_or(true),
            backend_output: cfg.backend.output.unwrap_or_default(),
            categories: cfg.integration.categories.clone(),
            policy: cfg.integration.policy.unwrap_or_default(),
            root,
        };

        Ok(layout)
    }

    /// Published backend binary.
    pub fn backend_binary(&self) -> PathBuf {
        self.publish_dir.join(&self.backend_dll)
    }

    pub fn unit_project_dir(&self) -> &Path {
        parent_dir(&self.unit_project)
    }

    pub fn integration_project_dir(&self) -> &Path {
        parent_dir(&self.integration_project)
    }
}

fn non_empty<'a>(
    key: &'static str,
    value: Option<&'a str>,
    default: &'a str,
) -> Result<&'a str, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { key }),
        Some(v) => Ok(v),
    }
}

fn project_file(key: &'static str, path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.file_name().is_none() {
        return Err(ConfigError::NotAFile {
            key,
            value: path.display().to_string(),
        });
    }
    Ok(path)
}

fn runner_program(root: &Path, program: &str) -> String {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() < 2 {
        return program.to_string();
    }
    let anchored = root.join(path);
    std::path::absolute(&anchored)
        .unwrap_or(anchored)
        .display()
        .to_string()
}

fn parent_dir(file: &Path) -> &Path {
    file.parent().unwrap_or_else(|| Path::new("."))
}
