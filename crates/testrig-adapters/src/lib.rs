//! Std adapters for testrig.
//!
//! In clean-arch terms: this is where we touch the world.

use anyhow::Context;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Destination for a child's stdout or stderr.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Inherit,
    /// Truncate-and-write to this file; parent directories are created.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,

    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,

    pub stdout: OutputTarget,
    pub stderr: OutputTarget,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            cwd: None,
            env: Vec::new(),
            stdout: OutputTarget::Inherit,
            stderr: OutputTarget::Inherit,
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn output(mut self, stdout: OutputTarget, stderr: OutputTarget) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub wall_ms: u64,

    /// `-1` when the child was terminated by a signal.
    pub exit_code: i32,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("command argv must not be empty")]
    EmptyArgv,

    #[error("program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("failed to open log file {path}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Blocking process execution. One child at a time.
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<RunResult, AdapterError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<RunResult, AdapterError> {
        (**self).run(spec)
    }
}

#[derive(Debug, Default, Clone)]
pub struct StdProcessRunner;

impl ProcessRunner for StdProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<RunResult, AdapterError> {
        let Some(program) = spec.argv.first() else {
            return Err(AdapterError::EmptyArgv);
        };

        let resolved = resolve_program(program, spec.cwd.as_deref())?;

        let mut cmd = Command::new(&resolved);
        cmd.args(&spec.argv[1..]);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(open_target(&spec.stdout)?);
        cmd.stderr(open_target(&spec.stderr)?);

        let start = Instant::now();

        let status = cmd
            .status()
            .with_context(|| format!("failed to run {:?}", spec.argv))
            .map_err(AdapterError::Other)?;

        let wall_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(RunResult {
            wall_ms,
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

/// Locate `program` the way a shell would.
///
/// Bare names go through `PATH`; anything with a path separator is taken
/// relative to `cwd` (the child's working directory), matching how the OS
/// resolves it after `chdir`.
pub fn resolve_program(program: &str, cwd: Option<&Path>) -> Result<PathBuf, AdapterError> {
    let not_found = || AdapterError::ProgramNotFound {
        program: program.to_string(),
    };

    let as_path = Path::new(program);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        let candidate = match cwd {
            Some(dir) if as_path.is_relative() => dir.join(as_path),
            _ => as_path.to_path_buf(),
        };
        return if candidate.is_file() {
            Ok(std::path::absolute(&candidate).unwrap_or(candidate))
        } else {
            Err(not_found())
        };
    }

    which::which(program).map_err(|_| not_found())
}

fn open_target(target: &OutputTarget) -> Result<Stdio, AdapterError> {
    match target {
        OutputTarget::Inherit => Ok(Stdio::inherit()),
        OutputTarget::File(path) => open_log(path).map(Stdio::from),
    }
}

fn open_log(path: &Path) -> Result<File, AdapterError> {
    let to_err = |source| AdapterError::OpenLog {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
    }

    File::create(path).map_err(to_err)
}
