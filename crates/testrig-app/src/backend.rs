//! BackendUseCase - start the published test backend and block on it.
//!
//! The backend is a server. It is expected to run until the job kills it, so
//! every exit (even 0) comes back as [`BackendTerminated`].

use crate::Layout;
use anyhow::Context;
use std::convert::Infallible;
use testrig_adapters::{CommandSpec, OutputTarget, ProcessRunner};
use testrig_types::{BACKEND_HOST, BACKEND_PORT, OutputMode};

#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub layout: Layout,
    pub output: OutputMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("test backend exited with code {exit_code} after {elapsed}")]
pub struct BackendTerminated {
    pub exit_code: i32,
    pub elapsed: String,
}

pub struct BackendUseCase<R: ProcessRunner> {
    runner: R,
}

impl<R: ProcessRunner> BackendUseCase<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Never returns `Ok`.
    pub fn execute(&self, req: BackendRequest) -> anyhow::Result<Infallible> {
        let spec = backend_spec(&req.layout, req.output);

        tracing::info!(
            command = %shell_words::join(&spec.argv),
            output = ?req.output,
            "starting test backend on {BACKEND_HOST}:{BACKEND_PORT}"
        );

        let run = self
            .runner
            .run(&spec)
            .with_context(|| format!("failed to start test backend: {:?}", spec.argv))?;

        let terminated = BackendTerminated {
            exit_code: run.exit_code,
            elapsed: crate::format_elapsed(run.wall_ms),
        };
        tracing::error!(exit_code = run.exit_code, "test backend terminated");

        Err(terminated.into())
    }
}

/// `<dotnet> <publish>/<dll> 0.0.0.0 9876 <log>`, run from the repository root.
pub fn backend_spec(layout: &Layout, output: OutputMode) -> CommandSpec {
    let argv = vec![
        layout.dotnet.clone(),
        layout.backend_binary().display().to_string(),
        BACKEND_HOST.to_string(),
        BACKEND_PORT.to_string(),
        layout.backend_log.clone(),
    ];

    let (stdout, stderr) = match output {
        OutputMode::Inherit => (OutputTarget::Inherit, OutputTarget::Inherit),
        OutputMode::Files => (
            OutputTarget::File(layout.backend_stdout_log.clone()),
            OutputTarget::File(layout.backend_stderr_log.clone()),
        ),
    };

    CommandSpec::new(argv)
        .cwd(&layout.root)
        .output(stdout, stderr)
}
