//! StressTestUseCase - run the stress suite against an already-built tree.

use crate::suites::file_arg;
use crate::{Clock, Layout, PlannedStep, SuiteOutcome, run_suite};
use testrig_adapters::{CommandSpec, ProcessRunner};
use testrig_domain::StressConnection;
use testrig_types::{FailurePolicy, SuiteKind, ToolInfo};

#[derive(Debug, Clone)]
pub struct StressRequest {
    pub layout: Layout,
    pub connection: StressConnection,
}

pub struct StressTestUseCase<R: ProcessRunner, C: Clock> {
    runner: R,
    clock: C,
    tool: ToolInfo,
}

impl<R: ProcessRunner, C: Clock> StressTestUseCase<R, C> {
    pub fn new(runner: R, clock: C, tool: ToolInfo) -> Self {
        Self {
            runner,
            clock,
            tool,
        }
    }

    pub fn execute(&self, req: StressRequest) -> anyhow::Result<SuiteOutcome> {
        tracing::info!(
            uri = %req.connection.uri,
            user = %req.connection.user,
            suite = req.connection.topology.test_class(),
            "selected stress suite"
        );

        let step = PlannedStep::new(
            req.connection.topology.test_class(),
            stress_spec(&req.layout, &req.connection),
        );

        run_suite(
            &self.runner,
            &self.clock,
            &self.tool,
            SuiteKind::Stress,
            FailurePolicy::FailFast,
            vec![step],
        )
    }
}

/// Assumes a prior build: no restore, no build.
pub fn stress_spec(layout: &Layout, connection: &StressConnection) -> CommandSpec {
    CommandSpec::new(vec![
        layout.dotnet.clone(),
        "test".to_string(),
        file_arg(&layout.integration_project),
        "--no-restore".to_string(),
        "--no-build".to_string(),
        "--filter".to_string(),
        connection.filter(),
    ])
    .cwd(layout.integration_project_dir())
    .envs(connection.child_env())
}
