//! Unit and integration test suites.

use crate::{Clock, Layout, PlannedStep, SuiteOutcome, run_suite};
use testrig_adapters::{CommandSpec, ProcessRunner};
use testrig_domain::{display_name_filter, integration_plan};
use testrig_types::{
    ENV_TEAMCITY_PROJECT, FailurePolicy, SuiteKind, TEAMCITY_INTEGRATION_PROJECT,
    TEAMCITY_UNIT_PROJECT, ToolInfo,
};

#[derive(Debug, Clone)]
pub struct UnitRequest {
    pub layout: Layout,
}

pub struct UnitTestUseCase<R: ProcessRunner, C: Clock> {
    runner: R,
    clock: C,
    tool: ToolInfo,
}

impl<R: ProcessRunner, C: Clock> UnitTestUseCase<R, C> {
    pub fn new(runner: R, clock: C, tool: ToolInfo) -> Self {
        Self {
            runner,
            clock,
            tool,
        }
    }

    pub fn execute(&self, req: UnitRequest) -> anyhow::Result<SuiteOutcome> {
        run_suite(
            &self.runner,
            &self.clock,
            &self.tool,
            SuiteKind::Unit,
            FailurePolicy::FailFast,
            vec![PlannedStep::new("unit", unit_spec(&req.layout))],
        )
    }
}

pub fn unit_spec(layout: &Layout) -> CommandSpec {
    CommandSpec::new(vec![
        layout.dotnet.clone(),
        "test".to_string(),
        file_arg(&layout.unit_project),
    ])
    .cwd(layout.unit_project_dir())
    .env(ENV_TEAMCITY_PROJECT, TEAMCITY_UNIT_PROJECT)
}

#[derive(Debug, Clone)]
pub struct IntegrationRequest {
    pub layout: Layout,
    pub policy: FailurePolicy,
}

pub struct IntegrationTestUseCase<R: ProcessRunner, C: Clock> {
    runner: R,
    clock: C,
    tool: ToolInfo,
}

impl<R: ProcessRunner, C: Clock> IntegrationTestUseCase<R, C> {
    pub fn new(runner: R, clock: C, tool: ToolInfo) -> Self {
        Self {
            runner,
            clock,
            tool,
        }
    }

    pub fn execute(&self, req: IntegrationRequest) -> anyhow::Result<SuiteOutcome> {
        run_suite(
            &self.runner,
            &self.clock,
            &self.tool,
            SuiteKind::Integration,
            req.policy,
            integration_specs(&req.layout),
        )
    }
}

/// One `dotnet test --filter DisplayName~<Category>` per planned category.
pub fn integration_specs(layout: &Layout) -> Vec<PlannedStep> {
    integration_plan(layout.categories.as_deref())
        .into_iter()
        .map(|category| {
            let spec = CommandSpec::new(vec![
                layout.dotnet.clone(),
                "test".to_string(),
                file_arg(&layout.integration_project),
                "--filter".to_string(),
                display_name_filter(category.name()),
            ])
            .cwd(layout.integration_project_dir())
            .env(ENV_TEAMCITY_PROJECT, TEAMCITY_INTEGRATION_PROJECT);
            PlannedStep::new(category.name(), spec)
        })
        .collect()
}

/// Project file name as seen from its own directory (the child's cwd).
pub(crate) fn file_arg(project: &std::path::Path) -> String {
    project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project.display().to_string())
}
