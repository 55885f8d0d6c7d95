//! BuildUseCase - restore, (clean, build,) publish.
//!
//! Every step must succeed before the next one starts. The first nonzero exit
//! ends the build; the remaining steps are recorded as skipped.

use crate::{Clock, Layout, PlannedStep, SuiteOutcome, run_suite};
use testrig_adapters::{CommandSpec, ProcessRunner};
use testrig_types::{FailurePolicy, SuiteKind, ToolInfo};

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub layout: Layout,
}

pub struct BuildUseCase<R: ProcessRunner, C: Clock> {
    runner: R,
    clock: C,
    tool: ToolInfo,
}

impl<R: ProcessRunner, C: Clock> BuildUseCase<R, C> {
    pub fn new(runner: R, clock: C, tool: ToolInfo) -> Self {
        Self {
            runner,
            clock,
            tool,
        }
    }

    pub fn execute(&self, req: BuildRequest) -> anyhow::Result<SuiteOutcome> {
        run_suite(
            &self.runner,
            &self.clock,
            &self.tool,
            SuiteKind::Build,
            FailurePolicy::FailFast,
            build_plan(&req.layout),
        )
    }
}

/// The ordered build steps for `layout`.
pub fn build_plan(layout: &Layout) -> Vec<PlannedStep> {
    let solution = layout.solution.display().to_string();
    let dotnet = |args: &[&str]| {
        let mut argv = vec![layout.dotnet.clone()];
        argv.extend(args.iter().map(|a| a.to_string()));
        CommandSpec::new(argv).cwd(&layout.root)
    };

    let mut steps = vec![PlannedStep::new(
        "restore",
        dotnet(&["restore", "--disable-parallel", &solution]),
    )];

    if layout.clean_and_build {
        steps.push(PlannedStep::new("clean", dotnet(&["clean", &solution])));
        steps.push(PlannedStep::new("build", dotnet(&["build", &solution])));
    }

    steps.push(PlannedStep::new(
        "publish",
        dotnet(&[
            "publish",
            &layout.backend_project.display().to_string(),
            "--output",
            &layout.publish_dir.display().to_string(),
        ]),
    ));

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, ScriptedRunner, tool};
    use std::path::Path;
    use testrig_types::{ConfigFile, StepStatus};

    fn layout(clean_and_build: bool) -> Layout {
        let mut layout = Layout::resolve(&ConfigFile::default(), Some(Path::new("/repo"))).unwrap();
        layout.clean_and_build = clean_and_build;
        layout
    }

    #[test]
    fn full_plan_runs_four_steps_in_order() {
        let runner = ScriptedRunner::default();
        let usecase = BuildUseCase::new(&runner, FixedClock, tool());

        let outcome = usecase
            .execute(BuildRequest {
                layout: layout(true),
            })
            .unwrap();

        assert!(!outcome.failed);
        assert_eq!(
            runner.argvs(),
            vec![
                vec![
                    "dotnet",
                    "restore",
                    "--disable-parallel",
                    "/repo/Neo4j.Driver/Neo4j.Driver.sln"
                ],
                vec!["dotnet", "clean", "/repo/Neo4j.Driver/Neo4j.Driver.sln"],
                vec!["dotnet", "build", "/repo/Neo4j.Driver/Neo4j.Driver.sln"],
                vec![
                    "dotnet",
                    "publish",
                    "/repo/Neo4j.Driver/Neo4j.Driver.Tests.TestBackend/Neo4j.Driver.Tests.TestBackend.csproj",
                    "--output",
                    "/repo/./bin/Publish"
                ],
            ]
        );
        assert!(
            runner
                .calls
                .borrow()
                .iter()
                .all(|s| s.cwd.as_deref() == Some(Path::new("/repo")))
        );
    }

    #[test]
    fn publish_only_variant_skips_clean_and_build() {
        let steps: Vec<String> = build_plan(&layout(false))
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(steps, vec!["restore", "publish"]);
    }

    #[test]
    fn failing_step_stops_the_build() {
        let runner = ScriptedRunner::with_exit_codes(&[0, 0, 6]);
        let usecase = BuildUseCase::new(&runner, FixedClock, tool());

        let outcome = usecase
            .execute(BuildRequest {
                layout: layout(true),
            })
            .unwrap();

        // restore, clean, build ran; publish never did.
        assert_eq!(runner.calls.borrow().len(), 3);
        assert!(outcome.failed);
        assert_eq!(outcome.exit_code, 6);

        let last = outcome.receipt.steps.last().unwrap();
        assert_eq!(last.name, "build");
        assert_eq!(last.status, StepStatus::Fail);
        assert_eq!(outcome.receipt.verdict.counts.skipped, 1);
    }

    #[test]
    fn failing_restore_runs_nothing_else() {
        let runner = ScriptedRunner::with_exit_codes(&[1]);
        let usecase = BuildUseCase::new(&runner, FixedClock, tool());

        let outcome = usecase
            .execute(BuildRequest {
                layout: layout(false),
            })
            .unwrap();

        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(outcome.exit_code, 1);
    }
}
