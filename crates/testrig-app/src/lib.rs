//! Application layer for testrig.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not read or write receipts.

mod backend;
mod build;
pub mod config;
mod render;
mod stress;
mod suites;

pub use backend::{BackendRequest, BackendTerminated, BackendUseCase, backend_spec};
pub use build::{BuildRequest, BuildUseCase, build_plan};
pub use config::{ConfigError, Layout, parse_config};
pub use render::{render_markdown, teamcity_escape, teamcity_messages};
pub use stress::{StressRequest, StressTestUseCase, stress_spec};
pub use suites::{
    IntegrationRequest, IntegrationTestUseCase, UnitRequest, UnitTestUseCase, integration_specs,
    unit_spec,
};

use anyhow::Context;
use testrig_adapters::{CommandSpec, ProcessRunner};
use testrig_domain::{FailureTally, step_status};
use testrig_types::{
    FailurePolicy, HostInfo, RunMeta, StepRecord, StepStatus, SuiteKind, SuiteReceipt, ToolInfo,
};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

/// What a suite run produced. The CLI decides exit codes.
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub receipt: SuiteReceipt,

    /// True if any step returned nonzero.
    pub failed: bool,

    /// Exit code of the first failing step, or 0.
    pub exit_code: i32,

    /// Human-readable reasons (for CI logs).
    pub reasons: Vec<String>,
}

/// A named step waiting to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: String,
    pub spec: CommandSpec,
}

impl PlannedStep {
    pub fn new(name: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Runs planned steps in order under a failure policy and builds the receipt.
///
/// Spawn failures are tool errors and abort immediately; nonzero exits are
/// recorded in the tally and handled by `policy`.
pub(crate) fn run_suite<R: ProcessRunner, C: Clock>(
    runner: &R,
    clock: &C,
    tool: &ToolInfo,
    suite: SuiteKind,
    policy: FailurePolicy,
    steps: Vec<PlannedStep>,
) -> anyhow::Result<SuiteOutcome> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = clock.now_rfc3339();

    let total = steps.len();
    let mut tally = FailureTally::new();

    for (i, step) in steps.into_iter().enumerate() {
        if !tally.should_continue(policy) {
            tally.skip(total - i);
            break;
        }
        let record = run_step(runner, &step)?;
        tally.record(record);
    }

    let ended_at = clock.now_rfc3339();
    let verdict = tally.verdict();
    let failed = tally.failed();
    let exit_code = tally.exit_code();

    if failed {
        tracing::warn!(suite = suite.as_str(), exit_code, "suite failed");
    } else {
        tracing::info!(suite = suite.as_str(), steps = total, "suite passed");
    }

    let reasons = verdict.reasons.clone();
    let receipt = SuiteReceipt {
        schema: testrig_types::SUITE_SCHEMA_V1.to_string(),
        tool: tool.clone(),
        run: RunMeta {
            id: run_id,
            started_at,
            ended_at,
            host: HostInfo {
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            },
        },
        suite,
        policy,
        steps: tally.into_steps(),
        verdict,
    };

    Ok(SuiteOutcome {
        receipt,
        failed,
        exit_code,
        reasons,
    })
}

fn run_step<R: ProcessRunner>(runner: &R, step: &PlannedStep) -> anyhow::Result<StepRecord> {
    let spec = &step.spec;
    let cwd = spec.cwd.as_ref().map(|p| p.display().to_string());

    tracing::info!(
        step = %step.name,
        cwd = cwd.as_deref().unwrap_or("."),
        command = %shell_words::join(&spec.argv),
        "running step"
    );
    for (k, _) in &spec.env {
        tracing::debug!(step = %step.name, var = %k, "setting environment variable");
    }

    let run = runner
        .run(spec)
        .with_context(|| format!("failed to run step {}: {:?}", step.name, spec.argv))?;

    let status = step_status(run.exit_code);
    match status {
        StepStatus::Pass => tracing::info!(
            step = %step.name,
            elapsed = %format_elapsed(run.wall_ms),
            "step passed"
        ),
        StepStatus::Fail => tracing::warn!(
            step = %step.name,
            exit_code = run.exit_code,
            elapsed = %format_elapsed(run.wall_ms),
            "step failed"
        ),
    }

    Ok(StepRecord {
        name: step.name.clone(),
        command: spec.argv.clone(),
        cwd,
        exit_code: run.exit_code,
        wall_ms: run.wall_ms,
        status,
    })
}

/// Whole-second precision is plenty for CI logs.
pub(crate) fn format_elapsed(wall_ms: u64) -> String {
    let secs = std::time::Duration::from_secs(wall_ms / 1000);
    if secs.is_zero() {
        format!("{wall_ms}ms")
    } else {
        humantime::format_duration(secs).to_string()
    }
}
