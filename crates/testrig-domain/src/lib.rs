//! Domain logic for testrig.
//!
//! This crate is intentionally I/O-free: it remaps environments, picks filters,
//! and keeps score. Reading the real process environment happens in the callers.

use testrig_types::{
    ENV_NEO4J_PASSWORD, ENV_NEO4J_URI, ENV_NEO4J_USER, ENV_TEST_HOST, ENV_TEST_IS_CLUSTER,
    ENV_TEST_PASS, ENV_TEST_PORT, ENV_TEST_SCHEME, ENV_TEST_USER, FailurePolicy, StepRecord,
    StepStatus, StressTopology, TestCategory, Verdict, VerdictCounts, VerdictStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<&'static str>),
}

/// `{scheme}://{host}:{port}`, verbatim.
pub fn compose_uri(scheme: &str, host: &str, port: &str) -> String {
    format!("{scheme}://{host}:{port}")
}

/// Display-name substring filter understood by `dotnet test --filter`.
pub fn display_name_filter(term: &str) -> String {
    format!("DisplayName~{term}")
}

/// A flag counts as set when it has a value that is not an explicit "off".
pub fn is_truthy(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !["0", "false", "no", "off"]
            .iter()
            .any(|off| v.eq_ignore_ascii_case(off)),
    }
}

/// Connection settings handed to the stress suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConnection {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub topology: StressTopology,
}

impl StressConnection {
    /// Resolve from a variable lookup (usually `std::env::var`).
    ///
    /// Empty values count as missing. Every missing variable is reported, in
    /// declaration order, so CI shows the whole problem at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = [
            ENV_TEST_SCHEME,
            ENV_TEST_HOST,
            ENV_TEST_PORT,
            ENV_TEST_USER,
            ENV_TEST_PASS,
        ];

        let mut values = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for key in required {
            match lookup(key).filter(|v| !v.is_empty()) {
                Some(v) => values.push(v),
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            return Err(DomainError::MissingEnv(missing));
        }

        let [scheme, host, port, user, password]: [String; 5] = values
            .try_into()
            .map_err(|_| DomainError::MissingEnv(required.to_vec()))?;

        let topology = if is_truthy(lookup(ENV_TEST_IS_CLUSTER).as_deref()) {
            StressTopology::CausalCluster
        } else {
            StressTopology::SingleInstance
        };

        Ok(Self {
            uri: compose_uri(&scheme, &host, &port),
            user,
            password,
            topology,
        })
    }

    /// Variables the test project's own configuration loader expects.
    pub fn child_env(&self) -> Vec<(String, String)> {
        vec![
            (ENV_NEO4J_USER.to_string(), self.user.clone()),
            (ENV_NEO4J_PASSWORD.to_string(), self.password.clone()),
            (ENV_NEO4J_URI.to_string(), self.uri.clone()),
        ]
    }

    pub fn filter(&self) -> String {
        display_name_filter(self.topology.test_class())
    }
}

/// Categories to run, in canonical order.
///
/// Disabled categories are dropped even when requested, and duplicates collapse.
/// `None` selects every enabled category.
pub fn integration_plan(requested: Option<&[TestCategory]>) -> Vec<TestCategory> {
    TestCategory::ALL
        .into_iter()
        .filter(|c| c.is_enabled())
        .filter(|c| requested.is_none_or(|r| r.contains(c)))
        .collect()
}

/// Map a child exit code onto a process exit status.
///
/// Codes outside `1..=255` (negative, signal-killed, or too large) become 1.
/// Zero stays zero.
pub fn exit_status_byte(code: i32) -> u8 {
    match code {
        0 => 0,
        1..=255 => code as u8,
        _ => 1,
    }
}

/// Accumulator for step outcomes across a suite.
///
/// Threaded through each invocation and inspected once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureTally {
    steps: Vec<StepRecord>,
    skipped: u32,
}

impl FailureTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    /// Note planned steps that will not run.
    pub fn skip(&mut self, count: usize) {
        self.skipped = self
            .skipped
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn failed(&self) -> bool {
        self.first_failure().is_some()
    }

    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Fail)
    }

    /// Whether the next planned step should run under `policy`.
    pub fn should_continue(&self, policy: FailurePolicy) -> bool {
        match policy {
            FailurePolicy::Aggregate => true,
            FailurePolicy::FailFast => !self.failed(),
        }
    }

    /// Exit code the suite should report: the first failure's, or 0.
    pub fn exit_code(&self) -> i32 {
        self.first_failure().map_or(0, |s| s.exit_code)
    }

    pub fn verdict(&self) -> Verdict {
        let mut counts = VerdictCounts {
            pass: 0,
            fail: 0,
            skipped: self.skipped,
        };
        let mut reasons = Vec::new();

        for step in &self.steps {
            match step.status {
                StepStatus::Pass => counts.pass += 1,
                StepStatus::Fail => {
                    counts.fail += 1;
                    reasons.push(format!(
                        "{} exited with code {}",
                        step.name, step.exit_code
                    ));
                }
            }
        }

        if self.skipped > 0 {
            reasons.push(format!("{} step(s) skipped after failure", self.skipped));
        }

        let status = if counts.fail > 0 {
            VerdictStatus::Fail
        } else {
            VerdictStatus::Pass
        };

        Verdict {
            status,
            counts,
            reasons,
        }
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}

/// Status of a finished step given its exit code.
pub fn step_status(exit_code: i32) -> StepStatus {
    if exit_code == 0 {
        StepStatus::Pass
    } else {
        StepStatus::Fail
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The stress URI is exactly `{scheme}://{host}:{port}` for any inputs.
        #[test]
        fn uri_is_plain_format(
            scheme in "[a-z+]{1,12}",
            host in "[a-zA-Z0-9.-]{1,30}",
            port in "[0-9]{1,5}",
            user in "[a-zA-Z0-9]{1,10}",
            pass in "[ -~]{1,20}",
        ) {
            let lookup = |k: &str| match k {
                ENV_TEST_SCHEME => Some(scheme.clone()),
                ENV_TEST_HOST => Some(host.clone()),
                ENV_TEST_PORT => Some(port.clone()),
                ENV_TEST_USER => Some(user.clone()),
                ENV_TEST_PASS => Some(pass.clone()),
                _ => None,
            };
            let conn = StressConnection::from_lookup(lookup).unwrap();
            prop_assert_eq!(conn.uri, format!("{}://{}:{}", scheme, host, port));
            prop_assert_eq!(conn.topology, StressTopology::SingleInstance);
        }

        /// Any plan is a subsequence of the canonical order and never contains Routing.
        #[test]
        fn plan_is_ordered_subset(
            picks in proptest::collection::vec(0usize..6, 0..12)
        ) {
            let requested: Vec<TestCategory> =
                picks.into_iter().map(|i| TestCategory::ALL[i]).collect();
            let plan = integration_plan(Some(requested.as_slice()));

            prop_assert!(!plan.contains(&TestCategory::Routing));
            prop_assert!(plan.windows(2).all(|w| w[0] < w[1]));
            for c in &plan {
                prop_assert!(requested.contains(c));
            }
        }

        /// Fail-fast stops exactly when the tally holds a failure.
        #[test]
        fn fail_fast_tracks_first_failure(codes in proptest::collection::vec(0i32..4, 0..10)) {
            let mut tally = FailureTally::new();
            for (i, code) in codes.iter().enumerate() {
                tally.record(StepRecord {
                    name: format!("step-{i}"),
                    command: vec![],
                    cwd: None,
                    exit_code: *code,
                    wall_ms: 0,
                    status: step_status(*code),
                });
            }
            let any_failed = codes.iter().any(|c| *c != 0);
            prop_assert_eq!(tally.should_continue(FailurePolicy::FailFast), !any_failed);
            prop_assert!(tally.should_continue(FailurePolicy::Aggregate));
            prop_assert_eq!(
                tally.exit_code(),
                codes.iter().copied().find(|c| *c != 0).unwrap_or(0)
            );
        }
    }
}
