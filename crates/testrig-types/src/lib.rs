//! Shared types for testrig.
//!
//! Design goal: versioned, explicit, boring.
//! These structs are the config file contract and the suite receipts written for CI.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SUITE_SCHEMA_V1: &str = "testrig.suite.v1";

// ----------------------------
// Environment contract
// ----------------------------

pub const ENV_TEST_SCHEME: &str = "TEST_NEO4J_SCHEME";
pub const ENV_TEST_HOST: &str = "TEST_NEO4J_HOST";
pub const ENV_TEST_PORT: &str = "TEST_NEO4J_PORT";
pub const ENV_TEST_USER: &str = "TEST_NEO4J_USER";
pub const ENV_TEST_PASS: &str = "TEST_NEO4J_PASS";
pub const ENV_TEST_IS_CLUSTER: &str = "TEST_NEO4J_IS_CLUSTER";

/// Stress tuning knobs read by the .NET stress harness itself.
pub const ENV_STRESS_DURATION: &str = "TEST_NEO4J_STRESS_DURATION";
pub const ENV_STRESS_MIN_LOG_LEVEL: &str = "TEST_NEO4J_STRESS_MIN_LOG_LEVEL";

pub const ENV_TEAMCITY_PROJECT: &str = "TEAMCITY_PROJECT_NAME";
pub const ENV_NEO4J_USER: &str = "NEO4J_USER";
pub const ENV_NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_NEO4J_URI: &str = "NEO4J_URI";

pub const TEAMCITY_UNIT_PROJECT: &str = "unittests";
pub const TEAMCITY_INTEGRATION_PROJECT: &str = "integrationtests";

// ----------------------------
// Backend contract
// ----------------------------

/// The backend always listens on every interface.
pub const BACKEND_HOST: &str = "0.0.0.0";
pub const BACKEND_PORT: u16 = 9876;

// ----------------------------
// Default repository layout
// ----------------------------

pub const DEFAULT_DOTNET: &str = "dotnet";
pub const DEFAULT_SOLUTION: &str = "Neo4j.Driver/Neo4j.Driver.sln";
pub const DEFAULT_BACKEND_PROJECT: &str =
    "Neo4j.Driver/Neo4j.Driver.Tests.TestBackend/Neo4j.Driver.Tests.TestBackend.csproj";
pub const DEFAULT_PUBLISH_DIR: &str = "./bin/Publish";
pub const DEFAULT_BACKEND_DLL: &str = "Neo4j.Driver.Tests.TestBackend.dll";
pub const DEFAULT_BACKEND_LOG: &str = "../artifacts/backend.log";
pub const DEFAULT_BACKEND_STDOUT_LOG: &str = "/artifacts/backendout.log";
pub const DEFAULT_BACKEND_STDERR_LOG: &str = "/artifacts/backenderr.log";
pub const DEFAULT_UNIT_PROJECT: &str = "Neo4j.Driver/Neo4j.Driver.Tests/Neo4j.Driver.Tests.csproj";
pub const DEFAULT_INTEGRATION_PROJECT: &str =
    "Neo4j.Driver/Neo4j.Driver.Tests.Integration/Neo4j.Driver.Tests.Integration.csproj";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?} (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

// ----------------------------
// Test selection
// ----------------------------

/// Integration test categories, matched by display-name substring.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum TestCategory {
    Internals,
    Direct,
    Reactive,
    Types,
    Examples,
    Routing,
}

impl TestCategory {
    /// Every category, in run order.
    pub const ALL: [TestCategory; 6] = [
        TestCategory::Internals,
        TestCategory::Direct,
        TestCategory::Reactive,
        TestCategory::Types,
        TestCategory::Examples,
        TestCategory::Routing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TestCategory::Internals => "Internals",
            TestCategory::Direct => "Direct",
            TestCategory::Reactive => "Reactive",
            TestCategory::Types => "Types",
            TestCategory::Examples => "Examples",
            TestCategory::Routing => "Routing",
        }
    }

    /// Routing tests need a cluster the integration job does not provision.
    pub fn is_enabled(self) -> bool {
        !matches!(self, TestCategory::Routing)
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                kind: "test category",
                value: s.to_string(),
                expected: "Internals, Direct, Reactive, Types, Examples, Routing",
            })
    }
}

/// Which stress suite to run against the target deployment.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StressTopology {
    SingleInstance,
    CausalCluster,
}

impl StressTopology {
    /// Test class name used as the display-name filter term.
    pub fn test_class(self) -> &'static str {
        match self {
            StressTopology::SingleInstance => "SingleInstanceStressTests",
            StressTopology::CausalCluster => "CausalClusterStressTests",
        }
    }
}

// ----------------------------
// Policies
// ----------------------------

/// Where the backend's stdout/stderr end up.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Inherit the parent's streams.
    #[default]
    Inherit,
    /// Redirect into the configured stdout/stderr log files.
    Files,
}

impl FromStr for OutputMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inherit" => Ok(OutputMode::Inherit),
            "files" => Ok(OutputMode::Files),
            other => Err(ParseEnumError {
                kind: "output mode",
                value: other.to_string(),
                expected: "inherit, files",
            }),
        }
    }
}

/// How a multi-invocation suite reacts to a failing invocation.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Run everything, report all failures once at the end.
    #[default]
    Aggregate,
    /// Stop at the first failing invocation.
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggregate" => Ok(FailurePolicy::Aggregate),
            "fail-fast" => Ok(FailurePolicy::FailFast),
            other => Err(ParseEnumError {
                kind: "failure policy",
                value: other.to_string(),
                expected: "aggregate, fail-fast",
            }),
        }
    }
}

// ----------------------------
// Receipts
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunMeta {
    pub id: String,
    pub started_at: String,
    pub ended_at: String,
    pub host: HostInfo,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuiteKind {
    Build,
    Backend,
    Unit,
    Integration,
    Stress,
}

impl SuiteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteKind::Build => "build",
            SuiteKind::Backend => "backend",
            SuiteKind::Unit => "unit",
            SuiteKind::Integration => "integration",
            SuiteKind::Stress => "stress",
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pass,
    Fail,
}

/// One external process invocation and how it ended.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,

    /// argv vector (no shell parsing).
    pub command: Vec<String>,

    /// Working directory the process was started in (stringified path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    pub exit_code: i32,
    pub wall_ms: u64,
    pub status: StepStatus,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct VerdictCounts {
    pub pass: u32,
    pub fail: u32,

    /// Planned steps that never ran because an earlier step stopped the suite.
    #[serde(default)]
    pub skipped: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub counts: VerdictCounts,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SuiteReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunMeta,
    pub suite: SuiteKind,
    pub policy: FailurePolicy,
    pub steps: Vec<StepRecord>,
    pub verdict: Verdict,
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub integration: IntegrationConfig,
}

/// Repository layout. Relative paths resolve against `root`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_dll: Option<String>,

    /// Passed verbatim to the backend as its log-file argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_log: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_stdout_log: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_stderr_log: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_project: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Program used for every toolchain call (default: `dotnet` on PATH).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dotnet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Run `clean` and `build` between restore and publish (default: true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_and_build: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<TestCategory>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<FailurePolicy>,
}
