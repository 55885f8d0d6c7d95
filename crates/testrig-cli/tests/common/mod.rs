//! Shared fixture: a scratch repository with a fake `dotnet` that records
//! every invocation instead of building anything.

#![allow(dead_code, deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const UNIT_DIR: &str = "Neo4j.Driver/Neo4j.Driver.Tests";
pub const INTEGRATION_DIR: &str = "Neo4j.Driver/Neo4j.Driver.Tests.Integration";

/// Appends one tab-separated line per call: args, cwd, and the env the
/// tool is expected to hand over. Exits with `$FAKE_DOTNET_CODE` (default 1)
/// when the joined args contain `$FAKE_DOTNET_FAIL_ON`.
const FAKE_DOTNET: &str = r#"#!/bin/sh
log="$(dirname "$0")/calls.log"
printf '%s\t%s\t%s\t%s\t%s\t%s\n' "$*" "$(pwd)" "${TEAMCITY_PROJECT_NAME:-}" "${NEO4J_URI:-}" "${NEO4J_USER:-}" "${NEO4J_PASSWORD:-}" >> "$log"
echo "fake dotnet $*"
echo "fake dotnet stderr" >&2
if [ -n "${FAKE_DOTNET_FAIL_ON:-}" ]; then
  case "$*" in
    *"$FAKE_DOTNET_FAIL_ON"*) exit "${FAKE_DOTNET_CODE:-1}" ;;
  esac
fi
exit 0
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: String,
    pub cwd: PathBuf,
    pub teamcity_project: String,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
}

pub struct FakeRepo {
    dir: TempDir,
    bin: TempDir,
}

impl FakeRepo {
    /// Repository skeleton plus a `testrig.toml` pointing at the fake.
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// As [`FakeRepo::new`], with `extra` appended to `testrig.toml`.
    pub fn with_config(extra: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("create repo dir");
        let bin = tempfile::tempdir().expect("create bin dir");

        for sub in [UNIT_DIR, INTEGRATION_DIR] {
            fs::create_dir_all(dir.path().join(sub)).expect("create project dir");
        }

        let dotnet = bin.path().join("dotnet");
        fs::write(&dotnet, FAKE_DOTNET).expect("write fake dotnet");
        let mut perms = fs::metadata(&dotnet).expect("stat fake dotnet").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&dotnet, perms).expect("chmod fake dotnet");

        let config = format!(
            "[runner]\ndotnet = {:?}\n{extra}",
            dotnet.display().to_string()
        );
        fs::write(dir.path().join("testrig.toml"), config).expect("write testrig.toml");

        Self { dir, bin }
    }

    /// Put a launcher for the fake at `rel` inside the repository and point
    /// `[runner] dotnet` at that relative path.
    pub fn use_repo_relative_dotnet(&self, rel: &str) {
        use std::os::unix::fs::PermissionsExt;

        let launcher = self.path(rel);
        if let Some(parent) = launcher.parent() {
            fs::create_dir_all(parent).expect("create launcher dir");
        }
        let target = self.bin.path().join("dotnet");
        fs::write(
            &launcher,
            format!("#!/bin/sh\nexec '{}' \"$@\"\n", target.display()),
        )
        .expect("write launcher");
        fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755))
            .expect("chmod launcher");

        fs::write(
            self.path("testrig.toml"),
            format!("[runner]\ndotnet = {rel:?}\n"),
        )
        .expect("rewrite testrig.toml");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn canonical_root(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("canonicalize root")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// `testrig` run from the repository root, with stress env cleared.
    pub fn testrig(&self) -> Command {
        let mut cmd = Command::cargo_bin("testrig").expect("failed to find testrig binary");
        cmd.current_dir(self.root());
        for key in [
            "TEST_NEO4J_SCHEME",
            "TEST_NEO4J_HOST",
            "TEST_NEO4J_PORT",
            "TEST_NEO4J_USER",
            "TEST_NEO4J_PASS",
            "TEST_NEO4J_IS_CLUSTER",
            "FAKE_DOTNET_FAIL_ON",
            "FAKE_DOTNET_CODE",
            "RUST_LOG",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }

    pub fn calls(&self) -> Vec<Call> {
        let Ok(text) = fs::read_to_string(self.bin.path().join("calls.log")) else {
            return Vec::new();
        };

        text.lines()
            .map(|line| {
                let f: Vec<&str> = line.split('\t').collect();
                Call {
                    args: f[0].to_string(),
                    cwd: PathBuf::from(f[1]),
                    teamcity_project: f[2].to_string(),
                    neo4j_uri: f[3].to_string(),
                    neo4j_user: f[4].to_string(),
                    neo4j_password: f[5].to_string(),
                }
            })
            .collect()
    }

    pub fn args(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.args).collect()
    }
}
