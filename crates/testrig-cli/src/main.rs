use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use testrig_adapters::StdProcessRunner;
use testrig_app::{
    BackendRequest, BackendUseCase, BuildRequest, BuildUseCase, IntegrationRequest,
    IntegrationTestUseCase, Layout, StressRequest, StressTestUseCase, SuiteOutcome, SystemClock,
    UnitRequest, UnitTestUseCase, parse_config, render_markdown, teamcity_messages,
};
use testrig_domain::{StressConnection, exit_status_byte};
use testrig_types::{
    ConfigFile, ENV_STRESS_DURATION, ENV_STRESS_MIN_LOG_LEVEL, FailurePolicy, OutputMode,
    SuiteReceipt, ToolInfo,
};

const DEFAULT_CONFIG: &str = "testrig.toml";

#[derive(Debug, Parser)]
#[command(
    name = "testrig",
    version,
    about = "Build, launch and test the .NET driver in CI"
)]
struct Cli {
    /// Config file (default: ./testrig.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (overrides RUST_LOG)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct RootArgs {
    /// Repository root (overrides paths.root)
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ReceiptArgs {
    /// Write a suite receipt (JSON) to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Restore, clean, build and publish the driver and test backend.
    Build {
        #[command(flatten)]
        root: RootArgs,

        /// Only restore and publish
        #[arg(long, default_value_t = false)]
        skip_clean_build: bool,

        #[command(flatten)]
        receipt: ReceiptArgs,
    },

    /// Start the published test backend on 0.0.0.0:9876 and block on it.
    Backend {
        #[command(flatten)]
        root: RootArgs,

        /// Where backend output goes: inherit | files
        #[arg(long)]
        output: Option<OutputMode>,
    },

    /// Run the unit-test project.
    Unit {
        #[command(flatten)]
        root: RootArgs,

        #[command(flatten)]
        receipt: ReceiptArgs,
    },

    /// Run the integration-test project once per test category.
    Integration {
        #[command(flatten)]
        root: RootArgs,

        /// How category failures are handled: aggregate | fail-fast
        #[arg(long)]
        policy: Option<FailurePolicy>,

        #[command(flatten)]
        receipt: ReceiptArgs,
    },

    /// Run the stress suite against the server named by TEST_NEO4J_* variables.
    Stress {
        #[command(flatten)]
        root: RootArgs,

        #[command(flatten)]
        receipt: ReceiptArgs,
    },

    /// Render a Markdown summary from a suite receipt.
    Md {
        #[arg(long)]
        receipt: PathBuf,

        /// Output markdown path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit TeamCity service messages from a suite receipt.
    Teamcity {
        #[arg(long)]
        receipt: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so the toolchain's own output on stdout stays readable.
fn init_logging(verbose: bool) {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .init();
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    let config = cli.config.as_deref();

    match cli.cmd {
        Command::Build {
            root,
            skip_clean_build,
            receipt,
        } => {
            let mut layout = layout(config, &root)?;
            if skip_clean_build {
                layout.clean_and_build = false;
            }

            let usecase = BuildUseCase::new(StdProcessRunner, SystemClock, tool_info());
            let outcome = usecase.execute(BuildRequest { layout })?;
            finish(outcome, &receipt)
        }

        Command::Backend { root, output } => {
            let layout = layout(config, &root)?;
            let output = output.unwrap_or(layout.backend_output);

            let usecase = BackendUseCase::new(StdProcessRunner);
            match usecase.execute(BackendRequest { layout, output })? {}
        }

        Command::Unit { root, receipt } => {
            let layout = layout(config, &root)?;

            let usecase = UnitTestUseCase::new(StdProcessRunner, SystemClock, tool_info());
            let outcome = usecase.execute(UnitRequest { layout })?;
            finish(outcome, &receipt)
        }

        Command::Integration {
            root,
            policy,
            receipt,
        } => {
            let layout = layout(config, &root)?;
            let policy = policy.unwrap_or(layout.policy);

            let usecase = IntegrationTestUseCase::new(StdProcessRunner, SystemClock, tool_info());
            let outcome = usecase.execute(IntegrationRequest { layout, policy })?;
            finish(outcome, &receipt)
        }

        Command::Stress { root, receipt } => {
            let layout = layout(config, &root)?;
            let connection = StressConnection::from_lookup(|key| std::env::var(key).ok())
                .context("stress tests need a target server")?;

            for key in [ENV_STRESS_DURATION, ENV_STRESS_MIN_LOG_LEVEL] {
                if let Ok(value) = std::env::var(key) {
                    tracing::info!(var = key, %value, "passing stress setting through");
                }
            }

            let usecase = StressTestUseCase::new(StdProcessRunner, SystemClock, tool_info());
            let outcome = usecase.execute(StressRequest { layout, connection })?;
            finish(outcome, &receipt)
        }

        Command::Md { receipt, out } => {
            let suite: SuiteReceipt = read_json(&receipt)?;
            let md = render_markdown(&suite);

            match out {
                Some(path) => {
                    fs::write(&path, md).with_context(|| format!("write {}", path.display()))?;
                }
                None => {
                    print!("{md}");
                }
            }

            Ok(0)
        }

        Command::Teamcity { receipt } => {
            let suite: SuiteReceipt = read_json(&receipt)?;
            for line in teamcity_messages(&suite) {
                println!("{line}");
            }
            Ok(0)
        }
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "testrig".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn layout(config: Option<&Path>, root: &RootArgs) -> anyhow::Result<Layout> {
    let cfg = load_config(config)?;
    Ok(Layout::resolve(&cfg, root.root.as_deref())?)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let path = match path {
        Some(p) => p,
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if !default.is_file() {
                return Ok(ConfigFile::default());
            }
            default
        }
    };

    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = parse_config(&text).with_context(|| format!("load {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

/// Write the receipt (if asked) and turn the outcome into an exit status.
fn finish(outcome: SuiteOutcome, receipt: &ReceiptArgs) -> anyhow::Result<u8> {
    if let Some(out) = &receipt.out {
        write_json(out, &outcome.receipt, receipt.pretty)?;
    }

    if outcome.failed {
        // Steps did run; the toolchain reported failures.
        eprintln!(
            "{} failed: {}",
            outcome.receipt.suite.as_str(),
            outcome.reasons.join(", ")
        );
        return Ok(exit_status_byte(outcome.exit_code).max(1));
    }

    Ok(0)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
