//! Markdown and TeamCity renderings of suite receipts.

use crate::format_elapsed;
use testrig_types::{StepStatus, SuiteReceipt, VerdictStatus};

pub fn render_markdown(receipt: &SuiteReceipt) -> String {
    let mut out = String::new();

    let suite = receipt.suite.as_str();
    let header = match receipt.verdict.status {
        VerdictStatus::Pass => format!("✅ testrig {suite}: pass"),
        VerdictStatus::Fail => format!("❌ testrig {suite}: fail"),
    };

    out.push_str(&header);
    out.push_str("\n\n");

    out.push_str("| step | status | exit code | duration |\n");
    out.push_str("|---|---|---:|---:|\n");

    for step in &receipt.steps {
        let status_icon = match step.status {
            StepStatus::Pass => "✅",
            StepStatus::Fail => "❌",
        };

        out.push_str(&format!(
            "| `{name}` | {status} | {code} | {elapsed} |\n",
            name = step.name,
            status = status_icon,
            code = step.exit_code,
            elapsed = format_elapsed(step.wall_ms),
        ));
    }

    if !receipt.verdict.reasons.is_empty() {
        out.push_str("\n**Notes:**\n");
        for r in &receipt.verdict.reasons {
            out.push_str(&format!("- {}\n", r));
        }
    }

    out
}

/// TeamCity service messages: one duration statistic per step, one build
/// problem per failed step.
pub fn teamcity_messages(receipt: &SuiteReceipt) -> Vec<String> {
    let suite = receipt.suite.as_str();
    let mut lines = Vec::new();

    for step in &receipt.steps {
        let key = format!("testrig.{suite}.{}.wall_ms", step.name);
        lines.push(format!(
            "##teamcity[buildStatisticValue key='{}' value='{}']",
            teamcity_escape(&key),
            step.wall_ms
        ));

        if step.status == StepStatus::Fail {
            let description = format!(
                "testrig {suite}: {} exited with code {}",
                step.name, step.exit_code
            );
            let identity = format!("testrig.{suite}.{}", step.name);
            lines.push(format!(
                "##teamcity[buildProblem description='{}' identity='{}']",
                teamcity_escape(&description),
                teamcity_escape(&identity)
            ));
        }
    }

    lines
}

/// Escape a value for a TeamCity service message attribute.
pub fn teamcity_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '|' => out.push_str("||"),
            '\'' => out.push_str("|'"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            '\u{0085}' => out.push_str("|x"),
            '\u{2028}' => out.push_str("|l"),
            '\u{2029}' => out.push_str("|p"),
            c => out.push(c),
        }
    }
    out
}
