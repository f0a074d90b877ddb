//! Health check results and their rendering.

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;
use serde_derive::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// Not a failure, but something to look at
    Warn,
    Skip,
}

impl CheckStatus {
    fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skip => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub checks: Vec<CheckResult>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(&mut self, name: &str, status: CheckStatus, detail: Option<S>) {
        self.checks.push(CheckResult {
            name: name.into(),
            status,
            detail: detail.map(Into::into),
        });
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn success(&self) -> bool {
        self.count(CheckStatus::Fail) == 0
    }

    /// Write the human readable form.
    ///
    /// Colors follow the global `colored` override set by `main`.
    pub fn print_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let rule = "=".repeat(50);
        writeln!(out, "{}", rule)?;
        writeln!(out, "  INDI Telescope Control Check")?;
        writeln!(out, "{}", rule)?;
        writeln!(out)?;

        for (i, check) in self.checks.iter().enumerate() {
            let label = match check.status {
                CheckStatus::Pass => check.status.label().green().bold(),
                CheckStatus::Fail => check.status.label().red().bold(),
                CheckStatus::Warn => check.status.label().yellow().bold(),
                CheckStatus::Skip => check.status.label().dimmed(),
            };
            write!(out, "Check {}: {}... [{}]", i + 1, check.name, label)?;
            match check.detail {
                Some(ref detail) => writeln!(out, " {}", detail)?,
                None => writeln!(out)?,
            }
        }

        writeln!(out)?;
        writeln!(out, "{}", rule)?;
        writeln!(
            out,
            "  Results: {} passed, {} failed, {} warnings, {} skipped",
            self.count(CheckStatus::Pass),
            self.count(CheckStatus::Fail),
            self.count(CheckStatus::Warn),
            self.count(CheckStatus::Skip)
        )?;
        writeln!(out, "{}", rule)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
