//! Orchestration for `toolchain test`: the built-in regression suite.
//!
//! Each selected case is materialized under the test directory and then run
//! through the entry point in its own process, one case at a time.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::context::RunContext;
use crate::core::case::Case;
use crate::core::suite;
use crate::error::ToolchainError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOptions {
    /// Print the cases instead of running them.
    pub list: bool,
    /// Restrict the run to these identities. Empty means every case.
    pub only: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteOutcome {
    pub passed: usize,
    /// Identities of the failing cases.
    pub failed: Vec<String>,
    /// Identities of cases that need more ranks than `--no-mpi` allows.
    pub skipped: Vec<String>,
}

/// Cases selected by `only`, in suite order.
pub fn select_cases(cases: Vec<Case>, only: &[String]) -> Result<Vec<Case>, ToolchainError> {
    if only.is_empty() {
        return Ok(cases);
    }
    let wanted: Vec<String> = only.iter().map(|id| id.to_ascii_uppercase()).collect();
    for id in &wanted {
        if !cases.iter().any(|case| &case.identity() == id) {
            return Err(ToolchainError::configuration(format!(
                "TEST: No case has identity {id}."
            )));
        }
    }
    Ok(cases
        .into_iter()
        .filter(|case| wanted.contains(&case.identity()))
        .collect())
}

#[instrument(skip_all, fields(list = options.list, only = options.only.len()))]
pub fn run_suite(
    ctx: &RunContext,
    options: &TestOptions,
    out: &mut dyn Write,
) -> Result<SuiteOutcome> {
    let cases = select_cases(suite::generate(), &options.only)?;

    if options.list {
        for case in &cases {
            writeln!(out, "{case}").context("write case list")?;
        }
        return Ok(SuiteOutcome::default());
    }

    info!(cases = cases.len(), "running regression suite");
    let mut outcome = SuiteOutcome::default();
    for case in &cases {
        if ctx.options.no_mpi && case.parallelism() > 1 {
            info!(id = %case.identity(), ranks = case.parallelism(), "skipping parallel case");
            writeln!(out, "SKIP {case} (needs {} ranks)", case.parallelism())
                .context("write result")?;
            outcome.skipped.push(case.identity());
            continue;
        }
        case.materialize(ctx)?;
        let output = case.run(ctx)?;
        if output.success() {
            outcome.passed += 1;
            writeln!(out, "PASS {case}").context("write result")?;
        } else {
            warn!(id = %case.identity(), exit_code = ?output.status.code(), "case failed");
            writeln!(out, "FAIL {case}").context("write result")?;
            for line in output.combined().lines() {
                writeln!(out, "  {line}").context("write result")?;
            }
            outcome.failed.push(case.identity());
        }
    }
    write!(
        out,
        "Tested {} case(s): {} passed, {} failed",
        cases.len(),
        outcome.passed,
        outcome.failed.len()
    )
    .context("write summary")?;
    if !outcome.skipped.is_empty() {
        write!(out, ", {} skipped", outcome.skipped.len()).context("write summary")?;
    }
    writeln!(out, ".").context("write summary")?;
    Ok(outcome)
}
