//! Resolved job options and the resource checks shared by every engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ToolchainError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"?([-a-zA-Z0-9.`?{}]+@\w+\.\w+)"?"#).expect("email pattern compiles")
});

/// Execution backend selected once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Launch directly on this machine and wait for the process.
    #[default]
    Interactive,
    /// Render a job script and hand it to the batch scheduler.
    Batch,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Interactive => "interactive",
            EngineKind::Batch => "batch",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = ToolchainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "interactive" => Ok(EngineKind::Interactive),
            "batch" => Ok(EngineKind::Batch),
            other => Err(ToolchainError::configuration(format!(
                "unknown engine {other:?} (expected interactive or batch)"
            ))),
        }
    }
}

/// Already-parsed options for one run invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Input deck: a JSON file or a descriptor script that prints one.
    pub input: PathBuf,
    /// Targets to run, in request order.
    pub targets: Vec<String>,
    /// Build mode, e.g. `release-cpu` or `release-gpu`.
    pub mode: String,
    pub engine: EngineKind,
    /// Job name shown in scheduler queues.
    pub name: String,
    /// Parallel build jobs.
    pub jobs: u32,
    pub nodes: i64,
    pub cpus_per_node: i64,
    pub gpus_per_node: i64,
    /// MPI launcher to use instead of the configured one (`mpirun`, `srun`, `jsrun`).
    pub binary: Option<PathBuf>,
    pub case_optimization: bool,
    pub no_build: bool,
    pub no_mpi: bool,
    /// Notification address for batch jobs. Blank means no notification.
    pub email: String,
    pub walltime: String,
    pub partition: String,
    pub account: String,
    /// Block until a submitted batch job finishes.
    pub wait: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("case.py"),
            targets: Vec::new(),
            mode: "release-cpu".to_string(),
            engine: EngineKind::default(),
            name: "sim".to_string(),
            jobs: 1,
            nodes: 1,
            cpus_per_node: 1,
            gpus_per_node: 0,
            binary: None,
            case_optimization: false,
            no_build: false,
            no_mpi: false,
            email: String::new(),
            walltime: "01:00:00".to_string(),
            partition: String::new(),
            account: String::new(),
            wait: false,
        }
    }
}

impl JobOptions {
    /// GPU builds are identified by the mode name.
    pub fn uses_gpus(&self) -> bool {
        self.mode.contains("gpu")
    }

    /// Total ranks across all nodes.
    pub fn total_ranks(&self) -> Result<i64, ToolchainError> {
        self.nodes.checked_mul(self.cpus_per_node).ok_or_else(|| {
            ToolchainError::configuration(format!(
                "RUN: {} nodes with {} CPUs each is more ranks than can be launched.",
                self.nodes, self.cpus_per_node
            ))
        })
    }
}

/// Resource checks every engine applies before backend-specific ones.
pub fn validate_job_options(options: &JobOptions) -> Result<(), ToolchainError> {
    if options.cpus_per_node != options.gpus_per_node && options.gpus_per_node != 0 {
        return Err(ToolchainError::configuration(
            "RUN: Conflicting job execution parameters. If using GPUs, CPUs per node and GPUs per node must match.",
        ));
    }
    if options.nodes <= 0 {
        return Err(ToolchainError::configuration(
            "RUN: At least one node must be requested.",
        ));
    }
    if options.cpus_per_node <= 0 {
        return Err(ToolchainError::configuration(
            "RUN: At least one CPU per node must be requested.",
        ));
    }
    options.total_ranks()?;
    if !options.email.trim().is_empty() && !EMAIL_PATTERN.is_match(&options.email) {
        return Err(ToolchainError::configuration(format!(
            "RUN: {} is not a valid e-mail address.",
            options.email
        )));
    }
    Ok(())
}
