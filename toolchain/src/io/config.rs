//! Toolchain configuration stored in `toolchain.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ToolchainError;

pub const DEFAULT_CONFIG_PATH: &str = "toolchain.toml";

/// Toolchain configuration (TOML).
///
/// Missing fields default to values that work for a stock CMake checkout with
/// MPI on the `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Root of the case-fixture tree; each case lives in `<test_dir>/<identity>`.
    pub test_dir: PathBuf,

    /// Root of per-target build trees.
    pub build_dir: PathBuf,

    /// Program `Case::run` re-invokes. Defaults to the running executable.
    pub entrypoint: Option<PathBuf>,

    /// Wall-clock limit for any single child process, in seconds.
    pub run_timeout_secs: u64,

    /// Keep at most this many bytes of child stdout/stderr in memory.
    pub output_limit_bytes: usize,

    pub build: BuildConfig,
    pub interactive: InteractiveConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Build argv. `{target}`, `{build_dir}` and `{jobs}` are substituted.
    pub command: Vec<String>,

    /// Targets the build knows about.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InteractiveConfig {
    /// MPI launcher (e.g. `mpirun`, `srun`).
    pub launcher: String,

    /// Flag that sets the rank count for `launcher`.
    pub rank_flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Scheduler submission argv; the job script path is appended.
    pub submit_command: Vec<String>,

    /// Flag that makes submission block until the job finishes.
    pub wait_flag: String,

    /// Launcher used inside the job script (e.g. `srun`, `mpirun`).
    pub launcher: String,

    /// Flag that sets the rank count for `launcher`.
    pub rank_flag: String,

    /// Optional job-script template overriding the built-in one.
    pub template: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: [
                "cmake",
                "--build",
                "{build_dir}",
                "--target",
                "{target}",
                "--parallel",
                "{jobs}",
            ]
            .map(String::from)
            .to_vec(),
            targets: ["pre_process", "simulation", "post_process"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            launcher: "mpirun".to_string(),
            rank_flag: "-np".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            submit_command: vec!["sbatch".to_string()],
            wait_flag: "--wait".to_string(),
            launcher: "srun".to_string(),
            rank_flag: "-n".to_string(),
            template: None,
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests"),
            build_dir: PathBuf::from("build"),
            entrypoint: None,
            run_timeout_secs: 24 * 60 * 60,
            output_limit_bytes: 1_000_000,
            build: BuildConfig::default(),
            interactive: InteractiveConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ToolchainConfig {
    pub fn validate(&self) -> Result<(), ToolchainError> {
        if self.run_timeout_secs == 0 {
            return Err(ToolchainError::configuration("run_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(ToolchainError::configuration(
                "output_limit_bytes must be > 0",
            ));
        }
        if self.build.command.is_empty() || self.build.command[0].trim().is_empty() {
            return Err(ToolchainError::configuration(
                "build.command must be a non-empty array",
            ));
        }
        if self.interactive.launcher.trim().is_empty() {
            return Err(ToolchainError::configuration(
                "interactive.launcher must be non-empty",
            ));
        }
        if self.batch.launcher.trim().is_empty() {
            return Err(ToolchainError::configuration(
                "batch.launcher must be non-empty",
            ));
        }
        if self.batch.submit_command.is_empty() || self.batch.submit_command[0].trim().is_empty()
        {
            return Err(ToolchainError::configuration(
                "batch.submit_command must be a non-empty array",
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ToolchainConfig::default()`.
pub fn load_config(path: &Path) -> Result<ToolchainConfig> {
    if !path.exists() {
        let cfg = ToolchainConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ToolchainConfig = toml::from_str(&contents)
        .map_err(|err| ToolchainError::configuration(format!("parse {}: {err}", path.display())))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ToolchainConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
