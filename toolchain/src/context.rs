//! Explicit per-invocation context threaded through coordinator, engines and cases.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::options::JobOptions;
use crate::io::config::ToolchainConfig;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory relative paths in the config resolve against.
    pub root: PathBuf,
    pub config: ToolchainConfig,
    pub options: JobOptions,
    /// Program re-invoked by case runs.
    pub entrypoint: PathBuf,
}

impl RunContext {
    /// Build a context, resolving the entry point from config or the running executable.
    pub fn new(
        root: impl Into<PathBuf>,
        config: ToolchainConfig,
        options: JobOptions,
    ) -> Result<Self> {
        let entrypoint = match &config.entrypoint {
            Some(path) => path.clone(),
            None => std::env::current_exe().context("resolve current executable")?,
        };
        Ok(Self {
            root: root.into(),
            config,
            options,
            entrypoint,
        })
    }

    pub fn test_dir(&self) -> PathBuf {
        self.resolve(&self.config.test_dir)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.config.build_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.run_timeout_secs)
    }

    pub fn output_limit(&self) -> usize {
        self.config.output_limit_bytes
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
