//! Build collaborator: compile a named target with the configured build tool.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::context::RunContext;
use crate::error::ToolchainError;
use crate::io::process::{display_command, run_command};

/// Abstraction over the build backend so orchestration can be tested without
/// a compiler.
pub trait Builder {
    /// Build `target`. Failure is surfaced as an error.
    fn build(&self, ctx: &RunContext, target: &str) -> Result<()>;

    /// Every target the build knows about.
    fn target_names(&self, ctx: &RunContext) -> Vec<String> {
        ctx.config.build.targets.clone()
    }

    /// Build tree for `target`.
    fn build_dir(&self, ctx: &RunContext, target: &str) -> PathBuf {
        ctx.build_dir().join(target)
    }
}

/// Runs `build.command` from the config, one invocation per target.
pub struct CommandBuilder;

impl CommandBuilder {
    fn command(&self, ctx: &RunContext, target: &str) -> Command {
        let build_dir = self.build_dir(ctx, target).display().to_string();
        let jobs = ctx.options.jobs.to_string();
        let argv: Vec<String> = ctx
            .config
            .build
            .command
            .iter()
            .map(|arg| {
                arg.replace("{target}", target)
                    .replace("{build_dir}", &build_dir)
                    .replace("{jobs}", &jobs)
            })
            .collect();

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).current_dir(&ctx.root);
        cmd
    }
}

impl Builder for CommandBuilder {
    #[instrument(skip(self, ctx))]
    fn build(&self, ctx: &RunContext, target: &str) -> Result<()> {
        let cmd = self.command(ctx, target);
        let line = display_command(&cmd);
        info!(command = %line, "building target");

        let output = run_command(cmd, ctx.timeout(), ctx.output_limit())
            .with_context(|| format!("build {target}"))?;
        if !output.success() {
            warn!(exit_code = ?output.status.code(), "build failed");
            return Err(ToolchainError::external(
                "build",
                format!(
                    "{target} failed ({line}) with status {:?}:\n{}",
                    output.status.code(),
                    output.combined().trim_end()
                ),
            )
            .into());
        }
        Ok(())
    }
}

/// Remove the build tree of `target`, if any.
pub fn clean_target<B: Builder>(builder: &B, ctx: &RunContext, target: &str) -> Result<bool> {
    let dir = builder.build_dir(ctx, target);
    if !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(&dir).with_context(|| format!("remove {}", dir.display()))?;
    Ok(true)
}

/// Reject targets the build does not define.
pub fn check_targets<B: Builder>(
    builder: &B,
    ctx: &RunContext,
    targets: &[String],
) -> Result<()> {
    let known = builder.target_names(ctx);
    for target in targets {
        if !known.contains(target) {
            return Err(ToolchainError::configuration(format!(
                "unknown target {target} (known: {})",
                known.join(", ")
            ))
            .into());
        }
    }
    Ok(())
}
