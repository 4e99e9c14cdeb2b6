//! Direct launch on the current machine; blocks until the target exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use super::{Engine, TargetRun, launch_command};
use crate::context::RunContext;
use crate::core::options::EngineKind;
use crate::error::ToolchainError;
use crate::io::input::InputDeck;
use crate::io::process::{display_command, run_command};

#[derive(Debug, Default)]
pub struct InteractiveEngine {
    case_dir: Option<PathBuf>,
}

impl Engine for InteractiveEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Interactive
    }

    fn validate(&self, ctx: &RunContext) -> Result<(), ToolchainError> {
        if ctx.options.no_mpi && ctx.options.total_ranks()? > 1 {
            return Err(ToolchainError::configuration(
                "RUN: Without MPI only a single rank can be launched.",
            ));
        }
        Ok(())
    }

    fn init(&mut self, _ctx: &RunContext, deck: &InputDeck) -> Result<()> {
        self.case_dir = Some(deck.case_dir.clone());
        Ok(())
    }

    fn describe(&self, ctx: &RunContext) -> String {
        let options = &ctx.options;
        let launcher = if options.no_mpi {
            "none (--no-mpi)".to_string()
        } else {
            options
                .binary
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| ctx.config.interactive.launcher.clone())
        };
        format!(
            "MPI Binary    (-b)  {launcher}\n\
             Nodes         (-N)  {}\n\
             CPUs (/node)  (-n)  {}\n\
             GPUs (/node)  (-g)  {}\n",
            options.nodes, options.cpus_per_node, options.gpus_per_node
        )
    }

    #[instrument(skip(self, ctx))]
    fn run(&mut self, ctx: &RunContext, target: &str) -> Result<TargetRun> {
        let case_dir = self.case_dir.as_ref().ok_or(ToolchainError::Programming {
            operation: "run",
            state: "Uninitialized".to_string(),
        })?;
        let mut cmd = launch_command(
            ctx,
            &ctx.config.interactive.launcher,
            &ctx.config.interactive.rank_flag,
            target,
        )?;
        cmd.current_dir(case_dir);
        info!(command = %display_command(&cmd), "launching target");

        let output = run_command(cmd, ctx.timeout(), ctx.output_limit())
            .with_context(|| format!("launch {target}"))?;
        Ok(TargetRun {
            target: target.to_string(),
            success: output.success(),
            exit_code: output.status.code(),
            output: output.combined(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::options::JobOptions;
    use crate::io::config::ToolchainConfig;
    use crate::test_support::{deck_in, install_fake_binary};

    #[test]
    fn runs_binary_in_case_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let options = JobOptions {
            no_mpi: true,
            ..JobOptions::default()
        };
        let ctx = RunContext::new(temp.path(), ToolchainConfig::default(), options).expect("ctx");
        install_fake_binary(&ctx, "simulation", "pwd\nexit 0");
        let case_dir = temp.path().join("case");
        std::fs::create_dir_all(&case_dir).expect("mkdir");

        let mut engine = InteractiveEngine::default();
        engine.init(&ctx, &deck_in(&case_dir)).expect("init");
        let run = engine.run(&ctx, "simulation").expect("run");
        assert!(run.success);
        assert!(run.output.trim_end().ends_with("case"));
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let temp = tempfile::tempdir().expect("tempdir");
        let options = JobOptions {
            no_mpi: true,
            ..JobOptions::default()
        };
        let ctx = RunContext::new(temp.path(), ToolchainConfig::default(), options).expect("ctx");
        install_fake_binary(&ctx, "pre_process", "echo diverged\nexit 9");

        let mut engine = InteractiveEngine::default();
        engine.init(&ctx, &deck_in(temp.path())).expect("init");
        let run = engine.run(&ctx, "pre_process").expect("run");
        assert!(!run.success);
        assert_eq!(run.exit_code, Some(9));
        assert!(run.output.contains("diverged"));
    }

    #[test]
    fn no_mpi_rejects_multiple_ranks() {
        let options = JobOptions {
            no_mpi: true,
            cpus_per_node: 2,
            ..JobOptions::default()
        };
        let ctx = RunContext::new("/work", ToolchainConfig::default(), options).expect("ctx");
        assert!(InteractiveEngine::default().validate(&ctx).is_err());
    }

    #[test]
    fn describe_lists_resources() {
        let ctx = RunContext::new("/work", ToolchainConfig::default(), JobOptions::default())
            .expect("ctx");
        let text = InteractiveEngine::default().describe(&ctx);
        assert!(text.contains("MPI Binary    (-b)  mpirun"));
        assert!(text.contains("Nodes         (-N)  1"));
    }
}
