//! Orchestration for `toolchain run`.
//!
//! Validation happens before any target is touched. Targets are then handled
//! strictly in order: generate inputs, build (unless `--no-build`), dispatch.
//! A build failure aborts the remaining targets; a target that exits non-zero
//! does not.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::context::RunContext;
use crate::engine::{Dispatcher, Engine, TargetRun};
use crate::io::build::{Builder, check_targets};
use crate::io::input::InputDeck;

/// Result of one `toolchain run` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// One entry per dispatched target, in dispatch order.
    pub runs: Vec<TargetRun>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.runs.iter().all(|run| run.success)
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter(|run| !run.success)
            .map(|run| run.target.as_str())
            .collect()
    }
}

pub struct RunCoordinator<'a, E, B> {
    ctx: &'a RunContext,
    dispatcher: Dispatcher<E>,
    builder: &'a B,
}

impl<'a, E: Engine, B: Builder> RunCoordinator<'a, E, B> {
    pub fn new(ctx: &'a RunContext, engine: E, builder: &'a B) -> Self {
        Self {
            ctx,
            dispatcher: Dispatcher::new(engine),
            builder,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    /// Run every selected target. Progress is written to `out`.
    #[instrument(skip_all, fields(input = %self.ctx.options.input.display()))]
    pub fn run(&mut self, out: &mut dyn Write) -> Result<RunOutcome> {
        let ctx = self.ctx;
        self.dispatcher.validate(ctx)?;
        check_targets(self.builder, ctx, &ctx.options.targets)?;
        if ctx.options.targets.is_empty() {
            writeln!(out, "> No target selected.").context("write summary")?;
            return Ok(RunOutcome::default());
        }

        let deck = InputDeck::load(ctx)?;
        self.dispatcher.init(ctx, &deck)?;
        write!(out, "{}", self.configuration_table(&deck)).context("write summary")?;

        let mut outcome = RunOutcome::default();
        for target in &ctx.options.targets {
            writeln!(out, "> Running {target}:").context("write summary")?;
            deck.generate(target)?;
            if !ctx.options.no_build {
                self.builder
                    .build(ctx, target)
                    .with_context(|| format!("build {target}"))?;
            }

            let run = self.dispatcher.run(ctx, target)?;
            out.write_all(run.output.as_bytes())
                .context("write target output")?;
            if run.success {
                info!(target = %target, "target completed");
                writeln!(out, "> Done ({target}).").context("write summary")?;
            } else {
                warn!(target = %target, exit_code = ?run.exit_code, "target failed");
                writeln!(
                    out,
                    "> {target} failed with exit code {}.",
                    run.exit_code
                        .map_or_else(|| "none".to_string(), |code| code.to_string())
                )
                .context("write summary")?;
            }
            outcome.runs.push(run);
        }
        Ok(outcome)
    }

    fn configuration_table(&self, deck: &InputDeck) -> String {
        let options = &self.ctx.options;
        format!(
            "Input               {}\n\
             Job Name      (-#)  {}\n\
             Engine        (-e)  {}\n\
             {}",
            deck.path.display(),
            options.name,
            options.engine,
            self.dispatcher.describe(self.ctx)
        )
    }
}
