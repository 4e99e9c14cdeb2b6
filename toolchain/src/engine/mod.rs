//! Execution engines: turn "run this target" into a process or a scheduler job.
//!
//! The set of backends is closed ([`AnyEngine`]) and chosen once per
//! invocation from [`EngineKind`]. [`Dispatcher`] wraps any [`Engine`] and
//! enforces the lifecycle
//! `Uninitialized → Validated → Initialized → Running → {Completed | Failed}`.

pub mod batch;
pub mod interactive;

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::core::options::{EngineKind, validate_job_options};
use crate::error::ToolchainError;
use crate::io::input::InputDeck;

pub use batch::BatchEngine;
pub use interactive::InteractiveEngine;

/// What a single target dispatch reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRun {
    pub target: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Captured output, or the submission response for batch jobs.
    pub output: String,
}

/// Backend capability set.
pub trait Engine {
    fn kind(&self) -> EngineKind;

    /// Checks beyond the shared resource rules.
    fn validate(&self, ctx: &RunContext) -> Result<(), ToolchainError>;

    /// Prepare backend state for this invocation. Calling it again must be harmless.
    fn init(&mut self, ctx: &RunContext, deck: &InputDeck) -> Result<()>;

    /// Human-readable summary of the resolved backend configuration.
    fn describe(&self, ctx: &RunContext) -> String;

    fn run(&mut self, ctx: &RunContext, target: &str) -> Result<TargetRun>;
}

/// One of the built-in backends.
pub enum AnyEngine {
    Interactive(InteractiveEngine),
    Batch(BatchEngine),
}

pub fn select_engine(kind: EngineKind) -> AnyEngine {
    match kind {
        EngineKind::Interactive => AnyEngine::Interactive(InteractiveEngine::default()),
        EngineKind::Batch => AnyEngine::Batch(BatchEngine::default()),
    }
}

impl Engine for AnyEngine {
    fn kind(&self) -> EngineKind {
        match self {
            AnyEngine::Interactive(engine) => engine.kind(),
            AnyEngine::Batch(engine) => engine.kind(),
        }
    }

    fn validate(&self, ctx: &RunContext) -> Result<(), ToolchainError> {
        match self {
            AnyEngine::Interactive(engine) => engine.validate(ctx),
            AnyEngine::Batch(engine) => engine.validate(ctx),
        }
    }

    fn init(&mut self, ctx: &RunContext, deck: &InputDeck) -> Result<()> {
        match self {
            AnyEngine::Interactive(engine) => engine.init(ctx, deck),
            AnyEngine::Batch(engine) => engine.init(ctx, deck),
        }
    }

    fn describe(&self, ctx: &RunContext) -> String {
        match self {
            AnyEngine::Interactive(engine) => engine.describe(ctx),
            AnyEngine::Batch(engine) => engine.describe(ctx),
        }
    }

    fn run(&mut self, ctx: &RunContext, target: &str) -> Result<TargetRun> {
        match self {
            AnyEngine::Interactive(engine) => engine.run(ctx, target),
            AnyEngine::Batch(engine) => engine.run(ctx, target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Validated,
    Initialized,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle guard around an engine.
pub struct Dispatcher<E> {
    engine: E,
    state: EngineState,
}

impl<E: Engine> Dispatcher<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: EngineState::Uninitialized,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Shared resource rules first, then the backend's own.
    pub fn validate(&mut self, ctx: &RunContext) -> Result<(), ToolchainError> {
        match self.state {
            EngineState::Uninitialized | EngineState::Validated => {}
            state => return Err(out_of_order("validate", state)),
        }
        validate_job_options(&ctx.options)?;
        self.engine.validate(ctx)?;
        self.state = EngineState::Validated;
        debug!(engine = %self.engine.kind(), "engine validated");
        Ok(())
    }

    pub fn init(&mut self, ctx: &RunContext, deck: &InputDeck) -> Result<()> {
        match self.state {
            EngineState::Validated | EngineState::Initialized => {}
            state => return Err(out_of_order("init", state).into()),
        }
        self.engine.init(ctx, deck)?;
        self.state = EngineState::Initialized;
        Ok(())
    }

    pub fn describe(&self, ctx: &RunContext) -> String {
        self.engine.describe(ctx)
    }

    /// Dispatch one target. Later targets may follow a completed or failed one.
    pub fn run(&mut self, ctx: &RunContext, target: &str) -> Result<TargetRun> {
        match self.state {
            EngineState::Initialized | EngineState::Completed | EngineState::Failed => {}
            state => return Err(out_of_order("run", state).into()),
        }
        self.state = EngineState::Running;
        match self.engine.run(ctx, target) {
            Ok(run) => {
                self.state = if run.success {
                    EngineState::Completed
                } else {
                    warn!(target, exit_code = ?run.exit_code, "target failed");
                    EngineState::Failed
                };
                Ok(run)
            }
            Err(err) => {
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }
}

fn out_of_order(operation: &'static str, state: EngineState) -> ToolchainError {
    ToolchainError::Programming {
        operation,
        state: state.to_string(),
    }
}

/// Executable a build of `target` installs.
pub fn target_binary(ctx: &RunContext, target: &str) -> PathBuf {
    ctx.build_dir()
        .join(target)
        .join("install")
        .join("bin")
        .join(target)
}

/// Command that starts `target` with the resolved rank count.
///
/// `-b` replaces `launcher`; `--no-mpi` runs the executable bare.
pub fn launch_command(
    ctx: &RunContext,
    launcher: &str,
    rank_flag: &str,
    target: &str,
) -> Result<Command, ToolchainError> {
    let binary = target_binary(ctx, target);
    if ctx.options.no_mpi {
        return Ok(Command::new(binary));
    }
    let launcher = ctx
        .options
        .binary
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| launcher.to_string());
    let mut cmd = Command::new(launcher);
    cmd.arg(rank_flag)
        .arg(ctx.options.total_ranks()?.to_string())
        .arg(binary);
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::JobOptions;
    use crate::io::config::ToolchainConfig;
    use crate::io::process::display_command;
    use crate::test_support::{FakeEngine, deck_in};

    fn context(options: JobOptions) -> RunContext {
        RunContext::new("/work", ToolchainConfig::default(), options).expect("ctx")
    }

    #[test]
    fn run_before_init_is_a_programming_error() {
        let ctx = context(JobOptions::default());
        let mut dispatcher = Dispatcher::new(FakeEngine::succeeding());
        let err = dispatcher.run(&ctx, "simulation").expect_err("out of order");
        assert!(matches!(
            err.downcast_ref::<ToolchainError>(),
            Some(ToolchainError::Programming { operation: "run", .. })
        ));

        dispatcher.validate(&ctx).expect("validate");
        assert!(dispatcher.run(&ctx, "simulation").is_err());
    }

    #[test]
    fn init_requires_validation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context(JobOptions::default());
        let deck = deck_in(temp.path());
        let mut dispatcher = Dispatcher::new(FakeEngine::succeeding());
        assert!(dispatcher.init(&ctx, &deck).is_err());
        assert_eq!(dispatcher.state(), EngineState::Uninitialized);
    }

    #[test]
    fn validate_is_rejected_after_init() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context(JobOptions::default());
        let deck = deck_in(temp.path());
        let mut dispatcher = Dispatcher::new(FakeEngine::succeeding());

        dispatcher.validate(&ctx).expect("validate");
        dispatcher.validate(&ctx).expect("validate again");
        dispatcher.init(&ctx, &deck).expect("init");

        let err = dispatcher.validate(&ctx).expect_err("out of order");
        assert!(matches!(
            err,
            ToolchainError::Programming {
                operation: "validate",
                ..
            }
        ));
        assert_eq!(dispatcher.state(), EngineState::Initialized);

        dispatcher.run(&ctx, "simulation").expect("run");
        assert!(dispatcher.validate(&ctx).is_err());
        assert_eq!(dispatcher.state(), EngineState::Completed);
    }

    #[test]
    fn lifecycle_tracks_target_outcomes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context(JobOptions::default());
        let deck = deck_in(temp.path());
        let mut dispatcher = Dispatcher::new(FakeEngine::failing_on(&["simulation"]));

        dispatcher.validate(&ctx).expect("validate");
        assert_eq!(dispatcher.state(), EngineState::Validated);
        dispatcher.init(&ctx, &deck).expect("init");
        dispatcher.init(&ctx, &deck).expect("init again");
        assert_eq!(dispatcher.state(), EngineState::Initialized);

        let run = dispatcher.run(&ctx, "pre_process").expect("run");
        assert!(run.success);
        assert_eq!(dispatcher.state(), EngineState::Completed);

        let run = dispatcher.run(&ctx, "simulation").expect("run");
        assert!(!run.success);
        assert_eq!(dispatcher.state(), EngineState::Failed);

        dispatcher.run(&ctx, "post_process").expect("run after failure");
        assert_eq!(dispatcher.state(), EngineState::Completed);
    }

    #[test]
    fn shared_validation_runs_before_backend_validation() {
        let ctx = context(JobOptions {
            nodes: 0,
            ..JobOptions::default()
        });
        let mut dispatcher = Dispatcher::new(FakeEngine::succeeding());
        let err = dispatcher.validate(&ctx).expect_err("nodes");
        assert!(err.to_string().contains("At least one node"));
        assert_eq!(dispatcher.state(), EngineState::Uninitialized);
        assert_eq!(dispatcher.engine().validations(), 0);
    }

    #[test]
    fn launch_command_uses_launcher_and_total_ranks() {
        let ctx = context(JobOptions {
            nodes: 2,
            cpus_per_node: 4,
            ..JobOptions::default()
        });
        let cmd = launch_command(&ctx, "mpirun", "-np", "simulation").expect("command");
        assert_eq!(
            display_command(&cmd),
            "mpirun -np 8 /work/build/simulation/install/bin/simulation"
        );
    }

    #[test]
    fn launch_command_honors_overrides() {
        let ctx = context(JobOptions {
            binary: Some(PathBuf::from("jsrun")),
            ..JobOptions::default()
        });
        let cmd = launch_command(&ctx, "mpirun", "-n", "pre_process").expect("command");
        assert_eq!(
            display_command(&cmd),
            "jsrun -n 1 /work/build/pre_process/install/bin/pre_process"
        );

        let ctx = context(JobOptions {
            no_mpi: true,
            ..JobOptions::default()
        });
        let cmd = launch_command(&ctx, "mpirun", "-np", "pre_process").expect("command");
        assert_eq!(
            display_command(&cmd),
            "/work/build/pre_process/install/bin/pre_process"
        );
    }

    #[test]
    fn select_engine_matches_kind() {
        assert_eq!(select_engine(EngineKind::Batch).kind(), EngineKind::Batch);
        assert_eq!(
            select_engine(EngineKind::Interactive).kind(),
            EngineKind::Interactive
        );
    }
}
