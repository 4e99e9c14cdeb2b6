//! Simulation toolchain front end.
//!
//! Runs input decks through the build and an execution engine, drives the
//! built-in regression suite, and manages per-target build trees.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use toolchain::context::RunContext;
use toolchain::core::case::CASE_TARGETS;
use toolchain::core::options::{EngineKind, JobOptions};
use toolchain::engine::select_engine;
use toolchain::error::ToolchainError;
use toolchain::exit_codes;
use toolchain::io::build::{Builder, CommandBuilder, check_targets, clean_target};
use toolchain::io::config::{DEFAULT_CONFIG_PATH, ToolchainConfig, load_config, write_config};
use toolchain::logging;
use toolchain::run::RunCoordinator;
use toolchain::testing::{TestOptions, run_suite};

#[derive(Parser)]
#[command(
    name = "toolchain",
    version,
    about = "Compose, build and run simulation cases"
)]
struct Cli {
    /// Toolchain configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate inputs, build and run targets for an input deck.
    Run(RunArgs),
    /// Run the built-in regression suite.
    Test(TestArgs),
    /// Build targets without running them.
    Build(BuildArgs),
    /// Remove target build trees.
    Clean(CleanArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Input deck: JSON, or a script that prints JSON.
    input: PathBuf,

    /// Targets to run, in order.
    #[arg(short, long, num_args = 0.., default_values_t = CASE_TARGETS.map(String::from))]
    targets: Vec<String>,

    #[arg(short, long, default_value = "release-cpu")]
    mode: String,

    #[arg(short, long, default_value_t = EngineKind::Interactive)]
    engine: EngineKind,

    /// Parallel build jobs.
    #[arg(short, long, default_value_t = 1)]
    jobs: u32,

    #[arg(short = 'N', long, default_value_t = 1, allow_negative_numbers = true)]
    nodes: i64,

    #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
    cpus_per_node: i64,

    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    gpus_per_node: i64,

    /// MPI launcher overriding the configured one.
    #[arg(short, long)]
    binary: Option<PathBuf>,

    #[arg(long)]
    case_optimization: bool,

    #[arg(long)]
    no_build: bool,

    #[arg(long)]
    no_mpi: bool,

    /// Job name.
    #[arg(short = '#', long, default_value = "sim")]
    name: String,

    /// Notification address for batch jobs.
    #[arg(short = '@', long, default_value = "")]
    email: String,

    #[arg(short, long, default_value = "01:00:00")]
    walltime: String,

    #[arg(short, long, default_value = "")]
    partition: String,

    #[arg(short, long, default_value = "")]
    account: String,

    /// Block until a submitted batch job finishes.
    #[arg(short = 'W', long)]
    wait: bool,
}

#[derive(Args)]
struct TestArgs {
    /// Print the cases instead of running them.
    #[arg(short, long)]
    list: bool,

    /// Only run cases with these identities.
    #[arg(short, long, num_args = 1..)]
    only: Vec<String>,

    #[arg(short, long, default_value = "release-cpu")]
    mode: String,

    #[arg(short, long, default_value_t = 1)]
    jobs: u32,

    #[arg(short, long)]
    binary: Option<PathBuf>,

    #[arg(long)]
    case_optimization: bool,

    #[arg(long)]
    no_mpi: bool,
}

#[derive(Args)]
struct BuildArgs {
    /// Targets to build. Defaults to every configured target.
    #[arg(short, long, num_args = 1..)]
    targets: Vec<String>,

    #[arg(short, long, default_value_t = 1)]
    jobs: u32,
}

#[derive(Args)]
struct CleanArgs {
    /// Targets to clean. Defaults to every configured target.
    #[arg(short, long, num_args = 1..)]
    targets: Vec<String>,
}

impl From<RunArgs> for JobOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            input: args.input,
            targets: args.targets,
            mode: args.mode,
            engine: args.engine,
            name: args.name,
            jobs: args.jobs,
            nodes: args.nodes,
            cpus_per_node: args.cpus_per_node,
            gpus_per_node: args.gpus_per_node,
            binary: args.binary,
            case_optimization: args.case_optimization,
            no_build: args.no_build,
            no_mpi: args.no_mpi,
            email: args.email,
            walltime: args.walltime,
            partition: args.partition,
            account: args.account,
            wait: args.wait,
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(err) => report(&err),
    };
    std::process::exit(code);
}

fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ToolchainError>() {
        Some(typed) if typed.is_user_facing() => {
            eprintln!("Error: {err:#}");
            exit_codes::FAILURE
        }
        _ => {
            eprintln!("{err:?}");
            eprintln!("ERROR: An unexpected exception occurred: {err}");
            exit_codes::INTERNAL
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run(args) => cmd_run(&cli.config, args.into()),
        Command::Test(args) => cmd_test(&cli.config, args),
        Command::Build(args) => cmd_build(&cli.config, args),
        Command::Clean(args) => cmd_clean(&cli.config, args),
    }
}

fn context(config_path: &Path, options: JobOptions) -> Result<RunContext> {
    let root = std::env::current_dir().context("resolve working directory")?;
    let config = load_config(config_path)?;
    RunContext::new(root, config, options)
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        return Err(ToolchainError::configuration(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ))
        .into());
    }
    write_config(config_path, &ToolchainConfig::default())?;
    println!("Wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, options: JobOptions) -> Result<i32> {
    let ctx = context(config_path, options)?;
    let engine = select_engine(ctx.options.engine);
    let mut coordinator = RunCoordinator::new(&ctx, engine, &CommandBuilder);
    let outcome = coordinator.run(&mut io::stdout().lock())?;
    if outcome.succeeded() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILURE)
    }
}

fn cmd_test(config_path: &Path, args: TestArgs) -> Result<i32> {
    let options = JobOptions {
        mode: args.mode,
        jobs: args.jobs,
        binary: args.binary,
        case_optimization: args.case_optimization,
        no_mpi: args.no_mpi,
        ..JobOptions::default()
    };
    let ctx = context(config_path, options)?;
    let test_options = TestOptions {
        list: args.list,
        only: args.only,
    };
    let outcome = run_suite(&ctx, &test_options, &mut io::stdout().lock())?;
    if outcome.failed.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::TESTS_FAILED)
    }
}

fn selected_targets<B: Builder>(
    builder: &B,
    ctx: &RunContext,
    targets: Vec<String>,
) -> Result<Vec<String>> {
    if targets.is_empty() {
        return Ok(builder.target_names(ctx));
    }
    check_targets(builder, ctx, &targets)?;
    Ok(targets)
}

fn cmd_build(config_path: &Path, args: BuildArgs) -> Result<i32> {
    let options = JobOptions {
        jobs: args.jobs,
        ..JobOptions::default()
    };
    let ctx = context(config_path, options)?;
    let builder = CommandBuilder;
    let mut out = io::stdout().lock();
    for target in selected_targets(&builder, &ctx, args.targets)? {
        builder.build(&ctx, &target)?;
        writeln!(out, "> Built {target}.").context("write summary")?;
    }
    Ok(exit_codes::OK)
}

fn cmd_clean(config_path: &Path, args: CleanArgs) -> Result<i32> {
    let ctx = context(config_path, JobOptions::default())?;
    let builder = CommandBuilder;
    let mut out = io::stdout().lock();
    for target in selected_targets(&builder, &ctx, args.targets)? {
        let dir = builder.build_dir(&ctx, &target);
        if clean_target(&builder, &ctx, &target)? {
            writeln!(out, "> Removed {}.", dir.display()).context("write summary")?;
        } else {
            writeln!(out, "> Nothing to clean for {target}.").context("write summary")?;
        }
    }
    Ok(exit_codes::OK)
}
