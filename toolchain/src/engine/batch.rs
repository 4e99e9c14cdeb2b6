//! Batch-scheduler submission.
//!
//! `init` loads and compiles the job-script template; `run` renders one
//! script per target into the case directory and submits it. With `--wait`
//! the submission blocks until the job finishes, otherwise it returns as soon
//! as the scheduler accepts the job.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::{info, instrument};

use super::{Engine, TargetRun, launch_command};
use crate::context::RunContext;
use crate::core::options::EngineKind;
use crate::error::ToolchainError;
use crate::io::input::InputDeck;
use crate::io::process::{display_command, run_command};

const DEFAULT_TEMPLATE: &str = include_str!("../../templates/slurm.sh.jinja");
const TEMPLATE_NAME: &str = "job.sh";

static WALLTIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:[0-5]\d:[0-5]\d$").expect("walltime pattern compiles"));

#[derive(Debug, Default)]
pub struct BatchEngine {
    prepared: Option<Prepared>,
}

#[derive(Debug)]
struct Prepared {
    case_dir: PathBuf,
    template: String,
}

impl BatchEngine {
    /// Render the job script for `target`.
    pub fn render_script(&self, ctx: &RunContext, target: &str) -> Result<String> {
        let prepared = self.prepared()?;
        let mut env = Environment::new();
        env.add_template(TEMPLATE_NAME, &prepared.template)
            .context("parse job template")?;
        let launch = launch_command(
            ctx,
            &ctx.config.batch.launcher,
            &ctx.config.batch.rank_flag,
            target,
        )?;
        let options = &ctx.options;
        let rendered = env.get_template(TEMPLATE_NAME)?.render(context! {
            name => &options.name,
            target => target,
            nodes => options.nodes,
            cpus_per_node => options.cpus_per_node,
            gpus_per_node => options.gpus_per_node,
            walltime => &options.walltime,
            partition => &options.partition,
            account => (!options.account.trim().is_empty()).then_some(options.account.trim()),
            email => (!options.email.trim().is_empty()).then_some(options.email.trim()),
            case_dir => prepared.case_dir.display().to_string(),
            command => display_command(&launch),
        })?;
        Ok(rendered)
    }

    pub fn script_path(&self, ctx: &RunContext, target: &str) -> Result<PathBuf> {
        Ok(self
            .prepared()?
            .case_dir
            .join(format!("{}-{target}.sh", ctx.options.name)))
    }

    fn prepared(&self) -> Result<&Prepared, ToolchainError> {
        self.prepared.as_ref().ok_or(ToolchainError::Programming {
            operation: "run",
            state: "Uninitialized".to_string(),
        })
    }

    fn submit_command(&self, ctx: &RunContext, script: &Path) -> Command {
        let argv = &ctx.config.batch.submit_command;
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        if ctx.options.wait && !ctx.config.batch.wait_flag.is_empty() {
            cmd.arg(&ctx.config.batch.wait_flag);
        }
        cmd.arg(script);
        cmd
    }
}

fn load_template(ctx: &RunContext) -> Result<String> {
    match &ctx.config.batch.template {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                ctx.root.join(path)
            };
            fs::read_to_string(&path).with_context(|| format!("read template {}", path.display()))
        }
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

impl Engine for BatchEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Batch
    }

    fn validate(&self, ctx: &RunContext) -> Result<(), ToolchainError> {
        let options = &ctx.options;
        if options.partition.trim().is_empty() {
            return Err(ToolchainError::configuration(
                "RUN: The batch engine requires a partition (-p).",
            ));
        }
        if !WALLTIME_PATTERN.is_match(&options.walltime) {
            return Err(ToolchainError::configuration(format!(
                "RUN: {} is not a valid walltime (expected HH:MM:SS).",
                options.walltime
            )));
        }
        Ok(())
    }

    fn init(&mut self, ctx: &RunContext, deck: &InputDeck) -> Result<()> {
        let template = load_template(ctx)?;
        let env = Environment::new();
        env.template_from_str(&template)
            .map_err(|err| ToolchainError::configuration(format!("invalid job template: {err}")))?;
        self.prepared = Some(Prepared {
            case_dir: deck.case_dir.clone(),
            template,
        });
        Ok(())
    }

    fn describe(&self, ctx: &RunContext) -> String {
        let options = &ctx.options;
        let or_none = |value: &str| {
            if value.trim().is_empty() {
                "None".to_string()
            } else {
                value.to_string()
            }
        };
        format!(
            "Nodes         (-N)  {}\n\
             CPUs (/node)  (-n)  {}\n\
             GPUs (/node)  (-g)  {}\n\
             Walltime      (-w)  {}\n\
             Partition     (-p)  {}\n\
             Account       (-a)  {}\n\
             Email         (-@)  {}\n\
             Wait          (-W)  {}\n",
            options.nodes,
            options.cpus_per_node,
            options.gpus_per_node,
            options.walltime,
            or_none(&options.partition),
            or_none(&options.account),
            or_none(&options.email),
            options.wait,
        )
    }

    #[instrument(skip(self, ctx))]
    fn run(&mut self, ctx: &RunContext, target: &str) -> Result<TargetRun> {
        let script = self.render_script(ctx, target)?;
        let path = self.script_path(ctx, target)?;
        fs::write(&path, script).with_context(|| format!("write {}", path.display()))?;

        let cmd = self.submit_command(ctx, &path);
        info!(command = %display_command(&cmd), wait = ctx.options.wait, "submitting job");
        let output = run_command(cmd, ctx.timeout(), ctx.output_limit())
            .with_context(|| format!("submit {}", path.display()))?;
        Ok(TargetRun {
            target: target.to_string(),
            success: output.success(),
            exit_code: output.status.code(),
            output: output.combined(),
        })
    }
}
