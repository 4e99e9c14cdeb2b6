//! Input-deck loading and per-target input generation.
//!
//! A deck is either a JSON document or an executable descriptor (such as a
//! materialized `case.py`) that prints one to stdout. Before a target is
//! built or run, the deck writes `<case_dir>/<target>.inp` as a Fortran
//! namelist.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::context::RunContext;
use crate::core::params::ParameterSet;
use crate::error::ToolchainError;
use crate::io::process::run_command;

const PYTHON: &str = "python3";

#[derive(Debug, Clone)]
pub struct InputDeck {
    /// File the deck was loaded from.
    pub path: PathBuf,
    /// Directory target inputs are generated into and targets run in.
    pub case_dir: PathBuf,
    pub params: ParameterSet,
}

impl InputDeck {
    /// Load the deck named by `ctx.options.input`.
    #[instrument(skip_all, fields(input = %ctx.options.input.display()))]
    pub fn load(ctx: &RunContext) -> Result<Self> {
        let path = if ctx.options.input.is_absolute() {
            ctx.options.input.clone()
        } else {
            ctx.root.join(&ctx.options.input)
        };
        if !path.is_file() {
            return Err(ToolchainError::configuration(format!(
                "Input file {} does not exist.",
                path.display()
            ))
            .into());
        }

        let document = if has_extension(&path, "json") {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            evaluate_descriptor(ctx, &path)?
        };
        let params: ParameterSet = serde_json::from_str(document.trim()).map_err(|err| {
            ToolchainError::configuration(format!(
                "Input file {} did not produce a JSON object of scalars: {err}",
                path.display()
            ))
        })?;

        let case_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.root.clone());
        debug!(keys = params.len(), case_dir = %case_dir.display(), "deck loaded");
        Ok(Self {
            path,
            case_dir,
            params,
        })
    }

    /// Namelist body read by every target.
    pub fn render_namelist(&self) -> String {
        let mut text = String::from("&user_inputs\n");
        for (key, value) in self.params.iter() {
            text.push_str(&format!("{key} = {value}\n"));
        }
        text.push_str("&end/\n");
        text
    }

    pub fn input_path(&self, target: &str) -> PathBuf {
        self.case_dir.join(format!("{target}.inp"))
    }

    /// Write `<case_dir>/<target>.inp`.
    #[instrument(skip(self))]
    pub fn generate(&self, target: &str) -> Result<PathBuf> {
        let path = self.input_path(target);
        fs::write(&path, self.render_namelist())
            .with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), "target input generated");
        Ok(path)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|value| value.to_str()) == Some(ext)
}

fn evaluate_descriptor(ctx: &RunContext, path: &Path) -> Result<String> {
    let mut cmd = if has_extension(path, "py") {
        let mut cmd = Command::new(PYTHON);
        cmd.arg(path);
        cmd
    } else {
        Command::new(path)
    };
    if let Some(dir) = path.parent() {
        cmd.current_dir(dir);
    }

    let output = run_command(cmd, ctx.timeout(), ctx.output_limit())
        .with_context(|| format!("evaluate {}", path.display()))?;
    if !output.success() {
        return Err(ToolchainError::external(
            path.display().to_string(),
            format!(
                "exited with {:?}:\n{}",
                output.status.code(),
                output.combined().trim()
            ),
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::JobOptions;
    use crate::core::params::Scalar;
    use crate::io::config::ToolchainConfig;

    fn context(root: &Path, input: &str) -> RunContext {
        let options = JobOptions {
            input: PathBuf::from(input),
            ..JobOptions::default()
        };
        RunContext::new(root, ToolchainConfig::default(), options).expect("ctx")
    }

    #[test]
    fn loads_json_deck_and_generates_namelist() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("deck.json"),
            r#"{"m": 99, "dt": 0.001, "bubbles": "F", "case_dir": "'.'"}"#,
        )
        .expect("write deck");

        let deck = InputDeck::load(&context(temp.path(), "deck.json")).expect("load");
        assert_eq!(deck.params.get("m"), Some(&Scalar::Int(99)));
        assert_eq!(deck.case_dir, temp.path());

        let path = deck.generate("pre_process").expect("generate");
        assert_eq!(path, temp.path().join("pre_process.inp"));
        let text = fs::read_to_string(path).expect("read");
        assert_eq!(
            text,
            "&user_inputs\nbubbles = F\ncase_dir = '.'\ndt = 0.001\nm = 99\n&end/\n"
        );
    }

    #[test]
    fn missing_input_is_a_configuration_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = InputDeck::load(&context(temp.path(), "nope.json")).expect_err("missing");
        assert!(matches!(
            err.downcast_ref::<ToolchainError>(),
            Some(ToolchainError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_non_object_documents() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("deck.json"), "[1, 2, 3]").expect("write deck");
        assert!(InputDeck::load(&context(temp.path(), "deck.json")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn evaluates_executable_descriptor() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("deck.sh");
        fs::write(&script, "#!/bin/sh\necho '{\"n\": 0, \"weno_order\": 5}'\n").expect("write");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let deck = InputDeck::load(&context(temp.path(), "deck.sh")).expect("load");
        assert_eq!(deck.params.get("weno_order"), Some(&Scalar::Int(5)));
    }

    #[test]
    fn json_deck_keeps_baseline_floats_exact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = crate::test_support::write_json_deck(temp.path());
        let ctx = context(temp.path(), &path.display().to_string());

        let deck = InputDeck::load(&ctx).expect("load");
        let expected = crate::core::baseline::baseline();
        for (key, value) in expected.iter() {
            assert_eq!(deck.params.get(key), Some(value), "key {key}");
        }
    }

    #[test]
    fn materialized_case_loads_back_unchanged() {
        use crate::core::stack::{CompositionStack, create_case};
        use crate::params;

        if Command::new(PYTHON).arg("--version").output().is_err() {
            eprintln!("{PYTHON} not available; skipping");
            return;
        }

        let temp = tempfile::tempdir().expect("tempdir");
        let case = create_case(
            &CompositionStack::new(),
            "1D",
            params! { "m" => 299, "dt" => 0.1 / 3.0, "bubbles" => "T" },
            None,
        );
        let ctx = context(temp.path(), "unused");
        let descriptor = case.materialize(&ctx).expect("materialize");
        let ctx = context(temp.path(), &descriptor.display().to_string());

        let deck = InputDeck::load(&ctx).expect("load descriptor");
        assert_eq!(deck.case_dir, case.dir(&ctx));
        assert_eq!(deck.params.len(), case.params().len());
        for (key, value) in case.params().iter() {
            assert_eq!(deck.params.get(key), Some(value), "key {key}");
        }
    }
}
