//! On-disk case fixtures: `<test_dir>/<identity>/case.py`.
//!
//! Directories are keyed by identity and shared across invocations without
//! locking. Materialization is deterministic, so concurrent writers of the same
//! identity produce the same bytes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::context::RunContext;
use crate::core::case::{Case, DESCRIPTOR_FILE};
use crate::io::process::{CommandOutput, run_command};

impl Case {
    pub fn dir(&self, ctx: &RunContext) -> PathBuf {
        ctx.test_dir().join(self.identity())
    }

    pub fn descriptor_path(&self, ctx: &RunContext) -> PathBuf {
        self.dir(ctx).join(DESCRIPTOR_FILE)
    }

    /// Create the case directory if needed and (over)write its descriptor.
    #[instrument(skip_all, fields(id = %self.identity()))]
    pub fn materialize(&self, ctx: &RunContext) -> Result<PathBuf> {
        let dir = self.dir(ctx);
        fs::create_dir_all(&dir).with_context(|| format!("create case dir {}", dir.display()))?;

        let path = dir.join(DESCRIPTOR_FILE);
        fs::write(&path, self.descriptor()?)
            .with_context(|| format!("write {}", path.display()))?;
        make_executable(&path)?;

        debug!(path = %path.display(), "case materialized");
        Ok(path)
    }

    /// Re-invoke the run entry point against the materialized descriptor.
    ///
    /// The child runs in its own process so a crashing case cannot take the
    /// suite down. A non-zero exit is returned in the output, not raised.
    #[instrument(skip_all, fields(id = %self.identity(), ppn = self.parallelism()))]
    pub fn run(&self, ctx: &RunContext) -> Result<CommandOutput> {
        let descriptor = self.descriptor_path(ctx);
        let mut cmd = Command::new(&ctx.entrypoint);
        cmd.args(self.run_args(&descriptor.display().to_string(), &ctx.options))
            .current_dir(&ctx.root);
        run_command(cmd, ctx.timeout(), ctx.output_limit())
            .with_context(|| format!("run case {}", self.identity()))
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::JobOptions;
    use crate::core::stack::{CompositionStack, create_case};
    use crate::io::config::ToolchainConfig;
    use crate::params;

    fn context(root: &std::path::Path) -> RunContext {
        RunContext::new(root, ToolchainConfig::default(), JobOptions::default()).expect("ctx")
    }

    #[test]
    fn materialize_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context(temp.path());
        let case = create_case(&CompositionStack::new(), "1D", params! { "m" => 99 }, None);

        let first_path = case.materialize(&ctx).expect("first");
        let first = fs::read(&first_path).expect("read first");
        let second_path = case.materialize(&ctx).expect("second");
        let second = fs::read(&second_path).expect("read second");

        assert_eq!(first_path, second_path);
        assert_eq!(first, second);
        assert_eq!(first_path, temp.path().join("tests").join("C31A5A19").join("case.py"));
    }

    #[test]
    fn materialize_overwrites_stale_descriptor() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context(temp.path());
        let case = create_case(&CompositionStack::new(), "leaf", params! {}, None);
        fs::create_dir_all(case.dir(&ctx)).expect("mkdir");
        fs::write(case.descriptor_path(&ctx), "stale").expect("write stale");

        case.materialize(&ctx).expect("materialize");
        let contents = fs::read_to_string(case.descriptor_path(&ctx)).expect("read");
        assert_eq!(contents, case.descriptor().expect("descriptor"));
    }

    #[cfg(unix)]
    #[test]
    fn run_reports_non_zero_exit_without_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("fake-entry.sh");
        fs::write(&script, "#!/bin/sh\necho \"$@\"\nexit 7\n").expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let config = ToolchainConfig {
            entrypoint: Some(script),
            ..ToolchainConfig::default()
        };
        let ctx = RunContext::new(temp.path(), config, JobOptions::default()).expect("ctx");
        let case = create_case(&CompositionStack::new(), "leaf", params! {}, None);
        let descriptor = case.materialize(&ctx).expect("materialize");

        let output = case.run(&ctx).expect("run");
        assert_eq!(output.status.code(), Some(7));
        let echoed = String::from_utf8_lossy(&output.stdout);
        assert!(echoed.starts_with(&format!("run {} -m release-cpu -n 1", descriptor.display())));
        assert!(echoed.contains("--no-build"));
    }
}
