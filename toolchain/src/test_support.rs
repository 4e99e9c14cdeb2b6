//! Test-only fakes and fixtures for engines, builders and input decks.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::context::RunContext;
use crate::core::baseline::baseline;
use crate::core::options::EngineKind;
use crate::engine::{Engine, TargetRun};
use crate::error::ToolchainError;
use crate::io::build::Builder;
use crate::io::input::InputDeck;

/// Engine that records dispatches instead of launching anything.
#[derive(Debug, Default)]
pub struct FakeEngine {
    failing: Vec<String>,
    validations: Cell<usize>,
    initialized: usize,
    runs: Vec<String>,
}

impl FakeEngine {
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Report a non-zero exit for each of `targets`.
    pub fn failing_on(targets: &[&str]) -> Self {
        Self {
            failing: targets.iter().map(|target| target.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn validations(&self) -> usize {
        self.validations.get()
    }

    pub fn initializations(&self) -> usize {
        self.initialized
    }

    /// Targets dispatched so far, in order.
    pub fn runs(&self) -> &[String] {
        &self.runs
    }
}

impl Engine for FakeEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Interactive
    }

    fn validate(&self, _ctx: &RunContext) -> Result<(), ToolchainError> {
        self.validations.set(self.validations.get() + 1);
        Ok(())
    }

    fn init(&mut self, _ctx: &RunContext, _deck: &InputDeck) -> Result<()> {
        self.initialized += 1;
        Ok(())
    }

    fn describe(&self, _ctx: &RunContext) -> String {
        "Fake          (-e)  recording\n".to_string()
    }

    fn run(&mut self, _ctx: &RunContext, target: &str) -> Result<TargetRun> {
        self.runs.push(target.to_string());
        let success = !self.failing.iter().any(|name| name == target);
        Ok(TargetRun {
            target: target.to_string(),
            success,
            exit_code: Some(if success { 0 } else { 1 }),
            output: format!("{target} ran\n"),
        })
    }
}

/// Builder that records requested targets and fails on the named ones.
#[derive(Debug, Default)]
pub struct ScriptedBuilder {
    failing: Vec<String>,
    built: RefCell<Vec<String>>,
}

impl ScriptedBuilder {
    pub fn failing_on(targets: &[&str]) -> Self {
        Self {
            failing: targets.iter().map(|target| target.to_string()).collect(),
            built: RefCell::default(),
        }
    }

    pub fn built(&self) -> Vec<String> {
        self.built.borrow().clone()
    }
}

impl Builder for ScriptedBuilder {
    fn build(&self, _ctx: &RunContext, target: &str) -> Result<()> {
        self.built.borrow_mut().push(target.to_string());
        if self.failing.iter().any(|name| name == target) {
            return Err(ToolchainError::external("build", format!("{target} failed")).into());
        }
        Ok(())
    }
}

/// Deck holding the baseline parameters, generating into `dir`.
pub fn deck_in(dir: &Path) -> InputDeck {
    InputDeck {
        path: dir.join("deck.json"),
        case_dir: dir.to_path_buf(),
        params: baseline(),
    }
}

/// Write the baseline parameters as a JSON deck at `dir/deck.json`.
pub fn write_json_deck(dir: &Path) -> PathBuf {
    let path = dir.join("deck.json");
    let text = serde_json::to_string_pretty(&baseline()).expect("serialize deck");
    fs::write(&path, text).expect("write deck");
    path
}

/// Install a shell script where a build of `target` would put its executable.
#[cfg(unix)]
pub fn install_fake_binary(ctx: &RunContext, target: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = crate::engine::target_binary(ctx, target);
    let parent = path.parent().expect("binary parent");
    fs::create_dir_all(parent).expect("create bin dir");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write binary");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}
