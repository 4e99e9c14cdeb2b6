//! Composed test cases and their content-derived identity.
//!
//! A [`Case`] is produced by [`create_case`](super::stack::create_case) and is
//! pure data here; materialization and execution live in
//! [`crate::io::fixtures`].

use std::fmt;

use serde::Serialize;
use sha1::{Digest, Sha1};

use super::options::JobOptions;
use super::params::{ParameterSet, Scalar};
use crate::error::ToolchainError;

/// File name of the self-describing descriptor inside a case directory.
pub const DESCRIPTOR_FILE: &str = "case.py";

/// Targets a case run builds and executes.
pub const CASE_TARGETS: [&str; 2] = ["pre_process", "simulation"];

/// Stable short label for a trace: CRC-32 of the SHA-1 digest, as 8 uppercase
/// hex digits.
///
/// Only the trace is hashed. Two cases with the same lineage but different
/// parameters share an identity.
pub fn identity(trace: &str) -> String {
    let digest = Sha1::digest(trace.as_bytes());
    format!("{:08X}", crc32fast::hash(&digest))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    trace: String,
    params: ParameterSet,
    parallelism: u32,
}

impl Case {
    pub(crate) fn new(trace: String, params: ParameterSet, parallelism: Option<u32>) -> Self {
        Self {
            trace,
            params,
            parallelism: parallelism.filter(|ppn| *ppn > 0).unwrap_or(1),
        }
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Processes per case run.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn identity(&self) -> String {
        identity(&self.trace)
    }

    pub fn get(&self, key: &str) -> Result<&Scalar, ToolchainError> {
        self.params.get(key).ok_or_else(|| ToolchainError::NotFound {
            trace: self.trace.clone(),
            key: key.to_string(),
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.params.insert(key, value);
    }

    pub fn has_parameter(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys()
    }

    /// Render the descriptor script that prints this case's parameters as JSON.
    ///
    /// JSON numbers and strings are valid Python literals, so the document is
    /// embedded as-is. Output is byte-stable for an unchanged parameter set.
    pub fn descriptor(&self) -> Result<String, ToolchainError> {
        if let Some((key, _)) = self.params.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ToolchainError::configuration(format!(
                "Case {}: Parameter {key} is not a finite number.",
                self.trace
            )));
        }
        let mut document = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut document, formatter);
        self.params.serialize(&mut serializer).map_err(|err| {
            ToolchainError::configuration(format!("Case {}: {err}", self.trace))
        })?;
        let document = String::from_utf8_lossy(&document);

        Ok(format!(
            "#!/usr/bin/env python3\nimport json\nprint(json.dumps({document}))\n"
        ))
    }

    /// Arguments for re-invoking the run entry point against this case.
    ///
    /// Exactly one of `--case-optimization` / `--no-build` is always present.
    pub fn run_args(&self, case_file: &str, options: &JobOptions) -> Vec<String> {
        let ppn = self.parallelism.to_string();
        let mut args = vec![
            "run".to_string(),
            case_file.to_string(),
            "-m".to_string(),
            options.mode.clone(),
            "-n".to_string(),
            ppn.clone(),
        ];
        if options.case_optimization {
            args.push("-j".to_string());
            args.push(options.jobs.to_string());
        }
        if options.uses_gpus() {
            args.push("-g".to_string());
            args.push(ppn);
        }
        if let Some(binary) = &options.binary {
            args.push("-b".to_string());
            args.push(binary.display().to_string());
        }
        if options.case_optimization {
            args.push("--case-optimization".to_string());
        } else {
            args.push("--no-build".to_string());
        }
        if options.no_mpi {
            args.push("--no-mpi".to_string());
        }
        args.push("-t".to_string());
        args.extend(CASE_TARGETS.iter().map(|target| target.to_string()));
        args
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tests/{}: {}", self.identity(), self.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stack::{CompositionStack, create_case};
    use crate::params;
    use std::path::PathBuf;

    fn case(label: &str) -> Case {
        create_case(&CompositionStack::new(), label, params! {}, None)
    }

    #[test]
    fn identity_matches_known_values() {
        assert_eq!(identity("suite -> group -> variant"), "FE81212F");
        assert_eq!(identity("1D"), "C31A5A19");
        assert_eq!(identity(""), "B8036321");
    }

    #[test]
    fn identity_is_eight_uppercase_hex_digits() {
        for trace in ["", "a", "2D -> bubbles -> qbmm", "ünïcode -> trace"] {
            let id = identity(trace);
            assert_eq!(id.len(), 8);
            assert!(id.chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase()));
            assert!(id.chars().all(|ch| ch.is_ascii_hexdigit()));
            assert_eq!(id, identity(trace));
        }
    }

    #[test]
    fn identity_ignores_parameters() {
        let stack = CompositionStack::new();
        let a = create_case(&stack, "same", params! { "m" => 1 }, None);
        let b = create_case(&stack, "same", params! { "m" => 2 }, None);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn missing_key_names_trace_and_key() {
        let case = case("1D -> weno_order=3");
        let err = case.get("nonexistent").expect_err("missing");
        match err {
            ToolchainError::NotFound { trace, key } => {
                assert_eq!(trace, "1D -> weno_order=3");
                assert_eq!(key, "nonexistent");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn set_overwrites_and_inserts() {
        let mut case = case("leaf");
        case.set("m", 299);
        case.set("custom_key", "T");
        assert_eq!(case.get("m").expect("m"), &Scalar::Int(299));
        assert!(case.has_parameter("custom_key"));
    }

    #[test]
    fn parallelism_defaults_to_one() {
        let stack = CompositionStack::new();
        assert_eq!(case("a").parallelism(), 1);
        assert_eq!(create_case(&stack, "b", params! {}, Some(0)).parallelism(), 1);
        assert_eq!(create_case(&stack, "c", params! {}, Some(4)).parallelism(), 4);
    }

    #[test]
    fn descriptor_embeds_sorted_json() {
        let stack = CompositionStack::new();
        let case = create_case(&stack, "leaf", params! { "m" => 49 }, None);
        let script = case.descriptor().expect("descriptor");
        assert!(script.starts_with("#!/usr/bin/env python3\nimport json\nprint(json.dumps({"));
        assert!(script.contains("\n    \"m\": 49,"));
        assert!(script.ends_with("}))\n"));

        let start = script.find('{').expect("open");
        let end = script.rfind('}').expect("close");
        let parsed: ParameterSet =
            serde_json::from_str(&script[start..=end]).expect("embedded json");
        assert_eq!(&parsed, case.params());
    }

    #[test]
    fn descriptor_rejects_non_finite_values() {
        let mut case = case("leaf");
        case.set("dt", f64::NAN);
        assert!(case.descriptor().is_err());
    }

    #[test]
    fn run_args_without_case_optimization() {
        let case = create_case(&CompositionStack::new(), "leaf", params! {}, Some(2));
        let args = case.run_args("tests/ABCDEF01/case.py", &JobOptions::default());
        assert_eq!(
            args,
            vec![
                "run",
                "tests/ABCDEF01/case.py",
                "-m",
                "release-cpu",
                "-n",
                "2",
                "--no-build",
                "-t",
                "pre_process",
                "simulation",
            ]
        );
    }

    #[test]
    fn run_args_with_every_option() {
        let case = create_case(&CompositionStack::new(), "leaf", params! {}, Some(2));
        let options = JobOptions {
            mode: "release-gpu".to_string(),
            jobs: 8,
            case_optimization: true,
            no_mpi: true,
            binary: Some(PathBuf::from("/opt/sim/bin/simulation")),
            ..JobOptions::default()
        };
        let args = case.run_args("case.py", &options);
        assert_eq!(
            args,
            vec![
                "run",
                "case.py",
                "-m",
                "release-gpu",
                "-n",
                "2",
                "-j",
                "8",
                "-g",
                "2",
                "-b",
                "/opt/sim/bin/simulation",
                "--case-optimization",
                "--no-mpi",
                "-t",
                "pre_process",
                "simulation",
            ]
        );
        assert!(!args.contains(&"--no-build".to_string()));
    }

    #[test]
    fn display_shows_identity_and_trace() {
        let case = case("1D");
        assert_eq!(case.to_string(), "tests/C31A5A19: 1D");
    }
}
