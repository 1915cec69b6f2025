// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Subprocess execution for the gcloud gateway.
//!
//! Everything that leaves the process goes through [`CommandRunner`].
//! [`ShellRunner`] is the real implementation and spawns the configured
//! platform shell; tests substitute a runner that returns canned output.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use tracing::instrument;

use crate::config::Shell;
use crate::error::Error;

/// A single subprocess to launch. Built per call and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Layered onto the inherited environment of the child.
    pub environment: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_directory: None,
            environment: BTreeMap::new(),
        }
    }

    /// Wrap `command_line` so it is interpreted by the configured shell.
    pub fn through_shell(shell: &Shell, command_line: impl Into<String>) -> Self {
        let mut args = shell.args.clone();
        args.push(command_line.into());

        Self {
            program: shell.program.clone(),
            args,
            working_directory: shell.working_directory.clone(),
            environment: shell.environment.clone(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add environment overrides. Later values replace earlier ones.
    pub fn with_environment<I, K, V>(mut self, environment: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment.extend(
            environment
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        self
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    }
}

/// Something that can execute an [`Invocation`] and capture its output.
///
/// Implementations block until the child exits. No timeout is applied.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, Error>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    #[instrument(skip_all, fields(program = %invocation.program))]
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, Error> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).envs(&invocation.environment);
        if let Some(dir) = &invocation.working_directory {
            command.current_dir(dir);
        }

        let output = command.output()?;
        tracing::debug!(
            target: "libgcloudwrapper::command::exit",
            exit_code = ?output.status.code(),
            "Subprocess exited"
        );

        Ok(output.into())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_through_shell_appends_command_line() {
        let mut shell = Shell::default();
        shell
            .environment
            .insert("CLOUDSDK_CORE_DISABLE_PROMPTS".into(), "1".into());

        let invocation =
            Invocation::through_shell(&shell, "gcloud info --format=json")
                .with_environment([("CLOUDSDK_CORE_DISABLE_PROMPTS", "0")]);

        assert_eq!(invocation.program, "sh");
        assert_eq!(
            invocation.args,
            vec!["-c".to_string(), "gcloud info --format=json".to_string()]
        );
        assert_eq!(
            invocation.environment["CLOUDSDK_CORE_DISABLE_PROMPTS"],
            "0"
        );
    }

    #[test]
    fn test_shell_runner_captures_stdout_and_stderr() {
        let invocation = Invocation::new("sh")
            .with_args(["-c", "echo out; echo err >&2"]);

        let output = ShellRunner.run(&invocation).unwrap();

        assert!(output.succeeded());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn test_shell_runner_reports_failure_exit_code() {
        let invocation = Invocation::new("sh").with_args(["-c", "exit 3"]);

        let output = ShellRunner.run(&invocation).unwrap();

        assert!(!output.succeeded());
        assert_eq!(output.exit_code, Some(3));
    }

    #[test]
    fn test_shell_runner_passes_environment_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut invocation = Invocation::new("sh")
            .with_args(["-c", "printf '%s' \"$GCLOUD_WRAPPER_TEST\"; pwd"])
            .with_environment([("GCLOUD_WRAPPER_TEST", "layered")]);
        invocation.working_directory = Some(dir.path().to_path_buf());

        let output = ShellRunner.run(&invocation).unwrap();

        assert!(output.stdout.starts_with("layered"));
        let expected = dir.path().canonicalize().unwrap();
        let printed = PathBuf::from(output.stdout["layered".len()..].trim())
            .canonicalize()
            .unwrap();
        assert_eq!(printed, expected);
    }

    #[test]
    fn test_shell_runner_missing_program_is_io_error() {
        let invocation = Invocation::new("/nonexistent/gcloud-wrapper-shell");

        let err = ShellRunner.run(&invocation).unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
}
