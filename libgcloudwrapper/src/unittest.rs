// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, Mutex};

use crate::command::{CommandRunner, Invocation, ProcessOutput};
use crate::error::Error;

#[derive(Clone, Debug)]
enum Outcome {
    Exit(ProcessOutput),
    SpawnError,
}

/// A [`CommandRunner`] that never spawns anything. It records every
/// invocation and answers with the same canned outcome each time.
#[derive(Clone, Debug)]
pub(crate) struct FakeRunner {
    outcome: Outcome,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl FakeRunner {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            invocations: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Exit code 0 with `stdout`.
    pub(crate) fn succeeding(stdout: impl Into<String>) -> Self {
        Self::new(Outcome::Exit(ProcessOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }))
    }

    /// Exit code 1 with `stderr`.
    pub(crate) fn failing(stderr: impl Into<String>) -> Self {
        Self::new(Outcome::Exit(ProcessOutput {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(1),
        }))
    }

    /// Behaves as if the shell executable does not exist.
    pub(crate) fn unspawnable() -> Self {
        Self::new(Outcome::SpawnError)
    }

    pub(crate) fn last_invocation(&self) -> Option<Invocation> {
        self.invocations.lock().unwrap().last().cloned()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, Error> {
        self.invocations.lock().unwrap().push(invocation.clone());

        match &self.outcome {
            Outcome::Exit(output) => Ok(output.clone()),
            Outcome::SpawnError => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "shell not found",
            ))),
        }
    }
}
