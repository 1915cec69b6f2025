// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;

/// Set of error codes that can be used by libgcloudwrapper.
///
/// None of these are retried internally; every failure is returned to the
/// caller exactly as it was detected.
///
/// # Example
///
/// ```rust
/// # use libgcloudwrapper::error::Error;
///
/// let err = Error::ExternalCommand {
///     command: "gcloud info --format=json".to_string(),
///     stderr: "ERROR: (gcloud) not installed".to_string(),
/// };
/// assert_eq!(err.reason(), "external command error");
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command {command} failed with error: {stderr}")]
    ExternalCommand { command: String, stderr: String },
    #[error("Command {command} failed.")]
    CommandFailed { command: String },
    #[error("{resource} cannot be found.")]
    FileNotFound { resource: String },
    #[error("Failed to get access token from gcloud {operation}.")]
    InvalidData { operation: String },
}

impl Error {
    /// Returns a concise, fixed string describing the kind of failure.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Io(_) => "I/O error",
            Self::ExternalCommand { .. } => "external command error",
            Self::CommandFailed { .. } => "command failed",
            Self::FileNotFound { .. } => "resource not found",
            Self::InvalidData { .. } => "invalid data",
        }
    }

    /// Returns a map of structured data about the failure.
    ///
    /// Variants without structured fields include the stringified error as
    /// `"error"`.
    pub fn supporting_data(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        match self {
            Error::ExternalCommand { command, stderr } => {
                map.insert("command".into(), command.clone());
                map.insert("stderr".into(), stderr.clone());
            }
            Error::CommandFailed { command } => {
                map.insert("command".into(), command.clone());
            }
            Error::FileNotFound { resource } => {
                map.insert("resource".into(), resource.clone());
            }
            Error::InvalidData { operation } => {
                map.insert("operation".into(), operation.clone());
            }
            _ => {
                map.insert("error".into(), format!("{self}"));
            }
        }
        map
    }
}
