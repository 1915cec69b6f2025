// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use crate::command::{CommandRunner, Invocation, ShellRunner};
use crate::config::Config;
use crate::error::Error;
use crate::token::TokenResponse;

const INFO_COMMAND: &str = "info";
const ACCESS_TOKEN_COMMAND: &str = "auth print-access-token";
const INSTALLATION_PROPERTIES_PATH: &str =
    "config.paths.installation_properties_path";
const TOKEN_RESPONSE_PATH: &str = "token_response";
const INSTALLATION_PROPERTIES_RESOURCE: &str =
    "Installation Properties file for Google Cloud SDK";

/// Walk `path`, a dot-separated list of object keys, starting from `value`.
///
/// Returns `None` as soon as a key is missing or an intermediate value is
/// not an object. An empty path returns `value` itself.
///
/// # Example
///
/// ```
/// # use serde_json::json;
/// # use libgcloudwrapper::gcloud::select;
///
/// let info = json!({"config": {"paths": {"global_config_dir": "/home/u/.config/gcloud"}}});
/// assert_eq!(
///     select(&info, "config.paths.global_config_dir"),
///     Some(&json!("/home/u/.config/gcloud"))
/// );
/// assert_eq!(select(&info, "config.account"), None);
/// ```
pub fn select<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

/// Runs `gcloud` commands and extracts data from their JSON output.
///
/// Each call spawns its own subprocess and shares no state with other
/// calls, so a single `GcloudWrapper` can be used from many threads.
///
/// # Example
///
/// ```no_run
/// # use libgcloudwrapper::{config::Config, GcloudWrapper};
/// let gcloud = GcloudWrapper::new(Config::default());
/// let token = gcloud.access_token()?;
/// println!("token expires at {:?}", token.expires_at());
/// # Ok::<(), libgcloudwrapper::error::Error>(())
/// ```
#[derive(Clone)]
pub struct GcloudWrapper {
    config: Config,
    runner: Arc<dyn CommandRunner>,
}

impl core::fmt::Debug for GcloudWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcloudWrapper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GcloudWrapper {
    /// Use the real platform shell to run `gcloud`.
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, ShellRunner)
    }

    /// Use a caller-supplied [`CommandRunner`] instead of spawning processes.
    pub fn with_runner(
        config: Config,
        runner: impl CommandRunner + 'static,
    ) -> Self {
        Self {
            config,
            runner: Arc::new(runner),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The full command line for `command`, e.g.
    /// `gcloud auth print-access-token --format=json`.
    pub fn command_line(&self, command: &str) -> String {
        format!(
            "{} {} --format={}",
            self.config.gcloud.program, command, self.config.gcloud.output_format
        )
    }

    /// Run `gcloud <command> --format=json` and return its standard output.
    ///
    /// `environment` is layered over both the inherited environment and the
    /// configured `[shell.environment]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalCommand`] if the tool fails and writes to
    /// stderr, [`Error::CommandFailed`] if it fails silently, and
    /// [`Error::Io`] if the shell cannot be started.
    pub fn run(
        &self,
        command: &str,
        environment: Option<&BTreeMap<String, String>>,
    ) -> Result<String, Error> {
        let command_line = self.command_line(command);
        tracing::debug!(
            target: "libgcloudwrapper::gcloud::exec",
            "Executing gcloud command: {}",
            command_line
        );

        let mut invocation =
            Invocation::through_shell(&self.config.shell, command_line.as_str());
        if let Some(environment) = environment {
            invocation = invocation.with_environment(environment.clone());
        }

        let output = self.runner.run(&invocation)?;
        if output.succeeded() {
            return Ok(output.stdout);
        }

        if !output.stderr.trim().is_empty() {
            return Err(Error::ExternalCommand {
                command: command_line,
                stderr: output.stderr,
            });
        }

        Err(Error::CommandFailed {
            command: command_line,
        })
    }

    /// Location of the SDK's installation-wide properties file, as reported
    /// by `gcloud info`.
    ///
    /// The path is returned verbatim; it is not checked for existence.
    #[instrument(err, skip_all)]
    pub fn installation_properties_path(&self) -> Result<String, Error> {
        let output = self.run(INFO_COMMAND, None)?;

        serde_json::from_str::<Value>(&output)
            .ok()
            .as_ref()
            .and_then(|info| select(info, INSTALLATION_PROPERTIES_PATH))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::FileNotFound {
                resource: INSTALLATION_PROPERTIES_RESOURCE.to_string(),
            })
    }

    /// Fetch the active account's access token from
    /// `gcloud auth print-access-token`.
    ///
    /// The returned token's `issued` time is taken on this host right
    /// before the tool is launched.
    #[instrument(err, skip_all)]
    pub fn access_token(&self) -> Result<TokenResponse, Error> {
        let issued = Utc::now();
        let output = self.run(ACCESS_TOKEN_COMMAND, None)?;

        let invalid = || Error::InvalidData {
            operation: ACCESS_TOKEN_COMMAND.to_string(),
        };
        let mut response: Value =
            serde_json::from_str(&output).map_err(|_| invalid())?;
        let token_response = response
            .get_mut(TOKEN_RESPONSE_PATH)
            .map(Value::take)
            .ok_or_else(invalid)?;
        let mut token: TokenResponse =
            serde_json::from_value(token_response).map_err(|_| invalid())?;
        token.issued = issued;

        tracing::info!(
            target: "libgcloudwrapper::gcloud::token",
            expires_in = ?token.expires_in,
            "Retrieved access token from gcloud"
        );

        Ok(token)
    }
}
