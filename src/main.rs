// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use libgcloudwrapper::{
    config::Config, error::Error as LibError, logging::setup_layers,
    GcloudWrapper,
};

/// Query the Google Cloud SDK for its installation properties path or an
/// access token.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file or a directory containing
    /// gcloud-wrapper.toml and gcloud-wrapper.d/
    #[arg(long, env = "GCLOUD_WRAPPER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print the path of the SDK's installation properties file
    InstallationPropertiesPath,
    /// Print the active account's access token as JSON
    AccessToken,
}

fn exit_code(error: &anyhow::Error) -> u8 {
    let code = match error.downcast_ref::<LibError>() {
        Some(LibError::ExternalCommand { .. })
        | Some(LibError::CommandFailed { .. }) => exitcode::UNAVAILABLE,
        Some(LibError::FileNotFound { .. })
        | Some(LibError::InvalidData { .. }) => exitcode::DATAERR,
        Some(LibError::Io(_)) => exitcode::IOERR,
        None => exitcode::SOFTWARE,
    };
    code as u8
}

fn run(command: Command, gcloud: &GcloudWrapper) -> anyhow::Result<()> {
    match command {
        Command::InstallationPropertiesPath => {
            let path = gcloud.installation_properties_path()?;
            println!("{path}");
        }
        Command::AccessToken => {
            let token = gcloud.access_token()?;
            let json = serde_json::to_string_pretty(&token)
                .context("Failed to serialize access token")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match setup_layers(&config) {
        Ok(subscriber) => {
            if let Err(e) = tracing::subscriber::set_global_default(subscriber)
            {
                eprintln!("Failed to set global tracing subscriber: {e}");
            }
        }
        Err(e) => eprintln!("Failed to set up logging: {e:?}"),
    }

    tracing::info!(
        target: "libgcloudwrapper::config::success",
        "Loaded configuration: {:?}",
        config
    );

    let gcloud = GcloudWrapper::new(config);
    match run(cli.command, &gcloud) {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(error) => {
            tracing::error!(?error, "gcloud-wrapper failed");
            eprintln!("{error:#}");
            ExitCode::from(exit_code(&error))
        }
    }
}
