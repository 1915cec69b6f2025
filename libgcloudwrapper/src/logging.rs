// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::OpenOptions;
use tracing::{event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::Config;

/// Environment variable holding an `EnvFilter` directive for all layers.
pub const LOG_FILTER_ENV: &str = "GCLOUD_WRAPPER_LOG";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Builds a `tracing` subscriber writing to `stderr` and, when
/// `config.logging.path` is set, appending to that file as well.
///
/// The stderr layer defaults to `error` and the file layer to `info`; both
/// are overridden by `GCLOUD_WRAPPER_LOG`. A log file that cannot be opened
/// is reported and skipped rather than failing setup.
///
/// # Example
///
/// ```no_run
/// # use libgcloudwrapper::{config::Config, logging::setup_layers};
/// let subscriber = setup_layers(&Config::default())?;
/// tracing::subscriber::set_global_default(subscriber)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn setup_layers(
    config: &Config,
) -> Result<Box<dyn Subscriber + Send + Sync + 'static>, anyhow::Error> {
    let stderr_layer = fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_filter(filter_or("error"));

    let file_layer = match config.logging.path.as_ref() {
        Some(path) => match open_log_file(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_writer(file)
                    .with_filter(filter_or("info")),
            ),
            Err(e) => {
                event!(
                    Level::ERROR,
                    "Could not open configured log file {}: {}. Continuing without file logging.",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    let subscriber = Registry::default().with(stderr_layer).with(file_layer);

    Ok(Box::new(subscriber))
}

fn open_log_file(path: &std::path::Path) -> std::io::Result<std::fs::File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        if let Err(e) = file.set_permissions(Permissions::from_mode(0o600)) {
            event!(
                Level::WARN,
                "Failed to set permissions on {}: {}.",
                path.display(),
                e,
            );
        }
    }

    Ok(file)
}
