// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use toml;
use tracing;

pub const DEFAULT_CONFIG_FILE: &str = "gcloud-wrapper.toml";
pub const DEFAULT_CONFIG_DIR: &str = "gcloud-wrapper.d";

/// How the external tool itself is named and asked to format its output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Gcloud {
    pub program: String,
    pub output_format: String,
}

impl Default for Gcloud {
    fn default() -> Self {
        Self {
            program: "gcloud".to_string(),
            output_format: "json".to_string(),
        }
    }
}

/// The platform shell used to launch the external tool.
///
/// `gcloud` ships as a batch file on Windows, so it is always run through
/// the shell rather than spawned directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Shell {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    /// Applied to every invocation, beneath any per-call overrides.
    pub environment: BTreeMap<String, String>,
}

impl Default for Shell {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                program: "cmd.exe".to_string(),
                args: vec!["/c".to_string()],
                working_directory: None,
                environment: BTreeMap::new(),
            }
        } else {
            Self {
                program: "sh".to_string(),
                args: vec!["-c".to_string()],
                working_directory: None,
                environment: BTreeMap::new(),
            }
        }
    }
}

#[derive(Default, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Logging {
    pub path: Option<PathBuf>,
}

#[derive(Default, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub gcloud: Gcloud,
    pub shell: Shell,
    pub logging: Logging,
}

impl Config {
    pub fn load(cli_overrides: Option<PathBuf>) -> Result<Config, Error> {
        let mut config = Config::default();

        if let Some(cli_config) = cli_overrides {
            if cli_config.is_dir() {
                config = Self::load_from_directory(cli_config)?;
            } else {
                config = Self::load_from_file(cli_config)?;
            }
        }

        Ok(config)
    }

    fn load_from_file(file_path: PathBuf) -> Result<Config, Error> {
        let content = fs::read_to_string(file_path)?;
        toml::from_str::<Config>(&content).map_err(|e| {
            tracing::error!("Failed to parse configuration file: {:?}", e);
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to parse TOML config file: {:?}", e),
            ))
        })
    }

    fn load_from_directory(dir: PathBuf) -> Result<Config, Error> {
        let mut config = Config::default();

        let base_config_path = dir.join(DEFAULT_CONFIG_FILE);
        if base_config_path.exists() {
            config = config.merge(Self::load_from_file(base_config_path)?);
        }

        let d_dir = dir.join(DEFAULT_CONFIG_DIR);
        if d_dir.is_dir() {
            let mut toml_files: Vec<_> = fs::read_dir(d_dir)?
                .filter_map(|entry| {
                    let entry = entry.ok()?;
                    let path = entry.path();
                    if path.extension()?.to_str()? == "toml" {
                        Some(path)
                    } else {
                        None
                    }
                })
                .collect();

            toml_files.sort();

            for file_path in toml_files {
                config = config.merge(Self::load_from_file(file_path)?);
            }
        }

        Ok(config)
    }

    fn merge(mut self, other: Config) -> Config {
        self.gcloud = other.gcloud;
        self.shell = other.shell;
        self.logging = other.logging;

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults_without_overrides() {
        let config = Config::load(None).unwrap();

        assert_eq!(config.gcloud.program, "gcloud");
        assert_eq!(config.gcloud.output_format, "json");
        assert!(config.shell.environment.is_empty());
        assert!(config.logging.path.is_none());
        if cfg!(windows) {
            assert_eq!(config.shell.program, "cmd.exe");
            assert_eq!(config.shell.args, vec!["/c".to_string()]);
        } else {
            assert_eq!(config.shell.program, "sh");
            assert_eq!(config.shell.args, vec!["-c".to_string()]);
        }
    }

    #[test]
    fn test_load_from_file_partial_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [gcloud]
            program = "/opt/google-cloud-sdk/bin/gcloud"
            output_format = "json"

            [shell.environment]
            CLOUDSDK_CORE_DISABLE_PROMPTS = "1"
            "#
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();

        assert_eq!(config.gcloud.program, "/opt/google-cloud-sdk/bin/gcloud");
        assert_eq!(
            config
                .shell
                .environment
                .get("CLOUDSDK_CORE_DISABLE_PROMPTS")
                .map(String::as_str),
            Some("1")
        );
        assert_eq!(config.shell.program, Shell::default().program);
    }

    #[test]
    fn test_load_from_directory_later_files_win() {
        let dir = tempdir().unwrap();
        let mut base = File::create(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        writeln!(
            base,
            r#"
            [gcloud]
            program = "gcloud-base"
            output_format = "json"
            "#
        )
        .unwrap();

        let d_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        create_dir(&d_dir).unwrap();
        let mut first = File::create(d_dir.join("10-first.toml")).unwrap();
        writeln!(
            first,
            r#"
            [gcloud]
            program = "gcloud-first"
            output_format = "json"
            "#
        )
        .unwrap();
        let mut second = File::create(d_dir.join("20-second.toml")).unwrap();
        writeln!(
            second,
            r#"
            [logging]
            path = "/tmp/gcloud-wrapper.log"
            "#
        )
        .unwrap();
        File::create(d_dir.join("ignored.txt")).unwrap();

        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();

        // Whole sections are replaced, so the second file resets [gcloud].
        assert_eq!(config.gcloud.program, "gcloud");
        assert_eq!(
            config.logging.path,
            Some(PathBuf::from("/tmp/gcloud-wrapper.log"))
        );
    }

    #[test]
    fn test_load_invalid_toml_is_invalid_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[gcloud\nprogram = ").unwrap();

        let err = Config::load(Some(path)).unwrap_err();

        match err {
            Error::Io(io) => {
                assert_eq!(io.kind(), std::io::ErrorKind::InvalidData)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err =
            Config::load(Some(dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
