// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) service: ServiceConfig,
    #[serde(default)]
    pub(crate) apply: ApplyConfig,
    #[serde(default)]
    pub(crate) provider: ProviderConfig,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServiceConfig {
    pub(crate) folder: String,
    pub(crate) keep_state_file_after_apply: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            folder: Config::DEFAULT_SERVICE_FOLDER.to_string(),
            keep_state_file_after_apply: false,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ApplyConfig {
    /// Seconds before an uncommitted checkpoint is rolled back.
    pub(crate) timeout: u32,
    pub(crate) verify_retry_count: u32,
    pub(crate) verify_retry_interval_ms: u64,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            timeout: 60,
            verify_retry_count: 5,
            verify_retry_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ProviderConfig {
    pub(crate) state_file: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            state_file: Config::DEFAULT_STATE_FILE.to_string(),
        }
    }
}

impl Config {
    pub(crate) const DEFAULT_CONFIG_PATH: &'static str =
        "/etc/netstate/netstatectl.conf";
    pub(crate) const DEFAULT_SERVICE_FOLDER: &'static str = "/etc/nmstate";
    pub(crate) const DEFAULT_STATE_FILE: &'static str =
        "/run/netstate/state.json";

    pub(crate) fn load(path: &str) -> Result<Self, CliError> {
        let path = std::path::Path::new(path);
        if !path.exists() {
            log::debug!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }
        let mut fd = std::fs::File::open(path)?;
        let mut content = String::new();
        fd.read_to_string(&mut content)?;
        match Self::parse(&content) {
            Ok(c) => {
                log::info!("Configuration loaded:\n{content}");
                Ok(c)
            }
            Err(e) => Err(CliError::new(
                e.code,
                format!(
                    "Failed to read configuration from {}: {}",
                    path.display(),
                    e.error_msg
                ),
            )),
        }
    }

    fn parse(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str::<Config>(content)?)
    }
}
