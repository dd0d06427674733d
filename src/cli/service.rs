// SPDX-License-Identifier: Apache-2.0

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::{
    apply::{apply, ApplyOptions},
    config::Config,
    error::CliError,
    state::state_from_file,
};

const CONFIG_FILE_EXTENTION: &str = "yml";
const RELOCATE_FILE_EXTENTION: &str = "applied";

/// Apply every `.yml` file in service folder in file name order. Stop at
/// the first failure.
pub(crate) fn ncl_service(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let folder = matches
        .value_of("FOLDER")
        .unwrap_or(config.service.folder.as_str());

    let config_files = get_config_files(folder)?;
    if config_files.is_empty() {
        log::info!(
            "No netstate config(end with .{}) found in config folder {}",
            CONFIG_FILE_EXTENTION,
            folder
        );
    }

    let opts = ApplyOptions::new(config);
    for file_path in config_files {
        let path_str = file_path.display().to_string();
        let result = state_from_file(&path_str)
            .and_then(|mut net_state| apply(&mut net_state, &opts, config));
        if let Err(e) = result {
            log::error!("Failed to apply state file {path_str}: {e}");
            return Err(e);
        }
        log::info!("Applied netstate config: {path_str}");
        if config.service.keep_state_file_after_apply {
            log::debug!("Keeping applied state file {path_str}");
        } else {
            relocate_file(&file_path)?;
        }
    }

    Ok("".to_string())
}

// All file ending with `.yml` will be included.
fn get_config_files(folder: &str) -> Result<Vec<PathBuf>, CliError> {
    let folder = Path::new(folder);
    let mut ret = Vec::new();
    for entry in folder.read_dir().map_err(|e| {
        CliError::from(format!(
            "Failed to read service folder {}: {e}",
            folder.display()
        ))
    })? {
        let file = entry?.path();
        if file.extension() == Some(OsStr::new(CONFIG_FILE_EXTENTION)) {
            ret.push(folder.join(file));
        }
    }
    ret.sort_unstable();
    Ok(ret)
}

// rename file by adding a suffix `.applied`.
fn relocate_file(file_path: &Path) -> Result<(), CliError> {
    let new_path = file_path.with_extension(RELOCATE_FILE_EXTENTION);
    std::fs::rename(file_path, &new_path).map_err(|e| {
        CliError::from(format!(
            "Failed to rename applied state file {}: {e}",
            file_path.display()
        ))
    })?;
    log::info!(
        "Renamed applied config {} to {}",
        file_path.display(),
        new_path.display()
    );
    Ok(())
}
