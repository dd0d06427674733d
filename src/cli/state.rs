// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use netstate::NetworkState;

use crate::error::CliError;

pub(crate) fn state_from_reader<R>(
    reader: &mut R,
) -> Result<NetworkState, CliError>
where
    R: Read,
{
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    state_from_str(&content)
}

pub(crate) fn state_from_file(
    file_path: &str,
) -> Result<NetworkState, CliError> {
    if file_path == "-" {
        state_from_reader(&mut std::io::stdin())
    } else {
        state_from_reader(&mut std::fs::File::open(file_path).map_err(
            |e| CliError::from(format!("Failed to open {file_path}: {e}")),
        )?)
    }
}

// YAML is a superset of JSON, both are accepted.
pub(crate) fn state_from_str(content: &str) -> Result<NetworkState, CliError> {
    // Replace non-breaking space '\u{A0}'  to normal space
    let content = content.replace('\u{A0}', " ");
    Ok(NetworkState::new_from_yaml(&content)?)
}
