// SPDX-License-Identifier: Apache-2.0

use netstate::{ErrorKind, NetstateError};

pub(crate) const DEFAULT_ERROR_CODE: i32 = 1;
pub(crate) const EX_USAGE: i32 = 64;
pub(crate) const EX_DATAERR: i32 = 65;
const EX_VERIFY: i32 = 66;
const EX_DEPENDENCY: i32 = 67;
const EX_NOT_SUPPORTED: i32 = 68;
const EX_PLUGIN: i32 = 69;
const EX_TEMPFAIL: i32 = 75;
const EX_NOPERM: i32 = 77;

#[derive(Debug, Default)]
pub(crate) struct CliError {
    pub(crate) code: i32,
    pub(crate) error_msg: String,
}

impl CliError {
    pub(crate) fn new(code: i32, error_msg: String) -> Self {
        Self { code, error_msg }
    }
}

pub(crate) fn exit_code_of(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::SrIovVfNotFound => EX_DATAERR,
        ErrorKind::VerificationError => EX_VERIFY,
        ErrorKind::DependencyError => EX_DEPENDENCY,
        ErrorKind::NotImplementedError | ErrorKind::NotSupportedError => {
            EX_NOT_SUPPORTED
        }
        ErrorKind::PluginFailure | ErrorKind::Timeout => EX_PLUGIN,
        ErrorKind::PermissionError => EX_NOPERM,
        ErrorKind::ConflictError => EX_TEMPFAIL,
        _ => DEFAULT_ERROR_CODE,
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self {
            code: DEFAULT_ERROR_CODE,
            error_msg: msg.into(),
        }
    }
}

impl From<String> for CliError {
    fn from(error_msg: String) -> Self {
        Self {
            code: DEFAULT_ERROR_CODE,
            error_msg,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error_msg)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self {
            code: DEFAULT_ERROR_CODE,
            error_msg: format!("std::io::Error: {e}"),
        }
    }
}

impl From<NetstateError> for CliError {
    fn from(e: NetstateError) -> Self {
        Self {
            code: exit_code_of(e.kind()),
            error_msg: e.chain().join("\n  caused by: "),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self {
            code: EX_DATAERR,
            error_msg: format!("serde_yaml::Error: {e}"),
        }
    }
}

impl From<clap::Error> for CliError {
    fn from(e: clap::Error) -> Self {
        Self {
            code: EX_USAGE,
            error_msg: format!("clap::Error {e}"),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            code: EX_DATAERR,
            error_msg: format!("serde_json::Error {e}"),
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        Self {
            code: EX_DATAERR,
            error_msg: format!("toml::de::Error {e}"),
        }
    }
}
