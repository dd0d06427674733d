// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Desired state is malformed or violates a constraint.
    InvalidArgument,
    /// Provider internal failure.
    PluginFailure,
    /// Invariant violation inside the engine.
    #[default]
    Bug,
    /// Post-apply state does not contain the intended state.
    VerificationError,
    NotImplementedError,
    NotSupportedError,
    /// Provider lacks a required capability.
    DependencyError,
    PermissionError,
    /// Another transaction or checkpoint is in the way.
    ConflictError,
    Timeout,
    SrIovVfNotFound,
}

impl ErrorKind {
    pub(crate) fn can_retry(&self) -> bool {
        matches!(
            self,
            ErrorKind::PluginFailure
                | ErrorKind::Bug
                | ErrorKind::VerificationError
                | ErrorKind::SrIovVfNotFound
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The property path with the intended and observed values which failed
/// verification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct VerificationDiff {
    pub path: String,
    pub desired: serde_json::Value,
    pub current: serde_json::Value,
}

impl VerificationDiff {
    pub fn new(
        path: String,
        desired: serde_json::Value,
        current: serde_json::Value,
    ) -> Self {
        Self {
            path,
            desired,
            current,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct NetstateError {
    kind: ErrorKind,
    msg: String,
    cause: Option<Box<NetstateError>>,
    diff: Option<VerificationDiff>,
}

impl std::fmt::Display for NetstateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl Error for NetstateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl NetstateError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self {
            kind,
            msg,
            ..Default::default()
        }
    }

    pub(crate) fn new_verification_error(diff: VerificationDiff) -> Self {
        Self {
            kind: ErrorKind::VerificationError,
            msg: format!(
                "Verification failure: {} desire '{}', current '{}'",
                diff.path, diff.desired, diff.current
            ),
            cause: None,
            diff: Some(diff),
        }
    }

    /// Wrap `cause` as the source of this error.
    pub fn with_cause(mut self, cause: NetstateError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }

    pub fn cause(&self) -> Option<&NetstateError> {
        self.cause.as_deref()
    }

    pub fn diff(&self) -> Option<&VerificationDiff> {
        self.diff.as_ref()
    }

    /// Messages of this error and every cause, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut ret = vec![self.to_string()];
        let mut cur = self.cause.as_deref();
        while let Some(e) = cur {
            ret.push(e.to_string());
            cur = e.cause.as_deref();
        }
        ret
    }
}

impl From<serde_json::Error> for NetstateError {
    fn from(e: serde_json::Error) -> Self {
        NetstateError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid property: {e}"),
        )
    }
}

impl From<serde_yaml::Error> for NetstateError {
    fn from(e: serde_yaml::Error) -> Self {
        NetstateError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid YAML string: {e}"),
        )
    }
}

impl From<std::net::AddrParseError> for NetstateError {
    fn from(e: std::net::AddrParseError) -> Self {
        NetstateError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address : {e}"),
        )
    }
}
