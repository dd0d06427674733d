// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetstateError};

const HOST_NAME_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
/// Host name of the system.
/// ```yaml
/// hostname:
///   running: host-a.example.org
///   config: host-a.example.org
/// ```
pub struct HostNameState {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Host name currently in use by kernel. When applying, it is changed
    /// without persisting.
    pub running: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Persistent host name. Empty string means no change.
    pub config: Option<String>,
}

impl HostNameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        for name in [&mut self.running, &mut self.config] {
            if name.as_deref() == Some("") {
                *name = None;
            }
            if let Some(n) = name.as_deref() {
                if n.len() > HOST_NAME_MAX_LEN {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Host name {n} is longer than \
                            {HOST_NAME_MAX_LEN} characters"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedHostNameState {
    pub(crate) desired: Option<HostNameState>,
    pub(crate) current: Option<HostNameState>,
}

impl MergedHostNameState {
    pub(crate) fn new(
        desired: Option<HostNameState>,
        current: Option<HostNameState>,
    ) -> Result<Self, NetstateError> {
        let desired = match desired {
            Some(mut d) => {
                d.sanitize()?;
                if d.running.is_none() && d.config.is_none() {
                    None
                } else {
                    Some(d)
                }
            }
            None => None,
        };
        Ok(Self { desired, current })
    }

    pub(crate) fn is_changed(&self) -> bool {
        match (self.desired.as_ref(), self.current.as_ref()) {
            (Some(des), Some(cur)) => {
                (des.running.is_some() && des.running != cur.running)
                    || (des.config.is_some() && des.config != cur.config)
            }
            (Some(_), None) => true,
            _ => false,
        }
    }
}
