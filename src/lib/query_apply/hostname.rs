// SPDX-License-Identifier: Apache-2.0

use crate::{ErrorKind, HostNameState, MergedHostNameState, NetstateError};

impl MergedHostNameState {
    // Persistent host name only changes running one after reboot when
    // in memory only mode, hence only compare the running one against
    // desired config when persisting.
    pub(crate) fn verify(
        &self,
        current: Option<&HostNameState>,
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        let desired = match self.desired.as_ref() {
            Some(d) => d,
            None => return Ok(()),
        };
        let current = match current {
            Some(c) => c,
            None => {
                let e = NetstateError::new(
                    ErrorKind::Bug,
                    "Got None HostNameState as current".to_string(),
                );
                log::error!("{}", e);
                return Err(e);
            }
        };

        if let Some(running) = desired.running.as_ref() {
            if Some(running) != current.running.as_ref() {
                let e = NetstateError::new(
                    ErrorKind::VerificationError,
                    format!(
                        "Verification fail, desire hostname.running: \
                        {}, current: {:?}",
                        running,
                        current.running.as_ref()
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        if let Some(config) = desired.config.as_ref() {
            let (prop, cur) = if memory_only {
                ("running", current.running.as_ref())
            } else {
                ("config", current.config.as_ref())
            };
            if Some(config) != cur {
                let e = NetstateError::new(
                    ErrorKind::VerificationError,
                    format!(
                        "Verification fail, desire hostname.config: \
                        {config}, current hostname.{prop}: {cur:?}"
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn gen_diff(&self) -> Option<HostNameState> {
        if self.is_changed() {
            self.desired.clone()
        } else {
            None
        }
    }
}
