// SPDX-License-Identifier: Apache-2.0

use crate::{
    memory::{MemoryProvider, MemoryState},
    ErrorKind, NetstateError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemoryCheckpoint {
    pub(crate) id: String,
    pub(crate) timeout: u32,
    pub(crate) snapshot: MemoryState,
}

impl MemoryProvider {
    pub(crate) fn checkpoint_create(
        &mut self,
        timeout: u32,
    ) -> Result<String, NetstateError> {
        if let Some(cur) = self.checkpoint.as_ref() {
            let e = NetstateError::new(
                ErrorKind::ConflictError,
                format!(
                    "Another checkpoint {} is still active, please commit \
                    or rollback it first",
                    cur.id
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        let id = format!("/memory/checkpoint/{}", uuid::Uuid::new_v4());
        let mut snapshot = self.state.clone();
        snapshot.pending_dns.clear();
        self.checkpoint = Some(MemoryCheckpoint {
            id: id.clone(),
            timeout,
            snapshot,
        });
        log::debug!("Checkpoint {id} created with timeout {timeout}");
        Ok(id)
    }

    pub(crate) fn checkpoint_destroy(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        self.take_checkpoint(checkpoint)?;
        self.state.pending_dns.clear();
        Ok(())
    }

    pub(crate) fn checkpoint_rollback(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        let checkpoint = self.take_checkpoint(checkpoint)?;
        log::info!("Restoring state of checkpoint {}", checkpoint.id);
        self.state = checkpoint.snapshot;
        Ok(())
    }

    pub(crate) fn checkpoint_timeout_extend(
        &mut self,
        checkpoint: &str,
        timeout: u32,
    ) -> Result<(), NetstateError> {
        match self.checkpoint.as_mut() {
            Some(cur) if cur.id == checkpoint => {
                cur.timeout = timeout;
                Ok(())
            }
            _ => Err(checkpoint_not_found(checkpoint)),
        }
    }

    fn take_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<MemoryCheckpoint, NetstateError> {
        match self.checkpoint.take() {
            Some(cur) if cur.id == checkpoint => Ok(cur),
            other => {
                self.checkpoint = other;
                Err(checkpoint_not_found(checkpoint))
            }
        }
    }
}

fn checkpoint_not_found(checkpoint: &str) -> NetstateError {
    let e = NetstateError::new(
        ErrorKind::InvalidArgument,
        format!("Checkpoint {checkpoint} not found"),
    );
    log::error!("{}", e);
    e
}
