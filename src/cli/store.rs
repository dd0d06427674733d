// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::{Path, PathBuf};

use netstate::{MemoryProvider, MemorySnapshot, NetstateProvider};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreContent {
    // Checkpoint id with the UNIX time it was first seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checkpoint_created: Option<(String, i64)>,
    #[serde(default)]
    snapshot: MemorySnapshot,
}

/// Keeps the network state of [MemoryProvider] in a JSON file so that
/// checkpoints survive between invocations.
#[derive(Debug)]
pub(crate) struct ProviderStore {
    path: PathBuf,
    checkpoint_created: Option<(String, i64)>,
}

impl ProviderStore {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            checkpoint_created: None,
        }
    }

    pub(crate) fn load(&mut self) -> Result<MemoryProvider, CliError> {
        self.load_at(chrono::Utc::now().timestamp())
    }

    fn load_at(&mut self, now: i64) -> Result<MemoryProvider, CliError> {
        if !self.path.exists() {
            log::debug!(
                "State file {} not found, starting from empty state",
                self.path.display()
            );
            return Ok(MemoryProvider::new());
        }
        let content: StoreContent =
            serde_json::from_str(&std::fs::read_to_string(&self.path)?)
                .map_err(|e| {
                    CliError::from(format!(
                        "Corrupted state file {}: {e}",
                        self.path.display()
                    ))
                })?;
        let mut provider = MemoryProvider::from_snapshot(&content.snapshot);
        self.checkpoint_created = content.checkpoint_created;

        if let Some(checkpoint) = content.snapshot.checkpoint.as_ref() {
            let created = match self.checkpoint_created.as_ref() {
                Some((id, created)) if id == &checkpoint.id => *created,
                _ => now,
            };
            if now >= created + i64::from(checkpoint.timeout) {
                log::warn!(
                    "Checkpoint {} expired after {} seconds, rolling back",
                    checkpoint.id,
                    checkpoint.timeout
                );
                provider.rollback_checkpoint(&checkpoint.id)?;
                self.save_at(&provider, now)?;
            }
        }
        Ok(provider)
    }

    pub(crate) fn save(
        &mut self,
        provider: &MemoryProvider,
    ) -> Result<(), CliError> {
        self.save_at(provider, chrono::Utc::now().timestamp())
    }

    fn save_at(
        &mut self,
        provider: &MemoryProvider,
        now: i64,
    ) -> Result<(), CliError> {
        self.checkpoint_created = match provider.last_checkpoint() {
            Some(id) => match self.checkpoint_created.take() {
                Some((old_id, created)) if old_id == id => Some((id, created)),
                _ => Some((id, now)),
            },
            None => None,
        };
        let content = StoreContent {
            checkpoint_created: self.checkpoint_created.clone(),
            snapshot: provider.snapshot(),
        };
        write_file_atomic(&self.path, &serde_json::to_string(&content)?)?;
        log::debug!("State saved to {}", self.path.display());
        Ok(())
    }
}

fn write_file_atomic(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
    let mut fd = std::fs::File::create(&tmp_path)?;
    fd.write_all(content.as_bytes())?;
    fd.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
