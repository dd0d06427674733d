// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    memory::{MemoryCheckpoint, MemoryProvider},
    NetworkState,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
/// Serializable image of a [MemoryProvider], allowing the simulated network
/// state and its pending checkpoint to outlive the process.
pub struct MemorySnapshot {
    pub state: NetworkState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<MemoryCheckpointSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct MemoryCheckpointSnapshot {
    pub id: String,
    pub timeout: u32,
    pub state: NetworkState,
}

impl MemoryProvider {
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            state: self.state.to_net_state(true),
            checkpoint: self.checkpoint.as_ref().map(|c| {
                MemoryCheckpointSnapshot {
                    id: c.id.clone(),
                    timeout: c.timeout,
                    state: c.snapshot.to_net_state(true),
                }
            }),
        }
    }

    /// Restore provider from [MemorySnapshot]. Capabilities are reset to
    /// default.
    pub fn from_snapshot(snapshot: &MemorySnapshot) -> Self {
        let mut ret = Self::new_with_state(&snapshot.state);
        ret.checkpoint = snapshot.checkpoint.as_ref().map(|c| MemoryCheckpoint {
            id: c.id.clone(),
            timeout: c.timeout,
            snapshot: Self::new_with_state(&c.state).state,
        });
        ret
    }
}
