// SPDX-License-Identifier: Apache-2.0

use crate::{
    ovn::MergedOvnConfiguration, state::verify_json, NetstateError,
    OvnConfiguration,
};

impl MergedOvnConfiguration {
    // Mappings are compared as a whole, sorted by localnet.
    pub(crate) fn verify(
        &self,
        current: &OvnConfiguration,
    ) -> Result<(), NetstateError> {
        if !self.is_changed() {
            return Ok(());
        }
        let mut cur_maps: Vec<_> = current
            .bridge_mappings
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|m| !m.is_absent())
            .cloned()
            .collect();
        cur_maps.sort_unstable();
        let current = OvnConfiguration {
            bridge_mappings: Some(cur_maps),
        };
        verify_json("ovn", &self.merged, &current)
    }

    pub(crate) fn gen_diff(&self) -> OvnConfiguration {
        if self.is_changed() {
            self.desired.clone()
        } else {
            OvnConfiguration::default()
        }
    }
}
