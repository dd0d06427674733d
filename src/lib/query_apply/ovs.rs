// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap};

use crate::{
    ovs::MergedOvsDbGlobalConfig, state::verify_json_value, NetstateError,
    OvsDbGlobalConfig,
};

impl MergedOvsDbGlobalConfig {
    // The merged config holds the full key set expected after apply, so
    // keys removed by `null` must be gone from current as well.
    pub(crate) fn verify(
        &self,
        current: Option<&OvsDbGlobalConfig>,
    ) -> Result<(), NetstateError> {
        if !self.is_changed {
            return Ok(());
        }
        let empty = OvsDbGlobalConfig::default();
        let current = current.unwrap_or(&empty);
        for (section, desired, current) in [
            (
                "ovs-db.external_ids",
                &self.external_ids,
                current.external_ids.as_ref(),
            ),
            (
                "ovs-db.other_config",
                &self.other_config,
                current.other_config.as_ref(),
            ),
        ] {
            let desired_value = serde_json::to_value(to_ordered_map(Some(
                desired,
            )))?;
            let current_value =
                serde_json::to_value(to_ordered_map(current))?;
            if desired_value != current_value {
                verify_json_value(section, &desired_value, &current_value)?;
                // Current holds keys which should be removed
                verify_json_value(section, &current_value, &desired_value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn gen_diff(&self) -> Option<OvsDbGlobalConfig> {
        if self.is_changed {
            self.desired.clone()
        } else {
            None
        }
    }
}

fn to_ordered_map(
    map: Option<&HashMap<String, Option<String>>>,
) -> BTreeMap<&str, &str> {
    let mut ret = BTreeMap::new();
    for (k, v) in map.into_iter().flatten() {
        if let Some(v) = v {
            ret.insert(k.as_str(), v.as_str());
        }
    }
    ret
}
