// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetstateError};

const MAPPINGS_SEPARATOR: char = ',';
const MAPPING_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
/// OVN bridge mappings stored in the `ovn-bridge-mappings` external id of
/// the OpenvSwitch database.
/// ```yml
/// ---
/// ovn:
///   bridge-mappings:
///   - localnet: tenantblue
///     bridge: ovsbr1
///   - localnet: tenantred
///     state: absent
/// ```
pub struct OvnConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_mappings: Option<Vec<OvnBridgeMapping>>,
}

impl OvnConfiguration {
    pub fn is_none(&self) -> bool {
        self.bridge_mappings.is_none()
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if let Some(maps) = self.bridge_mappings.as_deref_mut() {
            let mut seen: Vec<&str> = Vec::new();
            for map in maps.iter() {
                if seen.contains(&map.localnet.as_str()) {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Found duplicate `localnet` key {}",
                            map.localnet
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                seen.push(map.localnet.as_str());
            }
            for map in maps.iter_mut() {
                map.sanitize()?;
            }
        }
        Ok(())
    }

    /// Value of `ovn-bridge-mappings`: `localnet:bridge` pairs sorted by
    /// localnet joined by comma.
    pub(crate) fn to_ovsdb_external_id_value(&self) -> Option<String> {
        let pairs: BTreeMap<&str, &str> = self
            .bridge_mappings
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|m| !m.is_absent())
            .filter_map(|m| {
                m.bridge.as_deref().map(|br| (m.localnet.as_str(), br))
            })
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(
                pairs
                    .iter()
                    .map(|(localnet, br)| {
                        format!("{localnet}{MAPPING_SEPARATOR}{br}")
                    })
                    .collect::<Vec<String>>()
                    .join(&MAPPINGS_SEPARATOR.to_string()),
            )
        }
    }
}

impl TryFrom<&str> for OvnConfiguration {
    type Error = NetstateError;

    fn try_from(value: &str) -> Result<Self, NetstateError> {
        let mut maps: Vec<OvnBridgeMapping> = Vec::new();
        for item in value.split(MAPPINGS_SEPARATOR) {
            if !item.is_empty() {
                maps.push(OvnBridgeMapping::try_from(item)?);
            }
        }
        maps.sort_unstable();
        maps.dedup();
        Ok(Self {
            bridge_mappings: if maps.is_empty() { None } else { Some(maps) },
        })
    }
}

// OVN mappings are stored as a single `external_ids` entry of the global
// OVS database. The merged value is handed to `MergedOvsDbGlobalConfig`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedOvnConfiguration {
    pub(crate) desired: OvnConfiguration,
    pub(crate) current: OvnConfiguration,
    pub(crate) merged: OvnConfiguration,
}

impl MergedOvnConfiguration {
    // Partial editing:
    //  * Mapping of the same localnet in desired overrides current.
    //  * `state: absent` removes the mapping.
    //  * Unmentioned mappings of current are preserved.
    pub(crate) fn new(
        desired: OvnConfiguration,
        current: OvnConfiguration,
    ) -> Result<Self, NetstateError> {
        let mut desired = desired;
        desired.sanitize()?;

        let mut merged_maps: BTreeMap<String, String> = BTreeMap::new();
        for cur_map in current.bridge_mappings.as_deref().unwrap_or_default() {
            if let Some(br) = cur_map.bridge.as_ref() {
                merged_maps.insert(cur_map.localnet.clone(), br.clone());
            }
        }
        for des_map in desired.bridge_mappings.as_deref().unwrap_or_default() {
            if des_map.is_absent() {
                merged_maps.remove(des_map.localnet.as_str());
            } else if let Some(br) = des_map.bridge.as_ref() {
                merged_maps.insert(des_map.localnet.clone(), br.clone());
            }
        }
        let merged = OvnConfiguration {
            bridge_mappings: Some(
                merged_maps
                    .into_iter()
                    .map(|(localnet, bridge)| OvnBridgeMapping {
                        localnet,
                        bridge: Some(bridge),
                        state: None,
                    })
                    .collect(),
            ),
        };

        Ok(Self {
            desired,
            current,
            merged,
        })
    }

    pub(crate) fn is_changed(&self) -> bool {
        self.merged.to_ovsdb_external_id_value()
            != self.current.to_ovsdb_external_id_value()
    }

    pub(crate) fn to_ovsdb_external_id_value(&self) -> Option<String> {
        self.merged.to_ovsdb_external_id_value()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct OvnBridgeMapping {
    pub localnet: String,
    #[serde(skip_serializing)]
    /// When set to `state: absent`, will delete the existing
    /// `localnet` mapping.
    pub state: Option<OvnBridgeMappingState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
}

impl PartialOrd for OvnBridgeMapping {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OvnBridgeMapping {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl TryFrom<&str> for OvnBridgeMapping {
    type Error = NetstateError;

    fn try_from(value: &str) -> Result<Self, NetstateError> {
        match value.split_once(MAPPING_SEPARATOR) {
            Some((localnet, bridge))
                if !localnet.is_empty()
                    && !bridge.is_empty()
                    && !bridge.contains(MAPPING_SEPARATOR) =>
            {
                Ok(Self {
                    localnet: localnet.to_string(),
                    bridge: Some(bridge.to_string()),
                    state: None,
                })
            }
            _ => Err(NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Cannot convert {value} to OVN bridge mapping, \
                    expected format is `<localnet>{MAPPING_SEPARATOR}<bridge>`"
                ),
            )),
        }
    }
}

impl OvnBridgeMapping {
    pub(crate) fn is_absent(&self) -> bool {
        self.state == Some(OvnBridgeMappingState::Absent)
    }

    // Absent mappings sort first
    fn sort_key(&self) -> (bool, &str, Option<&str>) {
        (
            !self.is_absent(),
            self.localnet.as_str(),
            self.bridge.as_deref(),
        )
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if self.is_absent() {
            return Ok(());
        }
        self.state = None;
        if self.bridge.is_none() {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "mapping for `localnet` key {} missing the \
                    `bridge` attribute",
                    self.localnet
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
#[non_exhaustive]
pub enum OvnBridgeMappingState {
    Present,
    Absent,
}
