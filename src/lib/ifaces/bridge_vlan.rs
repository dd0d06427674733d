// SPDX-License-Identifier: Apache-2.0

use std::collections::{hash_map::Entry, HashMap};
use std::convert::TryFrom;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ErrorKind, NetstateError};

const VLAN_ID_MAX: u16 = 4094;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// VLAN filtering of a bridge port, shared by linux bridge and OVS bridge.
/// ```yml
/// vlan:
///   mode: trunk
///   enable-native: true
///   tag: 100
///   trunk-tags:
///   - id: 101
///   - id-range:
///       min: 200
///       max: 299
/// ```
pub struct BridgePortVlanConfig {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub enable_native: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<BridgePortVlanMode>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    /// Access tag, or native VLAN in trunk mode. Tag 0 is valid for
    /// OVS access port.
    pub tag: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk_tags: Option<Vec<BridgePortTrunkTag>>,
}

impl BridgePortVlanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &mut self,
        port_name: &str,
    ) -> Result<(), NetstateError> {
        let err_msg = if self.mode == Some(BridgePortVlanMode::Trunk)
            && self.tag.is_some()
            && self.tag != Some(0)
            && self.enable_native != Some(true)
        {
            Some(
                "VLAN `tag` cannot be used in trunk mode without \
                `enable-native`",
            )
        } else if self.mode == Some(BridgePortVlanMode::Access)
            && self.enable_native == Some(true)
        {
            Some("VLAN `enable-native: true` cannot be set in access mode")
        } else if self.mode == Some(BridgePortVlanMode::Access)
            && self.trunk_tags.as_ref().map(|t| !t.is_empty()) == Some(true)
        {
            Some("VLAN access mode cannot have trunk-tags defined")
        } else if self.mode == Some(BridgePortVlanMode::Trunk)
            && self.trunk_tags.as_ref().map(|t| t.is_empty()) != Some(false)
        {
            Some("VLAN trunk mode cannot have empty trunk-tags")
        } else if self.tag.map(|t| t > VLAN_ID_MAX) == Some(true) {
            Some("VLAN tag should be in the range of [0, 4094]")
        } else {
            None
        };
        if let Some(msg) = err_msg {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!("{msg}, port {port_name}"),
            );
            log::error!("{}", e);
            return Err(e);
        }
        if let Some(tags) = self.trunk_tags.as_ref() {
            if self.mode.is_none() {
                self.mode = Some(BridgePortVlanMode::Trunk);
            }
            validate_trunk_tags(port_name, tags)?;
        }
        Ok(())
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(tags) = self.trunk_tags.as_mut() {
            tags.sort_unstable_by_key(|t| t.get_vlan_tag_range());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum BridgePortVlanMode {
    /// Deserialize and serialize from/to `trunk`.
    Trunk,
    /// Deserialize and serialize from/to `access`.
    #[default]
    Access,
}

impl std::fmt::Display for BridgePortVlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Trunk => "trunk",
                Self::Access => "access",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// Trunk tag entry, either single VLAN ID or a range.
pub enum BridgePortTrunkTag {
    /// Serialize and deserialize from/to `id`.
    Id(u16),
    /// Serialize and deserialize from/to `id-range`.
    IdRange(BridgePortVlanRange),
}

impl std::fmt::Display for BridgePortTrunkTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(d) => write!(f, "id={d}"),
            Self::IdRange(range) => {
                write!(f, "id-range=[{},{}]", range.min, range.max)
            }
        }
    }
}

impl<'de> Deserialize<'de> for BridgePortTrunkTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        if let Some(id) = v.get("id") {
            if let Some(id) = id.as_str() {
                Ok(Self::Id(id.parse::<u16>().map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Failed to parse trunk tag id {id} as u16: {e}"
                    ))
                })?))
            } else if let Some(id) = id.as_u64() {
                Ok(Self::Id(u16::try_from(id).map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Failed to parse trunk tag id {id} as u16: {e}"
                    ))
                })?))
            } else {
                Err(serde::de::Error::custom(format!(
                    "The id of trunk tag should be unsigned 16 bits \
                    integer, but got {v}"
                )))
            }
        } else if let Some(id_range) = v.get("id-range") {
            Ok(Self::IdRange(
                BridgePortVlanRange::deserialize(id_range)
                    .map_err(serde::de::Error::custom)?,
            ))
        } else {
            Err(serde::de::Error::custom(format!(
                "Trunk tag only support 'id' or 'id-range', but got {v}"
            )))
        }
    }
}

impl BridgePortTrunkTag {
    pub fn get_vlan_tag_range(&self) -> (u16, u16) {
        match self {
            Self::Id(min) => (*min, *min),
            Self::IdRange(range) => (range.min, range.max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
pub struct BridgePortVlanRange {
    #[serde(deserialize_with = "crate::deserializer::u16_or_string")]
    pub max: u16,
    #[serde(deserialize_with = "crate::deserializer::u16_or_string")]
    pub min: u16,
}

fn validate_trunk_tags(
    port_name: &str,
    tags: &[BridgePortTrunkTag],
) -> Result<(), NetstateError> {
    let mut found: HashMap<u16, &BridgePortTrunkTag> = HashMap::new();
    for tag in tags {
        let (min, max) = tag.get_vlan_tag_range();
        if min > max || max > VLAN_ID_MAX {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Invalid trunk tag {tag} of port {port_name}, VLAN ID \
                    should be in the range of [0, {VLAN_ID_MAX}] with \
                    min <= max"
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        for vid in min..=max {
            match found.entry(vid) {
                Entry::Occupied(o) => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Trunk tag {tag} of port {port_name} is \
                            overlapping with other tag {}",
                            o.get()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                Entry::Vacant(v) => {
                    v.insert(tag);
                }
            }
        }
    }
    Ok(())
}
