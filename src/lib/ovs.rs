// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{ovn::MergedOvnConfiguration, ErrorKind, NetstateError};

// Key of OVS database section. `None` value removes the key on apply.
type OvsDbMap = HashMap<String, Option<String>>;

const EXTERNAL_IDS: &str = "external_ids";
const OTHER_CONFIG: &str = "other_config";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
/// The `ovs-db` top level section: global `external_ids` and
/// `other_config` of the OpenvSwitch database.
///
/// On apply, the keys are merged into current ones. A `null` value
/// removes the key, an empty section removes every key of that section
/// and `ovs-db: {}` removes both sections. OVN bridge mappings are managed
/// by the `ovn` section and cannot be set here.
/// ```yml
/// ovs-db:
///   external_ids:
///     hostname: host.example.org
///     obsolete-key: null
///   other_config:
///     stats-update-interval: "10000"
/// ```
pub struct OvsDbGlobalConfig {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_sorted"
    )]
    pub external_ids: Option<HashMap<String, Option<String>>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_sorted"
    )]
    pub other_config: Option<HashMap<String, Option<String>>>,
}

impl<'de> Deserialize<'de> for OvsDbGlobalConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (external_ids, other_config) =
            parse_sections::<D::Error>(Value::deserialize(deserializer)?)?;
        Ok(Self {
            external_ids,
            other_config,
        })
    }
}

impl OvsDbGlobalConfig {
    pub(crate) const OVN_BRIDGE_MAPPINGS_KEY: &'static str =
        "ovn-bridge-mappings";

    // `ovs-db: {}` purges everything except OVN mappings.
    pub(crate) fn is_purge(&self) -> bool {
        self.is_none()
    }

    pub fn is_none(&self) -> bool {
        self.external_ids.is_none() && self.other_config.is_none()
    }

    pub(crate) fn sanitize(&self) -> Result<(), NetstateError> {
        let has_ovn_key = self
            .external_ids
            .as_ref()
            .map(|ids| ids.contains_key(Self::OVN_BRIDGE_MAPPINGS_KEY))
            .unwrap_or_default();
        if !has_ovn_key {
            return Ok(());
        }
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Key {} of ovs-db external_ids is managed by the `ovn` \
                section",
                Self::OVN_BRIDGE_MAPPINGS_KEY
            ),
        );
        log::error!("{}", e);
        Err(e)
    }
}

fn serialize_sorted<S>(map: &Option<OvsDbMap>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match map {
        Some(map) => map.iter().collect::<BTreeMap<_, _>>().serialize(s),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
/// The `ovs-db` section of an interface or OVS bridge port. Unlike the
/// global one, a defined section replaces the current one as a whole.
/// Refer to `ovs-vswitchd.conf.db(5)` for supported keys.
pub struct OvsDbIfaceConfig {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_sorted"
    )]
    pub external_ids: Option<HashMap<String, Option<String>>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_sorted"
    )]
    pub other_config: Option<HashMap<String, Option<String>>>,
}

impl OvsDbIfaceConfig {
    // `null` values only instruct removal, current never holds them.
    pub(crate) fn pre_verify_cleanup(&mut self) {
        for section in [&mut self.external_ids, &mut self.other_config] {
            if let Some(map) = section {
                map.retain(|_, v| v.is_some());
            }
        }
    }
}

impl<'de> Deserialize<'de> for OvsDbIfaceConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (external_ids, other_config) =
            parse_sections::<D::Error>(Value::deserialize(deserializer)?)?;
        Ok(Self {
            external_ids,
            other_config,
        })
    }
}

// Values are stored as string in OVS database, numbers and booleans are
// converted.
fn parse_sections<E>(
    value: Value,
) -> Result<(Option<OvsDbMap>, Option<OvsDbMap>), E>
where
    E: serde::de::Error,
{
    let mut sections = match value {
        Value::Object(sections) => sections,
        Value::Null => return Ok((None, None)),
        v => {
            return Err(E::custom(format!(
                "Expecting map for ovs-db, but got {v}"
            )))
        }
    };
    let external_ids = sections.remove(EXTERNAL_IDS).map(to_ovsdb_map);
    let other_config = sections.remove(OTHER_CONFIG).map(to_ovsdb_map);
    if !sections.is_empty() {
        let unknown: Vec<&str> = sections.keys().map(String::as_str).collect();
        return Err(E::custom(format!(
            "Unsupported ovs-db section '{}', only {EXTERNAL_IDS} and \
            {OTHER_CONFIG} are allowed",
            unknown.join(", ")
        )));
    }
    Ok((external_ids, other_config))
}

fn to_ovsdb_map(section: Value) -> OvsDbMap {
    let entries = match section {
        Value::Object(entries) => entries,
        _ => return OvsDbMap::new(),
    };
    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
                _ => {
                    log::warn!("Ignoring ovs-db key {key} with value {value}");
                    return None;
                }
            };
            Some((key, value))
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedOvsDbGlobalConfig {
    pub(crate) desired: Option<OvsDbGlobalConfig>,
    pub(crate) current: OvsDbGlobalConfig,
    pub(crate) external_ids: HashMap<String, Option<String>>,
    pub(crate) other_config: HashMap<String, Option<String>>,
    pub(crate) is_changed: bool,
}

impl MergedOvsDbGlobalConfig {
    pub(crate) fn new(
        desired: Option<OvsDbGlobalConfig>,
        current: OvsDbGlobalConfig,
        merged_ovn: &MergedOvnConfiguration,
    ) -> Result<Self, NetstateError> {
        let mut cur_external_ids =
            current.external_ids.clone().unwrap_or_default();
        let cur_other_config = current.other_config.clone().unwrap_or_default();

        let (mut external_ids, other_config) = match desired.as_ref() {
            None => (cur_external_ids.clone(), cur_other_config.clone()),
            Some(des) if des.is_purge() => (OvsDbMap::new(), OvsDbMap::new()),
            Some(des) => {
                des.sanitize()?;
                (
                    merge_section(des.external_ids.as_ref(), &cur_external_ids),
                    merge_section(des.other_config.as_ref(), &cur_other_config),
                )
            }
        };

        let ovn_key = OvsDbGlobalConfig::OVN_BRIDGE_MAPPINGS_KEY;
        external_ids.remove(ovn_key);
        if let Some(mappings) = merged_ovn.to_ovsdb_external_id_value() {
            external_ids.insert(ovn_key.to_string(), Some(mappings));
        }
        if let Some(mappings) =
            merged_ovn.current.to_ovsdb_external_id_value()
        {
            cur_external_ids.insert(ovn_key.to_string(), Some(mappings));
        }

        let is_changed = cur_external_ids != external_ids
            || cur_other_config != other_config;
        Ok(Self {
            desired,
            current,
            external_ids,
            other_config,
            is_changed,
        })
    }

    /// The merged configuration to hand over to provider.
    pub(crate) fn to_config(&self) -> OvsDbGlobalConfig {
        OvsDbGlobalConfig {
            external_ids: Some(self.external_ids.clone()),
            other_config: Some(self.other_config.clone()),
        }
    }
}

// Section not mentioned is kept, empty section is purged, otherwise
// desired keys override current ones and `null` removes the key.
fn merge_section(desired: Option<&OvsDbMap>, current: &OvsDbMap) -> OvsDbMap {
    let desired = match desired {
        None => return current.clone(),
        Some(des) if des.is_empty() => return OvsDbMap::new(),
        Some(des) => des,
    };
    current
        .iter()
        .filter(|(key, _)| !desired.contains_key(key.as_str()))
        .chain(desired.iter())
        .filter(|(_, value)| value.is_some())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
