// SPDX-License-Identifier: Apache-2.0

//! Vocabulary of the state document: the keys, enumerated values and
//! numeric/named mappings, loaded once from the embedded YAML file.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use serde::Deserialize;
use serde_json::Value;

use crate::{ErrorKind, NetstateError};

const VOCABULARY_YAML: &str = include_str!("schema/vocabulary.yml");

const SECTION_INTERFACE: &str = "interface";

static SCHEMA: OnceLock<Result<Schema, NetstateError>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DeprecatedKey {
    pub section: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct Schema {
    pub version: String,
    pub top_level_keys: Vec<String>,
    pub interface_types: Vec<String>,
    #[serde(default)]
    pub interface_type_aliases: HashMap<String, String>,
    pub interface_states: Vec<String>,
    #[serde(default)]
    pub deprecated_keys: Vec<DeprecatedKey>,
    pub bond_modes: Vec<String>,
    #[serde(default)]
    pub bond_mode_aliases: HashMap<String, String>,
    pub bond_option_names: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub ethtool_feature_aliases: HashMap<String, String>,
    #[serde(skip)]
    warned_keys: Mutex<HashSet<String>>,
}

/// The process wide vocabulary.
pub fn schema() -> Result<&'static Schema, NetstateError> {
    SCHEMA
        .get_or_init(|| {
            serde_yaml::from_str::<Schema>(VOCABULARY_YAML).map_err(|e| {
                NetstateError::new(
                    ErrorKind::Bug,
                    format!("Failed to load embedded vocabulary: {e}"),
                )
            })
        })
        .as_ref()
        .map_err(|e| e.clone())
}

impl Schema {
    pub fn is_top_level_key(&self, key: &str) -> bool {
        self.top_level_keys.iter().any(|k| k == key)
    }

    pub fn is_known_iface_type(&self, iface_type: &str) -> bool {
        self.interface_types.iter().any(|t| t == iface_type)
            || self.interface_type_aliases.contains_key(iface_type)
    }

    /// Resolve alias of interface type, e.g. `macvlan` to `mac-vlan`.
    pub fn canonical_iface_type<'a>(&'a self, iface_type: &'a str) -> &'a str {
        self.interface_type_aliases
            .get(iface_type)
            .map(|s| s.as_str())
            .unwrap_or(iface_type)
    }

    /// Map numeric or alias form of bond mode to its canonical name.
    pub fn bond_mode_name<'a>(&'a self, mode: &'a str) -> Option<&'a str> {
        if let Some(name) = self.bond_modes.iter().find(|m| m.as_str() == mode)
        {
            return Some(name.as_str());
        }
        if let Some(name) = self.bond_mode_aliases.get(mode) {
            return Some(name.as_str());
        }
        mode.parse::<usize>()
            .ok()
            .and_then(|i| self.bond_modes.get(i))
            .map(|s| s.as_str())
    }

    /// For bond option holding both numeric and named form, return the
    /// named form. Return None if option has no mapping table or value is
    /// out of range.
    pub fn bond_option_name<'a>(
        &'a self,
        option: &str,
        value: &'a str,
    ) -> Option<&'a str> {
        let names = self.bond_option_names.get(option)?;
        if let Some(name) = names.iter().find(|n| n.as_str() == value) {
            return Some(name.as_str());
        }
        value
            .parse::<usize>()
            .ok()
            .and_then(|i| names.get(i))
            .map(|s| s.as_str())
    }

    /// Numeric form of named bond option.
    pub fn bond_option_index(&self, option: &str, name: &str) -> Option<usize> {
        self.bond_option_names
            .get(option)
            .and_then(|names| names.iter().position(|n| n == name))
    }

    /// Kernel name of ethtool feature, e.g. `gro` to `rx-gro`.
    pub fn ethtool_feature_name<'a>(&'a self, feature: &'a str) -> &'a str {
        self.ethtool_feature_aliases
            .get(feature)
            .map(|s| s.as_str())
            .unwrap_or(feature)
    }

    pub(crate) fn warn_deprecated_once(&self, section: &str, key: &str) {
        let full = format!("{section}.{key}");
        let mut warned = match self.warned_keys.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if warned.insert(full) {
            if let Some(dep) = self
                .deprecated_keys
                .iter()
                .find(|d| d.section == section && d.old == key)
            {
                log::warn!(
                    "Key '{}' in '{}' is deprecated, please use '{}' instead",
                    dep.old,
                    dep.section,
                    dep.new
                );
            }
        }
    }

    /// Rename deprecated keys of a single interface in raw form.
    pub(crate) fn normalize_iface_value(&self, iface: &mut Value) {
        if let Some(obj) = iface.as_object_mut() {
            for dep in self.deprecated_keys.iter() {
                let section = if dep.section == SECTION_INTERFACE {
                    Some(&mut *obj)
                } else {
                    obj.get_mut(dep.section.as_str())
                        .and_then(|v| v.as_object_mut())
                };
                if let Some(section) = section {
                    if let Some(old_value) = section.remove(dep.old.as_str()) {
                        self.warn_deprecated_once(&dep.section, &dep.old);
                        if !section.contains_key(dep.new.as_str()) {
                            section.insert(dep.new.clone(), old_value);
                        }
                    }
                }
            }
        }
    }

    /// Reject interface whose `type` or `state` is not in the vocabulary.
    pub(crate) fn validate_iface_value(
        &self,
        iface: &Value,
    ) -> Result<(), NetstateError> {
        let name = iface.get("name").and_then(Value::as_str).unwrap_or("");
        if let Some(iface_type) = iface.get("type").and_then(Value::as_str) {
            if !self.is_known_iface_type(iface_type) {
                return Err(invalid_value(
                    name,
                    "type",
                    iface_type,
                    &self.interface_types,
                ));
            }
        }
        if let Some(state) = iface.get("state").and_then(Value::as_str) {
            if !self.interface_states.iter().any(|s| s == state) {
                return Err(invalid_value(
                    name,
                    "state",
                    state,
                    &self.interface_states,
                ));
            }
        }
        Ok(())
    }

    /// Reject keys not defined at top level of the state document.
    pub(crate) fn validate_top_level(
        &self,
        state: &serde_json::Map<String, Value>,
    ) -> Result<(), NetstateError> {
        for key in state.keys() {
            if !self.is_top_level_key(key) {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Unknown top level key '{key}', supported keys are: {}",
                        self.top_level_keys.join(", ")
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}

fn invalid_value(
    iface_name: &str,
    key: &str,
    value: &str,
    supported: &[String],
) -> NetstateError {
    let e = NetstateError::new(
        ErrorKind::InvalidArgument,
        format!(
            "Unsupported interface {key} '{value}' for interface \
            '{iface_name}', supported: {}",
            supported.join(", ")
        ),
    );
    log::error!("{}", e);
    e
}

/// Canonical named form of bond option value. Used during deserialize of
/// bond enum options.
pub(crate) fn bond_option_to_name(option: &str, value: &str) -> String {
    match schema() {
        Ok(s) => s
            .bond_option_name(option, value)
            .map(|v| v.to_string())
            .unwrap_or_else(|| value.to_string()),
        Err(e) => {
            log::error!("{}", e);
            value.to_string()
        }
    }
}
