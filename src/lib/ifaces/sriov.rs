// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetstateError};

pub(crate) const SRIOV_VF_NAMING_PREFIX: &str = "sriov:";
const SRIOV_VF_NAMING_SEPARATOR: char = ':';
const VLAN_ID_MAX: u32 = 4094;
const VF_QOS_MAX: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Single Root I/O Virtualization(SRIOV) configuration. The example yaml
/// output of [crate::NetworkState] with SR-IOV enabled ethernet interface
/// would be:
/// ```yml
/// interfaces:
/// - name: ens1f1
///   type: ethernet
///   state: up
///   ethernet:
///     sr-iov:
///       total-vfs: 2
///       vfs:
///       - id: 0
///         mac-address: 92:DC:96:D4:66:CC
///         spoof-check: true
///         trust: false
///         min-tx-rate: 0
///         max-tx-rate: 0
///         vlan-id: 0
///         qos: 0
///       - id: 1
///         mac-address: 1E:2C:0B:94:A8:7B
/// ```
pub struct SrIovConfig {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Whether kernel loads the VF driver automatically.
    pub drivers_autoprobe: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// The number of VFs enabled on PF.
    pub total_vfs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// VF specific configurations.
    /// * Setting to `Some(Vec::new())` will revert all VF configurations back
    ///   to defaults.
    /// * If not empty, missing [SrIovVfConfig] will use current configuration.
    pub vfs: Option<Vec<SrIovVfConfig>>,
}

impl SrIovConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sriov_is_enabled(&self) -> bool {
        matches!(self.total_vfs, Some(i) if i > 0)
    }

    pub(crate) fn sanitize(
        &mut self,
        pf_name: &str,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        for vf in self.vfs.as_deref_mut().unwrap_or_default() {
            vf.sanitize(pf_name, is_desired)?;
        }
        Ok(())
    }

    // VF list is merged by VF ID: VF not mentioned in desired keeps current
    // settings, VF mentioned gets desired properties merged over current.
    // Inherited VFs beyond a changed `total-vfs` vanish along with it.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        let des_vfs = desired.vfs.as_deref().unwrap_or_default();
        if !des_vfs.is_empty() {
            let mut merged_vfs: Vec<SrIovVfConfig> =
                current.vfs.as_deref().unwrap_or_default().to_vec();
            for des_vf in des_vfs {
                match merged_vfs.iter_mut().find(|v| v.id == des_vf.id) {
                    Some(merged_vf) => merged_vf.merge(des_vf),
                    None => merged_vfs.push(des_vf.clone()),
                }
            }
            merged_vfs.sort_unstable_by_key(|v| v.id);
            self.vfs = Some(merged_vfs);
        }

        if let Some(total_vfs) = desired.total_vfs {
            if current.total_vfs != Some(total_vfs) {
                if let Some(vfs) = self.vfs.as_mut() {
                    vfs.retain(|vf| {
                        vf.id < total_vfs
                            || des_vfs.iter().any(|d| d.id == vf.id)
                    });
                }
            }
        }
    }

    pub(crate) fn validate_vf_ids(
        &self,
        pf_name: &str,
    ) -> Result<(), NetstateError> {
        if let Some(total_vfs) = self.total_vfs {
            for vf in self.vfs.as_deref().unwrap_or_default() {
                if vf.id >= total_vfs {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "VF ID {} of PF {pf_name} is out of range, \
                            total-vfs is {total_vfs}",
                            vf.id
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // Ignore 'vfs: []' which is just reverting all VF config to default.
    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(vfs) = self.vfs.as_mut() {
            for vf in vfs.iter_mut() {
                if let Some(address) = vf.mac_address.as_mut() {
                    address.make_ascii_uppercase()
                }
                vf.iface_name = None;
            }
            if vfs.is_empty() {
                self.vfs = None;
            } else {
                vfs.sort_unstable_by_key(|v| v.id);
            }
        }
    }

    pub(crate) fn get_vf_iface_name(&self, vf_id: u32) -> Option<&str> {
        self.vfs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|v| v.id == vf_id)
            .and_then(|v| v.iface_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct SrIovVfConfig {
    #[serde(deserialize_with = "crate::deserializer::u32_or_string")]
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Interface name of this VF, only for query.
    pub iface_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub spoof_check: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub trust: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub min_tx_rate: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub max_tx_rate: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub vlan_id: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub qos: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_proto: Option<SrIovVfVlanProto>,
}

impl SrIovVfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn sanitize(
        &mut self,
        pf_name: &str,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(mac) = self.mac_address.as_mut() {
            mac.make_ascii_uppercase();
        }
        if !is_desired {
            return Ok(());
        }
        self.iface_name = None;
        if let Some(vlan_id) = self.vlan_id {
            if vlan_id > VLAN_ID_MAX {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "VF {} of PF {pf_name} has invalid vlan-id \
                        {vlan_id}, should be in range [0, {VLAN_ID_MAX}]",
                        self.id
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        if let Some(qos) = self.qos {
            if qos > VF_QOS_MAX {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "VF {} of PF {pf_name} has invalid qos {qos}, \
                        should be in range [0, {VF_QOS_MAX}]",
                        self.id
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        if let (Some(min), Some(max)) = (self.min_tx_rate, self.max_tx_rate) {
            if max != 0 && min > max {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "VF {} of PF {pf_name} has min-tx-rate {min} \
                        bigger than max-tx-rate {max}",
                        self.id
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn merge(&mut self, desired: &Self) {
        macro_rules! take_desired {
            ($($field:ident),*) => {
                $(
                    if desired.$field.is_some() {
                        self.$field.clone_from(&desired.$field);
                    }
                )*
            };
        }
        take_desired!(
            mac_address,
            spoof_check,
            trust,
            min_tx_rate,
            max_tx_rate,
            vlan_id,
            qos,
            vlan_proto
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SrIovVfVlanProto {
    #[serde(rename = "802.1q")]
    Ieee8021Q,
    #[serde(rename = "802.1ad")]
    Ieee8021Ad,
}

/// Parse `sriov:<pf>:<vf_id>` into PF name and VF ID.
/// Return None if not in that form.
pub(crate) fn parse_sriov_vf_naming(
    iface_name: &str,
) -> Result<Option<(&str, u32)>, NetstateError> {
    if let Some(rest) = iface_name.strip_prefix(SRIOV_VF_NAMING_PREFIX) {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Invalid SR-IOV VF name {iface_name}, should be in the \
                form of `{SRIOV_VF_NAMING_PREFIX}<pf_name>\
                {SRIOV_VF_NAMING_SEPARATOR}<vf_id>`"
            ),
        );
        match rest.split_once(SRIOV_VF_NAMING_SEPARATOR) {
            Some((pf_name, vf_id)) if !pf_name.is_empty() => {
                match vf_id.parse::<u32>() {
                    Ok(vf_id) => Ok(Some((pf_name, vf_id))),
                    Err(_) => {
                        log::error!("{}", e);
                        Err(e)
                    }
                }
            }
            _ => {
                log::error!("{}", e);
                Err(e)
            }
        }
    } else {
        Ok(None)
    }
}
