// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, ErrorKind, Interface, InterfaceType, MergedInterface,
    NetstateError,
};

const PKEY_DEFAULT: u16 = 0xffff;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// IP over InfiniBand interface. The partition child interface is named as
/// `<base-iface>.<pkey in 4 lower case hex digits>`. The example yaml
/// output of [crate::NetworkState] with IPoIB partition interface would be:
/// ```yml
/// interfaces:
/// - name: ib0.8001
///   type: infiniband
///   state: up
///   infiniband:
///     base-iface: ib0
///     mode: datagram
///     pkey: '0x8001'
/// ```
pub struct InfiniBandInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none", rename = "infiniband")]
    pub ib: Option<InfiniBandConfig>,
}

impl Default for InfiniBandInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::InfiniBand;
        Self { base, ib: None }
    }
}

impl InfiniBandInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.ib
            .as_ref()
            .filter(|cfg| cfg.is_partition())
            .and_then(|cfg| cfg.base_iface.as_deref())
            .filter(|b| !b.is_empty())
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        let name_parts = parse_partition_name(self.base.name.as_str());
        let ib_conf = match self.ib.as_mut() {
            Some(c) => c,
            None => {
                if let Some((base_iface, pkey)) = name_parts {
                    self.ib = Some(InfiniBandConfig {
                        mode: InfiniBandMode::default(),
                        base_iface: Some(base_iface.to_string()),
                        pkey: Some(pkey),
                    });
                }
                return Ok(());
            }
        };

        if ib_conf.pkey == Some(0) {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "InfiniBand pkey of interface {} should be in range \
                    of [1, {PKEY_DEFAULT:#x}], got 0",
                    self.base.name
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }

        if ib_conf.pkey.is_none() {
            if let Some((_, pkey)) = name_parts {
                ib_conf.pkey = Some(pkey);
            }
        }

        if ib_conf.is_partition() {
            if ib_conf.base_iface.as_deref().unwrap_or_default().is_empty() {
                match name_parts {
                    Some((base_iface, _)) => {
                        ib_conf.base_iface = Some(base_iface.to_string());
                    }
                    None if is_desired => {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "InfiniBand partition interface {} requires \
                                base-iface or name in the form of \
                                <base-iface>.<pkey>",
                                self.base.name
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                    None => (),
                }
            }
        } else {
            ib_conf.base_iface = None;
            ib_conf.pkey = None;
        }
        Ok(())
    }
}

// Split IPoIB partition name `ib0.8001` into (`ib0`, 0x8001).
pub(crate) fn parse_partition_name(name: &str) -> Option<(&str, u16)> {
    let (base_iface, pkey) = name.rsplit_once('.')?;
    if base_iface.is_empty() || pkey.len() != 4 {
        return None;
    }
    match u16::from_str_radix(pkey, 16) {
        Ok(p) if p != 0 && p != PKEY_DEFAULT => Some((base_iface, p)),
        _ => None,
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum InfiniBandMode {
    /// Deserialize and serialize from/to `datagram`.
    #[default]
    Datagram,
    /// Deserialize and serialize from/to `connected`.
    Connected,
}

impl std::fmt::Display for InfiniBandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InfiniBandMode::Datagram => "datagram",
                InfiniBandMode::Connected => "connected",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct InfiniBandConfig {
    #[serde(default)]
    pub mode: InfiniBandMode,
    #[serde(
        skip_serializing_if = "crate::serializer::is_option_string_empty",
        default
    )]
    /// Only meaningful for partition child interface.
    pub base_iface: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::serializer::option_u16_as_hex",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    /// Partition key. `0xffff` or undefined means the base interface
    /// itself. Accepting integer or hex string like `0x8001`.
    pub pkey: Option<u16>,
}

impl InfiniBandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_partition(&self) -> bool {
        matches!(self.pkey, Some(p) if p != PKEY_DEFAULT)
    }
}

impl MergedInterface {
    // IPoIB cannot be attached to bridge, and only to bond in active-backup
    // mode.
    pub(crate) fn validate_infiniband_as_port(
        &self,
        ctrl: &Interface,
    ) -> Result<(), NetstateError> {
        if self.merged.iface_type() != InterfaceType::InfiniBand {
            return Ok(());
        }
        let allowed = match ctrl {
            Interface::Bond(bond) => {
                bond.mode() == Some(crate::BondMode::ActiveBackup)
            }
            Interface::LinuxBridge(_) | Interface::OvsBridge(_) => false,
            _ => true,
        };
        if !allowed {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "InfiniBand interface {} cannot be port of {} {}, only \
                    allowed as port of bond in active-backup mode",
                    self.merged.name(),
                    ctrl.iface_type(),
                    ctrl.name()
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }
}
