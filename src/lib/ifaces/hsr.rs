// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, ErrorKind, InterfaceType, NetstateError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// High-availability Seamless Redundancy (IEC 62439-3) device duplicating
/// every frame over two ports.
/// ```yaml
/// interfaces:
/// - name: hsr0
///   type: hsr
///   state: up
///   hsr:
///     port1: eth1
///     port2: eth2
///     multicast-spec: 40
///     protocol: prp
/// ```
pub struct HsrInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsr: Option<HsrConfig>,
}

impl Default for HsrInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::Hsr,
                ..BaseInterface::new()
            },
            hsr: None,
        }
    }
}

impl HsrInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        match self.hsr.as_mut() {
            Some(conf) => conf.sanitize(&self.base.name, is_desired),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct HsrConfig {
    pub port1: String,
    pub port2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Source MAC of supervision frames, reported by kernel only.
    pub supervision_address: Option<String>,
    #[serde(deserialize_with = "crate::deserializer::u8_or_string")]
    /// Last byte of the supervision multicast address.
    pub multicast_spec: u8,
    pub protocol: HsrProtocol,
}

impl HsrConfig {
    fn sanitize(
        &mut self,
        iface_name: &str,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if !is_desired {
            if let Some(address) = self.supervision_address.as_mut() {
                address.make_ascii_uppercase();
            }
            return Ok(());
        }
        if self.supervision_address.take().is_some() {
            log::warn!(
                "Ignoring read-only supervision-address of HSR interface \
                {iface_name}"
            );
        }
        if self.port1 != self.port2 {
            return Ok(());
        }
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "HSR interface {iface_name} cannot use {} as both port1 \
                and port2",
                self.port1
            ),
        );
        log::error!("{}", e);
        Err(e)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum HsrProtocol {
    #[default]
    Hsr,
    /// Parallel Redundancy Protocol.
    Prp,
}
