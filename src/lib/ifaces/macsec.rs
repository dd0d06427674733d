// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    state::PASSWORD_HID, BaseInterface, ErrorKind, InterfaceType,
    NetstateError,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// IEEE 802.1AE MACsec device on top of `base-iface`. When `mka-cak` and
/// `mka-ckn` are set, keys are negotiated through MKA. The CAK is a secret
/// and hidden on show unless secrets are requested.
/// ```yaml
/// interfaces:
/// - name: macsec0
///   type: macsec
///   state: up
///   macsec:
///     base-iface: eth1
///     encrypt: true
///     mka-cak: 50b71a8ef0bd5751ea76de6d6c98c03a
///     mka-ckn: f2b4297d39da7330910a74abc0449feb
///     port: 0
///     validation: strict
///     send-sci: true
/// ```
pub struct MacSecInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macsec: Option<MacSecConfig>,
}

impl Default for MacSecInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::MacSec,
                ..BaseInterface::new()
            },
            macsec: None,
        }
    }
}

impl MacSecInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        let conf = match self.macsec.as_ref() {
            Some(conf) if is_desired => conf,
            _ => return Ok(()),
        };
        match conf.mka_error() {
            Some(msg) => {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!("{msg}, interface {}", self.base.name),
                );
                log::error!("{}", e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.macsec.as_ref().map(|conf| conf.base_iface.as_str())
    }

    pub(crate) fn change_parent_name(&mut self, name: &str) {
        if let Some(conf) = self.macsec.as_mut() {
            conf.base_iface = name.to_string();
        }
    }

    pub(crate) fn hide_secrets(&mut self) {
        if let Some(cak) = self
            .macsec
            .as_mut()
            .and_then(|conf| conf.mka_cak.as_mut())
        {
            *cak = PASSWORD_HID.to_string();
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct MacSecConfig {
    pub encrypt: bool,
    #[serde(alias = "parent")]
    pub base_iface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Pre-shared connectivity association key, 32 characters.
    pub mka_cak: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Connectivity association key name, even length of 2 to 64
    /// characters.
    pub mka_ckn: Option<String>,
    #[serde(deserialize_with = "crate::deserializer::u32_or_string")]
    /// Port part of the secure channel identifier.
    pub port: u32,
    /// How strictly incoming frames are checked.
    pub validation: MacSecValidate,
    /// Include the secure channel identifier in every frame.
    pub send_sci: bool,
}

impl MacSecConfig {
    fn mka_error(&self) -> Option<&'static str> {
        match (self.mka_cak.as_deref(), self.mka_ckn.as_deref()) {
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                Some("The mka-cak and mka-ckn must be both set or both unset")
            }
            (Some(cak), _) if cak != PASSWORD_HID && cak.len() != 32 => {
                Some("The mka-cak must be a string of 32 characters")
            }
            (_, Some(ckn))
                if !(2..=64).contains(&ckn.len()) || ckn.len() % 2 == 1 =>
            {
                Some(
                    "The mka-ckn must be a string of even size between 2 \
                    and 64 characters",
                )
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum MacSecValidate {
    #[default]
    Disabled,
    Check,
    Strict,
}
