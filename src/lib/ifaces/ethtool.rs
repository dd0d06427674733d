// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{schema::schema, ErrorKind, NetstateError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Link layer tuning of a network device, the settings of `ethtool`.
///
/// Example yaml:
/// ```yml
/// ethtool:
///   pause:
///     autoneg: false
///     rx: true
///     tx: true
///   feature:
///     gro: false
///     tx-tcp-segmentation: true
///   ring:
///     rx: 256
/// ```
pub struct EthtoolConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause: Option<EthtoolPauseConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Offload features keyed by kernel name. The short names used by
    /// `ethtool -K`, like `gro` or `tso`, are renamed on input.
    pub feature: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ring: Option<EthtoolRingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coalesce: Option<EthtoolCoalesceConfig>,
}

impl EthtoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &mut self,
        iface_name: &str,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(pause) = self.pause.as_mut() {
            if is_desired && pause.has_ignored_rx_tx() {
                log::warn!(
                    "Ignoring rx/tx of ethtool pause on interface \
                    {iface_name} as autoneg is enabled"
                );
            }
            pause.canonicalize();
        }
        if let Some(features) = self.feature.take() {
            self.feature = Some(rename_feature_aliases(iface_name, features)?);
        }
        Ok(())
    }

    // Merging might combine desired `autoneg: true` with current rx/tx.
    pub(crate) fn special_merge(&mut self) {
        if let Some(pause) = self.pause.as_mut() {
            pause.canonicalize();
        }
    }
}

fn rename_feature_aliases(
    iface_name: &str,
    features: BTreeMap<String, bool>,
) -> Result<BTreeMap<String, bool>, NetstateError> {
    let sc = schema()?;
    let mut ret: BTreeMap<String, bool> = BTreeMap::new();
    for (name, enabled) in features.iter() {
        let kernel_name = sc.ethtool_feature_name(name);
        if kernel_name == name {
            ret.insert(name.clone(), *enabled);
            continue;
        }
        match features.get(kernel_name) {
            Some(other) if other != enabled => {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Ethtool feature {name} is alias of {kernel_name} \
                        on interface {iface_name}, but they are set to \
                        different values"
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
            Some(_) => (),
            None => {
                ret.insert(kernel_name.to_string(), *enabled);
            }
        }
    }
    Ok(ret)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Flow control of the link.
pub struct EthtoolPauseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// When enabled, the pause frames are negotiated with link partner and
    /// `rx` and `tx` are ignored.
    pub autoneg: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<bool>,
}

impl EthtoolPauseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_ignored_rx_tx(&self) -> bool {
        self.autoneg == Some(true) && (self.rx.is_some() || self.tx.is_some())
    }

    fn canonicalize(&mut self) {
        if self.autoneg == Some(true) {
            self.rx = None;
            self.tx = None;
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Size of the device rings, in descriptors.
pub struct EthtoolRingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_jumbo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_mini: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<u32>,
}

impl EthtoolRingConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Interrupt coalescing. Refer to `ethtool(8)` for the meaning of each
/// property. Frame counts and microsecond delays are unsigned integers.
pub struct EthtoolCoalesceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_rx: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_tx: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkt_rate_high: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkt_rate_low: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_block_usecs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_frames_high: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_frames_irq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_frames_low: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_usecs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_usecs_high: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_usecs_irq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_usecs_low: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_frames_high: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_frames_irq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_frames_low: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_usecs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_usecs_high: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_usecs_irq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_usecs_low: Option<u32>,
}

impl EthtoolCoalesceConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
