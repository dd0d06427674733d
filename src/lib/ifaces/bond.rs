// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    deserializer::NumberAsString,
    schema::{bond_option_to_name, schema},
    BaseInterface, ErrorKind, Interface, InterfaceState, InterfaceType,
    MergedInterface, NetstateError,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Bond interface.
///
/// When serializing or deserializing, the [BaseInterface] will
/// be flatted and [BondConfig] stored as `link-aggregation` section. The yaml
/// output [crate::NetworkState] containing an example bond interface:
/// ```yml
/// interfaces:
/// - name: bond99
///   type: bond
///   state: up
///   mac-address: 1A:24:D5:CA:76:54
///   mtu: 1500
///   ipv4:
///     enabled: false
///   ipv6:
///     enabled: false
///   link-aggregation:
///     mode: balance-rr
///     options:
///       all_slaves_active: dropped
///       arp_all_targets: any
///       miimon: 100
///     port:
///     - eth1
///     - eth2
/// ```
pub struct BondInterface {
    #[serde(flatten)]
    /// Base interface. Flat during serializing.
    pub base: BaseInterface,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "link-aggregation"
    )]
    /// Bond specific settings.
    pub bond: Option<BondConfig>,
    #[serde(skip)]
    /// Set when desired bond mode differs from current. Provider should
    /// recreate the bond instead of modifying it in place.
    pub(crate) mode_changed: bool,
}

impl Default for BondInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::Bond;
        Self {
            base,
            bond: None,
            mode_changed: false,
        }
    }
}

impl BondInterface {
    pub fn new() -> Self {
        Self::default()
    }

    // Do not merge bond options from current when bond mode is changing,
    // the options of old mode might be invalid for new mode.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if let Some(bond_conf) = self.bond.as_mut() {
            if let (Some(des_bond_conf), Some(cur_bond_conf)) =
                (desired.bond.as_ref(), current.bond.as_ref())
            {
                if des_bond_conf.mode.is_some()
                    && des_bond_conf.mode != cur_bond_conf.mode
                {
                    log::debug!(
                        "Bond {} is changing mode from {:?} to {:?}, \
                        discarding current bond options",
                        desired.base.name,
                        cur_bond_conf.mode,
                        des_bond_conf.mode
                    );
                    bond_conf.options = Some(
                        des_bond_conf.options.clone().unwrap_or_default(),
                    );
                }
            }
        }
    }

    pub(crate) fn flag_mode_change(&mut self, current: &Self) {
        if self.base.state == InterfaceState::Up
            && self.mode().is_some()
            && current.mode().is_some()
            && self.mode() != current.mode()
        {
            self.mode_changed = true;
        }
    }

    fn drop_empty_arp_ip_target(&mut self) {
        if let Some(bond_opts) =
            self.bond.as_mut().and_then(|b| b.options.as_mut())
        {
            if bond_opts.arp_ip_target.as_deref() == Some("") {
                bond_opts.arp_ip_target = None;
            }
        }
    }

    fn make_ad_actor_system_mac_upper_case(&mut self) {
        if let Some(mac) = self
            .bond
            .as_mut()
            .and_then(|c| c.options.as_mut())
            .and_then(|o| o.ad_actor_system.as_mut())
        {
            mac.make_ascii_uppercase();
        }
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        self.drop_empty_arp_ip_target();
        self.make_ad_actor_system_mac_upper_case();
        if is_desired {
            self.check_overlap_queue_id()?;
            self.validate_conflict_in_port_and_port_configs()?;
        }
        Ok(())
    }

    // Kernel does not allow multiple bond port holding the same queue ID.
    fn check_overlap_queue_id(&self) -> Result<(), NetstateError> {
        let mut existing_qids: HashMap<u16, &str> = HashMap::new();
        for port_conf in self
            .bond
            .as_ref()
            .and_then(|b| b.ports_config.as_deref())
            .unwrap_or_default()
            .iter()
            .filter(|p| p.queue_id.is_some() && p.queue_id != Some(0))
        {
            if let Some(queue_id) = port_conf.queue_id {
                if let Some(exist_port_name) = existing_qids.get(&queue_id) {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Port {} and {} of Bond {} are sharing the \
                            same queue-id which is not supported by \
                            linux kernel yet",
                            exist_port_name,
                            port_conf.name.as_str(),
                            self.base.name.as_str()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                existing_qids.insert(queue_id, port_conf.name.as_str());
            }
        }
        Ok(())
    }

    // Return None when desire state does not mention ports
    pub(crate) fn ports(&self) -> Option<Vec<&str>> {
        let bond_conf = self.bond.as_ref()?;
        if let Some(ports) = bond_conf.port.as_ref() {
            Some(ports.iter().map(|p| p.as_str()).collect())
        } else {
            bond_conf
                .ports_config
                .as_ref()
                .map(|ports| ports.iter().map(|p| p.name.as_str()).collect())
        }
    }

    pub(crate) fn get_port_conf(
        &self,
        port_name: &str,
    ) -> Option<&BondPortConfig> {
        self.bond
            .as_ref()
            .and_then(|bond_conf| bond_conf.ports_config.as_ref())
            .and_then(|port_confs| {
                port_confs
                    .iter()
                    .find(|port_conf| port_conf.name == port_name)
            })
    }

    pub(crate) fn mode(&self) -> Option<BondMode> {
        self.bond.as_ref().and_then(|bond_conf| bond_conf.mode)
    }

    fn is_mac_restricted_mode(&self) -> bool {
        self.mode() == Some(BondMode::ActiveBackup)
            && self
                .bond
                .as_ref()
                .and_then(|bond_conf| bond_conf.options.as_ref())
                .and_then(|bond_opts| bond_opts.fail_over_mac.as_deref())
                == Some("active")
    }

    fn is_not_mac_restricted_mode_explicitly(&self) -> bool {
        (self.mode().is_some() && self.mode() != Some(BondMode::ActiveBackup))
            || ![None, Some("active")].contains(
                &self
                    .bond
                    .as_ref()
                    .and_then(|bond_conf| bond_conf.options.as_ref())
                    .and_then(|bond_opts| bond_opts.fail_over_mac.as_deref()),
            )
    }

    fn validate_new_iface_with_no_mode(
        &self,
        current: Option<&Interface>,
    ) -> Result<(), NetstateError> {
        if self.base.state == InterfaceState::Up
            && current.is_none()
            && self.mode().is_none()
        {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Bond mode is mandatory for new bond interface: {}",
                    &self.base.name
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }

    // Fail on
    // * Desire mac restricted mode with mac defined
    // * Desire mac address with current interface in mac restricted mode with
    //   desired not changing mac restricted mode
    fn validate_mac_restricted_mode(
        &self,
        desired: &Self,
        current: Option<&Interface>,
    ) -> Result<(), NetstateError> {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "MAC address cannot be specified in bond interface {} \
                along with fail_over_mac active on active backup mode",
                self.base.name
            ),
        );
        if self.is_mac_restricted_mode() && desired.base.mac_address.is_some()
        {
            log::error!("{}", e);
            return Err(e);
        }

        if let Some(Interface::Bond(current)) = current {
            if current.is_mac_restricted_mode()
                && desired.base.mac_address.is_some()
                && !desired.is_not_mac_restricted_mode_explicitly()
            {
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn validate_conflict_in_port_and_port_configs(
        &self,
    ) -> Result<(), NetstateError> {
        if let Some((Some(ports), Some(ports_config))) = self
            .bond
            .as_ref()
            .map(|b| (b.port.as_ref(), b.ports_config.as_ref()))
        {
            let mut port_list: Vec<&str> =
                ports.iter().map(|p| p.as_str()).collect();
            let mut port_config_list: Vec<&str> =
                ports_config.iter().map(|p| p.name.as_str()).collect();
            port_list.sort_unstable();
            port_config_list.sort_unstable();
            // `ports-config` may hold subset of `port`, but never a port
            // not listed in `port`.
            if let Some(name) =
                port_config_list.iter().find(|n| !port_list.contains(n))
            {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "The port {name} specified in `ports-config` is not \
                        listed in `port` of bond interface: {}",
                        &self.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn remove_port(&mut self, port_to_remove: &str) {
        if let Some(bond_conf) = self.bond.as_mut() {
            if let Some(ports) = bond_conf.port.as_mut() {
                ports.retain(|p| p != port_to_remove);
            }
            if let Some(port_confs) = bond_conf.ports_config.as_mut() {
                port_confs.retain(|p| p.name != port_to_remove);
            }
        }
    }

    pub(crate) fn add_port(&mut self, port_name: &str) {
        let bond_conf = self.bond.get_or_insert_with(BondConfig::new);
        let ports = bond_conf.port.get_or_insert_with(Vec::new);
        if !ports.iter().any(|p| p == port_name) {
            ports.push(port_name.to_string());
        }
    }

    pub(crate) fn change_port_name(
        &mut self,
        origin_name: &str,
        new_name: &str,
    ) {
        if let Some(bond_conf) = self.bond.as_mut() {
            for port in bond_conf.port.as_mut().into_iter().flatten() {
                if port == origin_name {
                    *port = new_name.to_string();
                }
            }
            for port_conf in
                bond_conf.ports_config.as_mut().into_iter().flatten()
            {
                if port_conf.name == origin_name {
                    port_conf.name = new_name.to_string();
                }
            }
        }
    }

    // Strip options not valid for desired mode when mode is changing.
    pub(crate) fn pre_edit_cleanup(&mut self, current: Option<&Self>) {
        if let Some(current) = current {
            self.flag_mode_change(current);
        }
        if !self.mode_changed {
            return;
        }
        let mode = self.mode();
        if let Some(opts) = self.bond.as_mut().and_then(|b| b.options.as_mut())
        {
            if mode != Some(BondMode::LACP) {
                opts.ad_actor_sys_prio = None;
                opts.ad_actor_system = None;
                opts.ad_select = None;
                opts.ad_user_port_key = None;
                opts.lacp_rate = None;
            }
            if !matches!(
                mode,
                Some(BondMode::ActiveBackup)
                    | Some(BondMode::TLB)
                    | Some(BondMode::ALB)
            ) {
                opts.primary = None;
                opts.primary_reselect = None;
            }
        }
    }

    // Port order is meaningless for bond, compare as sorted.
    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(bond_conf) = self.bond.as_mut() {
            if let Some(ports) = bond_conf.port.as_mut() {
                ports.sort_unstable();
            }
            if let Some(port_confs) = bond_conf.ports_config.as_mut() {
                port_confs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[non_exhaustive]
/// Bond mode. Deserialize from named form, alias (`round-robin`, `xor`,
/// `tlb`, `alb`) or kernel integer value.
pub enum BondMode {
    /// Deserialize and serialize from/to `balance-rr`.
    #[default]
    RoundRobin,
    /// Deserialize and serialize from/to `active-backup`.
    ActiveBackup,
    /// Deserialize and serialize from/to `balance-xor`.
    XOR,
    /// Deserialize and serialize from/to `broadcast`.
    Broadcast,
    /// Deserialize and serialize from/to `802.3ad`.
    LACP,
    /// Deserialize and serialize from/to `balance-tlb`.
    TLB,
    /// Deserialize and serialize from/to `balance-alb`.
    ALB,
    Unknown,
}

impl From<&str> for BondMode {
    fn from(s: &str) -> Self {
        let name = match schema() {
            Ok(sc) => sc.bond_mode_name(s).unwrap_or(s),
            Err(_) => s,
        };
        match name {
            "balance-rr" => Self::RoundRobin,
            "active-backup" => Self::ActiveBackup,
            "balance-xor" => Self::XOR,
            "broadcast" => Self::Broadcast,
            "802.3ad" => Self::LACP,
            "balance-tlb" => Self::TLB,
            "balance-alb" => Self::ALB,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for BondMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = NumberAsString::deserialize(deserializer)?;
        match BondMode::from(v.0.as_str()) {
            BondMode::Unknown => Err(serde::de::Error::custom(format!(
                "Invalid bond mode {}",
                v.0
            ))),
            mode => Ok(mode),
        }
    }
}

impl Serialize for BondMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl std::fmt::Display for BondMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BondMode::RoundRobin => "balance-rr",
                BondMode::ActiveBackup => "active-backup",
                BondMode::XOR => "balance-xor",
                BondMode::Broadcast => "broadcast",
                BondMode::LACP => "802.3ad",
                BondMode::TLB => "balance-tlb",
                BondMode::ALB => "balance-alb",
                BondMode::Unknown => "unknown",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct BondConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Mode is mandatory when create new bond interface.
    pub mode: Option<BondMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// When applying, if defined, it will be merged with current options
    /// unless bond mode is changing.
    /// Please refer to the kernel bonding documentation for detail.
    pub options: Option<BondOptions>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "ports")]
    /// Deserialize and serialize from/to `port`.
    /// You can also use `ports` for deserializing.
    /// When applying, if defined, it will override current port list.
    pub port: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Deserialize and serialize from/to `ports-config`.
    /// When applying, if defined, it will override current ports
    /// configuration.
    pub ports_config: Option<Vec<BondPortConfig>>,
}

impl BondConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

// Bond options holding both numeric and named form are stored in named
// form, the mapping table lives in the schema vocabulary.
macro_rules! named_bond_option {
    ($func:ident, $option:literal) => {
        fn $func<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let v = Option::<NumberAsString>::deserialize(deserializer)?;
            Ok(v.map(|v| bond_option_to_name($option, v.0.as_str())))
        }
    };
}

named_bond_option!(ad_select_name, "ad_select");
named_bond_option!(all_slaves_active_name, "all_slaves_active");
named_bond_option!(arp_all_targets_name, "arp_all_targets");
named_bond_option!(arp_validate_name, "arp_validate");
named_bond_option!(fail_over_mac_name, "fail_over_mac");
named_bond_option!(lacp_rate_name, "lacp_rate");
named_bond_option!(primary_reselect_name, "primary_reselect");
named_bond_option!(xmit_hash_policy_name, "xmit_hash_policy");

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
pub struct BondOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub ad_actor_sys_prio: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_actor_system: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "ad_select_name"
    )]
    /// Named form: `stable`, `bandwidth` or `count`.
    pub ad_select: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub ad_user_port_key: Option<u16>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "all_slaves_active_name"
    )]
    /// Named form: `dropped` or `delivered`.
    pub all_slaves_active: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "arp_all_targets_name"
    )]
    pub arp_all_targets: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub arp_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Comma separated IPv4 addresses.
    pub arp_ip_target: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "arp_validate_name"
    )]
    pub arp_validate: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub downdelay: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "fail_over_mac_name"
    )]
    /// Named form: `none`, `active` or `follow`.
    pub fail_over_mac: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "lacp_rate_name"
    )]
    /// Named form: `slow` or `fast`.
    pub lacp_rate: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub lp_interval: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub miimon: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub min_links: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub num_grat_arp: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub num_unsol_na: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub packets_per_slave: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "primary_reselect_name"
    )]
    pub primary_reselect: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub resend_igmp: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub tlb_dynamic_lb: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub updelay: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_carrier: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "xmit_hash_policy_name"
    )]
    pub xmit_hash_policy: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string",
        alias = "balance-slb"
    )]
    pub balance_slb: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub arp_missed_max: Option<u8>,
}

impl BondOptions {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_ad_actor_system_mac_address(
        &self,
    ) -> Result<(), NetstateError> {
        if let Some(ad_actor_system) = &self.ad_actor_system {
            if ad_actor_system.to_uppercase().starts_with("01:00:5E") {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    "The ad_actor_system bond option cannot be an IANA \
                    multicast address(prefix with 01:00:5E)"
                        .to_string(),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn validate_miimon_and_arp_interval(&self) -> Result<(), NetstateError> {
        if let (Some(miimon), Some(arp_interval)) =
            (self.miimon, self.arp_interval)
        {
            if miimon > 0 && arp_interval > 0 {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    "Bond miimon and arp interval are not compatible options."
                        .to_string(),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn validate_balance_slb(
        &self,
        current: Option<&Self>,
        mode: BondMode,
    ) -> Result<(), NetstateError> {
        if self
            .balance_slb
            .or_else(|| current.and_then(|c| c.balance_slb))
            == Some(true)
        {
            let xmit_hash_policy = self
                .xmit_hash_policy
                .as_deref()
                .or_else(|| {
                    current.and_then(|c| c.xmit_hash_policy.as_deref())
                });
            if mode != BondMode::XOR || xmit_hash_policy != Some("vlan+srcmac")
            {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    "To enable balance-slb, bond mode should be \
                    balance-xor and xmit_hash_policy: 'vlan+srcmac'"
                        .to_string(),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    // Enumerated options must hold a value known by the vocabulary.
    fn validate_named_values(&self) -> Result<(), NetstateError> {
        let sc = schema()?;
        for (option, value) in [
            ("ad_select", self.ad_select.as_deref()),
            ("all_slaves_active", self.all_slaves_active.as_deref()),
            ("arp_all_targets", self.arp_all_targets.as_deref()),
            ("arp_validate", self.arp_validate.as_deref()),
            ("fail_over_mac", self.fail_over_mac.as_deref()),
            ("lacp_rate", self.lacp_rate.as_deref()),
            ("primary_reselect", self.primary_reselect.as_deref()),
            ("xmit_hash_policy", self.xmit_hash_policy.as_deref()),
        ] {
            if let Some(value) = value {
                if sc.bond_option_index(option, value).is_none() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Invalid value {value} for bond option {option}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl MergedInterface {
    pub(crate) fn post_inter_ifaces_process_bond(
        &mut self,
    ) -> Result<(), NetstateError> {
        if let (
            Some(Interface::Bond(apply_iface)),
            Some(Interface::Bond(des_iface)),
        ) = (self.for_apply.as_ref(), self.desired.as_ref())
        {
            apply_iface
                .validate_new_iface_with_no_mode(self.current.as_ref())?;
            apply_iface.validate_mac_restricted_mode(
                des_iface,
                self.current.as_ref(),
            )?;

            if let Some(bond_opts) =
                des_iface.bond.as_ref().and_then(|b| b.options.as_ref())
            {
                bond_opts.validate_ad_actor_system_mac_address()?;
                bond_opts.validate_miimon_and_arp_interval()?;
                bond_opts.validate_named_values()?;

                if let Some(mode) = apply_iface.mode() {
                    let cur_bond_opts =
                        if let Some(Interface::Bond(cur_iface)) =
                            self.current.as_ref()
                        {
                            cur_iface
                                .bond
                                .as_ref()
                                .and_then(|b| b.options.as_ref())
                        } else {
                            None
                        };
                    bond_opts.validate_balance_slb(cur_bond_opts, mode)?
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct BondPortConfig {
    /// name is mandatory when specifying the ports configuration.
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_i32_or_string"
    )]
    /// Only valid for active-backup, balance-tlb and balance-alb mode.
    pub priority: Option<i32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub queue_id: Option<u16>,
}

impl std::fmt::Display for BondPortConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BondPortConfig {{ name: {}, priority: {}, queue_id: {} }}",
            self.name,
            self.priority.unwrap_or_default(),
            self.queue_id.unwrap_or_default()
        )
    }
}

impl BondPortConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
