// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    schema::schema, state::merge_json_value, BaseInterface, BondInterface,
    DispatchInterface, DummyInterface, ErrorKind, EthernetInterface,
    HsrInterface, InfiniBandInterface, IpVlanInterface, LinuxBridgeInterface,
    LoopbackInterface, MacSecInterface, MacVlanInterface, MacVtapInterface,
    NetstateError, OvsBridgeInterface, OvsInterface, VlanInterface,
    VrfInterface, VxlanInterface, WireGuardInterface,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[non_exhaustive]
/// Interface type
pub enum InterfaceType {
    /// Bond interface.
    /// Deserialize and serialize from/to 'bond'
    Bond,
    /// Bridge provided by Linux kernel.
    /// Deserialize and serialize from/to 'linux-bridge'.
    LinuxBridge,
    /// Dummy interface.
    /// Deserialize and serialize from/to 'dummy'.
    Dummy,
    /// Ethernet interface.
    /// Deserialize and serialize from/to 'ethernet'.
    Ethernet,
    /// HSR interface.
    /// Deserialize and serialize from/to 'hsr'.
    Hsr,
    /// Loopback interface.
    /// Deserialize and serialize from/to 'loopback'.
    Loopback,
    /// MAC VLAN interface.
    /// Deserialize and serialize from/to 'mac-vlan'.
    MacVlan,
    /// MAC VTAP interface.
    /// Deserialize and serialize from/to 'mac-vtap'.
    MacVtap,
    /// OpenvSwitch bridge.
    /// Deserialize and serialize from/to 'ovs-bridge'.
    OvsBridge,
    /// OpenvSwitch system interface.
    /// Deserialize and serialize from/to 'ovs-interface'.
    OvsInterface,
    /// Virtual ethernet provide by Linux kernel.
    /// Deserialize and serialize from/to 'veth'.
    Veth,
    /// VLAN interface.
    /// Deserialize and serialize from/to 'vlan'.
    Vlan,
    /// Virtual Routing and Forwarding interface.
    /// Deserialize and serialize from/to 'vrf'.
    Vrf,
    /// Virtual extensible LAN interface.
    /// Deserialize and serialize from/to 'vxlan'.
    Vxlan,
    /// IP over InfiniBand interface.
    /// Deserialize and serialize from/to 'infiniband'.
    InfiniBand,
    /// MACsec interface.
    /// Deserialize and serialize from/to 'macsec'
    MacSec,
    /// IPVLAN interface.
    /// Deserialize and serialize from/to 'ipvlan'
    IpVlan,
    /// WireGuard tunnel.
    /// Deserialize and serialize from/to 'wireguard'
    WireGuard,
    /// Interface created and managed by provider specific handler.
    /// Deserialize and serialize from/to 'dispatch'
    Dispatch,
    /// Unknown interface.
    #[default]
    Unknown,
    /// Reserved for future use.
    Other(String),
}

impl From<&str> for InterfaceType {
    fn from(s: &str) -> Self {
        let s = match schema() {
            Ok(sc) => sc.canonical_iface_type(s),
            Err(_) => s,
        };
        match s {
            "bond" => InterfaceType::Bond,
            "linux-bridge" => InterfaceType::LinuxBridge,
            "dummy" => InterfaceType::Dummy,
            "ethernet" => InterfaceType::Ethernet,
            "hsr" => InterfaceType::Hsr,
            "loopback" => InterfaceType::Loopback,
            "mac-vlan" => InterfaceType::MacVlan,
            "mac-vtap" => InterfaceType::MacVtap,
            "ovs-bridge" => InterfaceType::OvsBridge,
            "ovs-interface" => InterfaceType::OvsInterface,
            "veth" => InterfaceType::Veth,
            "vlan" => InterfaceType::Vlan,
            "vrf" => InterfaceType::Vrf,
            "vxlan" => InterfaceType::Vxlan,
            "infiniband" => InterfaceType::InfiniBand,
            "macsec" => InterfaceType::MacSec,
            "ipvlan" => InterfaceType::IpVlan,
            "wireguard" => InterfaceType::WireGuard,
            "dispatch" => InterfaceType::Dispatch,
            "unknown" => InterfaceType::Unknown,
            _ => InterfaceType::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InterfaceType::Bond => "bond",
                InterfaceType::LinuxBridge => "linux-bridge",
                InterfaceType::Dummy => "dummy",
                InterfaceType::Ethernet => "ethernet",
                InterfaceType::Hsr => "hsr",
                InterfaceType::Loopback => "loopback",
                InterfaceType::MacVlan => "mac-vlan",
                InterfaceType::MacVtap => "mac-vtap",
                InterfaceType::OvsBridge => "ovs-bridge",
                InterfaceType::OvsInterface => "ovs-interface",
                InterfaceType::Veth => "veth",
                InterfaceType::Vlan => "vlan",
                InterfaceType::Vrf => "vrf",
                InterfaceType::Vxlan => "vxlan",
                InterfaceType::InfiniBand => "infiniband",
                InterfaceType::MacSec => "macsec",
                InterfaceType::IpVlan => "ipvlan",
                InterfaceType::WireGuard => "wireguard",
                InterfaceType::Dispatch => "dispatch",
                InterfaceType::Unknown => "unknown",
                InterfaceType::Other(ref s) => s,
            }
        )
    }
}

impl Serialize for InterfaceType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InterfaceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(InterfaceType::from(s.as_str()))
    }
}

impl InterfaceType {
    const USERSPACE_IFACE_TYPES: [Self; 1] = [Self::OvsBridge];
    const CONTROLLER_IFACES_TYPES: [Self; 4] =
        [Self::Bond, Self::LinuxBridge, Self::OvsBridge, Self::Vrf];

    pub(crate) fn is_userspace(&self) -> bool {
        Self::USERSPACE_IFACE_TYPES.contains(self)
    }

    pub(crate) fn is_controller(&self) -> bool {
        Self::CONTROLLER_IFACES_TYPES.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// The state of interface
pub enum InterfaceState {
    /// Interface is up and running.
    /// Deserialize and serialize from/to 'up'.
    #[default]
    Up,
    /// For apply action, down means configuration still exist but
    /// deactivate. The virtual interface will be removed and other interface
    /// will be reverted to down state or up with IP disabled state.
    /// Deserialize and serialize from/to 'down'.
    Down,
    /// Only for apply action to remove configuration and deactivate the
    /// interface.
    Absent,
    /// Interface is not managed by this engine. Its properties do not
    /// participate in merge or verification.
    /// Deserialize and serialize from/to 'ignore'.
    Ignore,
}

impl std::fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Up => "up",
                Self::Down => "down",
                Self::Absent => "absent",
                Self::Ignore => "ignore",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[non_exhaustive]
/// Holder for interface with known interface type defined.
/// During apply action, the type is resolved from current state.
pub struct UnknownInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(flatten)]
    pub(crate) other: serde_json::Map<String, serde_json::Value>,
}

impl UnknownInterface {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", untagged)]
#[non_exhaustive]
/// Represent a kernel or user space network interface.
pub enum Interface {
    /// Bond interface.
    Bond(BondInterface),
    /// Dummy interface.
    Dummy(DummyInterface),
    /// Ethernet interface or virtual ethernet(veth) of linux kernel
    Ethernet(EthernetInterface),
    /// HSR interface provided by Linux kernel.
    Hsr(HsrInterface),
    /// Bridge provided by Linux kernel.
    LinuxBridge(LinuxBridgeInterface),
    /// OpenvSwitch bridge.
    OvsBridge(OvsBridgeInterface),
    /// OpenvSwitch system interface.
    OvsInterface(OvsInterface),
    /// Unknown interface.
    Unknown(UnknownInterface),
    /// VLAN interface.
    Vlan(VlanInterface),
    /// Virtual extensible LAN interface.
    Vxlan(VxlanInterface),
    /// MAC VLAN interface.
    MacVlan(MacVlanInterface),
    /// MAC VTAP interface.
    MacVtap(MacVtapInterface),
    /// Virtual Routing and Forwarding interface.
    Vrf(VrfInterface),
    /// IP over InfiniBand interface.
    InfiniBand(InfiniBandInterface),
    /// Linux loopback interface
    Loopback(LoopbackInterface),
    /// MACsec interface.
    MacSec(MacSecInterface),
    /// IPVLAN interface
    IpVlan(IpVlanInterface),
    /// WireGuard tunnel
    WireGuard(WireGuardInterface),
    /// Interface handled by provider specific handler
    Dispatch(DispatchInterface),
}

impl<'de> Deserialize<'de> for Interface {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut v = serde_json::Value::deserialize(deserializer)?;
        let sc = schema().map_err(serde::de::Error::custom)?;
        sc.normalize_iface_value(&mut v);
        sc.validate_iface_value(&v).map_err(serde::de::Error::custom)?;

        // Ignore all properties except name and type if state: absent
        if matches!(
            Option::deserialize(&v["state"])
                .map_err(serde::de::Error::custom)?,
            Some(InterfaceState::Absent)
        ) {
            let mut new_value = serde_json::map::Map::new();
            for key in ["name", "type"] {
                if let Some(value) = v.get(key) {
                    new_value.insert(key.to_string(), value.clone());
                }
            }
            new_value.insert(
                "state".to_string(),
                serde_json::Value::String("absent".to_string()),
            );
            v = serde_json::value::Value::Object(new_value);
        }

        match Option::deserialize(&v["type"])
            .map_err(serde::de::Error::custom)?
        {
            Some(InterfaceType::Ethernet) | Some(InterfaceType::Veth) => {
                let inner = EthernetInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Ethernet(inner))
            }
            Some(InterfaceType::LinuxBridge) => {
                let inner = LinuxBridgeInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::LinuxBridge(inner))
            }
            Some(InterfaceType::Bond) => {
                let inner = BondInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Bond(inner))
            }
            Some(InterfaceType::Dummy) => {
                let inner = DummyInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Dummy(inner))
            }
            Some(InterfaceType::Hsr) => {
                let inner = HsrInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Hsr(inner))
            }
            Some(InterfaceType::OvsInterface) => {
                let inner = OvsInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::OvsInterface(inner))
            }
            Some(InterfaceType::OvsBridge) => {
                let inner = OvsBridgeInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::OvsBridge(inner))
            }
            Some(InterfaceType::Vlan) => {
                let inner = VlanInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Vlan(inner))
            }
            Some(InterfaceType::Vxlan) => {
                let inner = VxlanInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Vxlan(inner))
            }
            Some(InterfaceType::MacVlan) => {
                let inner = MacVlanInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::MacVlan(inner))
            }
            Some(InterfaceType::MacVtap) => {
                let inner = MacVtapInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::MacVtap(inner))
            }
            Some(InterfaceType::Vrf) => {
                let inner = VrfInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Vrf(inner))
            }
            Some(InterfaceType::InfiniBand) => {
                let inner = InfiniBandInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::InfiniBand(inner))
            }
            Some(InterfaceType::Loopback) => {
                let inner = LoopbackInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Loopback(inner))
            }
            Some(InterfaceType::MacSec) => {
                let inner = MacSecInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::MacSec(inner))
            }
            Some(InterfaceType::IpVlan) => {
                let inner = IpVlanInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::IpVlan(inner))
            }
            Some(InterfaceType::WireGuard) => {
                let inner = WireGuardInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::WireGuard(inner))
            }
            Some(InterfaceType::Dispatch) => {
                let inner = DispatchInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Dispatch(inner))
            }
            Some(InterfaceType::Other(ref s)) => {
                Err(serde::de::Error::custom(format!(
                    "Unsupported interface type {s}"
                )))
            }
            Some(InterfaceType::Unknown) | None => {
                let inner = UnknownInterface::deserialize(v)
                    .map_err(serde::de::Error::custom)?;
                Ok(Interface::Unknown(inner))
            }
        }
    }
}

macro_rules! on_every_variant {
    ($iface:expr, $inner:ident => $body:expr) => {
        match $iface {
            Interface::Bond($inner) => $body,
            Interface::Dummy($inner) => $body,
            Interface::Ethernet($inner) => $body,
            Interface::Hsr($inner) => $body,
            Interface::LinuxBridge($inner) => $body,
            Interface::OvsBridge($inner) => $body,
            Interface::OvsInterface($inner) => $body,
            Interface::Unknown($inner) => $body,
            Interface::Vlan($inner) => $body,
            Interface::Vxlan($inner) => $body,
            Interface::MacVlan($inner) => $body,
            Interface::MacVtap($inner) => $body,
            Interface::Vrf($inner) => $body,
            Interface::InfiniBand($inner) => $body,
            Interface::Loopback($inner) => $body,
            Interface::MacSec($inner) => $body,
            Interface::IpVlan($inner) => $body,
            Interface::WireGuard($inner) => $body,
            Interface::Dispatch($inner) => $body,
        }
    };
}

impl Interface {
    /// The interface name.
    pub fn name(&self) -> &str {
        self.base_iface().name.as_str()
    }

    pub(crate) fn is_userspace(&self) -> bool {
        self.base_iface().iface_type.is_userspace()
    }

    pub(crate) fn is_controller(&self) -> bool {
        self.base_iface().iface_type.is_controller()
    }

    /// Set interface type.
    pub fn set_iface_type(&mut self, iface_type: InterfaceType) {
        self.base_iface_mut().iface_type = iface_type;
    }

    /// The interface type
    pub fn iface_type(&self) -> InterfaceType {
        self.base_iface().iface_type.clone()
    }

    /// Whether interface is up, default to true.
    pub fn is_up(&self) -> bool {
        self.base_iface().state == InterfaceState::Up
    }

    /// Whether interface is marked as absent.
    pub fn is_absent(&self) -> bool {
        self.base_iface().state == InterfaceState::Absent
    }

    /// Whether interface is marked as down.
    pub fn is_down(&self) -> bool {
        self.base_iface().state == InterfaceState::Down
    }

    /// Whether interface is marked as ignore.
    pub fn is_ignore(&self) -> bool {
        self.base_iface().state == InterfaceState::Ignore
    }

    /// Whether interface is virtual and can be deleted.
    pub fn is_virtual(&self) -> bool {
        !matches!(
            self,
            Self::Ethernet(_)
                | Self::Unknown(_)
                | Self::InfiniBand(_)
                | Self::Loopback(_)
        ) || self.iface_type() == InterfaceType::Veth
            || self.parent().is_some()
    }

    /// Whether current interface only lives when its controller exists.
    /// For example, OpenvSwitch system interface can only live when
    /// its controller OpenvSwitch bridge exists.
    pub fn need_controller(&self) -> bool {
        matches!(self, Self::OvsInterface(_))
    }

    /// Whether current interface requires a parent interface to exist.
    pub fn need_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Whether this interface could be port of controller while holding
    /// IP. Only VRF controller allows that.
    pub fn can_have_ip_as_port(&self) -> bool {
        self.base_iface().controller_type == Some(InterfaceType::Vrf)
            || self.iface_type() == InterfaceType::OvsInterface
    }

    /// Get reference of its [BaseInterface].
    pub fn base_iface(&self) -> &BaseInterface {
        on_every_variant!(self, iface => &iface.base)
    }

    /// Get mutable reference of its [BaseInterface].
    pub fn base_iface_mut(&mut self) -> &mut BaseInterface {
        on_every_variant!(self, iface => &mut iface.base)
    }

    /// The name of ports.
    /// Return None if its is not controller or not mentioned port section
    pub fn ports(&self) -> Option<Vec<&str>> {
        if self.is_absent() {
            if self.is_controller() {
                return Some(Vec::new());
            }
            return None;
        }
        match self {
            Self::LinuxBridge(iface) => iface.ports(),
            Self::Bond(iface) => iface.ports(),
            Self::OvsBridge(iface) => iface.ports(),
            Self::Vrf(iface) => iface.ports(),
            _ => None,
        }
    }

    /// The name of the interface this one is stacked on.
    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Vlan(vlan) => vlan.parent(),
            Self::Vxlan(vxlan) => vxlan.parent(),
            Self::InfiniBand(ib) => ib.parent(),
            Self::MacVlan(i) => i.parent(),
            Self::MacVtap(i) => i.parent(),
            Self::MacSec(i) => i.parent(),
            Self::IpVlan(i) => i.parent(),
            _ => None,
        }
    }

    pub(crate) fn clone_name_type_only(&self) -> Self {
        let base = self.base_iface().clone_name_type_only();
        match self {
            Self::LinuxBridge(_) => {
                let mut new_iface = LinuxBridgeInterface::new();
                new_iface.base = base;
                Self::LinuxBridge(new_iface)
            }
            Self::Ethernet(_) => {
                let mut new_iface = EthernetInterface::new();
                new_iface.base = base;
                Self::Ethernet(new_iface)
            }
            Self::Bond(_) => {
                let mut new_iface = BondInterface::new();
                new_iface.base = base;
                Self::Bond(new_iface)
            }
            Self::OvsBridge(_) => {
                let mut new_iface = OvsBridgeInterface::new();
                new_iface.base = base;
                Self::OvsBridge(new_iface)
            }
            Self::Vrf(_) => {
                let mut new_iface = VrfInterface::new();
                new_iface.base = base;
                Self::Vrf(new_iface)
            }
            _ => {
                let mut new_iface = UnknownInterface::new();
                new_iface.base = base;
                // Keep the type as it is required to identify user space
                // interface
                new_iface.base.iface_type = self.iface_type();
                Self::Unknown(new_iface)
            }
        }
    }

    /// Re-create interface as desired type while keeping properties.
    /// Used when desired interface has no type defined.
    pub(crate) fn resolve_type(
        &self,
        iface_type: &InterfaceType,
    ) -> Result<Self, NetstateError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "type".to_string(),
                serde_json::Value::String(iface_type.to_string()),
            );
        }
        let mut ret: Interface = serde_json::from_value(value)?;
        ret.base_iface_mut().controller_type =
            self.base_iface().controller_type.clone();
        Ok(ret)
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if is_desired && self.is_absent() {
            return Ok(());
        }
        self.base_iface_mut().sanitize(is_desired)?;
        match self {
            Interface::Ethernet(iface) => iface.sanitize(is_desired)?,
            Interface::Bond(iface) => iface.sanitize(is_desired)?,
            Interface::LinuxBridge(iface) => iface.sanitize(is_desired)?,
            Interface::OvsBridge(iface) => iface.sanitize(is_desired)?,
            Interface::OvsInterface(iface) => iface.sanitize(is_desired)?,
            Interface::Vlan(iface) => iface.sanitize(is_desired)?,
            Interface::Vxlan(iface) => iface.sanitize(is_desired)?,
            Interface::InfiniBand(iface) => iface.sanitize(is_desired)?,
            Interface::Loopback(iface) => iface.sanitize(is_desired)?,
            Interface::MacVlan(iface) => iface.sanitize(is_desired)?,
            Interface::MacVtap(iface) => iface.sanitize(is_desired)?,
            Interface::MacSec(iface) => iface.sanitize(is_desired)?,
            Interface::IpVlan(iface) => iface.sanitize(is_desired)?,
            Interface::Hsr(iface) => iface.sanitize(is_desired)?,
            Interface::Vrf(iface) => iface.sanitize(is_desired)?,
            Interface::WireGuard(iface) => iface.sanitize(is_desired)?,
            Interface::Dummy(_)
            | Interface::Unknown(_)
            | Interface::Dispatch(_) => (),
        }
        Ok(())
    }

    // Fold `current` into `self`: maps merged recursively, lists and scalars
    // of `self` win.
    pub(crate) fn merge(&self, current: &Self) -> Result<Self, NetstateError> {
        let mut merged_value = serde_json::to_value(self)?;
        let current_value = serde_json::to_value(current)?;
        merge_json_value(&mut merged_value, &current_value);
        let mut merged: Interface = serde_json::from_value(merged_value)
            .map_err(|e| {
                NetstateError::new(
                    ErrorKind::Bug,
                    format!(
                        "Failed to merge interface {}: {e}",
                        self.name()
                    ),
                )
            })?;
        merged.special_merge(self, current);
        Ok(merged)
    }

    fn special_merge(&mut self, desired: &Self, current: &Self) {
        self.base_iface_mut()
            .special_merge(desired.base_iface(), current.base_iface());
        if self.base_iface().controller_type.is_none() {
            self.base_iface_mut().controller_type = desired
                .base_iface()
                .controller_type
                .clone()
                .or_else(|| current.base_iface().controller_type.clone());
        }
        match (self, desired, current) {
            (
                Interface::Bond(iface),
                Interface::Bond(des),
                Interface::Bond(cur),
            ) => iface.special_merge(des, cur),
            (
                Interface::Ethernet(iface),
                Interface::Ethernet(des),
                Interface::Ethernet(cur),
            ) => iface.special_merge(des, cur),
            (
                Interface::OvsInterface(iface),
                Interface::OvsInterface(des),
                Interface::OvsInterface(cur),
            ) => iface.special_merge(des, cur),
            (
                Interface::LinuxBridge(iface),
                Interface::LinuxBridge(des),
                Interface::LinuxBridge(cur),
            ) => iface.special_merge(des, cur),
            (
                Interface::OvsBridge(iface),
                Interface::OvsBridge(des),
                Interface::OvsBridge(cur),
            ) => iface.special_merge(des, cur),
            _ => (),
        }
    }

    pub(crate) fn remove_port(&mut self, port_name: &str) {
        match self {
            Interface::LinuxBridge(iface) => iface.remove_port(port_name),
            Interface::OvsBridge(iface) => iface.remove_port(port_name),
            Interface::Bond(iface) => iface.remove_port(port_name),
            Interface::Vrf(iface) => iface.remove_port(port_name),
            _ => {
                log::warn!(
                    "BUG: Interface {} is not controller, cannot remove \
                    port {port_name}",
                    self.name()
                );
            }
        }
    }

    pub(crate) fn add_port(&mut self, port_name: &str) {
        match self {
            Interface::LinuxBridge(iface) => iface.add_port(port_name),
            Interface::OvsBridge(iface) => iface.add_port(port_name),
            Interface::Bond(iface) => iface.add_port(port_name),
            Interface::Vrf(iface) => iface.add_port(port_name),
            _ => {
                log::warn!(
                    "BUG: Interface {} is not controller, cannot add \
                    port {port_name}",
                    self.name()
                );
            }
        }
    }

    pub(crate) fn change_port_name(&mut self, org_name: &str, new_name: &str) {
        match self {
            Interface::LinuxBridge(iface) => {
                iface.change_port_name(org_name, new_name)
            }
            Interface::OvsBridge(iface) => {
                iface.change_port_name(org_name, new_name)
            }
            Interface::Bond(iface) => {
                iface.change_port_name(org_name, new_name)
            }
            Interface::Vrf(iface) => iface.change_port_name(org_name, new_name),
            _ => (),
        }
    }

    pub(crate) fn change_parent_name(&mut self, new_name: &str) {
        match self {
            Interface::Vlan(iface) => iface.change_parent_name(new_name),
            Interface::MacVlan(iface) => iface.change_parent_name(new_name),
            Interface::MacVtap(iface) => iface.change_parent_name(new_name),
            Interface::IpVlan(iface) => iface.change_parent_name(new_name),
            Interface::MacSec(iface) => iface.change_parent_name(new_name),
            Interface::Vxlan(iface) => iface.change_parent_name(new_name),
            _ => (),
        }
    }

    /// Per-port configuration block of controller for specified port.
    pub(crate) fn get_port_options(
        &self,
        port_name: &str,
    ) -> Option<serde_json::Value> {
        match self {
            Interface::LinuxBridge(iface) => iface
                .get_port_conf(port_name)
                .and_then(|c| serde_json::to_value(c).ok()),
            Interface::OvsBridge(iface) => iface
                .get_port_conf(port_name)
                .and_then(|c| serde_json::to_value(c).ok()),
            Interface::Bond(iface) => iface
                .get_port_conf(port_name)
                .and_then(|c| serde_json::to_value(c).ok()),
            _ => None,
        }
    }

    pub(crate) fn pre_edit_cleanup(
        &mut self,
        current: Option<&Self>,
    ) -> Result<(), NetstateError> {
        self.base_iface_mut().pre_edit_cleanup();
        if let Interface::Ethernet(iface) = self {
            iface.pre_edit_cleanup();
        }
        if let Interface::OvsInterface(iface) = self {
            iface.pre_edit_cleanup();
        }
        if let Interface::Bond(iface) = self {
            iface.pre_edit_cleanup(
                if let Some(Interface::Bond(cur)) = current {
                    Some(cur)
                } else {
                    None
                },
            );
        }
        Ok(())
    }

    pub(crate) fn hide_secrets(&mut self) {
        match self {
            Interface::MacSec(iface) => iface.hide_secrets(),
            Interface::WireGuard(iface) => iface.hide_secrets(),
            _ => (),
        }
    }

    pub(crate) fn is_iface_valid_for_dns(&self, is_ipv6: bool) -> bool {
        if is_ipv6 {
            self.base_iface().ipv6.as_ref().map(|i| i.enabled) == Some(true)
        } else {
            self.base_iface().ipv4.as_ref().map(|i| i.enabled) == Some(true)
        }
    }
}

// The default on enum is experimental, but clippy is suggestion we use
// that experimental derive. Suppress the warning there
#[allow(clippy::derivable_impls)]
impl Default for Interface {
    fn default() -> Self {
        Interface::Unknown(UnknownInterface::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedInterface {
    /// Interface to compare against observed state after apply.
    pub(crate) for_verify: Option<Interface>,
    /// Interface to hand over to provider.
    pub(crate) for_apply: Option<Interface>,
    pub(crate) merged: Interface,
    pub(crate) desired: Option<Interface>,
    pub(crate) current: Option<Interface>,
}

impl MergedInterface {
    pub(crate) fn new(
        desired: Option<Interface>,
        current: Option<Interface>,
    ) -> Result<Self, NetstateError> {
        let mut current = current;
        if let Some(cur_iface) = current.as_mut() {
            cur_iface.sanitize(false)?;
        }
        let mut desired = match (desired, current.as_ref()) {
            (Some(des_iface), Some(cur_iface))
                if des_iface.iface_type() == InterfaceType::Unknown
                    && cur_iface.iface_type() != InterfaceType::Unknown =>
            {
                Some(des_iface.resolve_type(&cur_iface.iface_type())?)
            }
            (desired, _) => desired,
        };
        if let Some(des_iface) = desired.as_mut() {
            des_iface.sanitize(true)?;
        }

        let mut ret = match (desired, current) {
            (Some(des_iface), Some(cur_iface)) => {
                if des_iface.is_absent() {
                    let mut apply_iface = cur_iface.clone_name_type_only();
                    apply_iface.base_iface_mut().state = InterfaceState::Absent;
                    Self {
                        for_verify: Some(apply_iface.clone()),
                        for_apply: Some(apply_iface.clone()),
                        merged: apply_iface,
                        desired: Some(des_iface),
                        current: Some(cur_iface),
                    }
                } else if des_iface.is_ignore() {
                    let mut merged = cur_iface.clone();
                    merged.base_iface_mut().state = InterfaceState::Ignore;
                    Self {
                        for_verify: None,
                        for_apply: None,
                        merged,
                        desired: Some(des_iface),
                        current: Some(cur_iface),
                    }
                } else {
                    let merged = des_iface.merge(&cur_iface)?;
                    Self {
                        for_verify: Some(merged.clone()),
                        for_apply: Some(merged.clone()),
                        merged,
                        desired: Some(des_iface),
                        current: Some(cur_iface),
                    }
                }
            }
            (Some(des_iface), None) => {
                if des_iface.is_absent() || des_iface.is_ignore() {
                    Self {
                        for_verify: if des_iface.is_absent() {
                            Some(des_iface.clone())
                        } else {
                            None
                        },
                        for_apply: None,
                        merged: des_iface.clone(),
                        desired: Some(des_iface),
                        current: None,
                    }
                } else if des_iface.iface_type() == InterfaceType::Unknown {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {} has no type defined and does \
                            not exist in current state",
                            des_iface.name()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                } else {
                    Self {
                        for_verify: Some(des_iface.clone()),
                        for_apply: Some(des_iface.clone()),
                        merged: des_iface.clone(),
                        desired: Some(des_iface),
                        current: None,
                    }
                }
            }
            (None, Some(cur_iface)) => Self {
                for_verify: None,
                for_apply: None,
                merged: cur_iface.clone(),
                desired: None,
                current: Some(cur_iface),
            },
            (None, None) => {
                return Err(NetstateError::new(
                    ErrorKind::Bug,
                    "BUG: MergedInterface::new() got both desired \
                    and current set to None"
                        .to_string(),
                ));
            }
        };
        ret.post_merge_sanitize();
        Ok(ret)
    }

    fn post_merge_sanitize(&mut self) {
        if let (Some(apply_iface), Some(cur_iface)) =
            (self.for_apply.as_mut(), self.current.as_ref())
        {
            if let (Interface::Bond(apply), Interface::Bond(cur)) =
                (apply_iface, cur_iface)
            {
                apply.flag_mode_change(cur);
            }
        }
    }

    pub(crate) fn is_desired(&self) -> bool {
        self.desired.is_some()
    }

    pub(crate) fn is_changed(&self) -> bool {
        self.for_apply.is_some()
    }

    // Interface not mentioned in desired but changed by other interface,
    // e.g. port list changed because of port removal.
    pub(crate) fn mark_as_changed(&mut self) {
        if self.desired.is_none() {
            if let Some(cur_iface) = self.current.as_ref() {
                let mut new_iface = cur_iface.clone_name_type_only();
                new_iface.base_iface_mut().state =
                    self.merged.base_iface().state;
                self.desired = Some(new_iface);
            }
        }
        if self.for_apply.is_none() {
            self.for_apply = Some(self.merged.clone());
        }
        if self.for_verify.is_none() {
            self.for_verify = Some(self.merged.clone());
        }
    }

    // Apply a change to every view of this interface.
    pub(crate) fn apply_change<F>(&mut self, f: F)
    where
        F: Fn(&mut Interface),
    {
        f(&mut self.merged);
        if let Some(iface) = self.for_apply.as_mut() {
            f(iface);
        }
        if let Some(iface) = self.for_verify.as_mut() {
            f(iface);
        }
    }

    pub(crate) fn apply_ctrller_change(
        &mut self,
        ctrl_name: String,
        ctrl_type: Option<InterfaceType>,
        port_options: Option<serde_json::Value>,
    ) -> Result<(), NetstateError> {
        if self.merged.need_controller() && ctrl_name.is_empty() {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Interface {} cannot live without controller",
                    self.merged.name()
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        self.mark_as_changed();
        let ctrl_type_clone = ctrl_type.clone();
        self.apply_change(move |iface| {
            let base = iface.base_iface_mut();
            base.controller = Some(ctrl_name.clone());
            base.controller_type = ctrl_type_clone.clone();
            base.port_options = port_options.clone();
        });
        // Port of non-VRF controller cannot hold IP.
        if ctrl_type.is_some() && !self.merged.base_iface().can_have_ip() {
            self.apply_change(|iface| {
                let base = iface.base_iface_mut();
                base.ipv4 = None;
                base.ipv6 = None;
            });
        }
        Ok(())
    }
}
