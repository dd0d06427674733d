// SPDX-License-Identifier: Apache-2.0

mod bond;
mod bridge;
mod checkpoint;
mod dns;
mod ethernet;
mod ethtool;
mod gen_diff;
mod hostname;
mod hsr;
mod infiniband;
mod ip;
mod ipvlan;
mod iplib;
mod mac_vlan;
mod macsec;
mod memory;
mod mptcp;
mod net_state;
mod ovn;
mod ovs;
mod route;
mod route_rule;
mod running_config;
mod schema;
mod sriov;
mod state;
mod testlib;
