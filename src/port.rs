// NetLab: Simulating Multi-Vendor Network Fabrics
// Copyright (C) 2024  NetLab Developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module defining a device attachment point (a port / interface).

use crate::addr::{Ipv4Address, Ipv6Address, MacAddress, SubnetMask};
use crate::frame::InterfaceAddress;
use crate::types::{CableId, VlanId};
use std::collections::BTreeSet;

/// Default interface bandwidth: 100 Mb/s, expressed in kb/s.
pub const DEFAULT_BANDWIDTH_KBPS: u64 = 100_000;

/// VLAN membership mode of a switch port.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum VlanMode {
    /// Untagged member of exactly one VLAN
    Access(VlanId),
    /// Tagged member of the allowed set of VLANs
    Trunk(BTreeSet<VlanId>),
}

/// Spanning-tree state of a port.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum StpPortState {
    /// Port is administratively down or unplugged
    Disabled,
    /// Port drops all frames
    Blocking,
    /// Port drops frames, BPDUs processed
    Listening,
    /// Port learns MAC addresses but does not forward
    Learning,
    /// Port learns and forwards
    Forwarding,
}

impl StpPortState {
    /// The next stage towards forwarding, if any.
    pub fn next(&self) -> Option<StpPortState> {
        match self {
            StpPortState::Disabled => None,
            StpPortState::Blocking => Some(StpPortState::Listening),
            StpPortState::Listening => Some(StpPortState::Learning),
            StpPortState::Learning => Some(StpPortState::Forwarding),
            StpPortState::Forwarding => None,
        }
    }
}

/// How an IPv6 address got onto an interface.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Ipv6Origin {
    /// Derived from the interface MAC when IPv6 was enabled
    LinkLocal,
    /// Configured explicitly
    Static,
    /// Formed by SLAAC from a router advertisement prefix
    Slaac,
}

/// An IPv6 address assigned to an interface.
#[derive(PartialEq, Debug, Clone)]
pub struct InterfaceIpv6 {
    /// The address
    pub address: Ipv6Address,
    /// Prefix length
    pub prefix_len: u8,
    /// Where the address came from
    pub origin: Ipv6Origin,
}

/// # Port
///
/// A device's attachment point. A port is owned by exactly one device and is
/// the endpoint of at most one cable. Layer-3 configuration (addresses) only
/// matters on hosts and routers; layer-2 configuration (VLAN, STP) only
/// matters on switches — the struct carries both so the fabric can treat
/// ports uniformly.
#[derive(PartialEq, Debug, Clone)]
pub struct Port {
    name: String,
    mac: MacAddress,
    admin_up: bool,
    ipv4: Option<InterfaceAddress>,
    ipv6_enabled: bool,
    ipv6: Vec<InterfaceIpv6>,
    vlan_mode: VlanMode,
    suspended: bool,
    stp_state: StpPortState,
    portfast: bool,
    bandwidth_kbps: u64,
    ospf_cost: Option<u32>,
    ospf_priority: u8,
    pub(crate) cable: Option<CableId>,
}

impl Port {
    /// Create a port with default attributes: administratively up, access
    /// port in VLAN 1, STP disabled until attached, 100 Mb/s.
    pub(crate) fn new<S: Into<String>>(name: S, mac: MacAddress) -> Self {
        Self {
            name: name.into(),
            mac,
            admin_up: true,
            ipv4: None,
            ipv6_enabled: false,
            ipv6: Vec::new(),
            vlan_mode: VlanMode::Access(1),
            suspended: false,
            stp_state: StpPortState::Disabled,
            portfast: false,
            bandwidth_kbps: DEFAULT_BANDWIDTH_KBPS,
            ospf_cost: None,
            ospf_priority: 1,
            cable: None,
        }
    }

    /// Name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MAC address of the port.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Administrative state.
    pub fn is_admin_up(&self) -> bool {
        self.admin_up
    }

    pub(crate) fn set_admin_up(&mut self, up: bool) {
        self.admin_up = up;
    }

    /// The configured IPv4 address and mask, if any.
    pub fn ipv4(&self) -> Option<InterfaceAddress> {
        self.ipv4
    }

    pub(crate) fn set_ipv4(&mut self, address: Ipv4Address, mask: SubnetMask) {
        self.ipv4 = Some(InterfaceAddress { address, mask });
    }

    pub(crate) fn clear_ipv4(&mut self) {
        self.ipv4 = None;
    }

    /// Whether IPv6 is enabled on this interface.
    pub fn is_ipv6_enabled(&self) -> bool {
        self.ipv6_enabled
    }

    /// Enable IPv6, generating the EUI-64 link-local address. Idempotent.
    pub(crate) fn enable_ipv6(&mut self) {
        if !self.ipv6_enabled {
            self.ipv6_enabled = true;
            self.ipv6.push(InterfaceIpv6 {
                address: Ipv6Address::eui64_link_local(self.mac),
                prefix_len: 64,
                origin: Ipv6Origin::LinkLocal,
            });
        }
    }

    /// Disable IPv6, dropping every assigned address.
    pub(crate) fn disable_ipv6(&mut self) {
        self.ipv6_enabled = false;
        self.ipv6.clear();
    }

    pub(crate) fn add_ipv6(&mut self, address: Ipv6Address, prefix_len: u8, origin: Ipv6Origin) {
        if !self.ipv6.iter().any(|a| a.address == address) {
            self.ipv6.push(InterfaceIpv6 { address, prefix_len, origin });
        }
    }

    pub(crate) fn remove_ipv6(&mut self, address: &Ipv6Address) -> bool {
        let before = self.ipv6.len();
        self.ipv6.retain(|a| &a.address != address || a.origin == Ipv6Origin::LinkLocal);
        self.ipv6.len() != before
    }

    /// All IPv6 addresses on the interface. The link-local address comes
    /// first when IPv6 is enabled.
    pub fn ipv6_addresses(&self) -> &[InterfaceIpv6] {
        &self.ipv6
    }

    /// The link-local address, if IPv6 is enabled.
    pub fn link_local(&self) -> Option<&Ipv6Address> {
        self.ipv6.iter().find(|a| a.origin == Ipv6Origin::LinkLocal).map(|a| &a.address)
    }

    /// Returns true if the given IPv6 address is assigned to this interface.
    pub fn has_ipv6(&self, address: &Ipv6Address) -> bool {
        self.ipv6.iter().any(|a| &a.address == address)
    }

    /// VLAN membership mode.
    pub fn vlan_mode(&self) -> &VlanMode {
        &self.vlan_mode
    }

    pub(crate) fn set_vlan_mode(&mut self, mode: VlanMode) {
        self.vlan_mode = mode;
    }

    /// The access VLAN, if the port is in access mode.
    pub fn access_vlan(&self) -> Option<VlanId> {
        match self.vlan_mode {
            VlanMode::Access(v) => Some(v),
            VlanMode::Trunk(_) => None,
        }
    }

    /// Returns true if the port carries traffic for the VLAN.
    pub fn carries_vlan(&self, vlan: VlanId) -> bool {
        match &self.vlan_mode {
            VlanMode::Access(v) => *v == vlan,
            VlanMode::Trunk(allowed) => allowed.contains(&vlan),
        }
    }

    /// Whether the port is suspended (its access VLAN was deleted).
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub(crate) fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Spanning-tree state.
    pub fn stp_state(&self) -> StpPortState {
        self.stp_state
    }

    pub(crate) fn set_stp_state(&mut self, state: StpPortState) {
        self.stp_state = state;
    }

    /// Whether PortFast is configured.
    pub fn is_portfast(&self) -> bool {
        self.portfast
    }

    pub(crate) fn set_portfast(&mut self, portfast: bool) {
        self.portfast = portfast;
    }

    /// Interface bandwidth in kb/s.
    pub fn bandwidth_kbps(&self) -> u64 {
        self.bandwidth_kbps
    }

    pub(crate) fn set_bandwidth_kbps(&mut self, bandwidth: u64) {
        self.bandwidth_kbps = bandwidth;
    }

    /// Explicit OSPF cost override, if configured.
    pub fn ospf_cost(&self) -> Option<u32> {
        self.ospf_cost
    }

    pub(crate) fn set_ospf_cost(&mut self, cost: Option<u32>) {
        self.ospf_cost = cost;
    }

    /// OSPF priority of the interface.
    pub fn ospf_priority(&self) -> u8 {
        self.ospf_priority
    }

    pub(crate) fn set_ospf_priority(&mut self, priority: u8) {
        self.ospf_priority = priority;
    }

    /// The cable this port is plugged into.
    pub fn cable(&self) -> Option<CableId> {
        self.cable
    }

    /// A port takes part in frame delivery iff it is up, plugged in and not
    /// suspended.
    pub fn is_operational(&self) -> bool {
        self.admin_up && self.cable.is_some() && !self.suspended
    }
}
