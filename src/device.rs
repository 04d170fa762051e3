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

//! Module defining the polymorphic network device and the end host.

use crate::addr::{Ipv4Address, MacAddress};
use crate::clock::VirtualClock;
use crate::event::{Event, EventQueue};
use crate::frame::{
    arp_reply, neighbor_advertisement, ArpMessage, ArpOperation, EthernetFrame, FramePayload,
    IcmpMessage, Icmpv6Message, Ipv4Packet, Ipv4Payload, Ipv6Packet, Ipv6Payload, NdpMessage,
};
use crate::neighbor::NeighborCaches;
use crate::port::{Ipv6Origin, Port};
use crate::router::Router;
use crate::switch::Switch;
use crate::types::{DeviceId, NetworkError};
use log::*;

/// The kind of a registered device.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DeviceKind {
    /// An end host
    Host,
    /// A Layer-2 switch
    Switch,
    /// A Layer-3 router
    Router,
}

/// # Host
///
/// An end system: one or more ports, neighbor caches, and an optional
/// default gateway. Hosts answer ARP/NDP and ICMP echo, and perform SLAAC
/// when a router advertisement carries an autonomous prefix.
#[derive(Debug)]
pub struct Host {
    pub(crate) device_id: DeviceId,
    name: String,
    mac: MacAddress,
    pub(crate) ports: Vec<Port>,
    pub(crate) gateway: Option<Ipv4Address>,
    pub(crate) caches: NeighborCaches,
}

impl Host {
    pub(crate) fn new(name: String, device_id: DeviceId, mac: MacAddress) -> Self {
        Self {
            device_id,
            name,
            mac,
            ports: Vec::new(),
            gateway: None,
            caches: NeighborCaches::new(),
        }
    }

    /// Name of the host.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chassis MAC address.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// The configured default gateway.
    pub fn gateway(&self) -> Option<Ipv4Address> {
        self.gateway
    }

    pub(crate) fn owns_mac(&self, mac: MacAddress) -> bool {
        self.mac == mac || self.ports.iter().any(|p| p.mac() == mac)
    }

    /// Process a frame delivered to this host.
    pub(crate) fn handle_frame(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        queue: &mut EventQueue,
    ) {
        match &frame.payload {
            FramePayload::Arp(arp) => self.handle_arp(port_index, arp, queue),
            FramePayload::Ipv4(packet) => self.handle_ipv4(port_index, frame, packet, queue),
            FramePayload::Ipv6(packet) => self.handle_ipv6(port_index, frame, packet, queue),
            FramePayload::Raw(..) => {}
        }
    }

    fn handle_arp(&mut self, port_index: usize, arp: &ArpMessage, queue: &mut EventQueue) {
        let port = &self.ports[port_index];
        let port_name = port.name().to_string();
        match arp.operation {
            ArpOperation::Request => {
                if port.ipv4().map(|a| a.address) == Some(arp.target_ip) {
                    self.caches.arp_insert(arp.sender_ip, arp.sender_mac, &port_name);
                    let reply = arp_reply(port.mac(), arp.target_ip, arp);
                    queue.push_back(Event::Transmit(self.device_id, port_name, reply));
                }
            }
            ArpOperation::Reply => {
                self.caches.arp_insert(arp.sender_ip, arp.sender_mac, &port_name);
            }
        }
    }

    fn handle_ipv4(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        packet: &Ipv4Packet,
        queue: &mut EventQueue,
    ) {
        let port = &self.ports[port_index];
        if port.ipv4().map(|a| a.address) != Some(packet.destination) {
            return;
        }
        if let Ipv4Payload::Icmp(IcmpMessage::EchoRequest(id, seq)) = &packet.payload {
            let reply = EthernetFrame::ipv4(
                port.mac(),
                frame.source,
                Ipv4Packet::new(
                    packet.destination,
                    packet.source,
                    Ipv4Payload::Icmp(IcmpMessage::EchoReply(*id, *seq)),
                ),
            );
            queue.push_back(Event::Transmit(self.device_id, port.name().to_string(), reply));
        }
    }

    fn handle_ipv6(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        packet: &Ipv6Packet,
        queue: &mut EventQueue,
    ) {
        if !self.ports[port_index].is_ipv6_enabled() {
            return;
        }
        let port_name = self.ports[port_index].name().to_string();
        let port_mac = self.ports[port_index].mac();
        match &packet.payload {
            Ipv6Payload::Icmpv6(Icmpv6Message::Ndp(ndp)) => match ndp {
                NdpMessage::NeighborSolicitation { target, source_link_layer } => {
                    if self.ports[port_index].has_ipv6(target) {
                        self.caches.ndp_insert(
                            packet.source.clone(),
                            *source_link_layer,
                            &port_name,
                        );
                        let reply = neighbor_advertisement(
                            port_mac,
                            target.clone(),
                            *source_link_layer,
                            packet.source.clone(),
                            target.clone(),
                        );
                        queue.push_back(Event::Transmit(self.device_id, port_name, reply));
                    }
                }
                NdpMessage::NeighborAdvertisement { target, target_link_layer } => {
                    self.caches.ndp_insert(target.clone(), *target_link_layer, &port_name);
                }
                NdpMessage::RouterAdvertisement { prefixes } => {
                    self.apply_slaac(port_index, prefixes);
                }
                NdpMessage::RouterSolicitation => {}
            },
            Ipv6Payload::Icmpv6(Icmpv6Message::EchoRequest(id, seq)) => {
                if self.ports[port_index].has_ipv6(&packet.destination) {
                    let reply = EthernetFrame::ipv6(
                        port_mac,
                        frame.source,
                        Ipv6Packet::new(
                            packet.destination.clone(),
                            packet.source.clone(),
                            Ipv6Payload::Icmpv6(Icmpv6Message::EchoReply(*id, *seq)),
                        ),
                    );
                    queue.push_back(Event::Transmit(self.device_id, port_name, reply));
                }
            }
            _ => {}
        }
    }

    /// Stateless address autoconfiguration: combine each autonomous prefix
    /// with the interface's EUI-64 identifier. The link-local address and
    /// everything else on the interface stay untouched.
    fn apply_slaac(&mut self, port_index: usize, prefixes: &[crate::frame::RaPrefixOption]) {
        let port = &mut self.ports[port_index];
        for option in prefixes.iter().filter(|p| p.autonomous) {
            let address = crate::addr::Ipv6Address::from_prefix_and_mac(
                option.prefix.clone(),
                port.mac(),
            );
            if !port.has_ipv6(&address) {
                debug!("{}: SLAAC address {} on {}", self.name, address, port.name());
                port.add_ipv6(address, option.prefix_len, Ipv6Origin::Slaac);
            }
        }
    }
}

/// A registered network device, polymorphic over host, switch and router.
#[derive(Debug)]
pub(crate) enum Device {
    Host(Host),
    Switch(Switch),
    Router(Router),
}

impl Device {
    pub(crate) fn name(&self) -> &str {
        match self {
            Device::Host(h) => h.name(),
            Device::Switch(s) => s.name(),
            Device::Router(r) => r.name(),
        }
    }

    pub(crate) fn kind(&self) -> DeviceKind {
        match self {
            Device::Host(_) => DeviceKind::Host,
            Device::Switch(_) => DeviceKind::Switch,
            Device::Router(_) => DeviceKind::Router,
        }
    }

    pub(crate) fn mac(&self) -> MacAddress {
        match self {
            Device::Host(h) => h.mac(),
            Device::Switch(s) => s.mac(),
            Device::Router(r) => r.mac(),
        }
    }

    pub(crate) fn ports(&self) -> &[Port] {
        match self {
            Device::Host(h) => &h.ports,
            Device::Switch(s) => &s.ports,
            Device::Router(r) => &r.ports,
        }
    }

    pub(crate) fn ports_mut(&mut self) -> &mut Vec<Port> {
        match self {
            Device::Host(h) => &mut h.ports,
            Device::Switch(s) => &mut s.ports,
            Device::Router(r) => &mut r.ports,
        }
    }

    pub(crate) fn port_index(&self, name: &str) -> Option<usize> {
        self.ports().iter().position(|p| p.name() == name)
    }

    /// The neighbor caches of the device, if it has any (hosts and routers).
    pub(crate) fn caches_mut(&mut self) -> Option<&mut NeighborCaches> {
        match self {
            Device::Host(h) => Some(&mut h.caches),
            Device::Switch(_) => None,
            Device::Router(r) => Some(&mut r.caches),
        }
    }

    /// The neighbor caches of the device, if it has any (hosts and routers).
    pub(crate) fn caches(&self) -> Option<&NeighborCaches> {
        match self {
            Device::Host(h) => Some(&h.caches),
            Device::Switch(_) => None,
            Device::Router(r) => Some(&r.caches),
        }
    }

    /// Returns true if the MAC belongs to this device (chassis or any port).
    pub(crate) fn owns_mac(&self, mac: MacAddress) -> bool {
        match self {
            Device::Host(h) => h.owns_mac(mac),
            Device::Switch(s) => s.mac() == mac || s.ports.iter().any(|p| p.mac() == mac),
            Device::Router(r) => r.owns_mac(mac),
        }
    }

    /// Dispatch a delivered frame to the device's protocol handlers.
    /// Switches never terminate frames; they are handled by the delivery
    /// walk itself.
    pub(crate) fn handle_frame(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        queue: &mut EventQueue,
        clock: &mut VirtualClock,
    ) {
        match self {
            Device::Host(h) => h.handle_frame(port_index, frame, queue),
            Device::Switch(_) => {}
            Device::Router(r) => r.handle_frame(port_index, frame, queue, clock),
        }
    }
}

/// # Fabric Device (similar to `Option`)
/// Enumerates all possible device views returned by
/// [`Fabric::get_device`](crate::Fabric::get_device). This struct behaves
/// similar to an `Option`, but it knows three different `Some` values, one
/// per device kind. Thus, it knows the `unwrap_host`, `unwrap_switch` and
/// `unwrap_router` functions, as well as `host_or`, `switch_or` and
/// `router_or`.
#[derive(Debug)]
pub enum FabricDevice<'a> {
    /// An end host
    Host(&'a Host),
    /// A Layer-2 switch
    Switch(&'a Switch),
    /// A Layer-3 router
    Router(&'a Router),
    /// None was found
    None,
}

impl<'a> FabricDevice<'a> {
    /// Returns the host or **panics**, if the enum is not a `FabricDevice::Host`
    pub fn unwrap_host(self) -> &'a Host {
        match self {
            Self::Host(h) => h,
            Self::Switch(_) => panic!("`unwrap_host()` called on a `FabricDevice::Switch`"),
            Self::Router(_) => panic!("`unwrap_host()` called on a `FabricDevice::Router`"),
            Self::None => panic!("`unwrap_host()` called on a `FabricDevice::None`"),
        }
    }

    /// Returns the switch or **panics**, if the enum is not a `FabricDevice::Switch`
    pub fn unwrap_switch(self) -> &'a Switch {
        match self {
            Self::Switch(s) => s,
            Self::Host(_) => panic!("`unwrap_switch()` called on a `FabricDevice::Host`"),
            Self::Router(_) => panic!("`unwrap_switch()` called on a `FabricDevice::Router`"),
            Self::None => panic!("`unwrap_switch()` called on a `FabricDevice::None`"),
        }
    }

    /// Returns the router or **panics**, if the enum is not a `FabricDevice::Router`
    pub fn unwrap_router(self) -> &'a Router {
        match self {
            Self::Router(r) => r,
            Self::Host(_) => panic!("`unwrap_router()` called on a `FabricDevice::Host`"),
            Self::Switch(_) => panic!("`unwrap_router()` called on a `FabricDevice::Switch`"),
            Self::None => panic!("`unwrap_router()` called on a `FabricDevice::None`"),
        }
    }

    /// Returns true if and only if self contains a host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Returns true if and only if self contains a switch.
    pub fn is_switch(&self) -> bool {
        matches!(self, Self::Switch(_))
    }

    /// Returns true if and only if self contains a router.
    pub fn is_router(&self) -> bool {
        matches!(self, Self::Router(_))
    }

    /// Returns true if and only if self contains `FabricDevice::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Maps the `FabricDevice` to an option, with `Some(h)` only if self is `Host`.
    pub fn host(self) -> Option<&'a Host> {
        match self {
            Self::Host(h) => Some(h),
            _ => None,
        }
    }

    /// Maps the `FabricDevice` to an option, with `Some(s)` only if self is `Switch`.
    pub fn switch(self) -> Option<&'a Switch> {
        match self {
            Self::Switch(s) => Some(s),
            _ => None,
        }
    }

    /// Maps the `FabricDevice` to an option, with `Some(r)` only if self is `Router`.
    pub fn router(self) -> Option<&'a Router> {
        match self {
            Self::Router(r) => Some(r),
            _ => None,
        }
    }

    /// Maps the `FabricDevice` to a result, with the `Ok` case only if self
    /// is `Host`.
    pub fn host_or(self, error: NetworkError) -> Result<&'a Host, NetworkError> {
        match self {
            Self::Host(h) => Ok(h),
            _ => Err(error),
        }
    }

    /// Maps the `FabricDevice` to a result, with the `Ok` case only if self
    /// is `Switch`.
    pub fn switch_or(self, error: NetworkError) -> Result<&'a Switch, NetworkError> {
        match self {
            Self::Switch(s) => Ok(s),
            _ => Err(error),
        }
    }

    /// Maps the `FabricDevice` to a result, with the `Ok` case only if self
    /// is `Router`.
    pub fn router_or(self, error: NetworkError) -> Result<&'a Router, NetworkError> {
        match self {
            Self::Router(r) => Ok(r),
            _ => Err(error),
        }
    }
}
