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

//! # Frame and packet model
//!
//! Immutable records representing an Ethernet frame and its encapsulated
//! IPv4/IPv6/ICMP/ARP/NDP payloads. Frames carry typed messages, not wire
//! bytes; the simulation never serializes them.

use crate::addr::{Ipv4Address, Ipv6Address, MacAddress, SubnetMask};
use crate::routing::ospf::OspfMessage;
use crate::routing::rip::RipMessage;
use crate::types::VlanId;

/// EtherType of IPv4
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// EtherType of ARP
pub const ETHERTYPE_ARP: u16 = 0x0806;
/// EtherType of IPv6
pub const ETHERTYPE_IPV6: u16 = 0x86dd;

/// Default TTL / hop limit for generated packets
pub const DEFAULT_TTL: u8 = 64;

/// An Ethernet frame. The optional VLAN id models the 802.1Q tag added on
/// trunk hops; frames on access links are untagged.
#[derive(PartialEq, Debug, Clone)]
pub struct EthernetFrame {
    /// Source MAC address
    pub source: MacAddress,
    /// Destination MAC address
    pub destination: MacAddress,
    /// 802.1Q VLAN tag, present only on trunk links
    pub vlan: Option<VlanId>,
    /// Encapsulated payload
    pub payload: FramePayload,
}

/// Payload of an [`EthernetFrame`].
#[derive(PartialEq, Debug, Clone)]
pub enum FramePayload {
    /// An IPv4 packet
    Ipv4(Ipv4Packet),
    /// An IPv6 packet
    Ipv6(Ipv6Packet),
    /// An ARP message
    Arp(ArpMessage),
    /// Opaque application bytes with an explicit EtherType
    Raw(u16, Vec<u8>),
}

impl EthernetFrame {
    /// Frame carrying an IPv4 packet.
    pub fn ipv4(source: MacAddress, destination: MacAddress, packet: Ipv4Packet) -> Self {
        Self { source, destination, vlan: None, payload: FramePayload::Ipv4(packet) }
    }

    /// Frame carrying an IPv6 packet.
    pub fn ipv6(source: MacAddress, destination: MacAddress, packet: Ipv6Packet) -> Self {
        Self { source, destination, vlan: None, payload: FramePayload::Ipv6(packet) }
    }

    /// Frame carrying an ARP message.
    pub fn arp(source: MacAddress, destination: MacAddress, message: ArpMessage) -> Self {
        Self { source, destination, vlan: None, payload: FramePayload::Arp(message) }
    }

    /// The EtherType corresponding to the payload.
    pub fn ethertype(&self) -> u16 {
        match &self.payload {
            FramePayload::Ipv4(_) => ETHERTYPE_IPV4,
            FramePayload::Ipv6(_) => ETHERTYPE_IPV6,
            FramePayload::Arp(_) => ETHERTYPE_ARP,
            FramePayload::Raw(ethertype, _) => *ethertype,
        }
    }

    /// Replace the VLAN tag.
    pub fn with_vlan(mut self, vlan: Option<VlanId>) -> Self {
        self.vlan = vlan;
        self
    }
}

/// An IPv4 packet.
#[derive(PartialEq, Debug, Clone)]
pub struct Ipv4Packet {
    /// Source address
    pub source: Ipv4Address,
    /// Destination address
    pub destination: Ipv4Address,
    /// Time to live
    pub ttl: u8,
    /// Encapsulated payload
    pub payload: Ipv4Payload,
}

/// Payload of an [`Ipv4Packet`].
#[derive(PartialEq, Debug, Clone)]
pub enum Ipv4Payload {
    /// ICMP message
    Icmp(IcmpMessage),
    /// OSPF protocol message
    Ospf(OspfMessage),
    /// RIP protocol message
    Rip(RipMessage),
    /// Opaque application payload
    Data(Vec<u8>),
}

impl Ipv4Packet {
    /// Build a packet with the default TTL.
    pub fn new(source: Ipv4Address, destination: Ipv4Address, payload: Ipv4Payload) -> Self {
        Self { source, destination, ttl: DEFAULT_TTL, payload }
    }

    /// The IANA protocol number of the payload.
    pub fn protocol(&self) -> u8 {
        match &self.payload {
            Ipv4Payload::Icmp(_) => 1,
            Ipv4Payload::Ospf(_) => 89,
            Ipv4Payload::Rip(_) => 17,
            Ipv4Payload::Data(_) => 253,
        }
    }
}

/// An IPv6 packet.
#[derive(PartialEq, Debug, Clone)]
pub struct Ipv6Packet {
    /// Source address
    pub source: Ipv6Address,
    /// Destination address
    pub destination: Ipv6Address,
    /// Hop limit
    pub hop_limit: u8,
    /// Encapsulated payload
    pub payload: Ipv6Payload,
}

/// Payload of an [`Ipv6Packet`].
#[derive(PartialEq, Debug, Clone)]
pub enum Ipv6Payload {
    /// ICMPv6 message (including neighbor discovery)
    Icmpv6(Icmpv6Message),
    /// Opaque application payload
    Data(Vec<u8>),
}

impl Ipv6Packet {
    /// Build a packet with the default hop limit.
    pub fn new(source: Ipv6Address, destination: Ipv6Address, payload: Ipv6Payload) -> Self {
        Self { source, destination, hop_limit: DEFAULT_TTL, payload }
    }

    /// The IANA next-header number of the payload.
    pub fn next_header(&self) -> u8 {
        match &self.payload {
            Ipv6Payload::Icmpv6(_) => 58,
            Ipv6Payload::Data(_) => 253,
        }
    }
}

/// ARP operation
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ArpOperation {
    /// Who-has request, broadcast
    Request,
    /// Is-at reply, unicast
    Reply,
}

/// An ARP message (IPv4 over Ethernet).
#[derive(PartialEq, Debug, Clone)]
pub struct ArpMessage {
    /// Request or reply
    pub operation: ArpOperation,
    /// Link-layer address of the sender
    pub sender_mac: MacAddress,
    /// Protocol address of the sender
    pub sender_ip: Ipv4Address,
    /// Link-layer address of the target (unspecified in requests)
    pub target_mac: Option<MacAddress>,
    /// Protocol address being resolved
    pub target_ip: Ipv4Address,
}

/// An ICMP message.
#[derive(PartialEq, Debug, Clone)]
pub enum IcmpMessage {
    /// Echo request with identifier and sequence number
    EchoRequest(u16, u16),
    /// Echo reply with identifier and sequence number
    EchoReply(u16, u16),
    /// Destination unreachable
    DestinationUnreachable,
    /// TTL exceeded in transit
    TimeExceeded,
}

/// An ICMPv6 message.
#[derive(PartialEq, Debug, Clone)]
pub enum Icmpv6Message {
    /// Echo request with identifier and sequence number
    EchoRequest(u16, u16),
    /// Echo reply with identifier and sequence number
    EchoReply(u16, u16),
    /// Neighbor discovery sub-message
    Ndp(NdpMessage),
}

/// A neighbor discovery message carried in ICMPv6.
#[derive(PartialEq, Debug, Clone)]
pub enum NdpMessage {
    /// Who-has for an IPv6 address, sent to the solicited-node group
    NeighborSolicitation {
        /// Address being resolved
        target: Ipv6Address,
        /// Link-layer address of the solicitor
        source_link_layer: MacAddress,
    },
    /// Response to a solicitation
    NeighborAdvertisement {
        /// Address that was resolved
        target: Ipv6Address,
        /// Link-layer address of the target
        target_link_layer: MacAddress,
    },
    /// Sent by hosts to ask routers for an immediate advertisement
    RouterSolicitation,
    /// Sent by routers, carries prefix options for SLAAC
    RouterAdvertisement {
        /// Advertised prefixes
        prefixes: Vec<RaPrefixOption>,
    },
}

/// A prefix information option in a router advertisement.
#[derive(PartialEq, Debug, Clone)]
pub struct RaPrefixOption {
    /// The advertised prefix
    pub prefix: Ipv6Address,
    /// Prefix length in bits
    pub prefix_len: u8,
    /// Prefix is usable for on-link determination
    pub on_link: bool,
    /// Prefix is usable for stateless address autoconfiguration
    pub autonomous: bool,
}

/// ARP request asking for `target_ip`, broadcast from the given interface.
pub fn arp_request(
    sender_mac: MacAddress,
    sender_ip: Ipv4Address,
    target_ip: Ipv4Address,
) -> EthernetFrame {
    EthernetFrame::arp(
        sender_mac,
        MacAddress::broadcast(),
        ArpMessage {
            operation: ArpOperation::Request,
            sender_mac,
            sender_ip,
            target_mac: None,
            target_ip,
        },
    )
}

/// ARP reply answering `request`, unicast back to the requester.
pub fn arp_reply(sender_mac: MacAddress, sender_ip: Ipv4Address, request: &ArpMessage) -> EthernetFrame {
    EthernetFrame::arp(
        sender_mac,
        request.sender_mac,
        ArpMessage {
            operation: ArpOperation::Reply,
            sender_mac,
            sender_ip,
            target_mac: Some(request.sender_mac),
            target_ip: request.sender_ip,
        },
    )
}

/// Neighbor solicitation for `target`, sent to its solicited-node group.
pub fn neighbor_solicitation(
    sender_mac: MacAddress,
    sender_ip: Ipv6Address,
    target: Ipv6Address,
) -> EthernetFrame {
    let group = target.solicited_node();
    EthernetFrame::ipv6(
        sender_mac,
        group.multicast_mac(),
        Ipv6Packet::new(
            sender_ip,
            group,
            Ipv6Payload::Icmpv6(Icmpv6Message::Ndp(NdpMessage::NeighborSolicitation {
                target,
                source_link_layer: sender_mac,
            })),
        ),
    )
}

/// Neighbor advertisement answering a solicitation for `target`.
pub fn neighbor_advertisement(
    sender_mac: MacAddress,
    sender_ip: Ipv6Address,
    solicitor_mac: MacAddress,
    solicitor_ip: Ipv6Address,
    target: Ipv6Address,
) -> EthernetFrame {
    EthernetFrame::ipv6(
        sender_mac,
        solicitor_mac,
        Ipv6Packet::new(
            sender_ip,
            solicitor_ip,
            Ipv6Payload::Icmpv6(Icmpv6Message::Ndp(NdpMessage::NeighborAdvertisement {
                target,
                target_link_layer: sender_mac,
            })),
        ),
    )
}

/// Router advertisement to the all-nodes group.
pub fn router_advertisement(
    sender_mac: MacAddress,
    sender_ip: Ipv6Address,
    prefixes: Vec<RaPrefixOption>,
) -> EthernetFrame {
    let group = Ipv6Address::all_nodes();
    EthernetFrame::ipv6(
        sender_mac,
        group.multicast_mac(),
        Ipv6Packet::new(
            sender_ip,
            group,
            Ipv6Payload::Icmpv6(Icmpv6Message::Ndp(NdpMessage::RouterAdvertisement { prefixes })),
        ),
    )
}

/// OSPF packet to the AllSPFRouters group `224.0.0.5`.
pub fn ospf_multicast(
    sender_mac: MacAddress,
    sender_ip: Ipv4Address,
    message: OspfMessage,
) -> EthernetFrame {
    // 224.0.0.5 maps to MAC 01:00:5e:00:00:05
    EthernetFrame::ipv4(
        sender_mac,
        MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x05]),
        Ipv4Packet {
            source: sender_ip,
            destination: Ipv4Address([224, 0, 0, 5]),
            ttl: 1,
            payload: Ipv4Payload::Ospf(message),
        },
    )
}

/// RIPv2 update to the RIP routers group `224.0.0.9`.
pub fn rip_multicast(
    sender_mac: MacAddress,
    sender_ip: Ipv4Address,
    message: RipMessage,
) -> EthernetFrame {
    EthernetFrame::ipv4(
        sender_mac,
        MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x09]),
        Ipv4Packet {
            source: sender_ip,
            destination: Ipv4Address([224, 0, 0, 9]),
            ttl: 1,
            payload: Ipv4Payload::Rip(message),
        },
    )
}

/// The interface description used when deriving connected routes: an IPv4
/// address with its mask.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct InterfaceAddress {
    /// Configured address
    pub address: Ipv4Address,
    /// Configured mask
    pub mask: SubnetMask,
}
