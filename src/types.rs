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

//! Module containing all type definitions

use crate::addr::{MacAddress, ParseError};
use thiserror::Error;

/// Device identification (index into the device arena of the [`Fabric`](crate::Fabric))
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct DeviceId(pub(crate) usize);

/// Cable identification (index into the cable arena of the [`Fabric`](crate::Fabric))
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct CableId(pub(crate) usize);

/// Identification of a scheduled timer on the virtual clock
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct TimerId(pub(crate) u64);

/// Identification of a registered event handler
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct HandlerId(pub(crate) u64);

/// VLAN identifier (1..=4094)
pub type VlanId = u16;

/// OSPF area identifier
pub type AreaId = u32;

/// # Id Allocator
/// Allocator for device indices, cable indices and chassis/port MAC addresses.
/// The allocator is owned by the [`Fabric`](crate::Fabric); constructing a fresh
/// fabric resets all counters, so tests never share global mutable state.
#[derive(Debug, Clone)]
pub(crate) struct IdAllocator {
    next_device: usize,
    next_cable: usize,
    next_mac: u32,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self { next_device: 0, next_cable: 0, next_mac: 1 }
    }

    pub(crate) fn device_id(&mut self) -> DeviceId {
        let id = DeviceId(self.next_device);
        self.next_device += 1;
        id
    }

    pub(crate) fn cable_id(&mut self) -> CableId {
        let id = CableId(self.next_cable);
        self.next_cable += 1;
        id
    }

    /// Allocate the next locally-administered MAC address (`02:00:5e:xx:xx:xx`).
    pub(crate) fn mac_address(&mut self) -> MacAddress {
        let n = self.next_mac;
        self.next_mac += 1;
        MacAddress([0x02, 0x00, 0x5e, (n >> 16) as u8, (n >> 8) as u8, n as u8])
    }
}

/// Configuration Error
///
/// Raised when a protocol configuration command is incomplete or contradicts
/// the present configuration. The offending call leaves all tables untouched.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A `network <addr> <wildcard> area <id>` statement is missing its wildcard
    /// or area token.
    #[error("Incomplete command: {0}")]
    IncompleteCommand(&'static str),
    /// The router already runs an OSPF process with a different process id.
    #[error("OSPF process {0} is already running")]
    OspfProcessExists(u32),
    /// The requested OSPF process does not exist on this router.
    #[error("OSPF process {0} is not running")]
    NoOspfProcess(u32),
    /// OSPF cannot derive a router id because no interface has an IPv4 address.
    #[error("Cannot derive an OSPF router id: no interface has an IPv4 address")]
    NoRouterId,
    /// The VLAN id is outside of the valid range (1..=4094).
    #[error("Invalid VLAN id: {0}")]
    InvalidVlanId(VlanId),
    /// The VLAN does not exist on this switch.
    #[error("VLAN {0} does not exist")]
    NoSuchVlan(VlanId),
    /// A static route with the same destination already exists.
    #[error("Static route for {0} does already exist")]
    StaticRouteExists(String),
    /// The static route to remove does not exist.
    #[error("Static route for {0} does not exist")]
    NoStaticRoute(String),
    /// The next hop of a static route is not on any connected network.
    #[error("Next hop {0} is not on a connected network")]
    NextHopNotConnected(String),
    /// IPv6 must be enabled on the interface before the operation.
    #[error("IPv6 is not enabled on interface {0}")]
    Ipv6NotEnabled(String),
    /// RIP is already running on this router.
    #[error("RIP is already running")]
    RipProcessExists,
    /// RIP is not running on this router.
    #[error("RIP is not running")]
    NoRipProcess,
}

/// Network Errors
///
/// Top-level error type of the fabric. All errors are raised synchronously at
/// the offending call; frame delivery to an unreachable destination is *not*
/// an error (it is reported through the `FrameDropped` event instead).
#[derive(Error, Debug, PartialEq)]
pub enum NetworkError {
    /// Address literal could not be parsed
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    /// A device with the same name is already registered
    #[error("Device {0} is already registered")]
    DuplicateDevice(String),
    /// The chassis MAC address is already in use by another device
    #[error("MAC address {0} is already in use")]
    DuplicateMac(MacAddress),
    /// Device is not present in the topology
    #[error("Network device was not found in topology: {0:?}")]
    DeviceNotFound(DeviceId),
    /// Device name is not present in the topology
    #[error("Network device name was not found in topology: {0}")]
    DeviceNameNotFound(String),
    /// The named port does not exist on the device
    #[error("Port {1} was not found on device {0}")]
    PortNotFound(String, String),
    /// The named port already exists on the device
    #[error("Port {1} does already exist on device {0}")]
    DuplicatePort(String, String),
    /// The operation requires a switch
    #[error("Network device is not a switch: {0}")]
    NotASwitch(String),
    /// The operation requires a router
    #[error("Network device is not a router: {0}")]
    NotARouter(String),
    /// The operation requires a host
    #[error("Network device is not a host: {0}")]
    NotAHost(String),
}
