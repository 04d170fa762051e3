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

//! # Topology mediator
//!
//! This module represents the network topology: the device registry, the
//! cable graph, frame delivery, and all configuration operations. The
//! [`Fabric`] owns every device, the event queue and the virtual clock;
//! every public operation executes to completion synchronously before it
//! returns.

use crate::addr::{Ipv4Address, Ipv4Network, Ipv6Address, Ipv6Network, MacAddress, SubnetMask};
use crate::clock::{SimTime, TimerKind, TimerScope, VirtualClock};
use crate::device::{Device, DeviceKind, FabricDevice, Host};
use crate::event::{Event, EventHandlers, EventQueue, FabricEvent};
use crate::frame::{arp_request, neighbor_solicitation, EthernetFrame};
use crate::neighbor::NeighborEntry;
use crate::port::{Port, StpPortState, VlanMode};
use crate::router::Router;
use crate::routing::ospf::{
    AreaType, Lsa, NetworkStatement, OspfAreaInfo, OspfNeighborInfo, OspfProcess, HELLO_INTERVAL,
};
use crate::routing::rip::{RipProcess, UPDATE_INTERVAL};
use crate::routing::{Ipv6RouteEntry, RouteEntry, RouteSource};
use crate::switch::{MacTableEntry, Switch, VlanTableEntry, STP_FORWARD_DELAY_SECS};
use crate::types::{
    AreaId, CableId, ConfigError, DeviceId, HandlerId, IdAllocator, NetworkError, VlanId,
};
use itertools::Itertools;
use log::*;
use std::collections::{HashMap, HashSet, VecDeque};

/// Upper bound on events processed per queue drain, as a safety net against
/// a frame storm that the visited-set logic failed to contain.
static DEFAULT_STOP_AFTER: usize = 10_000;

/// Seconds between MAC table aging sweeps.
const MAC_AGING_SWEEP_SECS: u64 = 60;

/// A cable between exactly two ports.
#[derive(PartialEq, Eq, Debug, Clone)]
pub(crate) struct Cable {
    a: (DeviceId, String),
    b: (DeviceId, String),
}

impl Cable {
    /// The far end, given one end.
    fn peer_of(&self, device: DeviceId, port: &str) -> Option<(DeviceId, &str)> {
        if self.a.0 == device && self.a.1 == port {
            Some((self.b.0, self.b.1.as_str()))
        } else if self.b.0 == device && self.b.1 == port {
            Some((self.a.0, self.a.1.as_str()))
        } else {
            None
        }
    }
}

/// Cumulative frame counters, since construction or the last reset.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct FabricStatistics {
    /// Frames submitted for delivery (every transmission counts, whatever
    /// its outcome)
    pub total_frames: usize,
    /// `FrameReceived` deliveries
    pub delivered_frames: usize,
    /// Undeliverable unicast frames
    pub dropped_frames: usize,
    /// Broadcast frames submitted
    pub broadcast_frames: usize,
}

/// # Fabric
///
/// The topology mediator. It owns the device registry, the cable arena, the
/// event queue and the virtual clock, and it enforces the registry
/// invariants (unique device names, unique chassis MACs, one cable per
/// port) at a single choke point. All protocol state lives inside the
/// devices; cross-component reads go through accessor methods.
#[derive(Debug)]
pub struct Fabric {
    devices: HashMap<DeviceId, Device>,
    names: HashMap<String, DeviceId>,
    macs: HashMap<MacAddress, DeviceId>,
    cables: Vec<Option<Cable>>,
    allocator: IdAllocator,
    clock: VirtualClock,
    queue: EventQueue,
    handlers: EventHandlers,
    pending_events: Vec<FabricEvent>,
    statistics: FabricStatistics,
}

impl Default for Fabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Fabric {
    /// Generate an empty fabric with a fresh id allocator and a virtual
    /// clock at time zero.
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
            names: HashMap::new(),
            macs: HashMap::new(),
            cables: Vec::new(),
            allocator: IdAllocator::new(),
            clock: VirtualClock::new(),
            queue: EventQueue::new(),
            handlers: EventHandlers::new(),
            pending_events: Vec::new(),
            statistics: FabricStatistics::default(),
        }
    }

    // ------------------
    // Device lifecycle
    // ------------------

    fn register(
        &mut self,
        name: &str,
        kind: DeviceKind,
        mac: Option<MacAddress>,
    ) -> Result<DeviceId, NetworkError> {
        if self.names.contains_key(name) {
            return Err(NetworkError::DuplicateDevice(name.to_string()));
        }
        let mac = mac.unwrap_or_else(|| self.allocator.mac_address());
        if self.macs.contains_key(&mac) {
            return Err(NetworkError::DuplicateMac(mac));
        }
        let id = self.allocator.device_id();
        let device = match kind {
            DeviceKind::Host => Device::Host(Host::new(name.to_string(), id, mac)),
            DeviceKind::Switch => {
                // periodic MAC aging sweep runs for the switch's lifetime
                self.clock.schedule(
                    SimTime::from_secs(MAC_AGING_SWEEP_SECS),
                    TimerScope::Device(id),
                    TimerKind::MacAging(id),
                );
                Device::Switch(Switch::new(name.to_string(), mac))
            }
            DeviceKind::Router => Device::Router(Router::new(name.to_string(), id, mac)),
        };
        debug!("registered {:?} {} as {:?}", kind, name, id);
        self.devices.insert(id, device);
        self.names.insert(name.to_string(), id);
        self.macs.insert(mac, id);
        self.pending_events
            .push(FabricEvent::DeviceRegistered { device: id, name: name.to_string() });
        self.flush_events();
        Ok(id)
    }

    /// Register a host with an allocated chassis MAC address.
    pub fn add_host<S: AsRef<str>>(&mut self, name: S) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Host, None)
    }

    /// Register a host with an explicit chassis MAC address.
    pub fn add_host_with_mac<S: AsRef<str>>(
        &mut self,
        name: S,
        mac: MacAddress,
    ) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Host, Some(mac))
    }

    /// Register a switch with an allocated chassis MAC address.
    pub fn add_switch<S: AsRef<str>>(&mut self, name: S) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Switch, None)
    }

    /// Register a switch with an explicit chassis MAC address.
    pub fn add_switch_with_mac<S: AsRef<str>>(
        &mut self,
        name: S,
        mac: MacAddress,
    ) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Switch, Some(mac))
    }

    /// Register a router with an allocated chassis MAC address.
    pub fn add_router<S: AsRef<str>>(&mut self, name: S) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Router, None)
    }

    /// Register a router with an explicit chassis MAC address.
    pub fn add_router_with_mac<S: AsRef<str>>(
        &mut self,
        name: S,
        mac: MacAddress,
    ) -> Result<DeviceId, NetworkError> {
        self.register(name.as_ref(), DeviceKind::Router, Some(mac))
    }

    /// Unregister a device: all its cables are disconnected, all its timers
    /// cancelled, and its registry entries removed.
    pub fn remove_device(&mut self, device: DeviceId) -> Result<(), NetworkError> {
        let name = self.device_name(device)?.to_string();
        let ports: Vec<String> = self
            .devices
            .get(&device)
            .map(|d| d.ports().iter().map(|p| p.name().to_string()).collect())
            .unwrap_or_default();
        for port in ports {
            let _ = self.disconnect(device, &port);
        }
        self.clock.cancel_scope(&TimerScope::Device(device));
        let removed = self.devices.remove(&device);
        self.names.remove(&name);
        if let Some(d) = removed {
            self.macs.remove(&d.mac());
        }
        self.pending_events.push(FabricEvent::DeviceUnregistered { device, name });
        self.flush_events();
        Ok(())
    }

    // ------------------
    // Lookup
    // ------------------

    /// Get the device id from the name.
    pub fn device_id(&self, name: &str) -> Result<DeviceId, NetworkError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::DeviceNameNotFound(name.to_string()))
    }

    /// Get the name of the device.
    pub fn device_name(&self, device: DeviceId) -> Result<&str, NetworkError> {
        self.devices
            .get(&device)
            .map(|d| d.name())
            .ok_or(NetworkError::DeviceNotFound(device))
    }

    /// Get a typed view of a device.
    pub fn get_device(&self, device: DeviceId) -> FabricDevice<'_> {
        match self.devices.get(&device) {
            Some(Device::Host(h)) => FabricDevice::Host(h),
            Some(Device::Switch(s)) => FabricDevice::Switch(s),
            Some(Device::Router(r)) => FabricDevice::Router(r),
            None => FabricDevice::None,
        }
    }

    /// All registered devices, sorted by id.
    pub fn devices(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().sorted().collect()
    }

    /// The kind of a device.
    pub fn device_kind(&self, device: DeviceId) -> Result<DeviceKind, NetworkError> {
        self.devices
            .get(&device)
            .map(|d| d.kind())
            .ok_or(NetworkError::DeviceNotFound(device))
    }

    /// The current virtual time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    fn switch_mut(&mut self, device: DeviceId) -> Result<&mut Switch, NetworkError> {
        let name = self.device_name(device)?.to_string();
        match self.devices.get_mut(&device) {
            Some(Device::Switch(s)) => Ok(s),
            Some(_) => Err(NetworkError::NotASwitch(name)),
            None => Err(NetworkError::DeviceNotFound(device)),
        }
    }

    /// Run a closure against a router together with the queue and clock,
    /// keeping the borrows disjoint.
    fn with_router<T>(
        &mut self,
        device: DeviceId,
        f: impl FnOnce(&mut Router, &mut EventQueue, &mut VirtualClock) -> Result<T, NetworkError>,
    ) -> Result<T, NetworkError> {
        let name = self.device_name(device)?.to_string();
        let Self { devices, queue, clock, .. } = self;
        match devices.get_mut(&device) {
            Some(Device::Router(r)) => f(r, queue, clock),
            Some(_) => Err(NetworkError::NotARouter(name)),
            None => Err(NetworkError::DeviceNotFound(device)),
        }
    }

    // ------------------
    // Ports
    // ------------------

    /// Create a port on a device. The port MAC is allocated by the fabric.
    pub fn add_port(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        let name = self.device_name(device)?.to_string();
        if self.devices.get(&device).and_then(|d| d.port_index(port)).is_some() {
            return Err(NetworkError::DuplicatePort(name, port.to_string()));
        }
        let mac = self.allocator.mac_address();
        let dev = self.devices.get_mut(&device).ok_or(NetworkError::DeviceNotFound(device))?;
        dev.ports_mut().push(Port::new(port, mac));
        Ok(())
    }

    /// Destroy a port: its cable is disconnected and its timers cancelled.
    pub fn remove_port(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        self.port_index(device, port)?;
        let _ = self.disconnect(device, port);
        self.clock.cancel_scope(&TimerScope::Port(device, port.to_string()));
        let dev = self.devices.get_mut(&device).ok_or(NetworkError::DeviceNotFound(device))?;
        dev.ports_mut().retain(|p| p.name() != port);
        self.after_l3_change(device);
        Ok(())
    }

    fn port_index(&self, device: DeviceId, port: &str) -> Result<usize, NetworkError> {
        let dev = self.devices.get(&device).ok_or(NetworkError::DeviceNotFound(device))?;
        dev.port_index(port)
            .ok_or_else(|| NetworkError::PortNotFound(dev.name().to_string(), port.to_string()))
    }

    /// A read-only view of a port.
    pub fn get_port(&self, device: DeviceId, port: &str) -> Result<&Port, NetworkError> {
        let index = self.port_index(device, port)?;
        Ok(&self.devices[&device].ports()[index])
    }

    fn port_mut(&mut self, device: DeviceId, port: &str) -> Result<&mut Port, NetworkError> {
        let index = self.port_index(device, port)?;
        Ok(&mut self.devices.get_mut(&device).unwrap().ports_mut()[index])
    }

    // ------------------
    // Cables
    // ------------------

    /// Connect two ports with a cable. A port already in a cable is
    /// implicitly disconnected first.
    pub fn connect(
        &mut self,
        device_a: DeviceId,
        port_a: &str,
        device_b: DeviceId,
        port_b: &str,
    ) -> Result<CableId, NetworkError> {
        self.port_index(device_a, port_a)?;
        self.port_index(device_b, port_b)?;
        if self.get_port(device_a, port_a)?.cable.is_some() {
            self.disconnect(device_a, port_a)?;
        }
        if self.get_port(device_b, port_b)?.cable.is_some() {
            self.disconnect(device_b, port_b)?;
        }
        let id = self.allocator.cable_id();
        while self.cables.len() <= id.0 {
            self.cables.push(None);
        }
        self.cables[id.0] = Some(Cable {
            a: (device_a, port_a.to_string()),
            b: (device_b, port_b.to_string()),
        });
        self.port_mut(device_a, port_a)?.cable = Some(id);
        self.port_mut(device_b, port_b)?.cable = Some(id);
        self.port_came_up(device_a, port_a);
        self.port_came_up(device_b, port_b);
        self.settle();
        Ok(id)
    }

    /// Disconnect the cable plugged into a port, freeing both ends.
    pub fn disconnect(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        let index = self.port_index(device, port)?;
        let cable_id = match self.devices[&device].ports()[index].cable {
            Some(id) => id,
            None => return Ok(()),
        };
        let cable = self.cables[cable_id.0].take();
        if let Some(cable) = cable {
            for (dev, port_name) in [cable.a, cable.b] {
                if let Ok(p) = self.port_mut(dev, &port_name) {
                    p.cable = None;
                }
                self.port_went_down(dev, &port_name);
            }
        }
        self.settle();
        Ok(())
    }

    /// Bring the link layer of a port up: spanning tree (re)starts on switch
    /// ports, everything else forwards immediately.
    fn port_came_up(&mut self, device: DeviceId, port: &str) {
        let index = match self.port_index(device, port) {
            Ok(i) => i,
            Err(_) => return,
        };
        let Self { devices, clock, queue, .. } = self;
        match devices.get_mut(&device) {
            Some(Device::Switch(switch)) => {
                let p = &mut switch.ports[index];
                if !p.is_admin_up() || p.cable.is_none() {
                    return;
                }
                let initial = Switch::stp_initial_state(p);
                p.set_stp_state(initial);
                if initial != StpPortState::Forwarding {
                    clock.schedule(
                        SimTime::from_secs(STP_FORWARD_DELAY_SECS),
                        TimerScope::Port(device, port.to_string()),
                        TimerKind::StpTransition(device, port.to_string()),
                    );
                }
            }
            Some(Device::Router(router)) => {
                router.ports[index].set_stp_state(StpPortState::Forwarding);
                router.refresh_connected_routes();
                router.ospf_sync(queue);
            }
            Some(Device::Host(host)) => {
                host.ports[index].set_stp_state(StpPortState::Forwarding);
            }
            None => {}
        }
    }

    /// Tear down everything a dead link invalidates: STP state, port
    /// timers, MAC entries and neighbor cache entries learned through the
    /// port, and OSPF adjacencies on it.
    fn port_went_down(&mut self, device: DeviceId, port: &str) {
        self.clock.cancel_scope(&TimerScope::Port(device, port.to_string()));
        let index = match self.port_index(device, port) {
            Ok(i) => i,
            Err(_) => return,
        };
        let Self { devices, queue, .. } = self;
        match devices.get_mut(&device) {
            Some(Device::Switch(switch)) => {
                switch.ports[index].set_stp_state(StpPortState::Disabled);
                switch.flush_port(port);
            }
            Some(Device::Router(router)) => {
                router.ports[index].set_stp_state(StpPortState::Disabled);
                router.caches.invalidate_port(port);
                router.ospf_sync(queue);
            }
            Some(Device::Host(host)) => {
                host.ports[index].set_stp_state(StpPortState::Disabled);
                host.caches.invalidate_port(port);
            }
            None => {}
        }
    }

    // ------------------
    // Per-port configuration
    // ------------------

    /// Re-derive everything that depends on a device's Layer-3 interface
    /// configuration.
    fn after_l3_change(&mut self, device: DeviceId) {
        let Self { devices, queue, .. } = self;
        if let Some(Device::Router(router)) = devices.get_mut(&device) {
            router.refresh_connected_routes();
            router.ospf_sync(queue);
        }
        self.settle();
    }

    /// Set the IPv4 address and mask of an interface.
    pub fn set_ipv4(
        &mut self,
        device: DeviceId,
        port: &str,
        address: Ipv4Address,
        mask: SubnetMask,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.set_ipv4(address, mask);
        self.after_l3_change(device);
        Ok(())
    }

    /// Remove the IPv4 address of an interface.
    pub fn clear_ipv4(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.clear_ipv4();
        self.after_l3_change(device);
        Ok(())
    }

    /// Enable IPv6 on an interface. The EUI-64 link-local address is
    /// generated from the port MAC. Idempotent.
    pub fn enable_ipv6(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.enable_ipv6();
        self.after_l3_change(device);
        Ok(())
    }

    /// Disable IPv6 on an interface, dropping all its IPv6 addresses.
    pub fn disable_ipv6(&mut self, device: DeviceId, port: &str) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.disable_ipv6();
        self.after_l3_change(device);
        Ok(())
    }

    /// Add a static global IPv6 address to an interface. IPv6 must be
    /// enabled first.
    pub fn add_ipv6(
        &mut self,
        device: DeviceId,
        port: &str,
        address: Ipv6Address,
        prefix_len: u8,
    ) -> Result<(), NetworkError> {
        let p = self.port_mut(device, port)?;
        if !p.is_ipv6_enabled() {
            return Err(ConfigError::Ipv6NotEnabled(port.to_string()).into());
        }
        p.add_ipv6(address, prefix_len, crate::port::Ipv6Origin::Static);
        self.after_l3_change(device);
        Ok(())
    }

    /// Remove a global IPv6 address from an interface. The link-local
    /// address cannot be removed this way.
    pub fn remove_ipv6(
        &mut self,
        device: DeviceId,
        port: &str,
        address: &Ipv6Address,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.remove_ipv6(address);
        self.after_l3_change(device);
        Ok(())
    }

    /// Set the administrative state of a port.
    pub fn set_admin_state(
        &mut self,
        device: DeviceId,
        port: &str,
        up: bool,
    ) -> Result<(), NetworkError> {
        let p = self.port_mut(device, port)?;
        if p.is_admin_up() == up {
            return Ok(());
        }
        p.set_admin_up(up);
        if up {
            self.port_came_up(device, port);
        } else {
            self.port_went_down(device, port);
        }
        self.after_l3_change(device);
        Ok(())
    }

    /// Set the VLAN mode of a switch port. Assigning an access port to a
    /// VLAN that does not exist suspends it until the VLAN is created.
    pub fn set_vlan_mode(
        &mut self,
        device: DeviceId,
        port: &str,
        mode: VlanMode,
    ) -> Result<(), NetworkError> {
        let index = self.port_index(device, port)?;
        let switch = self.switch_mut(device)?;
        switch.apply_vlan_mode(index, mode);
        Ok(())
    }

    /// Enable or disable PortFast on a switch port.
    pub fn set_stp_portfast(
        &mut self,
        device: DeviceId,
        port: &str,
        portfast: bool,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.set_portfast(portfast);
        Ok(())
    }

    /// Set the interface bandwidth in kb/s (feeds the OSPF cost).
    pub fn set_bandwidth(
        &mut self,
        device: DeviceId,
        port: &str,
        kbps: u64,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.set_bandwidth_kbps(kbps);
        self.after_l3_change(device);
        Ok(())
    }

    /// Set or clear the explicit per-interface OSPF cost.
    pub fn set_ospf_cost(
        &mut self,
        device: DeviceId,
        port: &str,
        cost: Option<u32>,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.set_ospf_cost(cost);
        self.after_l3_change(device);
        Ok(())
    }

    /// Set the per-interface OSPF priority.
    pub fn set_ospf_priority(
        &mut self,
        device: DeviceId,
        port: &str,
        priority: u8,
    ) -> Result<(), NetworkError> {
        self.port_mut(device, port)?.set_ospf_priority(priority);
        Ok(())
    }

    /// Set the default gateway of a host.
    pub fn set_gateway(
        &mut self,
        device: DeviceId,
        gateway: Option<Ipv4Address>,
    ) -> Result<(), NetworkError> {
        let name = self.device_name(device)?.to_string();
        match self.devices.get_mut(&device) {
            Some(Device::Host(h)) => {
                h.gateway = gateway;
                Ok(())
            }
            Some(_) => Err(NetworkError::NotAHost(name)),
            None => Err(NetworkError::DeviceNotFound(device)),
        }
    }

    // ------------------
    // Switch operations
    // ------------------

    /// Create a VLAN on a switch (or rename it). Recreating a deleted VLAN
    /// reactivates exactly the access ports suspended for it.
    pub fn create_vlan(
        &mut self,
        device: DeviceId,
        id: VlanId,
        name: Option<&str>,
    ) -> Result<(), NetworkError> {
        let switch = self.switch_mut(device)?;
        switch.create_vlan(id, name.map(|n| n.to_string()))?;
        Ok(())
    }

    /// Delete a VLAN on a switch. Its access ports are suspended in place.
    pub fn delete_vlan(&mut self, device: DeviceId, id: VlanId) -> Result<(), NetworkError> {
        let switch = self.switch_mut(device)?;
        switch.delete_vlan(id)?;
        Ok(())
    }

    /// The MAC learning table of a switch.
    pub fn mac_table(&self, device: DeviceId) -> Result<Vec<MacTableEntry>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        self.get_device(device)
            .switch_or(NetworkError::NotASwitch(name))
            .map(|s| s.mac_table())
    }

    /// The VLAN table of a switch, including per-port suspend state.
    pub fn vlan_table(&self, device: DeviceId) -> Result<Vec<VlanTableEntry>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        self.get_device(device)
            .switch_or(NetworkError::NotASwitch(name))
            .map(|s| s.vlan_table())
    }

    // ------------------
    // Router operations: static routing
    // ------------------

    /// Install a static (or default) IPv4 route. The outgoing interface is
    /// derived from the next hop, which must be on a connected network.
    pub fn add_static_route(
        &mut self,
        device: DeviceId,
        prefix: Ipv4Network,
        next_hop: Ipv4Address,
        metric: u32,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, _, _| {
            let exists = router.routing_table.iter().any(|e| {
                e.prefix == prefix
                    && matches!(e.source, RouteSource::Static | RouteSource::DefaultRoute)
            });
            if exists {
                return Err(ConfigError::StaticRouteExists(prefix.to_string()).into());
            }
            let interface = router
                .ports
                .iter()
                .filter(|p| p.is_admin_up())
                .find(|p| {
                    p.ipv4()
                        .map(|ia| ia.address.is_in_same_subnet(next_hop, ia.mask))
                        .unwrap_or(false)
                })
                .map(|p| p.name().to_string())
                .ok_or_else(|| ConfigError::NextHopNotConnected(next_hop.to_string()))?;
            let source = if prefix == Ipv4Network::default_route() {
                RouteSource::DefaultRoute
            } else {
                RouteSource::Static
            };
            router.routing_table.install(RouteEntry {
                prefix,
                source,
                next_hop: Some(next_hop),
                interface,
                metric,
            });
            Ok(())
        })
    }

    /// Remove a static (or default) IPv4 route.
    pub fn remove_static_route(
        &mut self,
        device: DeviceId,
        prefix: Ipv4Network,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, _, _| {
            let before = router.routing_table.len();
            router.routing_table.remove_where(|e| {
                e.prefix == prefix
                    && matches!(e.source, RouteSource::Static | RouteSource::DefaultRoute)
            });
            if router.routing_table.len() == before {
                Err(ConfigError::NoStaticRoute(prefix.to_string()).into())
            } else {
                Ok(())
            }
        })
    }

    /// Install a static (or default) IPv6 route.
    pub fn add_ipv6_static_route(
        &mut self,
        device: DeviceId,
        prefix: Ipv6Network,
        next_hop: Ipv6Address,
        interface: &str,
        metric: u32,
    ) -> Result<(), NetworkError> {
        self.port_index(device, interface)?;
        self.with_router(device, |router, _, _| {
            let exists = router.ipv6_routing_table.routes().iter().any(|e| {
                e.prefix == prefix
                    && matches!(e.source, RouteSource::Static | RouteSource::DefaultRoute)
            });
            if exists {
                return Err(ConfigError::StaticRouteExists(prefix.to_string()).into());
            }
            let source = if prefix == Ipv6Network::default_route() {
                RouteSource::DefaultRoute
            } else {
                RouteSource::Static
            };
            router.ipv6_routing_table.install(Ipv6RouteEntry {
                prefix,
                source,
                next_hop: Some(next_hop),
                interface: interface.to_string(),
                metric,
            });
            Ok(())
        })
    }

    /// Remove a static (or default) IPv6 route.
    pub fn remove_ipv6_static_route(
        &mut self,
        device: DeviceId,
        prefix: Ipv6Network,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, _, _| {
            let before = router.ipv6_routing_table.len();
            router.ipv6_routing_table.remove_where(|e| {
                e.prefix == prefix
                    && matches!(e.source, RouteSource::Static | RouteSource::DefaultRoute)
            });
            if router.ipv6_routing_table.len() == before {
                Err(ConfigError::NoStaticRoute(prefix.to_string()).into())
            } else {
                Ok(())
            }
        })
    }

    /// The IPv4 routing table of a router (sorted snapshot).
    pub fn routing_table(&self, device: DeviceId) -> Result<Vec<RouteEntry>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        self.get_device(device)
            .router_or(NetworkError::NotARouter(name))
            .map(|r| r.routing_table().routes())
    }

    /// The IPv6 routing table of a router (sorted snapshot).
    pub fn ipv6_routing_table(
        &self,
        device: DeviceId,
    ) -> Result<Vec<Ipv6RouteEntry>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        self.get_device(device)
            .router_or(NetworkError::NotARouter(name))
            .map(|r| r.ipv6_routing_table().routes())
    }

    // ------------------
    // Router operations: OSPF
    // ------------------

    /// Enable the OSPF process on a router. The router id is either given
    /// explicitly or derived as the numerically highest interface IPv4
    /// address. Enabling the same process id again is a no-op; a different
    /// process id is rejected (one process per router).
    pub fn ospf_enable(
        &mut self,
        device: DeviceId,
        process_id: u32,
        router_id: Option<Ipv4Address>,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, clock| {
            if let Some(process) = &router.ospf {
                if process.process_id != process_id {
                    return Err(ConfigError::OspfProcessExists(process.process_id).into());
                }
                return Ok(());
            }
            let router_id = match router_id {
                Some(id) => id,
                None => router
                    .ports
                    .iter()
                    .filter_map(|p| p.ipv4().map(|ia| ia.address))
                    .max()
                    .ok_or(ConfigError::NoRouterId)?,
            };
            info!("{}: OSPF process {} with router id {}", router.name(), process_id, router_id);
            router.ospf = Some(OspfProcess::new(process_id, router_id));
            router.ospf_arm_timers(clock);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Disable the OSPF process: all its timers are cancelled, neighbor and
    /// database state is discarded, and only OSPF-derived routes are
    /// withdrawn. Routes of every other protocol stay untouched.
    pub fn ospf_disable(&mut self, device: DeviceId, process_id: u32) -> Result<(), NetworkError> {
        self.with_router(device, |router, _, clock| {
            match &router.ospf {
                Some(process) if process.process_id == process_id => {}
                _ => return Err(ConfigError::NoOspfProcess(process_id).into()),
            }
            clock.cancel_scope(&TimerScope::Ospf(router.device_id));
            router.ospf = None;
            router.routing_table.remove_where(|e| e.source.is_ospf());
            Ok(())
        })
    }

    /// Set the OSPF router id explicitly. Adjacency and database state is
    /// rebuilt under the new identity.
    pub fn ospf_set_router_id(
        &mut self,
        device: DeviceId,
        router_id: Ipv4Address,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.set_router_id(router_id);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Add a `network <addr> <wildcard> area <id>` statement. Both the
    /// wildcard and the area are mandatory; a missing token fails validation
    /// and leaves the configuration untouched.
    pub fn ospf_network(
        &mut self,
        device: DeviceId,
        network: Ipv4Address,
        wildcard: Option<Ipv4Address>,
        area: Option<AreaId>,
    ) -> Result<(), NetworkError> {
        let wildcard =
            wildcard.ok_or(ConfigError::IncompleteCommand("network statement needs a wildcard"))?;
        let area =
            area.ok_or(ConfigError::IncompleteCommand("network statement needs an area"))?;
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.add_network(NetworkStatement { network, wildcard, area });
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Remove a network statement. Interfaces that lose coverage drop their
    /// adjacencies; the shared area configuration is kept.
    pub fn ospf_no_network(
        &mut self,
        device: DeviceId,
        network: Ipv4Address,
        wildcard: Ipv4Address,
        area: AreaId,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.remove_network(&NetworkStatement { network, wildcard, area });
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Set the type of an area. Creating the entry on demand and re-typing
    /// an area are both idempotent.
    pub fn ospf_set_area_type(
        &mut self,
        device: DeviceId,
        area: AreaId,
        area_type: AreaType,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.set_area_type(area, area_type);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Mark one interface passive, or un-mark it. A passive interface sends
    /// no hellos (existing adjacencies on it are torn down) but its network
    /// is still advertised.
    pub fn ospf_passive_interface(
        &mut self,
        device: DeviceId,
        interface: &str,
        passive: bool,
    ) -> Result<(), NetworkError> {
        self.port_index(device, interface)?;
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.set_passive(interface, passive);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// `passive-interface default`: mark every interface passive (or lift
    /// the default again).
    pub fn ospf_passive_default(
        &mut self,
        device: DeviceId,
        passive: bool,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.set_passive_default(passive);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Set the auto-cost reference bandwidth in Mb/s.
    pub fn ospf_set_reference_bandwidth(
        &mut self,
        device: DeviceId,
        mbps: u64,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.reference_bandwidth_mbps = mbps.max(1);
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Enable or disable origination of a default route into OSPF.
    pub fn ospf_default_originate(
        &mut self,
        device: DeviceId,
        enabled: bool,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.ospf.as_mut().ok_or(ConfigError::NoOspfProcess(0))?;
            process.default_originate = enabled;
            router.ospf_sync(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// The OSPF neighbor table of a router.
    pub fn ospf_neighbors(
        &self,
        device: DeviceId,
    ) -> Result<Vec<OspfNeighborInfo>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        let router = self.get_device(device).router_or(NetworkError::NotARouter(name))?;
        Ok(router
            .ospf
            .as_ref()
            .map(|p| p.neighbor_infos(self.clock.now()))
            .unwrap_or_default())
    }

    /// The OSPF area summary of a router.
    pub fn ospf_areas(&self, device: DeviceId) -> Result<Vec<OspfAreaInfo>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        let router = self.get_device(device).router_or(NetworkError::NotARouter(name))?;
        Ok(router.ospf.as_ref().map(|p| p.area_infos()).unwrap_or_default())
    }

    /// The link-state database of one area on a router.
    pub fn ospf_lsdb(&self, device: DeviceId, area: AreaId) -> Result<Vec<Lsa>, NetworkError> {
        let name = self.device_name(device)?.to_string();
        let router = self.get_device(device).router_or(NetworkError::NotARouter(name))?;
        Ok(router.ospf.as_ref().map(|p| p.lsdb_snapshot(area)).unwrap_or_default())
    }

    // ------------------
    // Router operations: RIP
    // ------------------

    /// Enable the RIP process on a router.
    pub fn rip_enable(&mut self, device: DeviceId) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, clock| {
            if router.rip.is_some() {
                return Err(ConfigError::RipProcessExists.into());
            }
            router.rip = Some(RipProcess::new());
            clock.schedule(
                SimTime::from_secs(UPDATE_INTERVAL),
                TimerScope::Rip(router.device_id),
                TimerKind::RipUpdate(router.device_id),
            );
            router.rip_send_update(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    /// Disable the RIP process. Its timers are cancelled and only
    /// RIP-derived routes are withdrawn; OSPF state and routes on the same
    /// router are untouched.
    pub fn rip_disable(&mut self, device: DeviceId) -> Result<(), NetworkError> {
        self.with_router(device, |router, _, clock| {
            if router.rip.is_none() {
                return Err(ConfigError::NoRipProcess.into());
            }
            clock.cancel_scope(&TimerScope::Rip(router.device_id));
            router.rip = None;
            router.routing_table.remove_where(|e| e.source == RouteSource::Rip);
            Ok(())
        })
    }

    /// Add a RIP network statement.
    pub fn rip_network(
        &mut self,
        device: DeviceId,
        network: Ipv4Network,
    ) -> Result<(), NetworkError> {
        self.with_router(device, |router, queue, _| {
            let process = router.rip.as_mut().ok_or(ConfigError::NoRipProcess)?;
            process.add_network(network);
            router.rip_send_update(queue);
            Ok(())
        })?;
        self.settle();
        Ok(())
    }

    // ------------------
    // Neighbor discovery
    // ------------------

    /// Resolve an IPv4 address to a MAC address by ARP. A cached entry is
    /// returned immediately; otherwise a request is broadcast on the
    /// interface whose subnet contains the target and the cache is consulted
    /// again once the exchange has settled. `Ok(None)` means unresolved.
    pub fn resolve_arp(
        &mut self,
        device: DeviceId,
        target: Ipv4Address,
    ) -> Result<Option<MacAddress>, NetworkError> {
        self.device_name(device)?;
        if let Some(entry) =
            self.devices[&device].caches().and_then(|c| c.arp_lookup(target))
        {
            return Ok(Some(entry.mac));
        }
        let egress = self.devices[&device]
            .ports()
            .iter()
            .filter(|p| p.is_admin_up())
            .find_map(|p| {
                p.ipv4().and_then(|ia| {
                    if ia.address.is_in_same_subnet(target, ia.mask) {
                        Some((p.name().to_string(), p.mac(), ia.address))
                    } else {
                        None
                    }
                })
            });
        let (port, mac, source) = match egress {
            Some(e) => e,
            None => return Ok(None),
        };
        self.queue.push_back(Event::Transmit(device, port, arp_request(mac, source, target)));
        self.settle();
        Ok(self.devices[&device]
            .caches()
            .and_then(|c| c.arp_lookup(target))
            .map(|e| e.mac))
    }

    /// Resolve an IPv6 address to a MAC address by NDP neighbor
    /// solicitation, using the solicited-node multicast group.
    pub fn resolve_ndp(
        &mut self,
        device: DeviceId,
        target: &Ipv6Address,
    ) -> Result<Option<MacAddress>, NetworkError> {
        self.device_name(device)?;
        if let Some(entry) = self.devices[&device].caches().and_then(|c| c.ndp_lookup(target)) {
            return Ok(Some(entry.mac));
        }
        let egress = self.devices[&device]
            .ports()
            .iter()
            .filter(|p| p.is_admin_up() && p.is_ipv6_enabled())
            .find_map(|p| p.link_local().map(|ll| (p.name().to_string(), p.mac(), ll.clone())));
        let (port, mac, source) = match egress {
            Some(e) => e,
            None => return Ok(None),
        };
        self.queue.push_back(Event::Transmit(
            device,
            port,
            neighbor_solicitation(mac, source, target.clone().without_zone()),
        ));
        self.settle();
        Ok(self.devices[&device]
            .caches()
            .and_then(|c| c.ndp_lookup(target))
            .map(|e| e.mac))
    }

    /// Send an unsolicited router advertisement out of a router interface,
    /// announcing its global prefixes for SLAAC.
    pub fn send_router_advertisement(
        &mut self,
        device: DeviceId,
        port: &str,
    ) -> Result<(), NetworkError> {
        let index = self.port_index(device, port)?;
        let frame = {
            let name = self.device_name(device)?.to_string();
            let router = self.get_device(device).router_or(NetworkError::NotARouter(name))?;
            router.build_router_advertisement(index)
        };
        if let Some(frame) = frame {
            self.queue.push_back(Event::Transmit(device, port.to_string(), frame));
            self.settle();
        }
        Ok(())
    }

    /// The ARP cache of a host or router.
    pub fn arp_table(
        &self,
        device: DeviceId,
    ) -> Result<Vec<(Ipv4Address, NeighborEntry)>, NetworkError> {
        self.device_name(device)?;
        Ok(self.devices[&device].caches().map(|c| c.arp_entries()).unwrap_or_default())
    }

    /// The NDP cache of a host or router.
    pub fn ndp_table(
        &self,
        device: DeviceId,
    ) -> Result<Vec<(Ipv6Address, NeighborEntry)>, NetworkError> {
        self.device_name(device)?;
        Ok(self.devices[&device].caches().map(|c| c.ndp_entries()).unwrap_or_default())
    }

    // ------------------
    // Frame delivery
    // ------------------

    /// Send a frame from a device port into the fabric. Broadcast and
    /// multicast frames are delivered to every reachable device except the
    /// sender; unicast frames are delivered to the owner of the destination
    /// MAC, or dropped (with a `FrameDropped` event) if no such device is
    /// reachable. Never raises on an unreachable destination.
    pub fn send_frame(
        &mut self,
        device: DeviceId,
        port: &str,
        frame: EthernetFrame,
    ) -> Result<(), NetworkError> {
        self.port_index(device, port)?;
        self.queue.push_back(Event::Transmit(device, port.to_string(), frame));
        self.settle();
        Ok(())
    }

    /// Subscribe to fabric events. Handlers run synchronously, in
    /// subscription order, before the triggering call returns.
    pub fn subscribe(&mut self, handler: Box<dyn FnMut(&FabricEvent)>) -> HandlerId {
        self.handlers.subscribe(handler)
    }

    /// Remove an event handler.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.handlers.unsubscribe(id)
    }

    /// Cumulative statistics since the last reset.
    pub fn statistics(&self) -> FabricStatistics {
        self.statistics
    }

    /// Zero the statistics counters. Registrations and connections are not
    /// affected.
    pub fn reset_statistics(&mut self) {
        self.statistics = FabricStatistics::default();
    }

    // ------------------
    // Virtual clock
    // ------------------

    /// Advance the virtual clock, firing every timer that becomes due, in
    /// timestamp order. All protocol activity triggered by a timer (frames,
    /// state transitions, route updates) completes before the next timer
    /// fires.
    pub fn advance_clock(&mut self, duration: SimTime) {
        let target = self.clock.now() + duration;
        while let Some(kind) = self.clock.pop_due(target) {
            self.fire_timer(kind);
            self.do_queue();
        }
        self.clock.advance_to(target);
        self.flush_events();
    }

    fn fire_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::StpTransition(device, port) => {
                let Self { devices, clock, .. } = self;
                if let Some(Device::Switch(switch)) = devices.get_mut(&device) {
                    if let Some(index) = switch.ports.iter().position(|p| p.name() == port) {
                        if let Some(state) = switch.stp_advance(index) {
                            if state != StpPortState::Forwarding {
                                clock.schedule(
                                    SimTime::from_secs(STP_FORWARD_DELAY_SECS),
                                    TimerScope::Port(device, port.clone()),
                                    TimerKind::StpTransition(device, port),
                                );
                            }
                        }
                    }
                }
            }
            TimerKind::MacAging(device) => {
                let Self { devices, clock, .. } = self;
                if let Some(Device::Switch(switch)) = devices.get_mut(&device) {
                    switch.age_out(clock.now());
                    clock.schedule(
                        SimTime::from_secs(MAC_AGING_SWEEP_SECS),
                        TimerScope::Device(device),
                        TimerKind::MacAging(device),
                    );
                }
            }
            TimerKind::OspfHello(device) => {
                let Self { devices, queue, clock, .. } = self;
                if let Some(Device::Router(router)) = devices.get_mut(&device) {
                    if router.ospf.is_some() {
                        router.ospf_send_hellos(queue);
                        clock.schedule(
                            SimTime::from_secs(HELLO_INTERVAL),
                            TimerScope::Ospf(device),
                            TimerKind::OspfHello(device),
                        );
                    }
                }
            }
            TimerKind::OspfDeadCheck(device) => {
                let Self { devices, queue, clock, .. } = self;
                if let Some(Device::Router(router)) = devices.get_mut(&device) {
                    if router.ospf.is_some() {
                        router.ospf_dead_check(queue, clock.now());
                        clock.schedule(
                            SimTime::from_secs(HELLO_INTERVAL),
                            TimerScope::Ospf(device),
                            TimerKind::OspfDeadCheck(device),
                        );
                    }
                }
            }
            TimerKind::OspfAdjacencyStep(device, interface, neighbor) => {
                let Self { devices, queue, clock, .. } = self;
                if let Some(Device::Router(router)) = devices.get_mut(&device) {
                    router.ospf_adjacency_step(&interface, neighbor, queue, clock);
                }
            }
            TimerKind::RipUpdate(device) => {
                let Self { devices, queue, clock, .. } = self;
                if let Some(Device::Router(router)) = devices.get_mut(&device) {
                    if router.rip.is_some() {
                        router.rip_send_update(queue);
                        clock.schedule(
                            SimTime::from_secs(UPDATE_INTERVAL),
                            TimerScope::Rip(device),
                            TimerKind::RipUpdate(device),
                        );
                    }
                }
            }
        }
    }

    // ------------------
    // Internals
    // ------------------

    /// Drain the event queue and dispatch the collected fabric events.
    fn settle(&mut self) {
        self.do_queue();
        self.flush_events();
    }

    fn flush_events(&mut self) {
        let events = std::mem::take(&mut self.pending_events);
        for event in events {
            self.handlers.dispatch(&event);
        }
    }

    fn do_queue(&mut self) {
        let mut remaining = DEFAULT_STOP_AFTER;
        while let Some(event) = self.queue.pop_front() {
            if remaining == 0 {
                warn!("event queue did not drain after {} events", DEFAULT_STOP_AFTER);
                break;
            }
            remaining -= 1;
            match event {
                Event::Transmit(device, port, frame) => self.deliver_frame(device, &port, frame),
            }
        }
    }

    /// The far end of the cable plugged into a port.
    fn link_peer(&self, device: DeviceId, port: &str) -> Option<(DeviceId, usize)> {
        let index = self.devices.get(&device)?.port_index(port)?;
        let cable_id = self.devices[&device].ports()[index].cable?;
        let cable = self.cables.get(cable_id.0)?.as_ref()?;
        let (peer_device, peer_port) = cable.peer_of(device, port)?;
        let peer_index = self.devices.get(&peer_device)?.port_index(peer_port)?;
        Some((peer_device, peer_index))
    }

    /// The forwarding algorithm: walk the broadcast domain from the sending
    /// port, flooding and learning through switches, and deliver to the
    /// matching endpoints.
    fn deliver_frame(&mut self, source: DeviceId, source_port: &str, frame: EthernetFrame) {
        self.statistics.total_frames += 1;
        let multicast = frame.destination.is_multicast();
        if frame.destination.is_broadcast() {
            self.statistics.broadcast_frames += 1;
        }

        let mut arrivals: VecDeque<(DeviceId, usize, EthernetFrame)> = VecDeque::new();
        let mut visited_switches: HashSet<DeviceId> = HashSet::new();
        let mut recipients: Vec<(DeviceId, usize, EthernetFrame)> = Vec::new();

        let source_up = self
            .port_index(source, source_port)
            .ok()
            .map(|i| {
                let p = &self.devices[&source].ports()[i];
                p.is_admin_up() && !p.is_suspended()
            })
            .unwrap_or(false);
        if source_up {
            if let Some((peer, peer_index)) = self.link_peer(source, source_port) {
                arrivals.push_back((peer, peer_index, frame.clone()));
            }
        }

        while let Some((device_id, port_index, incoming)) = arrivals.pop_front() {
            let now = self.clock.now();
            // stage 1: process the arrival on the device, collecting the
            // cables to propagate over
            let mut outgoing: Vec<(CableId, String, Option<VlanId>)> = Vec::new();
            match self.devices.get_mut(&device_id) {
                Some(Device::Switch(switch)) => {
                    if !visited_switches.insert(device_id) {
                        continue;
                    }
                    let ingress = &switch.ports[port_index];
                    if !ingress.is_admin_up() || ingress.is_suspended() {
                        continue;
                    }
                    let ingress_name = ingress.name().to_string();
                    let vlan = match ingress.vlan_mode() {
                        VlanMode::Access(v) => {
                            if incoming.vlan.is_some() {
                                continue;
                            }
                            *v
                        }
                        VlanMode::Trunk(allowed) => {
                            let v = incoming.vlan.unwrap_or(1);
                            if !allowed.contains(&v) {
                                continue;
                            }
                            v
                        }
                    };
                    if !switch.has_vlan(vlan) {
                        continue;
                    }
                    let state = ingress.stp_state();
                    if state != StpPortState::Forwarding && state != StpPortState::Learning {
                        continue;
                    }
                    switch.learn(incoming.source, &ingress_name, vlan, now);
                    if state != StpPortState::Forwarding {
                        continue;
                    }
                    // known unicast goes out one port, everything else floods
                    let known_egress = if incoming.destination.is_unicast() {
                        switch.egress_for(incoming.destination, vlan).map(|p| p.to_string())
                    } else {
                        None
                    };
                    for port in switch.ports.iter() {
                        if port.name() == ingress_name {
                            continue;
                        }
                        if let Some(known) = &known_egress {
                            if port.name() != known {
                                continue;
                            }
                        }
                        if !port.is_admin_up()
                            || port.is_suspended()
                            || port.stp_state() != StpPortState::Forwarding
                            || !port.carries_vlan(vlan)
                        {
                            continue;
                        }
                        let cable = match port.cable() {
                            Some(c) => c,
                            None => continue,
                        };
                        let tag = match port.vlan_mode() {
                            VlanMode::Access(_) => None,
                            VlanMode::Trunk(_) => Some(vlan),
                        };
                        outgoing.push((cable, port.name().to_string(), tag));
                    }
                }
                Some(device) => {
                    // endpoint: hosts and routers only take untagged frames
                    let port = &device.ports()[port_index];
                    if !port.is_admin_up() || incoming.vlan.is_some() {
                        continue;
                    }
                    if device_id == source {
                        continue;
                    }
                    if multicast || device.owns_mac(incoming.destination) {
                        recipients.push((device_id, port_index, incoming.clone()));
                    }
                }
                None => continue,
            }
            // stage 2: resolve the far end of each collected cable
            for (cable_id, egress_name, tag) in outgoing {
                let cable = match self.cables.get(cable_id.0).and_then(|c| c.as_ref()) {
                    Some(c) => c.clone(),
                    None => continue,
                };
                let (peer_device, peer_port) = match cable.peer_of(device_id, &egress_name) {
                    Some(p) => (p.0, p.1.to_string()),
                    None => continue,
                };
                let peer_index = match self
                    .devices
                    .get(&peer_device)
                    .and_then(|d| d.port_index(&peer_port))
                {
                    Some(i) => i,
                    None => continue,
                };
                arrivals.push_back((peer_device, peer_index, incoming.clone().with_vlan(tag)));
            }
        }

        let delivered = recipients.len();
        for (device_id, port_index, delivered_frame) in recipients {
            self.statistics.delivered_frames += 1;
            let port_name = self.devices[&device_id].ports()[port_index].name().to_string();
            self.pending_events.push(FabricEvent::FrameReceived {
                device: device_id,
                port: port_name,
                frame: delivered_frame.clone(),
            });
            let Self { devices, queue, clock, .. } = self;
            if let Some(device) = devices.get_mut(&device_id) {
                device.handle_frame(port_index, &delivered_frame, queue, clock);
            }
        }
        if !multicast && delivered == 0 {
            trace!("frame to {} dropped: destination not found", frame.destination);
            self.statistics.dropped_frames += 1;
            self.pending_events.push(FabricEvent::FrameDropped {
                device: source,
                reason: "Destination not found",
                frame,
            });
        }
    }
}
