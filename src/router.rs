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

//! Module defining a router with its routing tables and protocol engines.

use crate::addr::{Ipv4Address, Ipv4Network, Ipv6Network, MacAddress};
use crate::clock::{SimTime, TimerKind, TimerScope, VirtualClock};
use crate::event::{Event, EventQueue};
use crate::frame::{
    arp_reply, neighbor_advertisement, ospf_multicast, rip_multicast, ArpMessage, ArpOperation,
    EthernetFrame, FramePayload, IcmpMessage, Icmpv6Message, Ipv4Packet, Ipv4Payload, Ipv6Packet,
    Ipv6Payload, NdpMessage,
};
use crate::neighbor::NeighborCaches;
use crate::port::Port;
use crate::routing::ospf::{
    AreaType, Lsa, LsaBody, LsaId, OspfHello, OspfMessage, OspfProcess, ADJACENCY_STEP,
    DEAD_INTERVAL, HELLO_INTERVAL,
};
use crate::routing::rip::{RipMessage, RipProcess, INFINITY_METRIC};
use crate::routing::{Ipv6RoutingTable, RouteEntry, RouteSource, RoutingTable};
use crate::types::{AreaId, DeviceId};
use log::*;
use std::collections::{HashMap, HashSet};

/// Facts about one OSPF-activated interface, snapshotted to keep borrows
/// short while the process state is being mutated.
#[derive(Debug, Clone)]
struct OspfInterface {
    index: usize,
    name: String,
    mac: MacAddress,
    address: Ipv4Address,
    network: Ipv4Network,
    area: AreaId,
    cost: u32,
    passive: bool,
}

/// # Router
///
/// A Layer-3 device: named ports, independent IPv4 and IPv6 routing tables,
/// optional OSPF and RIP processes, and its neighbor discovery caches. All
/// protocol handlers enqueue their replies; they never send directly.
#[derive(Debug)]
pub struct Router {
    pub(crate) device_id: DeviceId,
    name: String,
    mac: MacAddress,
    pub(crate) ports: Vec<Port>,
    pub(crate) routing_table: RoutingTable,
    pub(crate) ipv6_routing_table: Ipv6RoutingTable,
    pub(crate) ospf: Option<OspfProcess>,
    pub(crate) rip: Option<RipProcess>,
    pub(crate) caches: NeighborCaches,
}

impl Router {
    pub(crate) fn new(name: String, device_id: DeviceId, mac: MacAddress) -> Self {
        Self {
            device_id,
            name,
            mac,
            ports: Vec::new(),
            routing_table: RoutingTable::new(),
            ipv6_routing_table: Ipv6RoutingTable::new(),
            ospf: None,
            rip: None,
            caches: NeighborCaches::new(),
        }
    }

    /// Name of the router.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chassis MAC address.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// The IPv4 routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    /// The IPv6 routing table.
    pub fn ipv6_routing_table(&self) -> &Ipv6RoutingTable {
        &self.ipv6_routing_table
    }

    pub(crate) fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name() == name)
    }

    /// Returns true if the MAC belongs to this router (chassis or any port).
    pub(crate) fn owns_mac(&self, mac: MacAddress) -> bool {
        self.mac == mac || self.ports.iter().any(|p| p.mac() == mac)
    }

    /// Returns true if the IPv4 address is configured on any interface.
    pub(crate) fn owns_ipv4(&self, address: Ipv4Address) -> bool {
        self.ports.iter().any(|p| p.ipv4().map(|a| a.address) == Some(address))
    }

    // ------------------
    // Route maintenance
    // ------------------

    /// Re-derive connected routes from the interface configuration. Called
    /// after every address or admin-state change.
    pub(crate) fn refresh_connected_routes(&mut self) {
        self.routing_table.remove_where(|e| e.source == RouteSource::Connected);
        self.ipv6_routing_table.remove_where(|e| e.source == RouteSource::Connected);
        for port in self.ports.iter().filter(|p| p.is_admin_up()) {
            if let Some(ia) = port.ipv4() {
                let prefix = Ipv4Network::new(ia.address, ia.mask.prefix_len()).unwrap();
                self.routing_table.install(RouteEntry {
                    prefix,
                    source: RouteSource::Connected,
                    next_hop: None,
                    interface: port.name().to_string(),
                    metric: 0,
                });
            }
            for assigned in port.ipv6_addresses() {
                if assigned.address.is_link_local() {
                    continue;
                }
                if let Ok(prefix) = Ipv6Network::new(assigned.address.clone(), assigned.prefix_len)
                {
                    self.ipv6_routing_table.install(crate::routing::Ipv6RouteEntry {
                        prefix,
                        source: RouteSource::Connected,
                        next_hop: None,
                        interface: port.name().to_string(),
                        metric: 0,
                    });
                }
            }
        }
    }

    // ------------------
    // Frame handling
    // ------------------

    /// Process a frame delivered to this router.
    pub(crate) fn handle_frame(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        queue: &mut EventQueue,
        clock: &mut VirtualClock,
    ) {
        match &frame.payload {
            FramePayload::Arp(arp) => self.handle_arp(port_index, arp, queue),
            FramePayload::Ipv4(packet) => self.handle_ipv4(port_index, frame, packet, queue, clock),
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
                    // answer and opportunistically learn the requester
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
        clock: &mut VirtualClock,
    ) {
        if self.owns_ipv4(packet.destination) || packet.destination.is_multicast() {
            match &packet.payload {
                Ipv4Payload::Icmp(IcmpMessage::EchoRequest(id, seq)) => {
                    let port = &self.ports[port_index];
                    if let Some(ia) = port.ipv4() {
                        let reply = EthernetFrame::ipv4(
                            port.mac(),
                            frame.source,
                            Ipv4Packet::new(
                                ia.address,
                                packet.source,
                                Ipv4Payload::Icmp(IcmpMessage::EchoReply(*id, *seq)),
                            ),
                        );
                        queue.push_back(Event::Transmit(
                            self.device_id,
                            port.name().to_string(),
                            reply,
                        ));
                    }
                }
                Ipv4Payload::Ospf(message) => {
                    self.ospf_handle(port_index, packet.source, message.clone(), queue, clock)
                }
                Ipv4Payload::Rip(message) => self.handle_rip(port_index, packet.source, message),
                _ => {}
            }
        } else {
            self.forward_ipv4(packet, queue);
        }
    }

    /// Forward a transit IPv4 packet along the routing table. The next-hop
    /// MAC must already be resolved; unresolved or unroutable packets are
    /// silently discarded, like a real data plane.
    fn forward_ipv4(&mut self, packet: &Ipv4Packet, queue: &mut EventQueue) {
        if packet.ttl <= 1 {
            trace!("{}: TTL expired for {}", self.name, packet.destination);
            return;
        }
        let route = match self.routing_table.lookup(packet.destination) {
            Some(r) => r.clone(),
            None => {
                trace!("{}: no route to {}", self.name, packet.destination);
                return;
            }
        };
        let hop_ip = route.next_hop.unwrap_or(packet.destination);
        let hop = match self.caches.arp_lookup(hop_ip) {
            Some(e) => e.clone(),
            None => {
                trace!("{}: next hop {} not resolved", self.name, hop_ip);
                return;
            }
        };
        let out_index = match self.port_index(&route.interface) {
            Some(i) => i,
            None => return,
        };
        let out_port = &self.ports[out_index];
        if !out_port.is_operational() {
            return;
        }
        let mut forwarded = packet.clone();
        forwarded.ttl -= 1;
        let out_frame = EthernetFrame::ipv4(out_port.mac(), hop.mac, forwarded);
        queue.push_back(Event::Transmit(self.device_id, route.interface, out_frame));
    }

    fn handle_ipv6(
        &mut self,
        port_index: usize,
        frame: &EthernetFrame,
        packet: &Ipv6Packet,
        queue: &mut EventQueue,
    ) {
        let port = &self.ports[port_index];
        if !port.is_ipv6_enabled() {
            return;
        }
        let for_us = port.has_ipv6(&packet.destination)
            || packet.destination.is_multicast()
            || self.ports.iter().any(|p| p.has_ipv6(&packet.destination));
        if !for_us {
            return;
        }
        let port_name = port.name().to_string();
        let port_mac = port.mac();
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
                NdpMessage::RouterSolicitation => {
                    if let Some(ra) = self.build_router_advertisement(port_index) {
                        queue.push_back(Event::Transmit(self.device_id, port_name, ra));
                    }
                }
                // routers do not autoconfigure from other routers
                NdpMessage::RouterAdvertisement { .. } => {}
            },
            Ipv6Payload::Icmpv6(Icmpv6Message::EchoRequest(id, seq)) => {
                if let Some(link_local) = self.ports[port_index].link_local().cloned() {
                    let source = if self.ports[port_index].has_ipv6(&packet.destination) {
                        packet.destination.clone()
                    } else {
                        link_local
                    };
                    let reply = EthernetFrame::ipv6(
                        port_mac,
                        frame.source,
                        Ipv6Packet::new(
                            source,
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

    /// Build a router advertisement announcing the global prefixes of the
    /// interface, or `None` if the interface has no global address.
    pub(crate) fn build_router_advertisement(&self, port_index: usize) -> Option<EthernetFrame> {
        let port = &self.ports[port_index];
        let link_local = port.link_local()?.clone();
        let prefixes: Vec<crate::frame::RaPrefixOption> = port
            .ipv6_addresses()
            .iter()
            .filter(|a| !a.address.is_link_local())
            .filter_map(|a| {
                a.address.network_prefix(a.prefix_len).ok().map(|prefix| {
                    crate::frame::RaPrefixOption {
                        prefix,
                        prefix_len: a.prefix_len,
                        on_link: true,
                        autonomous: true,
                    }
                })
            })
            .collect();
        if prefixes.is_empty() {
            return None;
        }
        Some(crate::frame::router_advertisement(port.mac(), link_local, prefixes))
    }

    // ------------------
    // OSPF orchestration
    // ------------------

    /// Interfaces that participate in OSPF: administratively up, addressed,
    /// and covered by a network statement.
    fn ospf_interfaces(&self) -> Vec<OspfInterface> {
        let process = match &self.ospf {
            Some(p) => p,
            None => return Vec::new(),
        };
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_admin_up())
            .filter_map(|(index, p)| {
                let ia = p.ipv4()?;
                let area = process.area_for(ia.address)?;
                Some(OspfInterface {
                    index,
                    name: p.name().to_string(),
                    mac: p.mac(),
                    address: ia.address,
                    network: Ipv4Network::new(ia.address, ia.mask.prefix_len()).unwrap(),
                    area,
                    cost: process.interface_cost(p),
                    passive: process.is_passive(p.name()),
                })
            })
            .collect()
    }

    /// Schedule the periodic OSPF timers. Called once when the process is
    /// created.
    pub(crate) fn ospf_arm_timers(&self, clock: &mut VirtualClock) {
        let scope = TimerScope::Ospf(self.device_id);
        clock.schedule(
            SimTime::from_secs(HELLO_INTERVAL),
            scope.clone(),
            TimerKind::OspfHello(self.device_id),
        );
        clock.schedule(
            SimTime::from_secs(HELLO_INTERVAL),
            scope,
            TimerKind::OspfDeadCheck(self.device_id),
        );
    }

    /// Send a hello on every activated, non-passive interface.
    pub(crate) fn ospf_send_hellos(&mut self, queue: &mut EventQueue) {
        let interfaces = self.ospf_interfaces();
        let process = match &self.ospf {
            Some(p) => p,
            None => return,
        };
        for iface in interfaces.iter().filter(|i| !i.passive) {
            let hello = OspfHello {
                router_id: process.router_id,
                area: iface.area,
                hello_interval: HELLO_INTERVAL,
                dead_interval: DEAD_INTERVAL,
                priority: self.ports[iface.index].ospf_priority(),
                neighbors_seen: process.seen_on(&iface.name),
            };
            let frame = ospf_multicast(iface.mac, iface.address, OspfMessage::Hello(hello));
            queue.push_back(Event::Transmit(self.device_id, iface.name.clone(), frame));
        }
    }

    /// Handle a received OSPF message.
    pub(crate) fn ospf_handle(
        &mut self,
        port_index: usize,
        source: Ipv4Address,
        message: OspfMessage,
        queue: &mut EventQueue,
        clock: &mut VirtualClock,
    ) {
        let interfaces = self.ospf_interfaces();
        let iface = match interfaces.iter().find(|i| i.index == port_index) {
            Some(i) => i.clone(),
            None => return,
        };
        if self.ospf.is_none() {
            return;
        }
        match message {
            OspfMessage::Hello(hello) => {
                if iface.passive {
                    return;
                }
                let process = self.ospf.as_mut().unwrap();
                if hello.area != iface.area {
                    debug!(
                        "{}: hello from {} ignored, area mismatch ({} != {})",
                        self.name, hello.router_id, hello.area, iface.area
                    );
                    return;
                }
                let own_id = process.router_id;
                if hello.router_id == own_id {
                    return;
                }
                let now = clock.now();
                process.observe_hello(&iface.name, iface.area, &hello, source, iface.cost, now);
                if hello.neighbors_seen.contains(&own_id)
                    && process.promote_two_way(&iface.name, hello.router_id)
                {
                    debug!("{}: neighbor {} reached 2WAY on {}", self.name, hello.router_id, iface.name);
                    clock.schedule(
                        SimTime::from_secs(ADJACENCY_STEP),
                        TimerScope::Ospf(self.device_id),
                        TimerKind::OspfAdjacencyStep(self.device_id, iface.name.clone(), hello.router_id),
                    );
                }
            }
            OspfMessage::DatabaseUpdate { area, lsas } => {
                let process = self.ospf.as_mut().unwrap();
                if process.merge_lsas(area, lsas) {
                    self.ospf_refresh(queue);
                    self.ospf_recompute();
                }
            }
        }
    }

    /// One adjacency timer tick: advance the neighbor one stage; on reaching
    /// `Full`, synchronize databases and recompute routes.
    pub(crate) fn ospf_adjacency_step(
        &mut self,
        interface: &str,
        neighbor: Ipv4Address,
        queue: &mut EventQueue,
        clock: &mut VirtualClock,
    ) {
        use crate::routing::ospf::OspfNeighborState::*;
        let process = match self.ospf.as_mut() {
            Some(p) => p,
            None => return,
        };
        match process.advance_adjacency(interface, neighbor) {
            Some(Full) => {
                debug!("{}: neighbor {} reached FULL on {}", self.name, neighbor, interface);
                self.ospf_refresh(queue);
                self.ospf_recompute();
            }
            Some(state) if state > TwoWay => {
                trace!("{}: neighbor {} now {}", self.name, neighbor, state);
                clock.schedule(
                    SimTime::from_secs(ADJACENCY_STEP),
                    TimerScope::Ospf(self.device_id),
                    TimerKind::OspfAdjacencyStep(
                        self.device_id,
                        interface.to_string(),
                        neighbor,
                    ),
                );
            }
            _ => {}
        }
    }

    /// Drop neighbors whose dead interval expired; on any loss, re-originate
    /// and recompute.
    pub(crate) fn ospf_dead_check(&mut self, queue: &mut EventQueue, now: SimTime) {
        let process = match self.ospf.as_mut() {
            Some(p) => p,
            None => return,
        };
        let removed = process.prune_dead(now);
        if !removed.is_empty() {
            for neighbor in &removed {
                warn!(
                    "{}: neighbor {} on {} dead (last seen {})",
                    self.name, neighbor.router_id, neighbor.interface, neighbor.last_seen
                );
            }
            self.ospf_refresh(queue);
            self.ospf_recompute();
        }
    }

    /// Re-originate our own link-state records (router record per area, ABR
    /// summaries, externals) and flood every changed area database to the
    /// adjacent neighbors.
    pub(crate) fn ospf_refresh(&mut self, queue: &mut EventQueue) {
        let interfaces = self.ospf_interfaces();
        let default_originate = match &self.ospf {
            Some(p) => p.default_originate,
            None => return,
        };

        // group own networks by area
        let mut own_areas: HashMap<AreaId, Vec<(Ipv4Network, u32)>> = HashMap::new();
        for iface in &interfaces {
            own_areas.entry(iface.area).or_default().push((iface.network, iface.cost));
        }

        let process = self.ospf.as_mut().unwrap();
        let full = process.full_neighbors();
        let mut changed = false;

        // withdraw the router record of areas we no longer have interfaces in
        for area in process.known_areas() {
            if !own_areas.contains_key(&area) {
                changed |= process.withdraw(area, LsaId::Router);
            }
        }

        for (area, networks) in &own_areas {
            let links: Vec<(Ipv4Address, u32)> = full
                .iter()
                .filter(|n| n.area == *area)
                .map(|n| (n.router_id, n.cost))
                .collect();
            let mut networks = networks.clone();
            networks.sort();
            let mut links = links;
            links.sort();
            changed |= process.originate(*area, LsaBody::Router { links, networks });
        }

        // area border router duties: summarize between areas
        if own_areas.len() >= 2 {
            let areas: Vec<AreaId> = own_areas.keys().copied().collect();
            for into in &areas {
                let area_type = process.area_type(*into);
                if area_type == AreaType::TotallyStubby || area_type == AreaType::Stub {
                    // stub variants get a default summary instead of specifics
                    changed |= process.originate(
                        *into,
                        LsaBody::Summary { network: Ipv4Network::default_route(), metric: 1 },
                    );
                    if area_type == AreaType::TotallyStubby {
                        continue;
                    }
                }
                for from in areas.iter().filter(|a| *a != into) {
                    for (network, metric) in process.area_reachable_networks(*from) {
                        changed |=
                            process.originate(*into, LsaBody::Summary { network, metric });
                    }
                }
            }
        }

        for area in process.known_areas() {
            let area_type = process.area_type(area);
            let wanted =
                default_originate && !matches!(area_type, AreaType::Stub | AreaType::TotallyStubby);
            if wanted {
                changed |= process.originate(
                    area,
                    LsaBody::External { network: Ipv4Network::default_route(), metric: 1 },
                );
            } else {
                changed |= process.withdraw(area, LsaId::External(Ipv4Network::default_route()));
            }
        }

        if changed || !full.is_empty() {
            self.ospf_flood(queue);
        }
    }

    /// Flood the per-area databases out of every interface with at least one
    /// fully adjacent neighbor.
    pub(crate) fn ospf_flood(&mut self, queue: &mut EventQueue) {
        let interfaces = self.ospf_interfaces();
        let process = match &self.ospf {
            Some(p) => p,
            None => return,
        };
        let mut flooded: HashSet<(String, AreaId)> = HashSet::new();
        for neighbor in process.full_neighbors() {
            if !flooded.insert((neighbor.interface.clone(), neighbor.area)) {
                continue;
            }
            let iface = match interfaces.iter().find(|i| i.name == neighbor.interface) {
                Some(i) => i,
                None => continue,
            };
            let lsas: Vec<Lsa> = process.lsdb_snapshot(neighbor.area);
            if lsas.is_empty() {
                continue;
            }
            let frame = ospf_multicast(
                iface.mac,
                iface.address,
                OspfMessage::DatabaseUpdate { area: neighbor.area, lsas },
            );
            queue.push_back(Event::Transmit(self.device_id, iface.name.clone(), frame));
        }
    }

    /// Recompute OSPF routes from the link-state databases and swap them
    /// into the routing table. Routes of every other origin are untouched.
    pub(crate) fn ospf_recompute(&mut self) {
        let process = match &self.ospf {
            Some(p) => p,
            None => return,
        };
        let connected: HashSet<Ipv4Network> = self
            .routing_table
            .iter()
            .filter(|e| e.source == RouteSource::Connected)
            .map(|e| e.prefix)
            .collect();
        let routes: Vec<RouteEntry> = process
            .compute_routes()
            .into_iter()
            .filter(|r| !connected.contains(&r.prefix))
            .collect();
        self.routing_table.remove_where(|e| e.source.is_ospf());
        for route in routes {
            self.routing_table.install(route);
        }
    }

    /// Reconcile OSPF with the current interface configuration: tear down
    /// adjacencies on interfaces that no longer participate, send fresh
    /// hellos, re-originate and recompute. Called after every configuration
    /// change that can affect activation (addresses, admin state, network
    /// statements, passivation, costs).
    pub(crate) fn ospf_sync(&mut self, queue: &mut EventQueue) {
        if self.ospf.is_none() {
            return;
        }
        let interfaces = self.ospf_interfaces();
        let active: HashSet<String> = interfaces
            .iter()
            .filter(|i| !i.passive)
            .map(|i| i.name.clone())
            .collect();
        let costs: HashMap<String, u32> =
            interfaces.iter().map(|i| (i.name.clone(), i.cost)).collect();
        let process = self.ospf.as_mut().unwrap();
        process.update_neighbor_costs(&costs);
        let stale: Vec<String> = process
            .neighbor_interfaces()
            .into_iter()
            .filter(|iface| !active.contains(iface))
            .collect();
        for iface in stale {
            debug!("{}: adjacencies on {} torn down", self.name, iface);
            process.drop_neighbors_on(&iface);
        }
        self.ospf_send_hellos(queue);
        self.ospf_refresh(queue);
        self.ospf_recompute();
    }

    // ------------------
    // RIP
    // ------------------

    /// Send a periodic RIP update on every covered interface.
    pub(crate) fn rip_send_update(&mut self, queue: &mut EventQueue) {
        let process = match &self.rip {
            Some(p) => p,
            None => return,
        };
        // advertise covered connected networks and everything learned by RIP
        let mut entries: Vec<(Ipv4Network, u32)> = Vec::new();
        for e in self.routing_table.iter() {
            match e.source {
                RouteSource::Connected if process.covers(e.prefix.address) => {
                    entries.push((e.prefix, 1))
                }
                RouteSource::Rip => entries.push((e.prefix, e.metric)),
                _ => {}
            }
        }
        entries.sort();
        if entries.is_empty() {
            return;
        }
        for port in self.ports.iter().filter(|p| p.is_admin_up()) {
            let ia = match port.ipv4() {
                Some(ia) => ia,
                None => continue,
            };
            if !process.covers(ia.address) {
                continue;
            }
            let frame =
                rip_multicast(port.mac(), ia.address, RipMessage { entries: entries.clone() });
            queue.push_back(Event::Transmit(self.device_id, port.name().to_string(), frame));
        }
    }

    /// Install routes from a received RIP update.
    pub(crate) fn handle_rip(&mut self, port_index: usize, source: Ipv4Address, message: &RipMessage) {
        let port = &self.ports[port_index];
        let interface = port.name().to_string();
        let covered = match (&self.rip, port.ipv4()) {
            (Some(p), Some(ia)) => p.covers(ia.address),
            _ => false,
        };
        if !covered {
            return;
        }
        let connected: HashSet<Ipv4Network> = self
            .routing_table
            .iter()
            .filter(|e| e.source == RouteSource::Connected)
            .map(|e| e.prefix)
            .collect();
        for (network, metric) in &message.entries {
            let metric = metric + 1;
            if metric >= INFINITY_METRIC || connected.contains(network) {
                continue;
            }
            let has_better = self.routing_table.iter().any(|e| {
                e.source == RouteSource::Rip && e.prefix == *network && e.metric < metric
            });
            if !has_better {
                self.routing_table.install(RouteEntry {
                    prefix: *network,
                    source: RouteSource::Rip,
                    next_hop: Some(source),
                    interface: interface.clone(),
                    metric,
                });
            }
        }
    }
}
