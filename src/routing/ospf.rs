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

//! # OSPF protocol engine
//!
//! One OSPF process per router: areas with types, `network` statements with
//! Cisco-style wildcards, passive interfaces, the per-neighbor adjacency
//! state machine (`Down → Init → 2-Way → ExStart → Exchange → Loading →
//! Full`), a link-state database per area, and shortest-path-first route
//! computation over the area's router graph.
//!
//! The process owns all OSPF state; the router drives it from received
//! hello/update messages and from hello/dead/adjacency timers on the virtual
//! clock. Area types govern route *visibility*, never adjacency: stub areas
//! suppress external routes, totally-stubby areas additionally suppress
//! inter-area summaries, NSSA re-permits external redistribution.

use crate::addr::{Ipv4Address, Ipv4Network};
use crate::clock::SimTime;
use crate::port::Port;
use crate::routing::{OspfRouteKind, RouteEntry, RouteSource};
use crate::types::AreaId;
use itertools::Itertools;
use log::*;
use petgraph::algo::bellman_ford;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Seconds between hello transmissions.
pub const HELLO_INTERVAL: u64 = 10;
/// Seconds without a hello after which a neighbor is declared dead.
pub const DEAD_INTERVAL: u64 = 40;
/// Seconds per modeled database-exchange stage (ExStart/Exchange/Loading).
pub const ADJACENCY_STEP: u64 = 1;
/// Default auto-cost reference bandwidth in Mb/s.
pub const DEFAULT_REFERENCE_BANDWIDTH_MBPS: u64 = 100;

/// Type of an OSPF area.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AreaType {
    /// Regular area, all LSA types flooded
    Normal,
    /// No external LSAs
    Stub,
    /// No external LSAs and no inter-area summaries; a default summary is
    /// injected by the area border router instead
    TotallyStubby,
    /// Not-so-stubby: external redistribution re-permitted
    Nssa,
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaType::Normal => write!(f, "normal"),
            AreaType::Stub => write!(f, "stub"),
            AreaType::TotallyStubby => write!(f, "totally-stubby"),
            AreaType::Nssa => write!(f, "nssa"),
        }
    }
}

/// Per-area configuration, shared by all network statements referencing the
/// same area id.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct AreaConfig {
    /// The area type; mutable after creation, re-typing is idempotent.
    pub area_type: AreaType,
}

/// A `network <addr> <wildcard> area <id>` statement.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct NetworkStatement {
    /// Network address to match
    pub network: Ipv4Address,
    /// Cisco-style wildcard (set bits are don't-care)
    pub wildcard: Ipv4Address,
    /// Area the matched interfaces join
    pub area: AreaId,
}

/// State of an OSPF adjacency.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum OspfNeighborState {
    /// No hello seen yet
    Down,
    /// Hello seen, we are not yet listed by the neighbor
    Init,
    /// Bidirectional communication established
    TwoWay,
    /// Master/slave negotiation for database exchange
    ExStart,
    /// Database description exchange
    Exchange,
    /// Requesting missing link-state records
    Loading,
    /// Databases synchronized, adjacency fully up
    Full,
}

impl OspfNeighborState {
    /// The next stage of the database exchange, if any.
    pub fn next(&self) -> Option<OspfNeighborState> {
        match self {
            OspfNeighborState::Down => Some(OspfNeighborState::Init),
            OspfNeighborState::Init => Some(OspfNeighborState::TwoWay),
            OspfNeighborState::TwoWay => Some(OspfNeighborState::ExStart),
            OspfNeighborState::ExStart => Some(OspfNeighborState::Exchange),
            OspfNeighborState::Exchange => Some(OspfNeighborState::Loading),
            OspfNeighborState::Loading => Some(OspfNeighborState::Full),
            OspfNeighborState::Full => None,
        }
    }
}

impl fmt::Display for OspfNeighborState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OspfNeighborState::Down => write!(f, "DOWN"),
            OspfNeighborState::Init => write!(f, "INIT"),
            OspfNeighborState::TwoWay => write!(f, "2WAY"),
            OspfNeighborState::ExStart => write!(f, "EXSTART"),
            OspfNeighborState::Exchange => write!(f, "EXCHANGE"),
            OspfNeighborState::Loading => write!(f, "LOADING"),
            OspfNeighborState::Full => write!(f, "FULL"),
        }
    }
}

/// One discovered neighbor on one interface.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct OspfNeighbor {
    pub(crate) router_id: Ipv4Address,
    pub(crate) address: Ipv4Address,
    pub(crate) interface: String,
    pub(crate) area: AreaId,
    pub(crate) state: OspfNeighborState,
    pub(crate) last_seen: SimTime,
    pub(crate) priority: u8,
    pub(crate) cost: u32,
}

/// Read-only snapshot of an adjacency, as shown by `show ip ospf neighbor`.
#[derive(PartialEq, Debug, Clone)]
pub struct OspfNeighborInfo {
    /// Neighbor router id
    pub router_id: Ipv4Address,
    /// Neighbor interface address
    pub address: Ipv4Address,
    /// Local interface of the adjacency
    pub interface: String,
    /// Area of the adjacency
    pub area: AreaId,
    /// Adjacency state
    pub state: OspfNeighborState,
    /// Neighbor priority from its hellos
    pub priority: u8,
    /// Seconds since the last hello
    pub idle_secs: u64,
}

/// Read-only summary of one area, as shown by `show ip ospf`.
#[derive(PartialEq, Debug, Clone)]
pub struct OspfAreaInfo {
    /// Area id
    pub area: AreaId,
    /// Area type
    pub area_type: AreaType,
    /// Number of records in the area's link-state database
    pub lsa_count: usize,
    /// Number of fully adjacent neighbors in the area
    pub full_neighbors: usize,
}

/// Identity of a link-state record within an origin router.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum LsaId {
    /// The origin's one router LSA
    Router,
    /// Inter-area summary for a prefix
    Summary(Ipv4Network),
    /// External record for a prefix
    External(Ipv4Network),
}

/// A link-state record. Newer sequence numbers replace older ones during
/// flooding; content is otherwise immutable.
#[derive(PartialEq, Debug, Clone)]
pub struct Lsa {
    /// Originating router id
    pub origin: Ipv4Address,
    /// Sequence number, monotonic per origin
    pub seq: u64,
    /// Record content
    pub body: LsaBody,
}

/// Content of a link-state record.
#[derive(PartialEq, Debug, Clone)]
pub enum LsaBody {
    /// Links and attached networks of one router
    Router {
        /// Fully adjacent neighbors and the cost towards them
        links: Vec<(Ipv4Address, u32)>,
        /// Directly attached networks and their interface cost
        networks: Vec<(Ipv4Network, u32)>,
    },
    /// Inter-area summary originated by an area border router
    Summary {
        /// Summarized prefix
        network: Ipv4Network,
        /// Cost from the originating border router
        metric: u32,
    },
    /// External destination
    External {
        /// External prefix
        network: Ipv4Network,
        /// External metric
        metric: u32,
    },
}

impl Lsa {
    /// The database key of this record.
    pub fn key(&self) -> (Ipv4Address, LsaId) {
        let id = match &self.body {
            LsaBody::Router { .. } => LsaId::Router,
            LsaBody::Summary { network, .. } => LsaId::Summary(*network),
            LsaBody::External { network, .. } => LsaId::External(*network),
        };
        (self.origin, id)
    }
}

/// An OSPF protocol message, carried in IPv4 packets to `224.0.0.5`.
#[derive(PartialEq, Debug, Clone)]
pub enum OspfMessage {
    /// Periodic neighbor discovery and keepalive
    Hello(OspfHello),
    /// Link-state flooding (stands in for the DD/LSR/LSU exchange)
    DatabaseUpdate {
        /// Area the records belong to
        area: AreaId,
        /// Flooded records
        lsas: Vec<Lsa>,
    },
}

/// The hello packet.
#[derive(PartialEq, Debug, Clone)]
pub struct OspfHello {
    /// Sender router id
    pub router_id: Ipv4Address,
    /// Sender area on the transmitting interface
    pub area: AreaId,
    /// Sender hello interval in seconds
    pub hello_interval: u64,
    /// Sender dead interval in seconds
    pub dead_interval: u64,
    /// Sender interface priority
    pub priority: u8,
    /// Router ids of neighbors the sender has seen on this link
    pub neighbors_seen: Vec<Ipv4Address>,
}

/// # OSPF process
///
/// All protocol state of one router's OSPF instance. Exactly one process per
/// router; creating and removing it is explicit and independent of any other
/// protocol running on the same router.
#[derive(Debug, Clone)]
pub(crate) struct OspfProcess {
    pub(crate) process_id: u32,
    pub(crate) router_id: Ipv4Address,
    networks: Vec<NetworkStatement>,
    areas: HashMap<AreaId, AreaConfig>,
    passive_all: bool,
    passive: HashSet<String>,
    pub(crate) reference_bandwidth_mbps: u64,
    pub(crate) default_originate: bool,
    neighbors: HashMap<(String, Ipv4Address), OspfNeighbor>,
    lsdb: HashMap<AreaId, HashMap<(Ipv4Address, LsaId), Lsa>>,
    next_seq: u64,
}

impl OspfProcess {
    pub(crate) fn new(process_id: u32, router_id: Ipv4Address) -> Self {
        Self {
            process_id,
            router_id,
            networks: Vec::new(),
            areas: HashMap::new(),
            passive_all: false,
            passive: HashSet::new(),
            reference_bandwidth_mbps: DEFAULT_REFERENCE_BANDWIDTH_MBPS,
            default_originate: false,
            neighbors: HashMap::new(),
            lsdb: HashMap::new(),
            next_seq: 1,
        }
    }

    // ------------------
    // Configuration
    // ------------------

    /// Change the router id. All adjacency and database state is reset; the
    /// process rebuilds it under the new identity.
    pub(crate) fn set_router_id(&mut self, router_id: Ipv4Address) {
        if self.router_id != router_id {
            self.router_id = router_id;
            self.neighbors.clear();
            self.lsdb.clear();
        }
    }

    /// Add a network statement. Statements referencing the same area share
    /// one [`AreaConfig`].
    pub(crate) fn add_network(&mut self, statement: NetworkStatement) {
        self.areas.entry(statement.area).or_insert(AreaConfig { area_type: AreaType::Normal });
        if !self.networks.contains(&statement) {
            self.networks.push(statement);
        }
    }

    /// Remove a network statement. Returns false if it was not present. The
    /// area configuration is kept.
    pub(crate) fn remove_network(&mut self, statement: &NetworkStatement) -> bool {
        let before = self.networks.len();
        self.networks.retain(|s| s != statement);
        self.networks.len() != before
    }

    /// Set (or create) the type of an area. Idempotent.
    pub(crate) fn set_area_type(&mut self, area: AreaId, area_type: AreaType) {
        self.areas.entry(area).or_insert(AreaConfig { area_type }).area_type = area_type;
    }

    /// The configured type of an area (Normal if never set).
    pub(crate) fn area_type(&self, area: AreaId) -> AreaType {
        self.areas.get(&area).map(|a| a.area_type).unwrap_or(AreaType::Normal)
    }

    /// The area the address belongs to, following the first matching network
    /// statement in configuration order.
    pub(crate) fn area_for(&self, address: Ipv4Address) -> Option<AreaId> {
        self.networks
            .iter()
            .find(|s| address.wildcard_match(s.network, s.wildcard))
            .map(|s| s.area)
    }

    pub(crate) fn statements(&self) -> &[NetworkStatement] {
        &self.networks
    }

    /// Mark one interface passive.
    pub(crate) fn set_passive(&mut self, interface: &str, passive: bool) {
        if passive {
            self.passive.insert(interface.to_string());
        } else {
            self.passive.remove(interface);
        }
    }

    /// Mark all interfaces passive (`passive-interface default`).
    pub(crate) fn set_passive_default(&mut self, passive: bool) {
        self.passive_all = passive;
        if !passive {
            self.passive.clear();
        }
    }

    /// A passive interface sends no hellos and ignores received ones; its
    /// network is still advertised.
    pub(crate) fn is_passive(&self, interface: &str) -> bool {
        self.passive_all || self.passive.contains(interface)
    }

    /// The OSPF cost of an interface: explicit override, or reference
    /// bandwidth divided by interface bandwidth, never below 1.
    pub(crate) fn interface_cost(&self, port: &Port) -> u32 {
        port.ospf_cost().unwrap_or_else(|| {
            let ref_kbps = self.reference_bandwidth_mbps * 1000;
            (ref_kbps / port.bandwidth_kbps().max(1)).max(1) as u32
        })
    }

    // ------------------
    // Neighbors
    // ------------------

    /// Record a received hello, creating the neighbor in `Init` if unknown.
    /// Returns the adjacency state after processing.
    pub(crate) fn observe_hello(
        &mut self,
        interface: &str,
        area: AreaId,
        hello: &OspfHello,
        source: Ipv4Address,
        cost: u32,
        now: SimTime,
    ) -> OspfNeighborState {
        let key = (interface.to_string(), hello.router_id);
        let neighbor = self.neighbors.entry(key).or_insert_with(|| {
            debug!("new OSPF neighbor {} on {}", hello.router_id, interface);
            OspfNeighbor {
                router_id: hello.router_id,
                address: source,
                interface: interface.to_string(),
                area,
                state: OspfNeighborState::Init,
                last_seen: now,
                priority: hello.priority,
                cost,
            }
        });
        neighbor.last_seen = now;
        neighbor.address = source;
        neighbor.priority = hello.priority;
        neighbor.cost = cost;
        neighbor.state
    }

    /// Promote a neighbor from `Init` to `TwoWay` (we appeared in its hello).
    /// Returns true if the state changed.
    pub(crate) fn promote_two_way(&mut self, interface: &str, router_id: Ipv4Address) -> bool {
        match self.neighbors.get_mut(&(interface.to_string(), router_id)) {
            Some(n) if n.state == OspfNeighborState::Init => {
                n.state = OspfNeighborState::TwoWay;
                true
            }
            _ => false,
        }
    }

    /// Advance one adjacency through the database exchange by one stage.
    /// Returns the new state, or `None` if the neighbor vanished.
    pub(crate) fn advance_adjacency(
        &mut self,
        interface: &str,
        router_id: Ipv4Address,
    ) -> Option<OspfNeighborState> {
        let neighbor = self.neighbors.get_mut(&(interface.to_string(), router_id))?;
        if neighbor.state >= OspfNeighborState::TwoWay {
            if let Some(next) = neighbor.state.next() {
                neighbor.state = next;
            }
        }
        Some(neighbor.state)
    }

    /// Drop every neighbor whose last hello is older than the dead interval.
    /// Returns the removed neighbors.
    pub(crate) fn prune_dead(&mut self, now: SimTime) -> Vec<OspfNeighbor> {
        let dead = SimTime::from_secs(DEAD_INTERVAL);
        let expired: Vec<(String, Ipv4Address)> = self
            .neighbors
            .iter()
            .filter(|(_, n)| now.since(n.last_seen) >= dead)
            .map(|(k, _)| k.clone())
            .collect();
        expired.into_iter().filter_map(|k| self.neighbors.remove(&k)).collect()
    }

    /// Drop every neighbor on the given interface. Returns true if any
    /// adjacency existed.
    pub(crate) fn drop_neighbors_on(&mut self, interface: &str) -> bool {
        let before = self.neighbors.len();
        self.neighbors.retain(|(iface, _), _| iface != interface);
        self.neighbors.len() != before
    }

    /// Refresh the cost stored on every neighbor from the current interface
    /// configuration, so re-originated router records carry the new costs.
    pub(crate) fn update_neighbor_costs(&mut self, costs: &HashMap<String, u32>) {
        for neighbor in self.neighbors.values_mut() {
            if let Some(cost) = costs.get(&neighbor.interface) {
                neighbor.cost = *cost;
            }
        }
    }

    /// Interfaces that currently carry at least one neighbor.
    pub(crate) fn neighbor_interfaces(&self) -> Vec<String> {
        let set: HashSet<&str> = self.neighbors.values().map(|n| n.interface.as_str()).collect();
        set.into_iter().map(|s| s.to_string()).collect()
    }

    /// All fully adjacent neighbors.
    pub(crate) fn full_neighbors(&self) -> Vec<OspfNeighbor> {
        self.neighbors
            .values()
            .filter(|n| n.state == OspfNeighborState::Full)
            .cloned()
            .collect()
    }

    /// Router ids seen on one interface (state `Init` or better), for hello
    /// generation.
    pub(crate) fn seen_on(&self, interface: &str) -> Vec<Ipv4Address> {
        self.neighbors
            .values()
            .filter(|n| n.interface == interface)
            .map(|n| n.router_id)
            .collect()
    }

    /// Snapshot of the neighbor table.
    pub(crate) fn neighbor_infos(&self, now: SimTime) -> Vec<OspfNeighborInfo> {
        let mut out: Vec<OspfNeighborInfo> = self
            .neighbors
            .values()
            .map(|n| OspfNeighborInfo {
                router_id: n.router_id,
                address: n.address,
                interface: n.interface.clone(),
                area: n.area,
                state: n.state,
                priority: n.priority,
                idle_secs: now.since(n.last_seen).as_secs(),
            })
            .collect();
        out.sort_by_key(|n| (n.interface.clone(), n.router_id));
        out
    }

    /// Snapshot of the area table.
    pub(crate) fn area_infos(&self) -> Vec<OspfAreaInfo> {
        self.areas
            .iter()
            .map(|(area, config)| OspfAreaInfo {
                area: *area,
                area_type: config.area_type,
                lsa_count: self.lsdb.get(area).map(|db| db.len()).unwrap_or(0),
                full_neighbors: self
                    .neighbors
                    .values()
                    .filter(|n| n.area == *area && n.state == OspfNeighborState::Full)
                    .count(),
            })
            .sorted_by_key(|a| a.area)
            .collect()
    }

    // ------------------
    // Link-state database
    // ------------------

    /// Merge flooded records into the area database. A record replaces the
    /// stored one only if its sequence number is strictly newer. Returns
    /// true if anything changed (the caller then refloods and recomputes).
    pub(crate) fn merge_lsas(&mut self, area: AreaId, lsas: Vec<Lsa>) -> bool {
        let db = self.lsdb.entry(area).or_default();
        let mut changed = false;
        for lsa in lsas {
            match db.get(&lsa.key()) {
                Some(existing) if existing.seq >= lsa.seq => {}
                _ => {
                    trace!("merge LSA {:?} seq {}", lsa.key(), lsa.seq);
                    db.insert(lsa.key(), lsa);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Originate (or refresh) one of our own records in the area database.
    /// The sequence number is bumped only when the content changed.
    pub(crate) fn originate(&mut self, area: AreaId, body: LsaBody) -> bool {
        let lsa = Lsa { origin: self.router_id, seq: 0, body };
        let db = self.lsdb.entry(area).or_default();
        match db.get(&lsa.key()) {
            Some(existing) if existing.body == lsa.body => false,
            _ => {
                let seq = self.next_seq;
                self.next_seq += 1;
                db.insert(lsa.key(), Lsa { seq, ..lsa });
                true
            }
        }
    }

    /// Withdraw one of our own records. Returns true if it existed.
    pub(crate) fn withdraw(&mut self, area: AreaId, id: LsaId) -> bool {
        let router_id = self.router_id;
        self.lsdb
            .get_mut(&area)
            .map(|db| db.remove(&(router_id, id)).is_some())
            .unwrap_or(false)
    }

    /// All records of one area.
    pub(crate) fn lsdb_snapshot(&self, area: AreaId) -> Vec<Lsa> {
        let mut out: Vec<Lsa> =
            self.lsdb.get(&area).map(|db| db.values().cloned().collect()).unwrap_or_default();
        out.sort_by_key(|l| (l.origin, l.seq));
        out
    }

    /// The areas with at least one database record or configuration entry.
    pub(crate) fn known_areas(&self) -> Vec<AreaId> {
        let mut areas: HashSet<AreaId> = self.areas.keys().copied().collect();
        areas.extend(self.lsdb.keys().copied());
        let mut out: Vec<AreaId> = areas.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// The prefixes reachable inside one area with their cost from this
    /// router, used by an area border router to build summaries. Our own
    /// attached networks count at their interface cost.
    pub(crate) fn area_reachable_networks(&self, area: AreaId) -> Vec<(Ipv4Network, u32)> {
        let db = match self.lsdb.get(&area) {
            Some(db) => db,
            None => return Vec::new(),
        };
        let mut graph: StableGraph<(), f32, Directed, u32> = StableGraph::default();
        let mut nodes: HashMap<Ipv4Address, NodeIndex> = HashMap::new();
        for lsa in db.values() {
            if let LsaBody::Router { links, .. } = &lsa.body {
                let from = *nodes.entry(lsa.origin).or_insert_with(|| graph.add_node(()));
                for (neighbor, cost) in links {
                    let to = *nodes.entry(*neighbor).or_insert_with(|| graph.add_node(()));
                    graph.add_edge(from, to, *cost as f32);
                }
            }
        }
        let own = match nodes.get(&self.router_id) {
            Some(n) => *n,
            None => return Vec::new(),
        };
        let (weights, _) = match bellman_ford(&graph, own) {
            Ok(r) => r,
            Err(_) => return Vec::new(),
        };
        let mut best: HashMap<Ipv4Network, u32> = HashMap::new();
        for lsa in db.values() {
            if let LsaBody::Router { networks, .. } = &lsa.body {
                let base = match nodes.get(&lsa.origin).map(|n| weights[n.index()]) {
                    Some(w) if w.is_finite() => w as u32,
                    _ => continue,
                };
                for (network, cost) in networks {
                    let metric = base + cost;
                    best.entry(*network)
                        .and_modify(|m| *m = (*m).min(metric))
                        .or_insert(metric);
                }
            }
        }
        let mut out: Vec<(Ipv4Network, u32)> = best.into_iter().collect();
        out.sort();
        out
    }

    // ------------------
    // Route computation
    // ------------------

    /// Run SPF over every area database and return the OSPF routes to
    /// install. Area types filter route visibility here: stub areas drop
    /// external records, totally-stubby areas additionally drop non-default
    /// summaries.
    pub(crate) fn compute_routes(&self) -> Vec<RouteEntry> {
        let mut best: HashMap<Ipv4Network, (u8, RouteEntry)> = HashMap::new();

        // next hops can only be fully adjacent neighbors
        let first_hops: HashMap<Ipv4Address, (String, Ipv4Address)> = self
            .full_neighbors()
            .into_iter()
            .map(|n| (n.router_id, (n.interface, n.address)))
            .collect();

        for area in self.known_areas() {
            let db = match self.lsdb.get(&area) {
                Some(db) => db,
                None => continue,
            };
            let area_type = self.area_type(area);

            // Build the directed router graph of the area from the router
            // records and compute shortest paths from ourselves.
            let mut graph: StableGraph<(), f32, Directed, u32> = StableGraph::default();
            let mut nodes: HashMap<Ipv4Address, NodeIndex> = HashMap::new();
            for lsa in db.values() {
                if let LsaBody::Router { links, .. } = &lsa.body {
                    let from = *nodes.entry(lsa.origin).or_insert_with(|| graph.add_node(()));
                    for (neighbor, cost) in links {
                        let to = *nodes.entry(*neighbor).or_insert_with(|| graph.add_node(()));
                        graph.add_edge(from, to, *cost as f32);
                    }
                }
            }
            let own = match nodes.get(&self.router_id) {
                Some(n) => *n,
                None => continue,
            };
            let (weights, predecessors) = match bellman_ford(&graph, own) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let distance = |target: NodeIndex| -> Option<u32> {
                let w = weights[target.index()];
                if w.is_finite() {
                    Some(w as u32)
                } else {
                    None
                }
            };
            let first_hop = |target: NodeIndex| -> Option<Ipv4Address> {
                let mut current = target;
                loop {
                    match predecessors[current.index()] {
                        Some(p) if p == own => {
                            return nodes.iter().find(|(_, n)| **n == current).map(|(r, _)| *r)
                        }
                        Some(p) => current = p,
                        None => return None,
                    }
                }
            };

            for lsa in db.values() {
                if lsa.origin == self.router_id {
                    continue;
                }
                let origin_node = match nodes.get(&lsa.origin) {
                    Some(n) => *n,
                    None => continue,
                };
                let base = match distance(origin_node) {
                    Some(d) => d,
                    None => continue,
                };
                let via = match first_hop(origin_node).and_then(|rid| first_hops.get(&rid)) {
                    Some(v) => v.clone(),
                    None => continue,
                };
                let candidates: Vec<(Ipv4Network, OspfRouteKind, u32)> = match &lsa.body {
                    LsaBody::Router { networks, .. } => networks
                        .iter()
                        .map(|(net, cost)| (*net, OspfRouteKind::IntraArea, base + cost))
                        .collect(),
                    LsaBody::Summary { network, metric } => {
                        if area_type == AreaType::TotallyStubby
                            && *network != Ipv4Network::default_route()
                        {
                            continue;
                        }
                        vec![(*network, OspfRouteKind::InterArea, base + metric)]
                    }
                    LsaBody::External { network, metric } => {
                        if matches!(area_type, AreaType::Stub | AreaType::TotallyStubby) {
                            continue;
                        }
                        vec![(*network, OspfRouteKind::External, base + metric)]
                    }
                };
                for (network, kind, metric) in candidates {
                    let rank = match kind {
                        OspfRouteKind::IntraArea => 0u8,
                        OspfRouteKind::InterArea => 1,
                        OspfRouteKind::External => 2,
                    };
                    let entry = RouteEntry {
                        prefix: network,
                        source: RouteSource::Ospf(kind),
                        next_hop: Some(via.1),
                        interface: via.0.clone(),
                        metric,
                    };
                    match best.get(&network) {
                        Some((r, e)) if (*r, e.metric) <= (rank, metric) => {}
                        _ => {
                            best.insert(network, (rank, entry));
                        }
                    }
                }
            }
        }

        let mut out: Vec<RouteEntry> = best.into_iter().map(|(_, (_, e))| e).collect();
        out.sort_by_key(|e| e.prefix);
        out
    }
}
