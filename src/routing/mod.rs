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

//! # Routing engine
//!
//! Per-device routing tables (IPv4 and IPv6 kept independent), route origins
//! with administrative distances, and the protocol engines: [`ospf`] and the
//! minimal [`rip`] coexistence process.

pub mod ospf;
pub mod rip;

use crate::addr::{Ipv4Address, Ipv4Network, Ipv6Address, Ipv6Network};
use std::fmt;

/// Origin of a routing table entry. The numeric value is the administrative
/// distance used to rank routes to the same prefix.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RouteSource {
    /// Derived from a configured interface address
    Connected,
    /// Installed explicitly
    Static,
    /// Explicitly installed default route
    DefaultRoute,
    /// Learned by the OSPF process
    Ospf(OspfRouteKind),
    /// Learned by the RIP process
    Rip,
}

/// Kind of an OSPF-learned route; area types filter on this.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum OspfRouteKind {
    /// Destination inside the local area
    IntraArea,
    /// Inter-area summary from an area border router
    InterArea,
    /// Redistributed external destination
    External,
}

impl RouteSource {
    /// Administrative distance: lower wins when prefix lengths tie.
    pub fn distance(&self) -> u8 {
        match self {
            RouteSource::Connected => 0,
            RouteSource::Static => 1,
            RouteSource::DefaultRoute => 1,
            RouteSource::Ospf(_) => 110,
            RouteSource::Rip => 120,
        }
    }

    /// Returns true for OSPF-derived routes.
    pub fn is_ospf(&self) -> bool {
        matches!(self, RouteSource::Ospf(_))
    }
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Connected => write!(f, "C"),
            RouteSource::Static => write!(f, "S"),
            RouteSource::DefaultRoute => write!(f, "S*"),
            RouteSource::Ospf(OspfRouteKind::IntraArea) => write!(f, "O"),
            RouteSource::Ospf(OspfRouteKind::InterArea) => write!(f, "O IA"),
            RouteSource::Ospf(OspfRouteKind::External) => write!(f, "O E2"),
            RouteSource::Rip => write!(f, "R"),
        }
    }
}

/// An IPv4 routing table entry.
#[derive(PartialEq, Debug, Clone)]
pub struct RouteEntry {
    /// Destination prefix
    pub prefix: Ipv4Network,
    /// Origin of the entry
    pub source: RouteSource,
    /// Next hop; `None` for connected routes
    pub next_hop: Option<Ipv4Address>,
    /// Outgoing interface
    pub interface: String,
    /// Metric within the origin protocol
    pub metric: u32,
}

/// An IPv6 routing table entry.
#[derive(PartialEq, Debug, Clone)]
pub struct Ipv6RouteEntry {
    /// Destination prefix
    pub prefix: Ipv6Network,
    /// Origin of the entry
    pub source: RouteSource,
    /// Next hop; `None` for connected routes
    pub next_hop: Option<Ipv6Address>,
    /// Outgoing interface
    pub interface: String,
    /// Metric within the origin protocol
    pub metric: u32,
}

/// # IPv4 routing table
///
/// Entries are kept unordered; lookup does longest-prefix match, breaking
/// ties by administrative distance and then by metric. One entry is kept per
/// `(prefix, source)` pair; installing over an existing pair replaces it.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry, replacing any entry with the same prefix and the
    /// same source.
    pub fn install(&mut self, entry: RouteEntry) {
        self.entries.retain(|e| {
            !(e.prefix == entry.prefix
                && std::mem::discriminant(&e.source) == std::mem::discriminant(&entry.source))
        });
        self.entries.push(entry);
    }

    /// Remove all entries matching the predicate.
    pub fn remove_where<F: FnMut(&RouteEntry) -> bool>(&mut self, mut pred: F) {
        self.entries.retain(|e| !pred(e));
    }

    /// Longest-prefix lookup.
    pub fn lookup(&self, destination: Ipv4Address) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|e| e.prefix.contains(destination))
            .min_by_key(|e| (std::cmp::Reverse(e.prefix.prefix_len), e.source.distance(), e.metric))
    }

    /// A snapshot of all entries, ordered by prefix then distance.
    pub fn routes(&self) -> Vec<RouteEntry> {
        let mut out = self.entries.clone();
        out.sort_by_key(|e| (e.prefix, e.source.distance(), e.metric));
        out
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// # IPv6 routing table
///
/// Maintained independently of the IPv4 table, with the same lookup rules.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Ipv6RoutingTable {
    entries: Vec<Ipv6RouteEntry>,
}

impl Ipv6RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry, replacing any entry with the same prefix and the
    /// same source.
    pub fn install(&mut self, entry: Ipv6RouteEntry) {
        self.entries.retain(|e| {
            !(e.prefix == entry.prefix
                && std::mem::discriminant(&e.source) == std::mem::discriminant(&entry.source))
        });
        self.entries.push(entry);
    }

    /// Remove all entries matching the predicate.
    pub fn remove_where<F: FnMut(&Ipv6RouteEntry) -> bool>(&mut self, mut pred: F) {
        self.entries.retain(|e| !pred(e));
    }

    /// Longest-prefix lookup.
    pub fn lookup(&self, destination: &Ipv6Address) -> Option<&Ipv6RouteEntry> {
        self.entries
            .iter()
            .filter(|e| e.prefix.contains(destination))
            .min_by_key(|e| (std::cmp::Reverse(e.prefix.prefix_len), e.source.distance(), e.metric))
    }

    /// A snapshot of all entries, ordered by prefix length then distance.
    pub fn routes(&self) -> Vec<Ipv6RouteEntry> {
        let mut out = self.entries.clone();
        out.sort_by_key(|e| (std::cmp::Reverse(e.prefix.prefix_len), e.source.distance(), e.metric));
        out
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
