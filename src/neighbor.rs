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

//! # Neighbor discovery caches
//!
//! Per-device resolution caches: ARP for IPv4 and NDP for IPv6. Entries are
//! keyed by protocol address and remember the port they were learned on, so
//! a port going down (or its cable being pulled) invalidates exactly the
//! entries learned through it. No timed expiry is modeled.

use crate::addr::{Ipv4Address, Ipv6Address, MacAddress};
use std::collections::HashMap;

/// A resolved neighbor: its link-layer address and the port it was learned
/// on.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NeighborEntry {
    /// Resolved link-layer address
    pub mac: MacAddress,
    /// Port the reply arrived on
    pub port: String,
}

/// ARP and NDP caches of one host or router.
#[derive(PartialEq, Debug, Clone, Default)]
pub(crate) struct NeighborCaches {
    arp: HashMap<Ipv4Address, NeighborEntry>,
    ndp: HashMap<Ipv6Address, NeighborEntry>,
}

impl NeighborCaches {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Look up an IPv4 neighbor.
    pub(crate) fn arp_lookup(&self, address: Ipv4Address) -> Option<&NeighborEntry> {
        self.arp.get(&address)
    }

    /// Cache an IPv4 neighbor, overwriting a stale entry.
    pub(crate) fn arp_insert(&mut self, address: Ipv4Address, mac: MacAddress, port: &str) {
        self.arp.insert(address, NeighborEntry { mac, port: port.to_string() });
    }

    /// Look up an IPv6 neighbor. Zone identifiers are ignored by the cache
    /// key (hashing ignores them by construction).
    pub(crate) fn ndp_lookup(&self, address: &Ipv6Address) -> Option<&NeighborEntry> {
        self.ndp.get(address)
    }

    /// Cache an IPv6 neighbor, overwriting a stale entry.
    pub(crate) fn ndp_insert(&mut self, address: Ipv6Address, mac: MacAddress, port: &str) {
        self.ndp.insert(address, NeighborEntry { mac, port: port.to_string() });
    }

    /// Drop every entry learned through the given port.
    pub(crate) fn invalidate_port(&mut self, port: &str) {
        self.arp.retain(|_, e| e.port != port);
        self.ndp.retain(|_, e| e.port != port);
    }

    /// Snapshot of the ARP cache, sorted by address.
    pub(crate) fn arp_entries(&self) -> Vec<(Ipv4Address, NeighborEntry)> {
        let mut out: Vec<_> = self.arp.iter().map(|(a, e)| (*a, e.clone())).collect();
        out.sort_by_key(|(a, _)| *a);
        out
    }

    /// Snapshot of the NDP cache, sorted by textual form.
    pub(crate) fn ndp_entries(&self) -> Vec<(Ipv6Address, NeighborEntry)> {
        let mut out: Vec<_> = self.ndp.iter().map(|(a, e)| (a.clone(), e.clone())).collect();
        out.sort_by_key(|(a, _)| a.to_string());
        out
    }
}
