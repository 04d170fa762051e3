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

//! # Minimal RIP process
//!
//! Just enough RIPv2 to verify protocol independence: periodic updates to
//! directly connected RIP routers, hop-count metrics, and routes tagged
//! [`RouteSource::Rip`](crate::routing::RouteSource::Rip). The process
//! lifecycle is fully independent of OSPF on the same router.

use crate::addr::Ipv4Network;
use std::collections::BTreeSet;

/// Seconds between periodic RIP updates.
pub const UPDATE_INTERVAL: u64 = 30;
/// Metric at which a RIP destination is unreachable.
pub const INFINITY_METRIC: u32 = 16;

/// A RIPv2 update message, carried in IPv4 packets to `224.0.0.9`.
#[derive(PartialEq, Debug, Clone)]
pub struct RipMessage {
    /// Advertised destinations with their metric at the sender
    pub entries: Vec<(Ipv4Network, u32)>,
}

/// # RIP process
///
/// Owns only the configuration; learned routes live in the router's routing
/// table, tagged with their origin.
#[derive(Debug, Clone, Default)]
pub(crate) struct RipProcess {
    networks: BTreeSet<Ipv4Network>,
}

impl RipProcess {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enable RIP on every interface whose address falls into `network`.
    pub(crate) fn add_network(&mut self, network: Ipv4Network) {
        self.networks.insert(network);
    }

    /// The configured networks.
    pub(crate) fn networks(&self) -> impl Iterator<Item = &Ipv4Network> {
        self.networks.iter()
    }

    /// Returns true if the interface address participates in RIP.
    pub(crate) fn covers(&self, address: crate::addr::Ipv4Address) -> bool {
        self.networks.iter().any(|n| n.contains(address))
    }
}
