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

#![deny(missing_docs)]

//! # NetLab: Simulating Multi-Vendor Network Fabrics
//!
//! This is a library for simulating IP networks built from hosts, switches
//! and routers connected by cables: Ethernet frame delivery with MAC
//! learning, VLANs and spanning tree, IPv4/IPv6 addressing, ARP and IPv6
//! neighbor discovery (including SLAAC), static routing, and a simplified
//! OSPF protocol engine with areas and a neighbor adjacency state machine.
//!
//! The engine is a single-threaded, discrete-event simulator. Every public
//! operation executes to completion synchronously, and all protocol timers
//! run against a virtual clock: advancing the clock is the only way hello
//! intervals elapse, MAC entries age out, or spanning-tree ports move
//! towards forwarding. This makes every outcome deterministic and testable.
//!
//! The vendor CLI layers (Cisco IOS, Huawei VRP) consume this engine's
//! operations and accessors; the engine itself is vendor-neutral and owns
//! all protocol state.
//!
//! ## Example usage
//!
//! The following example connects two routers back to back, runs OSPF
//! between them, and lets the adjacency form by advancing the virtual
//! clock.
//!
//! ```rust
//! use netlab::{Fabric, SimTime};
//! use netlab::routing::ospf::OspfNeighborState;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//!     let mut net = Fabric::new();
//!
//!     let r1 = net.add_router("R1")?;
//!     let r2 = net.add_router("R2")?;
//!     net.add_port(r1, "eth0")?;
//!     net.add_port(r2, "eth0")?;
//!     net.set_ipv4(r1, "eth0", "10.0.0.1".parse()?, "255.255.255.0".parse()?)?;
//!     net.set_ipv4(r2, "eth0", "10.0.0.2".parse()?, "255.255.255.0".parse()?)?;
//!     net.connect(r1, "eth0", r2, "eth0")?;
//!
//!     net.ospf_enable(r1, 1, None)?;
//!     net.ospf_enable(r2, 1, None)?;
//!     net.ospf_network(r1, "10.0.0.0".parse()?, Some("0.0.0.255".parse()?), Some(0))?;
//!     net.ospf_network(r2, "10.0.0.0".parse()?, Some("0.0.0.255".parse()?), Some(0))?;
//!
//!     net.advance_clock(SimTime::from_secs(60));
//!
//!     let neighbors = net.ospf_neighbors(r1)?;
//!     assert_eq!(neighbors.len(), 1);
//!     assert_eq!(neighbors[0].state, OspfNeighborState::Full);
//!
//!     Ok(())
//! }
//! ```

mod test;

pub mod addr;
mod clock;
pub mod device;
mod event;
pub mod fabric;
pub mod frame;
pub mod neighbor;
pub mod port;
pub mod router;
pub mod routing;
pub mod switch;
mod types;

pub use clock::SimTime;
pub use event::FabricEvent;
pub use fabric::{Fabric, FabricStatistics};
pub use types::{
    AreaId, CableId, ConfigError, DeviceId, HandlerId, NetworkError, VlanId,
};
