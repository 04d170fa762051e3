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

//! # Layer-2 switching engine
//!
//! MAC learning with virtual-clock aging, the VLAN table with
//! suspend-in-place delete/recreate semantics, and the spanning-tree port
//! state machine helpers. The switch owns its tables; the fabric walks them
//! during frame delivery and drives the timers.

use crate::addr::MacAddress;
use crate::clock::SimTime;
use crate::port::{Port, StpPortState, VlanMode};
use crate::types::{ConfigError, VlanId};
use log::*;
use std::collections::HashMap;

/// Seconds of inactivity after which a learned MAC entry ages out.
pub const MAC_AGING_SECS: u64 = 300;
/// Seconds a port spends in each spanning-tree stage before advancing.
pub const STP_FORWARD_DELAY_SECS: u64 = 15;

/// A learned entry of the MAC table.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct MacTableEntry {
    /// Learned source address
    pub mac: MacAddress,
    /// Ingress port the address was learned on
    pub port: String,
    /// VLAN the frame belonged to
    pub vlan: VlanId,
    /// Virtual time of the last frame from this address
    pub last_seen: SimTime,
}

/// A VLAN known to the switch.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Vlan {
    /// Administrative name
    pub name: String,
}

/// Entry of the VLAN table snapshot.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct VlanTableEntry {
    /// VLAN id
    pub id: VlanId,
    /// Administrative name
    pub name: String,
    /// Access ports assigned to the VLAN (including suspended ones)
    pub access_ports: Vec<String>,
    /// Access ports currently suspended
    pub suspended_ports: Vec<String>,
}

/// # Switch
///
/// A Layer-2 device: named ports, the MAC learning table and the VLAN
/// table. VLAN 1 always exists.
#[derive(Debug, Clone)]
pub struct Switch {
    name: String,
    mac: MacAddress,
    pub(crate) ports: Vec<Port>,
    mac_table: HashMap<MacAddress, MacTableEntry>,
    vlans: HashMap<VlanId, Vlan>,
}

impl Switch {
    pub(crate) fn new(name: String, mac: MacAddress) -> Self {
        let mut vlans = HashMap::new();
        vlans.insert(1, Vlan { name: "default".to_string() });
        Self { name, mac, ports: Vec::new(), mac_table: HashMap::new(), vlans }
    }

    /// Name of the switch.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chassis MAC address.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    // ------------------
    // MAC learning
    // ------------------

    /// Record `(source MAC → ingress port)`, overwriting any stale entry.
    pub(crate) fn learn(&mut self, mac: MacAddress, port: &str, vlan: VlanId, now: SimTime) {
        if mac.is_multicast() {
            return;
        }
        self.mac_table.insert(
            mac,
            MacTableEntry { mac, port: port.to_string(), vlan, last_seen: now },
        );
    }

    /// Look up the egress port for a unicast destination in a VLAN.
    pub(crate) fn egress_for(&self, mac: MacAddress, vlan: VlanId) -> Option<&str> {
        self.mac_table
            .get(&mac)
            .filter(|e| e.vlan == vlan)
            .map(|e| e.port.as_str())
    }

    /// Drop entries not refreshed within the aging interval.
    pub(crate) fn age_out(&mut self, now: SimTime) {
        let aging = SimTime::from_secs(MAC_AGING_SECS);
        self.mac_table.retain(|_, e| now.since(e.last_seen) < aging);
    }

    /// Drop entries learned on the given port (link down, cable pulled).
    pub(crate) fn flush_port(&mut self, port: &str) {
        self.mac_table.retain(|_, e| e.port != port);
    }

    /// Snapshot of the MAC table, sorted by address.
    pub fn mac_table(&self) -> Vec<MacTableEntry> {
        let mut out: Vec<MacTableEntry> = self.mac_table.values().cloned().collect();
        out.sort_by_key(|e| e.mac);
        out
    }

    // ------------------
    // VLAN table
    // ------------------

    /// Create a VLAN, or rename an existing one. Recreating a previously
    /// deleted VLAN reactivates exactly the access ports suspended for it.
    pub(crate) fn create_vlan(&mut self, id: VlanId, name: Option<String>) -> Result<(), ConfigError> {
        if id == 0 || id > 4094 {
            return Err(ConfigError::InvalidVlanId(id));
        }
        let name = name.unwrap_or_else(|| format!("VLAN{:04}", id));
        self.vlans.insert(id, Vlan { name });
        for port in self.ports.iter_mut() {
            if port.is_suspended() && port.access_vlan() == Some(id) {
                debug!("{}: reactivating port {} (VLAN {} recreated)", self.name, port.name(), id);
                port.set_suspended(false);
            }
        }
        Ok(())
    }

    /// Delete a VLAN. Member access ports keep their assignment but are
    /// suspended in place; they drop all frames until the VLAN is recreated.
    pub(crate) fn delete_vlan(&mut self, id: VlanId) -> Result<(), ConfigError> {
        if id == 1 {
            return Err(ConfigError::InvalidVlanId(id));
        }
        if self.vlans.remove(&id).is_none() {
            return Err(ConfigError::NoSuchVlan(id));
        }
        for port in self.ports.iter_mut() {
            if port.access_vlan() == Some(id) {
                debug!("{}: suspending port {} (VLAN {} deleted)", self.name, port.name(), id);
                port.set_suspended(true);
            }
        }
        Ok(())
    }

    /// Returns true if the VLAN exists.
    pub fn has_vlan(&self, id: VlanId) -> bool {
        self.vlans.contains_key(&id)
    }

    /// Snapshot of the VLAN table with per-port suspend state, sorted by id.
    pub fn vlan_table(&self) -> Vec<VlanTableEntry> {
        let mut out: Vec<VlanTableEntry> = self
            .vlans
            .iter()
            .map(|(id, vlan)| {
                let access_ports: Vec<String> = self
                    .ports
                    .iter()
                    .filter(|p| p.access_vlan() == Some(*id))
                    .map(|p| p.name().to_string())
                    .collect();
                let suspended_ports: Vec<String> = self
                    .ports
                    .iter()
                    .filter(|p| p.access_vlan() == Some(*id) && p.is_suspended())
                    .map(|p| p.name().to_string())
                    .collect();
                VlanTableEntry { id: *id, name: vlan.name.clone(), access_ports, suspended_ports }
            })
            .collect();
        out.sort_by_key(|e| e.id);
        out
    }

    /// Assigning a port to a VLAN that does not exist on the switch suspends
    /// it immediately; assigning it to an existing VLAN clears a suspension.
    pub(crate) fn apply_vlan_mode(&mut self, port_index: usize, mode: VlanMode) {
        let suspended = match &mode {
            VlanMode::Access(v) => !self.vlans.contains_key(v),
            VlanMode::Trunk(_) => false,
        };
        let port = &mut self.ports[port_index];
        port.set_vlan_mode(mode);
        port.set_suspended(suspended);
    }

    // ------------------
    // Spanning tree
    // ------------------

    /// The state a freshly attached (or re-enabled) port starts in.
    pub(crate) fn stp_initial_state(port: &Port) -> StpPortState {
        if port.is_portfast() {
            StpPortState::Forwarding
        } else {
            StpPortState::Blocking
        }
    }

    /// Advance a port one spanning-tree stage. Returns the new state if the
    /// port moved and is not yet forwarding (the caller then re-arms the
    /// transition timer).
    pub(crate) fn stp_advance(&mut self, port_index: usize) -> Option<StpPortState> {
        let port = &mut self.ports[port_index];
        let next = port.stp_state().next()?;
        trace!("{}: port {} STP {:?} -> {:?}", self.name, port.name(), port.stp_state(), next);
        port.set_stp_state(next);
        Some(next)
    }
}
