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

//! # Virtual clock
//!
//! Protocol timers (STP transitions, MAC aging, OSPF hello/dead intervals,
//! RIP updates) are callbacks scheduled against a virtual clock. Advancing
//! the clock is the only way timers fire. Timers are plain data
//! ([`TimerKind`]); the [`Fabric`](crate::Fabric) dispatches due timers with
//! the same synchronous semantics as any other operation.
//!
//! Every timer carries a [`TimerScope`]. Disabling an interface, removing an
//! OSPF/RIP process or unregistering a device cancels the matching scope, so
//! a later clock advance can never resurrect state for an entity that no
//! longer exists.

use crate::addr::Ipv4Address;
use crate::types::{DeviceId, TimerId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::ops::Add;

/// A point in virtual time, with millisecond resolution.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        SimTime(0)
    }

    /// A duration of whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1000)
    }

    /// A duration of milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        SimTime(millis)
    }

    /// Whole seconds, truncating.
    pub fn as_secs(&self) -> u64 {
        self.0 / 1000
    }

    /// Milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Saturating difference.
    pub fn since(&self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}s", self.0 / 1000, self.0 % 1000)
    }
}

/// What a timer does when it fires. Dispatched by `Fabric::fire_timer`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub(crate) enum TimerKind {
    /// Advance the spanning-tree state of a port by one stage
    StpTransition(DeviceId, String),
    /// Sweep aged-out entries from a switch MAC table
    MacAging(DeviceId),
    /// Send OSPF hellos on all activated, non-passive interfaces
    OspfHello(DeviceId),
    /// Check all OSPF neighbors against the dead interval
    OspfDeadCheck(DeviceId),
    /// Advance one OSPF adjacency through ExStart/Exchange/Loading
    OspfAdjacencyStep(DeviceId, String, Ipv4Address),
    /// Send a periodic RIP update
    RipUpdate(DeviceId),
}

/// The entity a timer belongs to, for bulk cancellation.
#[derive(PartialEq, Eq, Debug, Clone)]
pub(crate) enum TimerScope {
    /// Any timer owned by the device
    Device(DeviceId),
    /// A timer owned by one port of the device
    Port(DeviceId, String),
    /// A timer owned by the device's OSPF process
    Ospf(DeviceId),
    /// A timer owned by the device's RIP process
    Rip(DeviceId),
}

impl TimerScope {
    /// Returns true if cancelling `cancelled` must also cancel `self`.
    /// Cancelling a device cancels everything the device owns.
    fn within(&self, cancelled: &TimerScope) -> bool {
        match (self, cancelled) {
            (a, b) if a == b => true,
            (TimerScope::Port(d, _), TimerScope::Device(c))
            | (TimerScope::Ospf(d), TimerScope::Device(c))
            | (TimerScope::Rip(d), TimerScope::Device(c)) => d == c,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct TimerEntry {
    kind: TimerKind,
    scope: TimerScope,
}

/// # Virtual clock with timer queue
///
/// Due timers fire in timestamp order; ties fire in scheduling order, which
/// keeps the simulation fully deterministic. Cancellation leaves tombstones
/// in the heap which are skipped on pop.
#[derive(Debug, Clone, Default)]
pub(crate) struct VirtualClock {
    now: SimTime,
    heap: BinaryHeap<Reverse<(SimTime, u64, TimerId)>>,
    entries: HashMap<TimerId, TimerEntry>,
    next_id: u64,
}

impl VirtualClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The current virtual time.
    pub(crate) fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `kind` to fire `delay` from now.
    pub(crate) fn schedule(&mut self, delay: SimTime, scope: TimerScope, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse((self.now + delay, id.0, id)));
        self.entries.insert(id, TimerEntry { kind, scope });
        id
    }

    /// Cancel a single timer. Cancelling an already-fired timer is a no-op.
    pub(crate) fn cancel(&mut self, id: TimerId) {
        self.entries.remove(&id);
    }

    /// Cancel every timer within the given scope.
    pub(crate) fn cancel_scope(&mut self, scope: &TimerScope) {
        self.entries.retain(|_, entry| !entry.scope.within(scope));
    }

    /// Pop the next live timer due at or before `limit`, advancing `now` to
    /// its deadline. Returns `None` when no timer is due, leaving `now`
    /// untouched (the caller advances to `limit` itself).
    pub(crate) fn pop_due(&mut self, limit: SimTime) -> Option<TimerKind> {
        while let Some(Reverse((at, _, id))) = self.heap.peek().copied() {
            if at > limit {
                return None;
            }
            self.heap.pop();
            if let Some(entry) = self.entries.remove(&id) {
                self.now = at;
                return Some(entry.kind);
            }
            // tombstone of a cancelled timer
        }
        None
    }

    /// Jump the clock to `target` without firing anything. Used after all due
    /// timers have been drained.
    pub(crate) fn advance_to(&mut self, target: SimTime) {
        debug_assert!(target >= self.now);
        self.now = target;
    }

    /// Number of live timers (for tests and diagnostics).
    #[allow(dead_code)]
    pub(crate) fn pending(&self) -> usize {
        self.entries.len()
    }
}
