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

//! Module for defining events

use crate::frame::EthernetFrame;
use crate::types::{DeviceId, HandlerId};
use std::collections::VecDeque;
use std::fmt;

/// Internal event, processed by the fabric's queue drain loop. Protocol
/// handlers enqueue their replies here; the loop runs until the queue is
/// empty before the triggering public call returns.
#[derive(Debug, Clone)]
pub(crate) enum Event {
    /// A frame leaves `device` through `port`.
    Transmit(DeviceId, String, EthernetFrame),
}

/// Event queue for enqueuing events.
pub(crate) type EventQueue = VecDeque<Event>;

/// Observable fabric event, delivered synchronously to subscribed handlers.
#[derive(Debug, Clone)]
pub enum FabricEvent {
    /// A device was added to the registry.
    DeviceRegistered {
        /// The new device
        device: DeviceId,
        /// Its name
        name: String,
    },
    /// A device was removed from the registry.
    DeviceUnregistered {
        /// The removed device
        device: DeviceId,
        /// Its name
        name: String,
    },
    /// A frame was delivered to a device. Fired once per recipient.
    FrameReceived {
        /// Receiving device
        device: DeviceId,
        /// Receiving port
        port: String,
        /// The delivered frame
        frame: EthernetFrame,
    },
    /// A frame could not be delivered. Fired once per undeliverable frame;
    /// delivery failures never raise errors.
    FrameDropped {
        /// The sending device
        device: DeviceId,
        /// Why the frame was dropped
        reason: &'static str,
        /// The dropped frame
        frame: EthernetFrame,
    },
}

/// Registry of synchronous event handlers. Handlers run in subscription
/// order, inline, before the public call that caused the event returns.
#[derive(Default)]
pub(crate) struct EventHandlers {
    next_id: u64,
    handlers: Vec<(HandlerId, Box<dyn FnMut(&FabricEvent)>)>,
}

impl EventHandlers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self, handler: Box<dyn FnMut(&FabricEvent)>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler. Returns false if the id is unknown (or already
    /// unsubscribed).
    pub(crate) fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub(crate) fn dispatch(&mut self, event: &FabricEvent) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers").field("handlers", &self.handlers.len()).finish()
    }
}
