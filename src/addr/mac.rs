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

//! IEEE 802 MAC addresses.

use super::ParseError;
use std::fmt;
use std::str::FromStr;

/// A 48-bit MAC address. Equality is by value; the canonical textual form is
/// lowercase colon-separated hex (`02:00:5e:00:00:01`).
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// The all-ones broadcast address `ff:ff:ff:ff:ff:ff`.
    pub fn broadcast() -> Self {
        MacAddress([0xff; 6])
    }

    /// Generate a random locally-administered unicast address. The
    /// universal/local bit is set and the group bit is cleared, so generated
    /// addresses never collide with vendor-assigned ones.
    pub fn generate() -> Self {
        let mut octets: [u8; 6] = rand::random();
        octets[0] = (octets[0] | 0x02) & !0x01;
        MacAddress(octets)
    }

    /// Returns true for the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// Returns true if the group bit is set (multicast and broadcast).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Returns true if the address is neither broadcast nor multicast.
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    /// Returns true if the universal/local bit is set.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// The raw octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    /// Accepts colon- or dash-separated hex, case-insensitive. The separator
    /// must be used consistently.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = if s.contains(':') { ':' } else { '-' };
        let parts: Vec<&str> = s.split(sep).collect();
        if parts.len() != 6 {
            return Err(ParseError::WrongSegmentCount(s.to_string()));
        }
        let mut octets = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseError::InvalidDigit(s.to_string()));
            }
            octets[i] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidDigit(s.to_string()))?;
        }
        Ok(MacAddress(octets))
    }
}
