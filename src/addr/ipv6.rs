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

//! IPv6 addresses: parsing, canonical formatting, classification and the
//! derivations used by neighbor discovery (EUI-64, solicited-node multicast,
//! multicast MAC mapping).

use super::{MacAddress, ParseError};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Mutually exclusive IPv6 address categories.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Ipv6Kind {
    /// The unspecified address `::`
    Unspecified,
    /// The loopback address `::1`
    Loopback,
    /// Link-local unicast, `fe80::/10`
    LinkLocal,
    /// Multicast, `ff00::/8`
    Multicast,
    /// Everything else
    GlobalUnicast,
}

/// An IPv6 address as eight 16-bit groups, with an optional zone identifier.
///
/// The zone identifier (`%eth0`) is only carried by link-local addresses. It
/// participates in equality only when both sides specify one; hashing ignores
/// it entirely so that zoned and unzoned forms of the same address collide.
#[derive(Debug, Clone)]
pub struct Ipv6Address {
    groups: [u16; 8],
    zone: Option<String>,
}

impl PartialEq for Ipv6Address {
    fn eq(&self, other: &Self) -> bool {
        if self.groups != other.groups {
            return false;
        }
        match (&self.zone, &other.zone) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl Eq for Ipv6Address {}

impl Hash for Ipv6Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.groups.hash(state);
    }
}

impl Ipv6Address {
    /// Build an address from eight 16-bit groups.
    pub fn new(groups: [u16; 8]) -> Self {
        Self { groups, zone: None }
    }

    /// The unspecified address `::`.
    pub fn unspecified() -> Self {
        Self::new([0; 8])
    }

    /// The loopback address `::1`.
    pub fn loopback() -> Self {
        Self::new([0, 0, 0, 0, 0, 0, 0, 1])
    }

    /// The all-nodes link multicast group `ff02::1`.
    pub fn all_nodes() -> Self {
        Self::new([0xff02, 0, 0, 0, 0, 0, 0, 1])
    }

    /// The all-routers link multicast group `ff02::2`.
    pub fn all_routers() -> Self {
        Self::new([0xff02, 0, 0, 0, 0, 0, 0, 2])
    }

    /// The eight 16-bit groups.
    pub fn groups(&self) -> [u16; 8] {
        self.groups
    }

    /// The zone identifier, if one is carried.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Attach a zone identifier. Only meaningful on link-local addresses; the
    /// zone is dropped for any other kind.
    pub fn with_zone<S: Into<String>>(mut self, zone: S) -> Self {
        if self.kind() == Ipv6Kind::LinkLocal {
            self.zone = Some(zone.into());
        }
        self
    }

    /// Strip the zone identifier.
    pub fn without_zone(mut self) -> Self {
        self.zone = None;
        self
    }

    /// Classify the address. The categories are mutually exclusive.
    pub fn kind(&self) -> Ipv6Kind {
        if self.groups == [0; 8] {
            Ipv6Kind::Unspecified
        } else if self.groups == [0, 0, 0, 0, 0, 0, 0, 1] {
            Ipv6Kind::Loopback
        } else if self.groups[0] & 0xffc0 == 0xfe80 {
            Ipv6Kind::LinkLocal
        } else if self.groups[0] & 0xff00 == 0xff00 {
            Ipv6Kind::Multicast
        } else {
            Ipv6Kind::GlobalUnicast
        }
    }

    /// Returns true for multicast addresses (`ff00::/8`).
    pub fn is_multicast(&self) -> bool {
        self.kind() == Ipv6Kind::Multicast
    }

    /// Returns true for link-local addresses (`fe80::/10`).
    pub fn is_link_local(&self) -> bool {
        self.kind() == Ipv6Kind::LinkLocal
    }

    /// Derive the EUI-64 link-local address from a MAC address: invert the
    /// universal/local bit, insert `ff:fe` in the middle, prefix `fe80::/64`.
    pub fn eui64_link_local(mac: MacAddress) -> Self {
        let m = mac.octets();
        Self::new([
            0xfe80,
            0,
            0,
            0,
            u16::from(m[0] ^ 0x02) << 8 | u16::from(m[1]),
            u16::from(m[2]) << 8 | 0x00ff,
            0xfe00 | u16::from(m[3]),
            u16::from(m[4]) << 8 | u16::from(m[5]),
        ])
    }

    /// Combine a /64 prefix with the EUI-64 interface identifier of a MAC, as
    /// done by SLAAC.
    pub fn from_prefix_and_mac(prefix: Ipv6Address, mac: MacAddress) -> Self {
        let iid = Self::eui64_link_local(mac).groups;
        let p = prefix.groups;
        Self::new([p[0], p[1], p[2], p[3], iid[4], iid[5], iid[6], iid[7]])
    }

    /// The solicited-node multicast group `ff02::1:ffXX:XXXX`, built from the
    /// low 24 bits of the address.
    pub fn solicited_node(&self) -> Ipv6Address {
        Self::new([
            0xff02,
            0,
            0,
            0,
            0,
            1,
            0xff00 | (self.groups[6] & 0x00ff),
            self.groups[7],
        ])
    }

    /// Map a multicast address to its MAC address: `33:33` followed by the
    /// low 32 bits.
    pub fn multicast_mac(&self) -> MacAddress {
        MacAddress([
            0x33,
            0x33,
            (self.groups[6] >> 8) as u8,
            self.groups[6] as u8,
            (self.groups[7] >> 8) as u8,
            self.groups[7] as u8,
        ])
    }

    /// Zero out all bits after `prefix_len`.
    pub fn network_prefix(&self, prefix_len: u8) -> Result<Ipv6Address, ParseError> {
        if prefix_len > 128 {
            return Err(ParseError::InvalidPrefixLength(prefix_len));
        }
        let mut groups = [0u16; 8];
        let mut remaining = u32::from(prefix_len);
        for (i, g) in self.groups.iter().enumerate() {
            let bits = remaining.min(16);
            remaining -= bits;
            groups[i] = if bits == 0 { 0 } else { g & (0xffffu16 << (16 - bits) as u16) };
        }
        Ok(Self::new(groups))
    }

    /// Find the zero run to compress: the longest run of at least two
    /// consecutive zero groups. A later run replaces an earlier one only when
    /// it is strictly longer.
    fn zero_run(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut current: Option<(usize, usize)> = None;
        for (i, g) in self.groups.iter().enumerate() {
            if *g == 0 {
                current = match current {
                    Some((start, len)) => Some((start, len + 1)),
                    None => Some((i, 1)),
                };
                if let Some((_, len)) = current {
                    if len >= 2 && best.map(|(_, l)| len > l).unwrap_or(true) {
                        best = current;
                    }
                }
            } else {
                current = None;
            }
        }
        best
    }
}

impl fmt::Display for Ipv6Address {
    /// Canonical form: lowercase hex without leading zeros, compressing the
    /// longest zero run (ties keep the earlier run).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zero_run() {
            Some((start, len)) => {
                for (i, g) in self.groups.iter().take(start).enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{:x}", g)?;
                }
                write!(f, "::")?;
                for (i, g) in self.groups.iter().skip(start + len).enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{:x}", g)?;
                }
            }
            None => {
                for (i, g) in self.groups.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{:x}", g)?;
                }
            }
        }
        if let Some(zone) = &self.zone {
            write!(f, "%{}", zone)?;
        }
        Ok(())
    }
}

fn parse_groups(s: &str, full: &str) -> Result<Vec<u16>, ParseError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(':')
        .map(|part| {
            if part.is_empty() || part.len() > 4 {
                return Err(ParseError::WrongSegmentCount(full.to_string()));
            }
            if !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseError::InvalidDigit(full.to_string()));
            }
            u16::from_str_radix(part, 16).map_err(|_| ParseError::ValueOutOfRange(full.to_string()))
        })
        .collect()
}

impl FromStr for Ipv6Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, zone) = match s.split_once('%') {
            Some((a, z)) if !z.is_empty() => (a, Some(z.to_string())),
            Some(_) => return Err(ParseError::InvalidDigit(s.to_string())),
            None => (s, None),
        };

        let groups: [u16; 8] = match addr_part.matches("::").count() {
            0 => {
                let groups = parse_groups(addr_part, s)?;
                if groups.len() != 8 {
                    return Err(ParseError::WrongSegmentCount(s.to_string()));
                }
                let mut out = [0u16; 8];
                out.copy_from_slice(&groups);
                out
            }
            1 => {
                let (head, tail) = addr_part.split_once("::").unwrap();
                if tail.contains("::") {
                    return Err(ParseError::MultipleCompressions(s.to_string()));
                }
                let head = parse_groups(head, s)?;
                let tail = parse_groups(tail, s)?;
                if head.len() + tail.len() > 7 {
                    return Err(ParseError::WrongSegmentCount(s.to_string()));
                }
                let mut out = [0u16; 8];
                out[..head.len()].copy_from_slice(&head);
                out[8 - tail.len()..].copy_from_slice(&tail);
                out
            }
            _ => return Err(ParseError::MultipleCompressions(s.to_string())),
        };

        let addr = Ipv6Address::new(groups);
        match zone {
            Some(z) => {
                if addr.kind() != Ipv6Kind::LinkLocal {
                    return Err(ParseError::UnexpectedZone(s.to_string()));
                }
                Ok(Ipv6Address { groups, zone: Some(z) })
            }
            None => Ok(addr),
        }
    }
}

/// An IPv6 prefix (network address and prefix length).
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct Ipv6Network {
    /// Network address (host bits zeroed by [`Ipv6Network::new`]).
    pub address: Ipv6Address,
    /// Prefix length in bits.
    pub prefix_len: u8,
}

impl Ipv6Network {
    /// Build a prefix from any address inside it, zeroing the host bits.
    pub fn new(address: Ipv6Address, prefix_len: u8) -> Result<Self, ParseError> {
        Ok(Self { address: address.network_prefix(prefix_len)?, prefix_len })
    }

    /// The default route `::/0`.
    pub fn default_route() -> Self {
        Self { address: Ipv6Address::unspecified(), prefix_len: 0 }
    }

    /// Returns true if the address lies inside this prefix.
    pub fn contains(&self, addr: &Ipv6Address) -> bool {
        addr.network_prefix(self.prefix_len)
            .map(|p| p.groups() == self.address.groups())
            .unwrap_or(false)
    }
}

impl fmt::Display for Ipv6Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv6Network {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = match s.split_once('/') {
            Some((a, l)) => {
                let len =
                    l.parse::<u8>().map_err(|_| ParseError::InvalidDigit(s.to_string()))?;
                (a.parse::<Ipv6Address>()?, len)
            }
            None => (s.parse::<Ipv6Address>()?, 128),
        };
        Ipv6Network::new(addr.without_zone(), len)
    }
}
