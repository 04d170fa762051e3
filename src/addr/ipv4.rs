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

//! IPv4 addresses, subnet masks and prefixes.

use super::ParseError;
use std::fmt;
use std::str::FromStr;

/// An IPv4 address.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct Ipv4Address(pub [u8; 4]);

impl Ipv4Address {
    /// The unspecified address `0.0.0.0`.
    pub fn unspecified() -> Self {
        Ipv4Address([0; 4])
    }

    /// The address as a big-endian `u32`.
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Build an address from a big-endian `u32`.
    pub fn from_u32(v: u32) -> Self {
        Ipv4Address(v.to_be_bytes())
    }

    /// Returns true for class-D multicast addresses (`224.0.0.0/4`).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 0xe0
    }

    /// The network address of `self` under the given mask.
    pub fn network_address(&self, mask: SubnetMask) -> Ipv4Address {
        Ipv4Address::from_u32(self.to_u32() & mask.to_u32())
    }

    /// Two addresses are in the same subnet iff their network addresses under
    /// the mask are equal.
    pub fn is_in_same_subnet(&self, other: Ipv4Address, mask: SubnetMask) -> bool {
        self.network_address(mask) == other.network_address(mask)
    }

    /// Cisco-style wildcard matching, as used by OSPF `network` statements: a
    /// bit set in the wildcard is a don't-care bit.
    pub fn wildcard_match(&self, network: Ipv4Address, wildcard: Ipv4Address) -> bool {
        (self.to_u32() ^ network.to_u32()) & !wildcard.to_u32() == 0
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Ipv4Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(ParseError::WrongSegmentCount(s.to_string()));
        }
        let mut octets = [0u8; 4];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(ParseError::InvalidDigit(s.to_string()));
            }
            octets[i] =
                part.parse::<u8>().map_err(|_| ParseError::ValueOutOfRange(s.to_string()))?;
        }
        Ok(Ipv4Address(octets))
    }
}

/// An IPv4 subnet mask. Only contiguous masks are representable through the
/// public constructors; parsing a non-contiguous mask fails.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct SubnetMask(pub [u8; 4]);

impl SubnetMask {
    /// Build a mask from a CIDR prefix length (0..=32).
    pub fn from_prefix_len(len: u8) -> Result<Self, ParseError> {
        if len > 32 {
            return Err(ParseError::InvalidPrefixLength(len));
        }
        let bits: u32 = if len == 0 { 0 } else { u32::MAX << (32 - u32::from(len)) };
        Ok(SubnetMask(bits.to_be_bytes()))
    }

    /// The CIDR prefix length of the mask.
    pub fn prefix_len(&self) -> u8 {
        self.to_u32().count_ones() as u8
    }

    /// The mask as a big-endian `u32`.
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// The bitwise inverse of the mask, as a wildcard address.
    pub fn wildcard(&self) -> Ipv4Address {
        Ipv4Address::from_u32(!self.to_u32())
    }
}

impl fmt::Display for SubnetMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for SubnetMask {
    type Err = ParseError;

    /// Accepts dotted-decimal notation. The mask bits must be contiguous.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: Ipv4Address = s.parse()?;
        let bits = addr.to_u32();
        // a contiguous mask inverts to 2^n - 1
        if !bits != 0 && ((!bits) & (!bits).wrapping_add(1)) != 0 {
            return Err(ParseError::NonContiguousMask(s.to_string()));
        }
        Ok(SubnetMask(addr.0))
    }
}

/// An IPv4 prefix (network address and prefix length).
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct Ipv4Network {
    /// Network address (host bits zeroed by [`Ipv4Network::new`]).
    pub address: Ipv4Address,
    /// Prefix length in bits.
    pub prefix_len: u8,
}

impl Ipv4Network {
    /// Build a prefix from any address inside it, zeroing the host bits.
    pub fn new(address: Ipv4Address, prefix_len: u8) -> Result<Self, ParseError> {
        let mask = SubnetMask::from_prefix_len(prefix_len)?;
        Ok(Self { address: address.network_address(mask), prefix_len })
    }

    /// The default route `0.0.0.0/0`.
    pub fn default_route() -> Self {
        Self { address: Ipv4Address::unspecified(), prefix_len: 0 }
    }

    /// Returns true if the address lies inside this prefix.
    pub fn contains(&self, addr: Ipv4Address) -> bool {
        let mask = SubnetMask::from_prefix_len(self.prefix_len).unwrap().to_u32();
        addr.to_u32() & mask == self.address.to_u32()
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Network {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = match s.split_once('/') {
            Some((a, l)) => {
                let len =
                    l.parse::<u8>().map_err(|_| ParseError::InvalidDigit(s.to_string()))?;
                (a.parse::<Ipv4Address>()?, len)
            }
            None => (s.parse::<Ipv4Address>()?, 32),
        };
        Ipv4Network::new(addr, len)
    }
}
