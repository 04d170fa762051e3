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

//! # Addressing
//!
//! Value types for link-layer and network-layer addresses: [`MacAddress`],
//! [`Ipv4Address`] with [`SubnetMask`], and [`Ipv6Address`]. All operations
//! are pure; parsing fails closed with a specific [`ParseError`] on any
//! malformed input, there is no best-effort parsing.

mod ipv4;
mod ipv6;
mod mac;

pub use ipv4::{Ipv4Address, Ipv4Network, SubnetMask};
pub use ipv6::{Ipv6Address, Ipv6Kind, Ipv6Network};
pub use mac::MacAddress;

use thiserror::Error;

/// Error raised when an address literal cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The literal has the wrong number of segments (octets, hextets or
    /// mask groups).
    #[error("wrong segment count in address literal: {0}")]
    WrongSegmentCount(String),
    /// A segment contains a character which is not a valid digit.
    #[error("invalid digit in address literal: {0}")]
    InvalidDigit(String),
    /// A segment value is out of range for its position.
    #[error("value out of range in address literal: {0}")]
    ValueOutOfRange(String),
    /// An IPv6 literal contains more than one `::` compression marker.
    #[error("more than one '::' in IPv6 literal: {0}")]
    MultipleCompressions(String),
    /// A prefix length is larger than the address width allows.
    #[error("invalid prefix length: {0}")]
    InvalidPrefixLength(u8),
    /// A subnet mask has non-contiguous set bits.
    #[error("non-contiguous subnet mask: {0}")]
    NonContiguousMask(String),
    /// A zone identifier was given on an address which is not link-local.
    #[error("zone identifier on a non-link-local address: {0}")]
    UnexpectedZone(String),
}
