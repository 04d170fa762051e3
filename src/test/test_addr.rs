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

//! Test the address value types: parsing, canonical formatting,
//! classification and the neighbor-discovery derivations.

use crate::addr::{
    Ipv4Address, Ipv4Network, Ipv6Address, Ipv6Kind, Ipv6Network, MacAddress, ParseError,
    SubnetMask,
};

#[test]
fn test_mac_parse_format() {
    let mac: MacAddress = "02:00:5e:00:00:01".parse().unwrap();
    assert_eq!(mac.octets(), [0x02, 0x00, 0x5e, 0x00, 0x00, 0x01]);
    assert_eq!(mac.to_string(), "02:00:5e:00:00:01");

    // dash separated and uppercase normalize to lowercase colon form
    let dashed: MacAddress = "02-00-5E-00-00-01".parse().unwrap();
    assert_eq!(dashed, mac);
    assert_eq!(dashed.to_string(), "02:00:5e:00:00:01");

    // round trip
    assert_eq!(mac.to_string().parse::<MacAddress>().unwrap(), mac);
}

#[test]
fn test_mac_parse_errors() {
    assert_eq!(
        "02:00:5e:00:00".parse::<MacAddress>(),
        Err(ParseError::WrongSegmentCount("02:00:5e:00:00".to_string()))
    );
    assert_eq!(
        "02:00:5e:00:00:0g".parse::<MacAddress>(),
        Err(ParseError::InvalidDigit("02:00:5e:00:00:0g".to_string()))
    );
    assert!("02:00:5e:00:00:001".parse::<MacAddress>().is_err());
}

#[test]
fn test_mac_classify() {
    assert!(MacAddress::broadcast().is_broadcast());
    assert!(MacAddress::broadcast().is_multicast());
    assert!(MacAddress([0x01, 0x00, 0x5e, 0, 0, 5]).is_multicast());
    assert!(MacAddress([0x02, 0, 0, 0, 0, 1]).is_unicast());

    let generated = MacAddress::generate();
    assert!(generated.is_unicast());
    assert!(generated.is_locally_administered());
}

#[test]
fn test_ipv4_parse_format() {
    let addr: Ipv4Address = "192.168.1.10".parse().unwrap();
    assert_eq!(addr, Ipv4Address([192, 168, 1, 10]));
    assert_eq!(addr.to_string(), "192.168.1.10");

    assert!("192.168.1".parse::<Ipv4Address>().is_err());
    assert_eq!(
        "192.168.1.256".parse::<Ipv4Address>(),
        Err(ParseError::ValueOutOfRange("192.168.1.256".to_string()))
    );
    assert_eq!(
        "192.168.one.1".parse::<Ipv4Address>(),
        Err(ParseError::InvalidDigit("192.168.one.1".to_string()))
    );
}

#[test]
fn test_subnet_mask() {
    let mask: SubnetMask = "255.255.255.0".parse().unwrap();
    assert_eq!(mask.prefix_len(), 24);
    assert_eq!(SubnetMask::from_prefix_len(24).unwrap(), mask);
    assert_eq!(mask.wildcard(), Ipv4Address([0, 0, 0, 255]));

    assert_eq!(SubnetMask::from_prefix_len(0).unwrap().prefix_len(), 0);
    assert_eq!(SubnetMask::from_prefix_len(32).unwrap().prefix_len(), 32);
    assert_eq!(SubnetMask::from_prefix_len(33), Err(ParseError::InvalidPrefixLength(33)));
    assert_eq!(
        "255.0.255.0".parse::<SubnetMask>(),
        Err(ParseError::NonContiguousMask("255.0.255.0".to_string()))
    );
}

#[test]
fn test_same_subnet() {
    let mask: SubnetMask = "255.255.255.0".parse().unwrap();
    let a: Ipv4Address = "10.0.1.1".parse().unwrap();
    let b: Ipv4Address = "10.0.1.200".parse().unwrap();
    let c: Ipv4Address = "10.0.2.1".parse().unwrap();
    assert!(a.is_in_same_subnet(b, mask));
    assert!(!a.is_in_same_subnet(c, mask));
}

#[test]
fn test_wildcard_match() {
    let network: Ipv4Address = "10.0.0.0".parse().unwrap();
    let wildcard: Ipv4Address = "0.0.0.255".parse().unwrap();
    assert!("10.0.0.42".parse::<Ipv4Address>().unwrap().wildcard_match(network, wildcard));
    assert!(!"10.0.1.42".parse::<Ipv4Address>().unwrap().wildcard_match(network, wildcard));
}

#[test]
fn test_ipv4_network() {
    let net: Ipv4Network = "10.1.2.3/24".parse().unwrap();
    assert_eq!(net.to_string(), "10.1.2.0/24");
    assert!(net.contains("10.1.2.200".parse().unwrap()));
    assert!(!net.contains("10.1.3.1".parse().unwrap()));
    assert!(Ipv4Network::default_route().contains("1.2.3.4".parse().unwrap()));
}

#[test]
fn test_ipv6_parse() {
    let addr: Ipv6Address = "2001:0db8::0001".parse().unwrap();
    assert_eq!(addr.groups(), [0x2001, 0x0db8, 0, 0, 0, 0, 0, 1]);
    // canonical form strips leading zeros and compresses
    assert_eq!(addr.to_string(), "2001:db8::1");

    assert_eq!("::".parse::<Ipv6Address>().unwrap(), Ipv6Address::unspecified());
    assert_eq!("::1".parse::<Ipv6Address>().unwrap(), Ipv6Address::loopback());
    assert_eq!("1::".parse::<Ipv6Address>().unwrap().groups(), [1, 0, 0, 0, 0, 0, 0, 0]);

    // parse(format(v)) == v
    for literal in &["2001:db8::1", "fe80::ff:fe00:1", "ff02::1:ff01:2", "1:0:0:1::1"] {
        let parsed: Ipv6Address = literal.parse().unwrap();
        assert_eq!(parsed.to_string(), *literal);
        assert_eq!(parsed.to_string().parse::<Ipv6Address>().unwrap(), parsed);
    }
}

#[test]
fn test_ipv6_parse_errors() {
    assert_eq!(
        "1::2::3".parse::<Ipv6Address>(),
        Err(ParseError::MultipleCompressions("1::2::3".to_string()))
    );
    assert!("1:2:3:4:5:6:7".parse::<Ipv6Address>().is_err());
    assert!("1:2:3:4:5:6:7:8:9".parse::<Ipv6Address>().is_err());
    assert!("2001:db8::g".parse::<Ipv6Address>().is_err());
    assert!("12345::".parse::<Ipv6Address>().is_err());
    // a zone identifier is only valid on link-local addresses
    assert_eq!(
        "2001:db8::1%eth0".parse::<Ipv6Address>(),
        Err(ParseError::UnexpectedZone("2001:db8::1%eth0".to_string()))
    );
}

#[test]
fn test_ipv6_compression_rule() {
    // the longer, later zero run wins
    assert_eq!(Ipv6Address::new([1, 0, 0, 1, 0, 0, 0, 1]).to_string(), "1:0:0:1::1");
    assert_eq!(Ipv6Address::new([1, 0, 0, 0, 0, 0, 0, 1]).to_string(), "1::1");
    // equal-length runs keep the earlier one
    assert_eq!(Ipv6Address::new([0, 0, 1, 0, 0, 1, 1, 1]).to_string(), "::1:0:0:1:1:1");
    // a single zero group is not compressed
    assert_eq!(Ipv6Address::new([1, 0, 1, 1, 1, 1, 1, 1]).to_string(), "1:0:1:1:1:1:1:1");
}

#[test]
fn test_ipv6_classify() {
    assert_eq!("::".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::Unspecified);
    assert_eq!("::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::Loopback);
    assert_eq!("fe80::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::LinkLocal);
    assert_eq!("febf::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::LinkLocal);
    assert_eq!("ff02::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::Multicast);
    assert_eq!("2001:db8::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::GlobalUnicast);
    assert_eq!("fec0::1".parse::<Ipv6Address>().unwrap().kind(), Ipv6Kind::GlobalUnicast);
}

#[test]
fn test_ipv6_zone_equality() {
    let plain: Ipv6Address = "fe80::1".parse().unwrap();
    let zoned: Ipv6Address = "fe80::1%eth0".parse().unwrap();
    let other_zone: Ipv6Address = "fe80::1%eth1".parse().unwrap();

    assert_eq!(zoned.zone(), Some("eth0"));
    assert_eq!(zoned.to_string(), "fe80::1%eth0");
    // the zone participates in equality only when both sides carry one
    assert_eq!(plain, zoned);
    assert_eq!(plain, other_zone);
    assert_ne!(zoned, other_zone);
}

#[test]
fn test_eui64() {
    let mac: MacAddress = "02:00:00:00:00:01".parse().unwrap();
    let link_local = Ipv6Address::eui64_link_local(mac);
    assert_eq!(link_local.to_string(), "fe80::ff:fe00:1");
    assert_eq!(link_local.kind(), Ipv6Kind::LinkLocal);

    // the universal/local bit is inverted in both directions
    let vendor: MacAddress = "00:11:22:33:44:55".parse().unwrap();
    assert_eq!(
        Ipv6Address::eui64_link_local(vendor).to_string(),
        "fe80::211:22ff:fe33:4455"
    );
}

#[test]
fn test_slaac_address() {
    let mac: MacAddress = "02:00:00:00:00:01".parse().unwrap();
    let prefix: Ipv6Address = "2001:db8:0:1::".parse().unwrap();
    let addr = Ipv6Address::from_prefix_and_mac(prefix, mac);
    assert_eq!(addr.to_string(), "2001:db8:0:1:0:ff:fe00:1");
}

#[test]
fn test_solicited_node() {
    let addr: Ipv6Address = "2001:db8::1:2".parse().unwrap();
    let group = addr.solicited_node();
    assert_eq!(group.to_string(), "ff02::1:ff01:2");
    assert_eq!(group.kind(), Ipv6Kind::Multicast);
    assert_eq!(group.multicast_mac(), MacAddress([0x33, 0x33, 0xff, 0x01, 0x00, 0x02]));
}

#[test]
fn test_multicast_mac() {
    let all_nodes = Ipv6Address::all_nodes();
    assert_eq!(all_nodes.multicast_mac(), MacAddress([0x33, 0x33, 0, 0, 0, 1]));
}

#[test]
fn test_ipv6_network() {
    let net: Ipv6Network = "2001:db8::/32".parse().unwrap();
    assert!(net.contains(&"2001:db8:1234::1".parse().unwrap()));
    assert!(!net.contains(&"2001:db9::1".parse().unwrap()));
    assert_eq!(net.to_string(), "2001:db8::/32");
}
