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

//! Test route installation and lookup, and the neighbor discovery caches
//! (ARP, NDP and SLAAC).

use crate::addr::{Ipv4Address, Ipv4Network, Ipv6Address, SubnetMask};
use crate::fabric::Fabric;
use crate::port::Ipv6Origin;
use crate::routing::{OspfRouteKind, RouteSource};
use crate::types::{ConfigError, DeviceId, NetworkError};
use lazy_static::lazy_static;

lazy_static! {
    static ref MASK_24: SubnetMask = "255.255.255.0".parse().unwrap();
}

fn addr(s: &str) -> Ipv4Address {
    s.parse().unwrap()
}

fn net4(s: &str) -> Ipv4Network {
    s.parse().unwrap()
}

/// Router with two addressed interfaces, nothing connected.
fn get_router() -> (Fabric, DeviceId) {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    net.add_port(r1, "eth0").unwrap();
    net.add_port(r1, "eth1").unwrap();
    net.set_ipv4(r1, "eth0", addr("10.0.0.1"), *MASK_24).unwrap();
    net.set_ipv4(r1, "eth1", addr("10.0.1.1"), *MASK_24).unwrap();
    (net, r1)
}

#[test]
fn test_connected_routes() {
    let (net, r1) = get_router();
    let routes = net.routing_table(r1).unwrap();
    assert_eq!(routes.len(), 2);
    assert!(routes
        .iter()
        .all(|r| r.source == RouteSource::Connected && r.next_hop.is_none() && r.metric == 0));
    assert!(routes.iter().any(|r| r.prefix == net4("10.0.0.0/24") && r.interface == "eth0"));
    assert!(routes.iter().any(|r| r.prefix == net4("10.0.1.0/24") && r.interface == "eth1"));
}

#[test]
fn test_connected_routes_follow_interface_state() {
    let (mut net, r1) = get_router();
    net.set_admin_state(r1, "eth1", false).unwrap();
    assert_eq!(net.routing_table(r1).unwrap().len(), 1);

    net.set_admin_state(r1, "eth1", true).unwrap();
    assert_eq!(net.routing_table(r1).unwrap().len(), 2);

    net.clear_ipv4(r1, "eth1").unwrap();
    assert_eq!(net.routing_table(r1).unwrap().len(), 1);
}

#[test]
fn test_static_routes() {
    let (mut net, r1) = get_router();
    net.add_static_route(r1, net4("192.168.5.0/24"), addr("10.0.0.254"), 1).unwrap();

    let routes = net.routing_table(r1).unwrap();
    let stat = routes.iter().find(|r| r.source == RouteSource::Static).unwrap();
    assert_eq!(stat.prefix, net4("192.168.5.0/24"));
    assert_eq!(stat.next_hop, Some(addr("10.0.0.254")));
    assert_eq!(stat.interface, "eth0");

    // installing the same prefix again fails
    assert_eq!(
        net.add_static_route(r1, net4("192.168.5.0/24"), addr("10.0.0.254"), 1).unwrap_err(),
        NetworkError::ConfigError(ConfigError::StaticRouteExists("192.168.5.0/24".to_string()))
    );
    // a next hop outside every connected network fails
    assert_eq!(
        net.add_static_route(r1, net4("192.168.6.0/24"), addr("172.16.0.1"), 1).unwrap_err(),
        NetworkError::ConfigError(ConfigError::NextHopNotConnected("172.16.0.1".to_string()))
    );

    net.remove_static_route(r1, net4("192.168.5.0/24")).unwrap();
    assert_eq!(
        net.remove_static_route(r1, net4("192.168.5.0/24")).unwrap_err(),
        NetworkError::ConfigError(ConfigError::NoStaticRoute("192.168.5.0/24".to_string()))
    );
}

#[test]
fn test_default_route() {
    let (mut net, r1) = get_router();
    net.add_static_route(r1, Ipv4Network::default_route(), addr("10.0.0.254"), 1).unwrap();
    let routes = net.routing_table(r1).unwrap();
    assert!(routes.iter().any(|r| r.source == RouteSource::DefaultRoute));

    // everything without a better match falls back to the default
    let router = net.get_device(r1).unwrap_router();
    let entry = router.routing_table().lookup(addr("8.8.8.8")).unwrap();
    assert_eq!(entry.source, RouteSource::DefaultRoute);
}

#[test]
fn test_longest_prefix_match() {
    let (mut net, r1) = get_router();
    net.add_static_route(r1, net4("10.0.0.0/8"), addr("10.0.1.254"), 1).unwrap();

    let router = net.get_device(r1).unwrap_router();
    // the /24 connected route wins over the /8 static route
    let entry = router.routing_table().lookup(addr("10.0.0.77")).unwrap();
    assert_eq!(entry.source, RouteSource::Connected);
    assert_eq!(entry.interface, "eth0");
    // outside the /24, the /8 matches
    let entry = router.routing_table().lookup(addr("10.99.0.1")).unwrap();
    assert_eq!(entry.source, RouteSource::Static);
    // no route at all
    assert!(router.routing_table().lookup(addr("192.168.0.1")).is_none());
}

#[test]
fn test_route_source_display() {
    assert_eq!(RouteSource::Connected.to_string(), "C");
    assert_eq!(RouteSource::Static.to_string(), "S");
    assert_eq!(RouteSource::DefaultRoute.to_string(), "S*");
    assert_eq!(RouteSource::Ospf(OspfRouteKind::IntraArea).to_string(), "O");
    assert_eq!(RouteSource::Ospf(OspfRouteKind::InterArea).to_string(), "O IA");
    assert_eq!(RouteSource::Ospf(OspfRouteKind::External).to_string(), "O E2");
    assert_eq!(RouteSource::Rip.to_string(), "R");
}

#[test]
fn test_ipv6_routing_table_independent() {
    let (mut net, r1) = get_router();
    net.enable_ipv6(r1, "eth0").unwrap();
    net.add_ipv6(r1, "eth0", "2001:db8::1".parse().unwrap(), 64).unwrap();

    let v6 = net.ipv6_routing_table(r1).unwrap();
    assert_eq!(v6.len(), 1);
    assert_eq!(v6[0].prefix, "2001:db8::/64".parse().unwrap());
    assert_eq!(v6[0].source, RouteSource::Connected);

    // the IPv4 table is untouched by IPv6 configuration
    assert_eq!(net.routing_table(r1).unwrap().len(), 2);

    net.add_ipv6_static_route(
        r1,
        "2001:db8:99::/48".parse().unwrap(),
        "2001:db8::ff".parse().unwrap(),
        "eth0",
        1,
    )
    .unwrap();
    assert_eq!(net.ipv6_routing_table(r1).unwrap().len(), 2);

    net.remove_ipv6_static_route(r1, "2001:db8:99::/48".parse().unwrap()).unwrap();
    assert_eq!(net.ipv6_routing_table(r1).unwrap().len(), 1);
}

#[test]
fn test_ipv6_requires_enable() {
    let (mut net, r1) = get_router();
    assert_eq!(
        net.add_ipv6(r1, "eth0", "2001:db8::1".parse().unwrap(), 64).unwrap_err(),
        NetworkError::ConfigError(ConfigError::Ipv6NotEnabled("eth0".to_string()))
    );
}

#[test]
fn test_ipv6_link_local_on_enable() {
    let (mut net, r1) = get_router();
    net.enable_ipv6(r1, "eth0").unwrap();
    let port = net.get_port(r1, "eth0").unwrap();
    let link_local = port.link_local().unwrap();
    assert!(link_local.is_link_local());
    assert_eq!(*link_local, Ipv6Address::eui64_link_local(port.mac()));

    // disabling drops every address
    net.disable_ipv6(r1, "eth0").unwrap();
    assert!(net.get_port(r1, "eth0").unwrap().link_local().is_none());
}

#[test]
fn test_arp_resolution() {
    let mut net = Fabric::new();
    let h1 = net.add_host("H1").unwrap();
    let h2 = net.add_host("H2").unwrap();
    net.add_port(h1, "eth0").unwrap();
    net.add_port(h2, "eth0").unwrap();
    net.set_ipv4(h1, "eth0", addr("10.0.0.1"), *MASK_24).unwrap();
    net.set_ipv4(h2, "eth0", addr("10.0.0.2"), *MASK_24).unwrap();
    net.connect(h1, "eth0", h2, "eth0").unwrap();

    let h2_mac = net.get_port(h2, "eth0").unwrap().mac();
    assert_eq!(net.resolve_arp(h1, addr("10.0.0.2")).unwrap(), Some(h2_mac));

    // the reply is cached, and the request taught the target about us
    assert_eq!(net.arp_table(h1).unwrap().len(), 1);
    assert_eq!(net.arp_table(h2).unwrap().len(), 1);

    // a second resolution is answered from the cache without traffic
    net.reset_statistics();
    assert_eq!(net.resolve_arp(h1, addr("10.0.0.2")).unwrap(), Some(h2_mac));
    assert_eq!(net.statistics().total_frames, 0);

    // unknown addresses stay unresolved
    assert_eq!(net.resolve_arp(h1, addr("10.0.0.99")).unwrap(), None);
    // off-subnet addresses have no egress interface
    assert_eq!(net.resolve_arp(h1, addr("172.16.0.1")).unwrap(), None);
}

#[test]
fn test_arp_cache_invalidated_on_link_down() {
    let mut net = Fabric::new();
    let h1 = net.add_host("H1").unwrap();
    let h2 = net.add_host("H2").unwrap();
    net.add_port(h1, "eth0").unwrap();
    net.add_port(h2, "eth0").unwrap();
    net.set_ipv4(h1, "eth0", addr("10.0.0.1"), *MASK_24).unwrap();
    net.set_ipv4(h2, "eth0", addr("10.0.0.2"), *MASK_24).unwrap();
    net.connect(h1, "eth0", h2, "eth0").unwrap();

    net.resolve_arp(h1, addr("10.0.0.2")).unwrap().unwrap();
    assert_eq!(net.arp_table(h1).unwrap().len(), 1);

    net.disconnect(h1, "eth0").unwrap();
    assert!(net.arp_table(h1).unwrap().is_empty());
}

#[test]
fn test_ndp_resolution() {
    let mut net = Fabric::new();
    let h1 = net.add_host("H1").unwrap();
    let h2 = net.add_host("H2").unwrap();
    net.add_port(h1, "eth0").unwrap();
    net.add_port(h2, "eth0").unwrap();
    net.enable_ipv6(h1, "eth0").unwrap();
    net.enable_ipv6(h2, "eth0").unwrap();
    net.connect(h1, "eth0", h2, "eth0").unwrap();

    let h2_port = net.get_port(h2, "eth0").unwrap();
    let h2_mac = h2_port.mac();
    let h2_link_local = h2_port.link_local().unwrap().clone();

    assert_eq!(net.resolve_ndp(h1, &h2_link_local).unwrap(), Some(h2_mac));
    assert_eq!(net.ndp_table(h1).unwrap().len(), 1);

    // unknown target: the solicited-node group matches nobody
    let unknown: Ipv6Address = "fe80::dead:beef".parse().unwrap();
    assert_eq!(net.resolve_ndp(h1, &unknown).unwrap(), None);
}

#[test]
fn test_slaac() {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    let h1 = net.add_host("H1").unwrap();
    net.add_port(r1, "eth0").unwrap();
    net.add_port(h1, "eth0").unwrap();
    net.enable_ipv6(r1, "eth0").unwrap();
    net.enable_ipv6(h1, "eth0").unwrap();
    net.add_ipv6(r1, "eth0", "2001:db8:0:1::1".parse().unwrap(), 64).unwrap();
    net.connect(r1, "eth0", h1, "eth0").unwrap();

    let host_link_local = net.get_port(h1, "eth0").unwrap().link_local().unwrap().clone();

    net.send_router_advertisement(r1, "eth0").unwrap();

    let port = net.get_port(h1, "eth0").unwrap();
    let expected =
        Ipv6Address::from_prefix_and_mac("2001:db8:0:1::".parse().unwrap(), port.mac());
    let slaac = port
        .ipv6_addresses()
        .iter()
        .find(|a| a.origin == Ipv6Origin::Slaac)
        .expect("SLAAC address missing");
    assert_eq!(slaac.address, expected);
    assert_eq!(slaac.prefix_len, 64);
    // the link-local address is unaffected
    assert_eq!(port.link_local(), Some(&host_link_local));
}
