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

//! Test the OSPF engine: adjacency formation, passive interfaces, cost
//! computation, area types, and protocol independence.

use crate::addr::{Ipv4Address, Ipv4Network, SubnetMask};
use crate::fabric::Fabric;
use crate::routing::ospf::{AreaType, OspfNeighborState};
use crate::routing::{OspfRouteKind, RouteSource};
use crate::types::{ConfigError, DeviceId, NetworkError};
use crate::SimTime;
use lazy_static::lazy_static;

lazy_static! {
    static ref MASK_24: SubnetMask = "255.255.255.0".parse().unwrap();
    static ref WILD_255: Ipv4Address = "0.0.0.255".parse().unwrap();
}

fn addr(s: &str) -> Ipv4Address {
    s.parse().unwrap()
}

fn net4(s: &str) -> Ipv4Network {
    s.parse().unwrap()
}

/// Two routers back to back on `10.0.12.0/24`, OSPF enabled on both, no
/// network statements yet.
///
/// ```text
/// R1 (.1) ---- (.2) R2
/// ```
fn get_pair() -> (Fabric, DeviceId, DeviceId) {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    let r2 = net.add_router("R2").unwrap();
    net.add_port(r1, "eth0").unwrap();
    net.add_port(r2, "eth0").unwrap();
    net.set_ipv4(r1, "eth0", addr("10.0.12.1"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth0", addr("10.0.12.2"), *MASK_24).unwrap();
    net.connect(r1, "eth0", r2, "eth0").unwrap();
    net.ospf_enable(r1, 1, None).unwrap();
    net.ospf_enable(r2, 1, None).unwrap();
    (net, r1, r2)
}

fn cover(net: &mut Fabric, router: DeviceId, network: &str, area: u32) {
    net.ospf_network(router, addr(network), Some(*WILD_255), Some(area)).unwrap();
}

#[test]
fn test_adjacency_reaches_full() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);

    net.advance_clock(SimTime::from_secs(60));

    for (router, peer_address, peer_id) in
        [(r1, "10.0.12.2", "10.0.12.2"), (r2, "10.0.12.1", "10.0.12.1")]
    {
        let neighbors = net.ospf_neighbors(router).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].state, OspfNeighborState::Full);
        assert_eq!(neighbors[0].address, addr(peer_address));
        assert_eq!(neighbors[0].router_id, addr(peer_id));
        assert_eq!(neighbors[0].interface, "eth0");
        assert_eq!(neighbors[0].area, 0);
    }

    let areas = net.ospf_areas(r1).unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].area, 0);
    assert_eq!(areas[0].area_type, AreaType::Normal);
    assert_eq!(areas[0].full_neighbors, 1);
    assert!(areas[0].lsa_count >= 2);
}

#[test]
fn test_adjacency_needs_matching_area() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 7);

    net.advance_clock(SimTime::from_secs(60));

    // hellos with a foreign area id are ignored
    assert!(net
        .ospf_neighbors(r1)
        .unwrap()
        .iter()
        .all(|n| n.state != OspfNeighborState::Full));
    assert!(net
        .ospf_neighbors(r2)
        .unwrap()
        .iter()
        .all(|n| n.state != OspfNeighborState::Full));
}

#[test]
fn test_passive_interface_prevents_adjacency() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.ospf_passive_interface(r1, "eth0", true).unwrap();

    net.advance_clock(SimTime::from_secs(120));

    // neither side ever reaches FULL
    assert!(net.ospf_neighbors(r1).unwrap().is_empty());
    assert!(net.ospf_neighbors(r2).unwrap().is_empty());
}

#[test]
fn test_passive_network_still_advertised() {
    // R2's second interface is passive, but its network must still be
    // reachable through OSPF
    let (mut net, r1, r2) = get_pair();
    net.add_port(r2, "eth1").unwrap();
    net.set_ipv4(r2, "eth1", addr("192.168.2.1"), *MASK_24).unwrap();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "192.168.2.0", 0);
    net.ospf_passive_interface(r2, "eth1", true).unwrap();

    net.advance_clock(SimTime::from_secs(60));

    let routes = net.routing_table(r1).unwrap();
    let learned = routes
        .iter()
        .find(|r| r.prefix == net4("192.168.2.0/24"))
        .expect("passive network not advertised");
    assert_eq!(learned.source, RouteSource::Ospf(OspfRouteKind::IntraArea));
    assert_eq!(learned.next_hop, Some(addr("10.0.12.2")));
    assert_eq!(learned.interface, "eth0");
    assert_eq!(learned.metric, 2);
}

#[test]
fn test_passive_default() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.ospf_passive_default(r1, true).unwrap();

    net.advance_clock(SimTime::from_secs(120));
    assert!(net.ospf_neighbors(r2).unwrap().is_empty());

    // lifting the default lets the adjacency form
    net.ospf_passive_default(r1, false).unwrap();
    net.advance_clock(SimTime::from_secs(60));
    assert_eq!(net.ospf_neighbors(r2).unwrap()[0].state, OspfNeighborState::Full);
}

#[test]
fn test_network_statement_validation() {
    let (mut net, r1, _) = get_pair();
    assert_eq!(
        net.ospf_network(r1, addr("10.0.12.0"), None, Some(0)).unwrap_err(),
        NetworkError::ConfigError(ConfigError::IncompleteCommand(
            "network statement needs a wildcard"
        ))
    );
    assert_eq!(
        net.ospf_network(r1, addr("10.0.12.0"), Some(*WILD_255), None).unwrap_err(),
        NetworkError::ConfigError(ConfigError::IncompleteCommand(
            "network statement needs an area"
        ))
    );
    // the failed statements left the area table unchanged
    assert!(net.ospf_areas(r1).unwrap().is_empty());
}

#[test]
fn test_process_lifecycle_errors() {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    net.add_port(r1, "eth0").unwrap();

    // without any IPv4 interface, no router id can be derived
    assert_eq!(
        net.ospf_enable(r1, 1, None).unwrap_err(),
        NetworkError::ConfigError(ConfigError::NoRouterId)
    );

    net.set_ipv4(r1, "eth0", addr("10.0.0.1"), *MASK_24).unwrap();
    net.ospf_enable(r1, 1, None).unwrap();
    // same process id is a no-op, a different one is rejected
    net.ospf_enable(r1, 1, None).unwrap();
    assert_eq!(
        net.ospf_enable(r1, 2, None).unwrap_err(),
        NetworkError::ConfigError(ConfigError::OspfProcessExists(1))
    );

    net.ospf_disable(r1, 1).unwrap();
    assert_eq!(
        net.ospf_disable(r1, 1).unwrap_err(),
        NetworkError::ConfigError(ConfigError::NoOspfProcess(1))
    );
    // configuration against a missing process fails
    assert!(net.ospf_network(r1, addr("10.0.0.0"), Some(*WILD_255), Some(0)).is_err());
}

#[test]
fn test_router_id_derivation() {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    net.add_port(r1, "eth0").unwrap();
    net.add_port(r1, "eth1").unwrap();
    net.set_ipv4(r1, "eth0", addr("10.0.0.1"), *MASK_24).unwrap();
    net.set_ipv4(r1, "eth1", addr("172.16.0.1"), *MASK_24).unwrap();
    net.ospf_enable(r1, 1, None).unwrap();
    cover(&mut net, r1, "10.0.0.0", 0);

    // the highest interface address becomes the router id; visible in the
    // origin of our own router record
    let lsdb = net.ospf_lsdb(r1, 0).unwrap();
    assert_eq!(lsdb.len(), 1);
    assert_eq!(lsdb[0].origin, addr("172.16.0.1"));
}

#[test]
fn test_route_propagation_chain() {
    // R1 ---- R2 ---- R3, with a stub network behind R3
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    let r2 = net.add_router("R2").unwrap();
    let r3 = net.add_router("R3").unwrap();
    for r in [r1, r2, r3] {
        net.add_port(r, "eth0").unwrap();
        net.add_port(r, "eth1").unwrap();
    }
    net.set_ipv4(r1, "eth0", addr("10.0.12.1"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth0", addr("10.0.12.2"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth1", addr("10.0.23.2"), *MASK_24).unwrap();
    net.set_ipv4(r3, "eth0", addr("10.0.23.3"), *MASK_24).unwrap();
    net.set_ipv4(r3, "eth1", addr("192.168.3.1"), *MASK_24).unwrap();
    net.connect(r1, "eth0", r2, "eth0").unwrap();
    net.connect(r2, "eth1", r3, "eth0").unwrap();

    for r in [r1, r2, r3] {
        net.ospf_enable(r, 1, None).unwrap();
    }
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.23.0", 0);
    cover(&mut net, r3, "10.0.23.0", 0);
    cover(&mut net, r3, "192.168.3.0", 0);

    net.advance_clock(SimTime::from_secs(90));

    // R1 learns the far network across two hops
    let routes = net.routing_table(r1).unwrap();
    let far = routes
        .iter()
        .find(|r| r.prefix == net4("192.168.3.0/24"))
        .expect("no route to the far network");
    assert_eq!(far.source, RouteSource::Ospf(OspfRouteKind::IntraArea));
    assert_eq!(far.next_hop, Some(addr("10.0.12.2")));
    assert_eq!(far.interface, "eth0");
    assert_eq!(far.metric, 3);

    // the middle network is learned too, with a shorter metric
    let middle = routes.iter().find(|r| r.prefix == net4("10.0.23.0/24")).unwrap();
    assert_eq!(middle.metric, 2);

    // connected prefixes are never replaced by OSPF routes
    assert!(routes
        .iter()
        .all(|r| !(r.prefix == net4("10.0.12.0/24") && r.source.is_ospf())));
}

#[test]
fn test_cost_follows_bandwidth() {
    let (mut net, r1, r2) = get_pair();
    net.add_port(r2, "eth1").unwrap();
    net.set_ipv4(r2, "eth1", addr("192.168.2.1"), *MASK_24).unwrap();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "192.168.2.0", 0);
    net.advance_clock(SimTime::from_secs(60));

    let metric_of = |net: &Fabric| {
        net.routing_table(r1)
            .unwrap()
            .iter()
            .find(|r| r.prefix == net4("192.168.2.0/24"))
            .map(|r| r.metric)
            .unwrap()
    };

    // default: 100 Mb/s reference over 100 Mb/s interfaces, cost 1 per hop
    assert_eq!(metric_of(&net), 2);

    // a 10 Mb/s link towards R2 raises the link cost to 10
    net.set_bandwidth(r1, "eth0", 10_000).unwrap();
    net.advance_clock(SimTime::from_secs(30));
    assert_eq!(metric_of(&net), 11);

    // an explicit per-interface cost overrides the computed one
    net.set_ospf_cost(r1, "eth0", Some(5)).unwrap();
    net.advance_clock(SimTime::from_secs(30));
    assert_eq!(metric_of(&net), 6);

    // raising the reference bandwidth rescales the computed cost
    net.set_ospf_cost(r1, "eth0", None).unwrap();
    net.set_bandwidth(r1, "eth0", 100_000).unwrap();
    net.ospf_set_reference_bandwidth(r1, 1000).unwrap();
    net.advance_clock(SimTime::from_secs(30));
    assert_eq!(metric_of(&net), 11);
}

#[test]
fn test_default_originate_and_stub() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.ospf_default_originate(r1, true).unwrap();

    net.advance_clock(SimTime::from_secs(60));

    let default = net
        .routing_table(r2)
        .unwrap()
        .into_iter()
        .find(|r| r.prefix == Ipv4Network::default_route())
        .expect("no default route");
    assert_eq!(default.source, RouteSource::Ospf(OspfRouteKind::External));

    // a stub area suppresses external routes, without touching the adjacency
    net.ospf_set_area_type(r1, 0, AreaType::Stub).unwrap();
    net.ospf_set_area_type(r2, 0, AreaType::Stub).unwrap();
    net.advance_clock(SimTime::from_secs(30));

    assert!(net
        .routing_table(r2)
        .unwrap()
        .iter()
        .all(|r| r.prefix != Ipv4Network::default_route()));
    assert_eq!(net.ospf_neighbors(r2).unwrap()[0].state, OspfNeighborState::Full);

    // NSSA re-permits external redistribution; re-typing is idempotent
    net.ospf_set_area_type(r1, 0, AreaType::Nssa).unwrap();
    net.ospf_set_area_type(r2, 0, AreaType::Nssa).unwrap();
    net.ospf_set_area_type(r2, 0, AreaType::Nssa).unwrap();
    net.advance_clock(SimTime::from_secs(30));

    assert!(net
        .routing_table(r2)
        .unwrap()
        .iter()
        .any(|r| r.prefix == Ipv4Network::default_route()));
}

#[test]
fn test_totally_stubby_suppresses_summaries() {
    // R1 --area0-- R2 --area1-- R3, with an extra network behind R1
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    let r2 = net.add_router("R2").unwrap();
    let r3 = net.add_router("R3").unwrap();
    for r in [r1, r2, r3] {
        net.add_port(r, "eth0").unwrap();
        net.add_port(r, "eth1").unwrap();
    }
    net.set_ipv4(r1, "eth0", addr("10.0.12.1"), *MASK_24).unwrap();
    net.set_ipv4(r1, "eth1", addr("192.168.1.1"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth0", addr("10.0.12.2"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth1", addr("10.0.23.2"), *MASK_24).unwrap();
    net.set_ipv4(r3, "eth0", addr("10.0.23.3"), *MASK_24).unwrap();
    net.connect(r1, "eth0", r2, "eth0").unwrap();
    net.connect(r2, "eth1", r3, "eth0").unwrap();
    for r in [r1, r2, r3] {
        net.ospf_enable(r, 1, None).unwrap();
    }
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r1, "192.168.1.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.ospf_network(r2, addr("10.0.23.0"), Some(*WILD_255), Some(1)).unwrap();
    net.ospf_network(r3, addr("10.0.23.0"), Some(*WILD_255), Some(1)).unwrap();

    net.advance_clock(SimTime::from_secs(90));

    // the area border router summarizes area 0 into area 1
    let routes = net.routing_table(r3).unwrap();
    let summary = routes
        .iter()
        .find(|r| r.prefix == net4("192.168.1.0/24"))
        .expect("no inter-area route");
    assert_eq!(summary.source, RouteSource::Ospf(OspfRouteKind::InterArea));

    // a totally-stubby area sees only a default summary from the border
    net.ospf_set_area_type(r2, 1, AreaType::TotallyStubby).unwrap();
    net.ospf_set_area_type(r3, 1, AreaType::TotallyStubby).unwrap();
    net.advance_clock(SimTime::from_secs(30));

    let routes = net.routing_table(r3).unwrap();
    assert!(routes.iter().all(|r| r.prefix != net4("192.168.1.0/24")));
    let default = routes
        .iter()
        .find(|r| r.prefix == Ipv4Network::default_route())
        .expect("no default summary");
    assert_eq!(default.source, RouteSource::Ospf(OspfRouteKind::InterArea));
}

#[test]
fn test_adjacency_dies_without_hellos() {
    let (mut net, r1, r2) = get_pair();
    net.add_port(r2, "eth1").unwrap();
    net.set_ipv4(r2, "eth1", addr("192.168.2.1"), *MASK_24).unwrap();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "192.168.2.0", 0);
    net.advance_clock(SimTime::from_secs(60));
    assert_eq!(net.ospf_neighbors(r1).unwrap()[0].state, OspfNeighborState::Full);
    assert!(net.routing_table(r1).unwrap().iter().any(|r| r.source.is_ospf()));

    // pulling the cable silences hellos; the dead interval reaps the
    // neighbor and withdraws its routes
    net.disconnect(r1, "eth0").unwrap();
    net.advance_clock(SimTime::from_secs(60));

    assert!(net.ospf_neighbors(r1).unwrap().is_empty());
    assert!(net.routing_table(r1).unwrap().iter().all(|r| !r.source.is_ospf()));
}

#[test]
fn test_admin_down_tears_adjacency_immediately() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.advance_clock(SimTime::from_secs(60));
    assert_eq!(net.ospf_neighbors(r1).unwrap().len(), 1);

    net.set_admin_state(r1, "eth0", false).unwrap();
    assert!(net.ospf_neighbors(r1).unwrap().is_empty());
}

#[test]
fn test_ospf_rip_independence() {
    // R2 offers one network via OSPF and another via RIP; killing either
    // protocol on R1 must not disturb the other's routes
    let (mut net, r1, r2) = get_pair();
    net.add_port(r2, "eth1").unwrap();
    net.add_port(r2, "eth2").unwrap();
    net.set_ipv4(r2, "eth1", addr("172.16.0.1"), *MASK_24).unwrap();
    net.set_ipv4(r2, "eth2", addr("192.168.2.1"), *MASK_24).unwrap();

    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "172.16.0.0", 0);

    net.rip_enable(r1).unwrap();
    net.rip_enable(r2).unwrap();
    net.rip_network(r1, net4("10.0.12.0/24")).unwrap();
    net.rip_network(r2, net4("10.0.12.0/24")).unwrap();
    net.rip_network(r2, net4("192.168.2.0/24")).unwrap();

    net.advance_clock(SimTime::from_secs(90));

    let routes = net.routing_table(r1).unwrap();
    let ospf_route = routes.iter().find(|r| r.prefix == net4("172.16.0.0/24")).unwrap();
    assert!(ospf_route.source.is_ospf());
    let rip_route =
        routes.iter().find(|r| r.prefix == net4("192.168.2.0/24")).unwrap().clone();
    assert_eq!(rip_route.source, RouteSource::Rip);
    assert_eq!(rip_route.next_hop, Some(addr("10.0.12.2")));
    assert_eq!(rip_route.metric, 2);

    // disabling OSPF withdraws only OSPF routes
    net.ospf_disable(r1, 1).unwrap();
    let routes = net.routing_table(r1).unwrap();
    assert!(routes.iter().all(|r| !r.source.is_ospf()));
    assert_eq!(
        routes.iter().find(|r| r.prefix == net4("192.168.2.0/24")).unwrap(),
        &rip_route
    );

    // and the other way around: RIP down leaves OSPF alone
    let (mut net, r1, r2) = get_pair();
    net.add_port(r2, "eth1").unwrap();
    net.set_ipv4(r2, "eth1", addr("172.16.0.1"), *MASK_24).unwrap();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    cover(&mut net, r2, "172.16.0.0", 0);
    net.rip_enable(r1).unwrap();
    net.rip_network(r1, net4("10.0.12.0/24")).unwrap();
    net.advance_clock(SimTime::from_secs(90));

    net.rip_disable(r1).unwrap();
    let routes = net.routing_table(r1).unwrap();
    assert!(routes.iter().any(|r| r.prefix == net4("172.16.0.0/24") && r.source.is_ospf()));
    assert_eq!(net.ospf_neighbors(r1).unwrap()[0].state, OspfNeighborState::Full);
}

#[test]
fn test_rip_lifecycle_errors() {
    let mut net = Fabric::new();
    let r1 = net.add_router("R1").unwrap();
    assert_eq!(
        net.rip_disable(r1).unwrap_err(),
        NetworkError::ConfigError(ConfigError::NoRipProcess)
    );
    net.rip_enable(r1).unwrap();
    assert_eq!(
        net.rip_enable(r1).unwrap_err(),
        NetworkError::ConfigError(ConfigError::RipProcessExists)
    );
}

#[test]
fn test_ospf_disable_clears_neighbor_state() {
    let (mut net, r1, r2) = get_pair();
    cover(&mut net, r1, "10.0.12.0", 0);
    cover(&mut net, r2, "10.0.12.0", 0);
    net.advance_clock(SimTime::from_secs(60));
    assert_eq!(net.ospf_neighbors(r1).unwrap().len(), 1);

    net.ospf_disable(r1, 1).unwrap();
    assert!(net.ospf_neighbors(r1).unwrap().is_empty());
    assert!(net.ospf_areas(r1).unwrap().is_empty());

    // R2 notices the silence after the dead interval
    net.advance_clock(SimTime::from_secs(60));
    assert!(net.ospf_neighbors(r2).unwrap().is_empty());
}
