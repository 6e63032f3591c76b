// Integration tests for neighbour state tracking across scopes

use feedmesh_core::registry::{Availability, DiscoveredBy, NodeIpMapping, NodeNeighbour};
use feedmesh_core::{FeedMesh, NeighbourDescriptor, NeighbourState, RegistryConfig, Scope, TableStore};
use std::sync::Arc;

fn edge(node: &str, neighbour: &str, iface: &str, by: DiscoveredBy) -> NodeNeighbour {
    NodeNeighbour::new(node, "eth0", neighbour, iface, by, Availability::Unavailable)
}

#[test]
fn test_node_startup_and_link_loss() {
    let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
    let discovery = mesh.registry().neighbour_discovery(Scope::Local);

    discovery
        .record_neighbour(edge("n1", "n2", "eth0", DiscoveredBy::Static))
        .unwrap();
    discovery
        .record_neighbour(edge("n1", "n3", "eth1", DiscoveredBy::Static))
        .unwrap();
    discovery
        .record_neighbour(edge("n1", "n4", "wlan0", DiscoveredBy::Dynamic))
        .unwrap();

    assert!(discovery.mark_static_neighbours_as_available("n1"));
    assert_eq!(
        discovery.state_of("n1", "eth0", "n2", "eth0"),
        NeighbourState::StaticAvailable
    );
    assert_eq!(
        discovery.state_of("n1", "eth0", "n4", "wlan0"),
        NeighbourState::Unavailable
    );
    assert_eq!(discovery.get_available_neighbours_entries("n1", "n3").len(), 1);

    assert!(discovery.mark_unavailable("n1", &NeighbourDescriptor::new("n3", "eth1")));
    assert!(discovery.get_available_neighbours_entries("n1", "n3").is_empty());
    assert_eq!(discovery.get_all_neighbours().len(), 3);

    assert!(discovery.delete_neighbours_for_node("n1"));
    assert!(discovery.get_all_neighbours().is_empty());
    assert_eq!(
        discovery.state_of("n1", "eth0", "n2", "eth0"),
        NeighbourState::Unknown
    );
}

#[test]
fn test_distributed_scope_sees_peer_edges() {
    let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
    let peer = Arc::new(TableStore::memory());
    {
        let peer_mesh = FeedMesh::with_local(peer.clone(), RegistryConfig::new("n2")).unwrap();
        peer_mesh
            .registry()
            .neighbour_discovery(Scope::Local)
            .record_neighbour(NodeNeighbour::new(
                "n2",
                "eth0",
                "n5",
                "eth0",
                DiscoveredBy::Dynamic,
                Availability::Available,
            ))
            .unwrap();
    }
    mesh.join_peer("n2", peer);

    let local = mesh.registry().neighbour_discovery(Scope::Local);
    let distributed = mesh.neighbour_discovery();
    assert!(local.get_all_neighbours().is_empty());

    let edges = distributed.get_all_neighbours();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].origin_node(), Some("n2"));
    assert_eq!(
        distributed.state_of("n2", "eth0", "n5", "eth0"),
        NeighbourState::DynamicAvailable
    );
}

#[test]
fn test_ip_mapping_resolved_from_local_tables() {
    let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
    let mappings = &mesh.registry().local().ip_mappings;
    let mut mapping = mappings.create_with(NodeIpMapping::new("n2", "eth0", "192.168.7.2", Some(1883)));
    assert!(mappings.save(&mut mapping).unwrap());

    let discovery = mesh.neighbour_discovery();
    let neighbour = edge("n1", "n2", "eth0", DiscoveredBy::Static);
    let found = discovery.get_ip_mapping_for_neighbour(&neighbour).unwrap();
    assert_eq!(found.ip, "192.168.7.2");
    assert_eq!(found.port, Some(1883));
}

#[test]
fn test_predicate_lookups_propagate_errors() {
    let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
    let discovery = mesh.neighbour_discovery();
    discovery
        .record_neighbour(edge("n1", "n2", "eth0", DiscoveredBy::Static))
        .unwrap();

    let found = discovery
        .get_neighbours("neighbour_id = \"n2\" AND availability = 'UNAVAILABLE'")
        .unwrap();
    assert_eq!(found.len(), 1);

    assert!(discovery.get_neighbours("neighbour_id = *").is_err());
    assert!(discovery.get_neighbours("no_such_column = 1").is_err());
    assert!(discovery.get_neighbours("neighbour_id = ").is_err());
}
