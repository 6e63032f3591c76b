// Integration tests for route selection and resolution

use feedmesh_core::registry::{Availability, DiscoveredBy, Node, NodeNeighbour, Route};
use feedmesh_core::routing::{RoutingStrategy, StrategyRegistry, VIRTUAL_NODE};
use feedmesh_core::{FeedMesh, RegistryConfig, RouteError};
use mockall::mock;
use proptest::prelude::*;
use std::sync::Arc;

mock! {
    pub Strategy {}
    impl RoutingStrategy for Strategy {
        fn route_nodes(&self, start: &str, end: &str) -> Result<Vec<String>, RouteError>;
    }
}

fn mesh() -> FeedMesh {
    FeedMesh::open(RegistryConfig::new("nodeB")).unwrap()
}

fn add_route(mesh: &FeedMesh, route: Route) {
    let routes = &mesh.registry().local().routes;
    assert!(routes.save(&mut routes.create_with(route)).unwrap());
}

#[test]
fn test_explicit_route_preferred_over_fallback_strategy() {
    let mesh = mesh();
    add_route(&mesh, Route::new("nodeB", "nodeA", 9, "factory=Fallback"));
    add_route(&mesh, Route::new("nodeB", "nodeA", 1, "nodes=nodeB,relay1,nodeA"));

    let mut fallback = MockStrategy::new();
    fallback.expect_route_nodes().never();
    let mut strategies = StrategyRegistry::new("DynamicRouting");
    strategies.register("Fallback", Arc::new(fallback));
    let resolver = mesh.registry().route_resolver(strategies);

    let candidates = resolver.get_routes("nodeB", "nodeA").unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].ordinal, 1);
    assert_eq!(
        resolver
            .get_route_nodes("nodeB", "nodeA", &candidates[0].route)
            .unwrap(),
        vec!["nodeB", "relay1", "nodeA"]
    );
    assert_eq!(
        resolver.resolve("nodeB", "nodeA").unwrap(),
        vec!["nodeB", "relay1", "nodeA"]
    );
}

#[test]
fn test_routes_ordered_by_ordinal() {
    let mesh = mesh();
    for ordinal in [3, 1, 2] {
        add_route(
            &mesh,
            Route::new("s", "e", ordinal, format!("nodes=s,hop{},e", ordinal)),
        );
    }
    let ordinals: Vec<i64> = mesh
        .route_resolver()
        .get_routes("s", "e")
        .unwrap()
        .iter()
        .map(|r| r.ordinal)
        .collect();
    assert_eq!(ordinals, vec![1, 2, 3]);
}

#[test]
fn test_wildcard_row_matches_any_pair() {
    let mesh = mesh();
    add_route(&mesh, Route::new("*", "*", 7, "nodes=placeholder"));

    let resolver = mesh.route_resolver();
    let routes = resolver.get_routes("x", "y").unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].route, "factory=DynamicRouting");
    assert!(!routes[0].has_changed());

    let same = resolver.get_routes("x", "x").unwrap();
    assert_eq!(same[0].route, "nodes=x");
    assert_eq!(resolver.resolve("x", "x").unwrap(), vec!["x"]);
}

#[test]
fn test_factory_descriptor_delegates_once() {
    let mesh = mesh();
    let mut strategy = MockStrategy::new();
    strategy
        .expect_route_nodes()
        .withf(|start, end| start == "s" && end == "e")
        .times(1)
        .returning(|_, _| Ok(vec!["s".to_string(), "q".to_string(), "e".to_string()]));
    let mut strategies = StrategyRegistry::new("X");
    strategies.register("X", Arc::new(strategy));

    let resolver = mesh.registry().route_resolver(strategies);
    assert_eq!(
        resolver.get_route_nodes("s", "e", "factory=X").unwrap(),
        vec!["s", "q", "e"]
    );
}

#[test]
fn test_failing_strategy_falls_through_to_next_candidate() {
    let mesh = mesh();
    add_route(&mesh, Route::new("s", "e", 1, "factory=Flaky"));
    add_route(&mesh, Route::new("s", "e", 2, "nodes=s,backup,e"));

    let mut flaky = MockStrategy::new();
    flaky
        .expect_route_nodes()
        .times(1)
        .returning(|_, _| Err(RouteError::Strategy("topology unavailable".into())));
    let mut strategies = StrategyRegistry::new("Flaky");
    strategies.register("Flaky", Arc::new(flaky));

    let resolver = mesh.registry().route_resolver(strategies);
    assert_eq!(resolver.resolve("s", "e").unwrap(), vec!["s", "backup", "e"]);
}

#[test]
fn test_default_strategy_uses_neighbour_graph() {
    let mesh = mesh();
    let repos = mesh.registry().local();
    for id in ["nodeA", "nodeB", "relay1"] {
        let mut node = Node::new(id, "broker");
        node.availability = Some("AVAILABLE".into());
        assert!(repos.nodes.save(&mut repos.nodes.create_with(node)).unwrap());
    }
    let discovery = mesh.neighbour_discovery();
    for (a, b) in [("nodeB", "relay1"), ("relay1", "nodeA")] {
        discovery
            .record_neighbour(NodeNeighbour::new(
                a,
                "eth0",
                b,
                "eth0",
                DiscoveredBy::Static,
                Availability::Available,
            ))
            .unwrap();
    }
    add_route(&mesh, Route::new("*", "*", 1, ""));

    assert_eq!(
        mesh.route_resolver().resolve("nodeB", "nodeA").unwrap(),
        vec!["nodeB", "relay1", "nodeA"]
    );
    // No path to an unknown node: direct route
    assert_eq!(
        mesh.route_resolver().resolve("nodeB", "nodeZ").unwrap(),
        vec!["nodeB", "nodeZ"]
    );
}

#[test]
fn test_virtual_destination_never_consults_routes() {
    let mesh = mesh();
    let resolver = mesh.route_resolver();
    assert_eq!(
        resolver
            .get_route_nodes("nodeB", VIRTUAL_NODE, "factory=DoesNotExist")
            .unwrap(),
        vec!["nodeB"]
    );
}

proptest! {
    #[test]
    fn prop_candidates_sorted_by_ordinal(ordinals in proptest::collection::btree_set(-50i64..50, 1..12)) {
        let mesh = mesh();
        let mut shuffled: Vec<i64> = ordinals.iter().copied().collect();
        shuffled.reverse();
        for ordinal in &shuffled {
            add_route(&mesh, Route::new("s", "e", *ordinal, "nodes=s,e"));
        }
        let found: Vec<i64> = mesh
            .route_resolver()
            .get_routes("s", "e")
            .unwrap()
            .iter()
            .map(|r| r.ordinal)
            .collect();
        let expected: Vec<i64> = ordinals.into_iter().collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn prop_node_lists_returned_verbatim(nodes in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..6)) {
        let mesh = mesh();
        let descriptor = format!("nodes={}", nodes.join(" , "));
        let hops = mesh.route_resolver().get_route_nodes("s", "e", &descriptor).unwrap();
        prop_assert_eq!(hops, nodes);
    }
}
