// Integration tests for feed route queries
//
// A task uses feed feedY of system sysX on platform platA, hosted on nodeA.

use feedmesh_core::registry::{Node, Platform, Route, System, Task, TaskService};
use feedmesh_core::routing::{FeedSelector, RouteDescriptor, RoutingStrategy};
use feedmesh_core::{FeedMesh, RegistryConfig, RouteError, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn mesh(node_id: &str) -> FeedMesh {
    FeedMesh::open(RegistryConfig::new(node_id)).unwrap()
}

fn register_topology(mesh: &FeedMesh) {
    let repos = mesh.registry().local();

    let mut node = repos.nodes.create_with(Node::new("nodeA", "broker"));
    assert!(repos.nodes.save(&mut node).unwrap());
    let mut platform = repos.platforms.create_with(Platform::new("platA", "gateway", "nodeA"));
    assert!(repos.platforms.save(&mut platform).unwrap());
    let mut system = repos.systems.create_with(System::new("platA", "sysX", "thermometer"));
    assert!(repos.systems.save(&mut system).unwrap());
    let mut task = repos.tasks.create_with(Task::new("taskT"));
    assert!(repos.tasks.save(&mut task).unwrap());
    let mut feed = repos
        .task_services
        .create_with(TaskService::new("taskT", "platA", "sysX", "feedY"));
    assert!(repos.task_services.save(&mut feed).unwrap());
    let mut wildcard = repos.routes.create_with(Route::new("*", "*", 5, "nodes=nodeA"));
    assert!(repos.routes.save(&mut wildcard).unwrap());
}

fn selector() -> FeedSelector {
    FeedSelector::new("taskT", "platA", "sysX", "feedY")
}

struct CountingStrategy {
    calls: AtomicUsize,
}

impl RoutingStrategy for CountingStrategy {
    fn route_nodes(&self, start: &str, end: &str) -> Result<Vec<String>, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![start.to_string(), "relay7".to_string(), end.to_string()])
    }
}

#[test]
fn test_feed_hosted_on_querying_node_is_local() {
    let mesh = mesh("nodeA");
    register_topology(&mesh);

    let routes = mesh
        .feed_route_query()
        .get_feed_routes(&selector(), "nodeA")
        .unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].end_node_id, "nodeA");
    assert_eq!(routes[0].ordinal, 5);
    assert_eq!(routes[0].route, "nodes=nodeA");
}

#[test]
fn test_remote_feed_defers_to_default_strategy() {
    let mesh = mesh("nodeB");
    register_topology(&mesh);

    let routes = mesh
        .feed_route_query()
        .get_feed_routes(&selector(), "nodeB")
        .unwrap();
    assert_eq!(routes.len(), 1);
    let default = mesh.registry().config().default_strategy.clone();
    assert_eq!(routes[0].descriptor(), RouteDescriptor::factory(default.clone()));

    let strategy = Arc::new(CountingStrategy {
        calls: AtomicUsize::new(0),
    });
    let mut strategies = mesh.registry().default_strategies();
    strategies.register(default, strategy.clone());
    let resolver = mesh.registry().route_resolver(strategies);

    let hops = resolver
        .get_route_nodes("nodeB", &routes[0].end_node_id, &routes[0].route)
        .unwrap();
    assert_eq!(hops, vec!["nodeB", "relay7", "nodeA"]);
    assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_route_ranked_before_wildcard() {
    let mesh = mesh("nodeB");
    register_topology(&mesh);
    let routes = &mesh.registry().local().routes;
    let mut explicit = routes.create_with(Route::new("nodeB", "nodeA", 1, "nodes=nodeB,nodeA"));
    assert!(routes.save(&mut explicit).unwrap());

    let found = mesh
        .feed_route_query()
        .get_feed_routes(&FeedSelector::new("taskT", "*", "*", "*"), "nodeB")
        .unwrap();
    let descriptors: Vec<&str> = found.iter().map(|r| r.route.as_str()).collect();
    assert_eq!(descriptors, vec!["nodes=nodeB,nodeA", "factory=DynamicRouting"]);
}

#[test]
fn test_feed_routes_in_local_scope_ignore_peers() {
    let mut config = RegistryConfig::new("nodeB");
    config.feed_route_scope = Scope::Local;
    let mesh = FeedMesh::open(config).unwrap();

    let peer = mesh_peer_with_topology();
    mesh.join_peer("nodeA", peer);

    assert!(mesh
        .feed_route_query()
        .get_feed_routes(&selector(), "nodeB")
        .unwrap()
        .is_empty());
}

#[test]
fn test_feed_routes_span_peers_in_distributed_scope() {
    let mesh = mesh("nodeB");
    mesh.join_peer("nodeA", mesh_peer_with_topology());

    let found = mesh
        .feed_route_query()
        .get_feed_routes(&selector(), "nodeB")
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].route, "factory=DynamicRouting");
}

fn mesh_peer_with_topology() -> Arc<feedmesh_core::TableStore> {
    let peer = mesh("nodeA");
    register_topology(&peer);
    peer.store().local().clone()
}
