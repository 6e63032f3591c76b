use feedmesh_core::registry::{Node, Route, TaskService};
use feedmesh_core::{FeedMesh, RegistryConfig, TableStore};
use std::sync::Arc;

fn config(path: &str) -> RegistryConfig {
    let mut config = RegistryConfig::new("nodeA");
    config.storage_path = Some(path.to_string());
    config
}

#[test]
fn test_registry_persistence_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry");
    let path = path.to_str().unwrap();

    // First instance: register a node, a feed and a route
    {
        let mesh = FeedMesh::open(config(path)).unwrap();
        let repos = mesh.registry().local();
        assert!(repos
            .nodes
            .save(&mut repos.nodes.create_with(Node::new("nodeA", "broker")))
            .unwrap());
        assert!(repos
            .task_services
            .save(&mut repos.task_services.create_with(TaskService::new("t", "p", "s", "f")))
            .unwrap());
        assert!(repos
            .routes
            .save(&mut repos.routes.create_with(Route::new("nodeA", "nodeB", 1, "nodes=nodeA,nodeB")))
            .unwrap());
        mesh.flush().unwrap();
    }

    // Second instance: everything survived
    {
        let mesh = FeedMesh::open(config(path)).unwrap();
        let repos = mesh.registry().local();
        assert!(repos.nodes.get_by_id("nodeA").is_some());
        assert_eq!(repos.task_services.get_by_task("t").len(), 1);
        assert_eq!(
            mesh.route_resolver().resolve("nodeA", "nodeB").unwrap(),
            vec!["nodeA", "nodeB"]
        );
    }
}

#[test]
fn test_key_change_persists_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry");
    let path = path.to_str().unwrap();

    {
        let mesh = FeedMesh::open(config(path)).unwrap();
        let routes = &mesh.registry().local().routes;
        let mut route = routes.create_with(Route::new("nodeA", "nodeB", 1, "nodes=nodeA,nodeB"));
        assert!(routes.save(&mut route).unwrap());

        route.ordinal = 4;
        assert!(routes.save(&mut route).unwrap());
        mesh.flush().unwrap();
    }

    {
        let local = Arc::new(TableStore::open(path).unwrap());
        let mesh = FeedMesh::with_local(local, RegistryConfig::new("nodeA")).unwrap();
        let ordinals: Vec<i64> = mesh
            .registry()
            .local()
            .routes
            .get_routes_by_start_node("nodeA")
            .iter()
            .map(|r| r.ordinal)
            .collect();
        assert_eq!(ordinals, vec![4]);
    }
}
