// FeedMesh Core: registry and routing control plane
//
// Answers two questions for a broker in the mesh:
//   which node hosts the feed a task wants, and
//   which hops lead there from here.

pub mod config;
pub mod discovery;
pub mod registry;
pub mod routing;
pub mod store;

use std::sync::Arc;
use thiserror::Error;

pub use config::{ConfigError, RegistryConfig};
pub use discovery::{NeighbourDescriptor, NeighbourDiscovery, NeighbourState};
pub use registry::{Registry, RegistryError, Repository, Tracked};
pub use routing::{
    FeedRouteQuery, FeedRoutes, FeedSelector, RouteDescriptor, RouteError, RouteResolver,
    RoutingStrategy, StrategyRegistry,
};
pub use store::{FederatedStore, RegistryStore, Scope, StoreError, TableStore};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum FeedMeshError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// A node's registry: its own tables, the federated view over its peers,
/// and the repositories bound to both scopes.
pub struct FeedMesh {
    store: Arc<FederatedStore>,
    registry: Registry,
}

impl FeedMesh {
    /// Open the node's tables at `config.storage_path`, or in memory when
    /// no path is configured.
    pub fn open(config: RegistryConfig) -> Result<Self, FeedMeshError> {
        config.validate()?;
        let local = match &config.storage_path {
            Some(path) => TableStore::open(path)?,
            None => TableStore::memory(),
        };
        Self::with_local(Arc::new(local), config)
    }

    /// Build on an existing local table store.
    pub fn with_local(local: Arc<TableStore>, config: RegistryConfig) -> Result<Self, FeedMeshError> {
        let store = Arc::new(FederatedStore::new(config.node_id.clone(), local));
        let shared: Arc<dyn RegistryStore> = store.clone();
        let registry = Registry::new(shared, config)?;
        Ok(Self { store, registry })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<FederatedStore> {
        &self.store
    }

    pub fn node_id(&self) -> &str {
        &self.registry.config().node_id
    }

    /// Make `peer`'s tables visible through the distributed scope.
    pub fn join_peer(&self, peer_id: impl Into<String>, peer: Arc<dyn RegistryStore>) {
        self.store.join_peer(peer_id, peer);
    }

    pub fn leave_peer(&self, peer_id: &str) -> bool {
        self.store.leave_peer(peer_id)
    }

    /// Resolver backed by the default strategy set.
    pub fn route_resolver(&self) -> RouteResolver {
        self.registry
            .route_resolver(self.registry.default_strategies())
    }

    pub fn feed_route_query(&self) -> FeedRouteQuery {
        self.registry.feed_route_query()
    }

    pub fn neighbour_discovery(&self) -> NeighbourDiscovery {
        self.registry.neighbour_discovery(Scope::Distributed)
    }

    /// Flush the local tables to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.local().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Route;

    #[test]
    fn test_open_in_memory() {
        let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
        assert_eq!(mesh.node_id(), "n1");
        assert!(mesh.store().peer_ids().is_empty());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        assert!(matches!(
            FeedMesh::open(RegistryConfig::new("*")),
            Err(FeedMeshError::Config(ConfigError::InvalidNodeId))
        ));
    }

    #[test]
    fn test_peer_routes_visible_through_resolver() {
        let mesh = FeedMesh::open(RegistryConfig::new("n1")).unwrap();
        let peer = Arc::new(TableStore::memory());
        let peer_routes: Repository<Route> = Repository::new(peer.clone(), Scope::Local);
        peer_routes
            .save(&mut peer_routes.create_with(Route::new("n1", "n2", 1, "nodes=n1,hub,n2")))
            .unwrap();

        assert!(mesh.route_resolver().resolve("n1", "n2").is_err());
        mesh.join_peer("n9", peer);
        assert_eq!(
            mesh.route_resolver().resolve("n1", "n2").unwrap(),
            vec!["n1", "hub", "n2"]
        );
        assert!(mesh.leave_peer("n9"));
    }
}
