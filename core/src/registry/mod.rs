//! Registry entities and their repositories
//!
//! Every table of the registry maps to an [`Entity`]. Entities read from the
//! store are wrapped in a [`Tracked`] that keeps the snapshot (shadow) taken
//! when the row was loaded, so updates and deletes always target the row the
//! entity came from even after its key fields were changed in memory.
//!
//! A [`Registry`] owns one [`Repository`] per entity per scope.

pub mod bearer;
pub mod composite;
pub mod ip_mapping;
pub mod neighbour;
pub mod node;
pub mod platform;
pub mod repository;
pub mod route;
pub mod system;
pub mod task;
pub mod wiring;

pub use bearer::Bearer;
pub use composite::{CompositePart, CompositeService};
pub use ip_mapping::NodeIpMapping;
pub use neighbour::{Availability, DiscoveredBy, NodeNeighbour};
pub use node::Node;
pub use platform::Platform;
pub use repository::Repository;
pub use route::Route;
pub use system::System;
pub use task::{Task, TaskService, TaskSubscription};
pub use wiring::SystemWiring;

use crate::config::{ConfigError, RegistryConfig};
use crate::discovery::NeighbourDiscovery;
use crate::routing::{FeedRouteQuery, RouteResolver, ShortestPathStrategy, StrategyRegistry};
use crate::store::{Predicate, RegistryStore, Row, Scope, Select, StoreError, Table, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Incomplete {entity}: missing {field}")]
    IncompleteObject {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: String, key: String },

    #[error("Persistence failure: {0}")]
    Persistence(#[source] StoreError),

    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Query failed: {0}")]
    Query(#[source] StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { table, key } => RegistryError::DuplicateKey { table, key },
            other => RegistryError::Persistence(other),
        }
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A registry record type mapped onto one table.
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const TABLE: Table;
    /// Human-readable kind, used in logs and validation errors
    const KIND: &'static str;

    /// Map a store row. Missing mandatory columns are left empty and caught
    /// by `validate`.
    fn from_row(row: &Row) -> Self;

    fn to_row(&self) -> Row;

    /// Check the mandatory fields are present.
    fn validate(&self) -> Result<(), RegistryError>;

    /// Named, parameterised queries offered by this entity's repository
    fn finders() -> Vec<(&'static str, Select)> {
        Vec::new()
    }

    /// Filter matching this entity's row by its key columns.
    fn key_filter(&self) -> Predicate {
        let row = self.to_row();
        Predicate::all(Self::TABLE.key_columns().iter().map(|column| {
            Predicate::eq(column, row.get(column).cloned().unwrap_or(Value::Null))
        }))
    }
}

/// Fails with `IncompleteObject` when `value` is empty.
pub(crate) fn require(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        return Err(RegistryError::IncompleteObject { entity, field });
    }
    Ok(())
}

/// An entity plus the snapshot taken when it was last loaded or written.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<E> {
    entity: E,
    shadow: Option<E>,
    origin_node: Option<String>,
}

impl<E: Clone + PartialEq> Tracked<E> {
    /// A freshly constructed entity with no shadow; saving it inserts.
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            shadow: None,
            origin_node: None,
        }
    }

    /// An entity that mirrors a stored row.
    pub fn loaded(entity: E) -> Self {
        let shadow = Some(entity.clone());
        Self {
            entity,
            shadow,
            origin_node: None,
        }
    }

    pub(crate) fn with_origin(mut self, origin_node: Option<String>) -> Self {
        self.origin_node = origin_node;
        self
    }

    /// Copy of the snapshot, if one was taken
    pub fn shadow(&self) -> Option<E> {
        self.shadow.clone()
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    /// True if the live entity differs from its snapshot, or there is none.
    pub fn has_changed(&self) -> bool {
        match &self.shadow {
            Some(shadow) => *shadow != self.entity,
            None => true,
        }
    }

    /// Make the current state the new snapshot.
    pub fn snapshot(&mut self) {
        self.shadow = Some(self.entity.clone());
    }

    /// Node the row was read from, when read through the distributed scope
    pub fn origin_node(&self) -> Option<&str> {
        self.origin_node.as_deref()
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }

    /// The version whose key identifies the stored row.
    pub(crate) fn key_source(&self) -> &E {
        self.shadow.as_ref().unwrap_or(&self.entity)
    }
}

impl<E> Deref for Tracked<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E> DerefMut for Tracked<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// One repository per entity, all bound to the same scope.
#[derive(Clone)]
pub struct ScopedRepositories {
    pub nodes: Repository<Node>,
    pub bearers: Repository<Bearer>,
    pub neighbours: Repository<NodeNeighbour>,
    pub ip_mappings: Repository<NodeIpMapping>,
    pub routes: Repository<Route>,
    pub platforms: Repository<Platform>,
    pub systems: Repository<System>,
    pub tasks: Repository<Task>,
    pub task_services: Repository<TaskService>,
    pub task_subscriptions: Repository<TaskSubscription>,
    pub composite_services: Repository<CompositeService>,
    pub composite_parts: Repository<CompositePart>,
    pub wiring: Repository<SystemWiring>,
}

impl ScopedRepositories {
    fn new(store: &Arc<dyn RegistryStore>, scope: Scope) -> Self {
        Self {
            nodes: Repository::new(store.clone(), scope),
            bearers: Repository::new(store.clone(), scope),
            neighbours: Repository::new(store.clone(), scope),
            ip_mappings: Repository::new(store.clone(), scope),
            routes: Repository::new(store.clone(), scope),
            platforms: Repository::new(store.clone(), scope),
            systems: Repository::new(store.clone(), scope),
            tasks: Repository::new(store.clone(), scope),
            task_services: Repository::new(store.clone(), scope),
            task_subscriptions: Repository::new(store.clone(), scope),
            composite_services: Repository::new(store.clone(), scope),
            composite_parts: Repository::new(store.clone(), scope),
            wiring: Repository::new(store.clone(), scope),
        }
    }
}

/// The control plane's view of the registry: a repository set per scope,
/// assembled once and shared by reference.
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    config: RegistryConfig,
    local: ScopedRepositories,
    distributed: ScopedRepositories,
}

impl Registry {
    pub fn new(store: Arc<dyn RegistryStore>, config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let local = ScopedRepositories::new(&store, Scope::Local);
        let distributed = ScopedRepositories::new(&store, Scope::Distributed);
        tracing::info!(
            "Registry ready for node {} (feed routes: {} scope)",
            config.node_id,
            config.feed_route_scope
        );
        Ok(Self {
            store,
            config,
            local,
            distributed,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    pub fn scope(&self, scope: Scope) -> &ScopedRepositories {
        match scope {
            Scope::Local => &self.local,
            Scope::Distributed => &self.distributed,
        }
    }

    pub fn local(&self) -> &ScopedRepositories {
        &self.local
    }

    pub fn distributed(&self) -> &ScopedRepositories {
        &self.distributed
    }

    /// Neighbour state management over `scope`; IP mappings are always
    /// resolved from this node's own tables.
    pub fn neighbour_discovery(&self, scope: Scope) -> NeighbourDiscovery {
        NeighbourDiscovery::new(
            self.scope(scope).neighbours.clone(),
            self.local.ip_mappings.clone(),
        )
    }

    /// Shortest-path routing over the mesh-wide topology
    pub fn shortest_path(&self) -> ShortestPathStrategy {
        ShortestPathStrategy::new(
            self.distributed.nodes.clone(),
            self.distributed.neighbours.clone(),
        )
    }

    /// Strategy registry with the shortest-path strategy registered under
    /// the configured default name.
    pub fn default_strategies(&self) -> StrategyRegistry {
        let mut strategies = StrategyRegistry::new(&self.config.default_strategy);
        strategies.register(&self.config.default_strategy, Arc::new(self.shortest_path()));
        strategies
    }

    pub fn route_resolver(&self, strategies: StrategyRegistry) -> RouteResolver {
        RouteResolver::new(self.distributed.routes.clone(), strategies)
    }

    pub fn feed_route_query(&self) -> FeedRouteQuery {
        let repos = self.scope(self.config.feed_route_scope);
        FeedRouteQuery::new(
            repos.task_services.clone(),
            repos.platforms.clone(),
            repos.routes.clone(),
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;

    #[test]
    fn test_shadow_is_independent_copy() {
        let mut node = Tracked::loaded(Node::new("n1", "broker"));
        let shadow = node.shadow().unwrap();
        assert_eq!(shadow, *node.entity());
        assert!(!node.has_changed());

        node.affiliation = Some("blue".into());
        assert!(node.has_changed());
        assert_eq!(node.shadow().unwrap().affiliation, None);

        node.snapshot();
        assert!(!node.has_changed());
    }

    #[test]
    fn test_fresh_entity_has_no_shadow() {
        let node = Tracked::new(Node::new("n1", "broker"));
        assert!(node.shadow().is_none());
        assert!(node.has_changed());
        assert_eq!(node.key_source().id, "n1");
    }

    #[test]
    fn test_key_source_prefers_shadow() {
        let mut node = Tracked::loaded(Node::new("n1", "broker"));
        node.id = "n2".into();
        assert_eq!(node.key_source().id, "n1");
        assert_eq!(
            node.key_source().key_filter(),
            Predicate::eq("NODE_ID", "n1").and(Predicate::eq("TYPE_ID", "broker"))
        );
    }

    #[test]
    fn test_store_errors_map_to_registry_errors() {
        let dup = RegistryError::from(StoreError::DuplicateKey {
            table: "FABRIC.NODES".into(),
            key: "n1/broker".into(),
        });
        assert!(matches!(dup, RegistryError::DuplicateKey { .. }));
        let other = RegistryError::from(StoreError::Backend("disk".into()));
        assert!(matches!(other, RegistryError::Persistence(_)));
    }

    #[test]
    fn test_registry_rejects_invalid_config() {
        let store: Arc<dyn RegistryStore> = Arc::new(TableStore::memory());
        assert!(Registry::new(store.clone(), RegistryConfig::new("")).is_err());
        let registry = Registry::new(store, RegistryConfig::new("n1")).unwrap();
        assert_eq!(registry.scope(Scope::Local).nodes.scope(), Scope::Local);
        assert_eq!(
            registry.scope(Scope::Distributed).routes.scope(),
            Scope::Distributed
        );
    }
}
