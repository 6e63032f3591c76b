//! Route selection and resolution
//!
//! Turns the rows of the route table into concrete node paths:
//! - Descriptor: the persisted route mini-language (`nodes=`, `factory=`, packed)
//! - Strategy: named dynamic routing strategies behind `factory=` descriptors
//! - Shortest path: the default strategy, over the mesh-wide neighbour graph
//! - Packed: unpacking of `<route>` payloads carried by the transport
//! - Resolver: candidate routes for a node pair, tried in ordinal order
//! - Feed routes: routes towards the nodes hosting a task's feeds

pub mod descriptor;
pub mod feed_routes;
pub mod packed;
pub mod resolver;
pub mod shortest_path;
pub mod strategy;

pub use descriptor::{RouteDescriptor, VIRTUAL_NODE};
pub use feed_routes::{FeedRouteQuery, FeedRoutes, FeedSelector};
pub use packed::{RouteUnpacker, XmlRouteUnpacker};
pub use resolver::RouteResolver;
pub use shortest_path::ShortestPathStrategy;
pub use strategy::{RoutingStrategy, StrategyRegistry};

use crate::registry::RegistryError;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Route lookup failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Unknown routing strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid packed route: {0}")]
    InvalidPackedRoute(String),

    #[error("Routing strategy failed: {0}")]
    Strategy(String),

    #[error("No route from {start} to {end}")]
    NoRoute { start: String, end: String },
}
