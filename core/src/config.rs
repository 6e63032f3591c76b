//! Registry configuration
//!
//! Settings the control plane needs at construction time:
//! - The identity of this node in the mesh
//! - The pseudo-node standing for the mesh root
//! - Which routing strategy `factory=` descriptors fall back to
//! - The scope feed route queries run in

use crate::store::Scope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Invalid node id: must not be empty or '*'")]
    InvalidNodeId,

    #[error("Invalid root node: must not be empty or '*'")]
    InvalidRootNode,

    #[error("Invalid default strategy: must not be empty")]
    InvalidDefaultStrategy,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Name of the pseudo-node representing the mesh root
pub const ROOT_NODE: &str = "$FABRIC";

/// Strategy used when a route descriptor names none
pub const DEFAULT_STRATEGY: &str = "DynamicRouting";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// This node's id; rows read locally are attributed to it in the
    /// distributed scope.
    pub node_id: String,

    #[serde(default = "default_root_node")]
    pub root_node: String,

    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    /// Scope feed route queries run in
    #[serde(default)]
    pub feed_route_scope: Scope,

    /// On-disk location of the local tables; in-memory when absent.
    #[serde(default)]
    pub storage_path: Option<String>,
}

fn default_root_node() -> String {
    ROOT_NODE.to_string()
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

impl RegistryConfig {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            root_node: default_root_node(),
            default_strategy: default_strategy(),
            feed_route_scope: Scope::Distributed,
            storage_path: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() || self.node_id == "*" {
            return Err(ConfigError::InvalidNodeId);
        }
        if self.root_node.trim().is_empty() || self.root_node == "*" {
            return Err(ConfigError::InvalidRootNode);
        }
        if self.default_strategy.trim().is_empty() {
            return Err(ConfigError::InvalidDefaultStrategy);
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}
