//! Named dynamic routing strategies
//!
//! A `factory=<name>` descriptor defers path computation to the strategy
//! registered under `<name>`. Strategies are registered once at startup;
//! lookup is a map access.

use super::RouteError;
use crate::config::DEFAULT_STRATEGY;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Computes a hop list between two nodes.
///
/// An empty result means "no path known"; the resolver then falls back to
/// the direct two-hop route.
#[cfg_attr(test, mockall::automock)]
pub trait RoutingStrategy: Send + Sync {
    fn route_nodes(&self, start: &str, end: &str) -> Result<Vec<String>, RouteError>;
}

#[derive(Clone)]
pub struct StrategyRegistry {
    default_name: String,
    strategies: HashMap<String, Arc<dyn RoutingStrategy>>,
}

impl StrategyRegistry {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
            strategies: HashMap::new(),
        }
    }

    /// Register `strategy` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn RoutingStrategy>) {
        let name = name.into();
        if self.strategies.insert(name.clone(), strategy).is_some() {
            tracing::debug!("Replaced routing strategy {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn RoutingStrategy>, RouteError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| RouteError::UnknownStrategy(name.to_string()))
    }

    /// Name synthesized into `factory=` descriptors for wildcard routes
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGY)
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("default_name", &self.default_name)
            .field("strategies", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_registered_strategy() {
        let mut mock = MockRoutingStrategy::new();
        mock.expect_route_nodes()
            .withf(|start, end| start == "a" && end == "b")
            .times(1)
            .returning(|_, _| Ok(vec!["a".into(), "x".into(), "b".into()]));

        let mut registry = StrategyRegistry::default();
        registry.register("Mesh", Arc::new(mock));

        let strategy = registry.get("Mesh").unwrap();
        assert_eq!(strategy.route_nodes("a", "b").unwrap(), vec!["a", "x", "b"]);
        assert_eq!(registry.default_name(), DEFAULT_STRATEGY);
    }

    #[test]
    fn test_unknown_strategy() {
        let registry = StrategyRegistry::new("Mesh");
        assert!(matches!(
            registry.get("Mesh"),
            Err(RouteError::UnknownStrategy(name)) if name == "Mesh"
        ));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = StrategyRegistry::new("b");
        registry.register("b", Arc::new(MockRoutingStrategy::new()));
        registry.register("a", Arc::new(MockRoutingStrategy::new()));
        registry.register("b", Arc::new(MockRoutingStrategy::new()));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
