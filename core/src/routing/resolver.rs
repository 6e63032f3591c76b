//! Route resolution: from a (start, end) pair to a concrete hop list.

use super::{RouteDescriptor, RouteError, RouteUnpacker, StrategyRegistry, XmlRouteUnpacker, VIRTUAL_NODE};
use crate::registry::{Repository, Route, Tracked};
use std::sync::Arc;

pub struct RouteResolver {
    routes: Repository<Route>,
    strategies: StrategyRegistry,
    unpacker: Arc<dyn RouteUnpacker>,
}

impl RouteResolver {
    pub fn new(routes: Repository<Route>, strategies: StrategyRegistry) -> Self {
        Self::with_unpacker(routes, strategies, Arc::new(XmlRouteUnpacker))
    }

    pub fn with_unpacker(
        routes: Repository<Route>,
        strategies: StrategyRegistry,
        unpacker: Arc<dyn RouteUnpacker>,
    ) -> Self {
        Self {
            routes,
            strategies,
            unpacker,
        }
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Candidate routes from `start` to `end`, lowest ordinal first.
    ///
    /// Wildcard rows are included with their descriptor synthesized for
    /// this pair. Query failures propagate.
    pub fn get_routes(&self, start: &str, end: &str) -> Result<Vec<Tracked<Route>>, RouteError> {
        let routes = self
            .routes
            .get_routes(start, end, self.strategies.default_name())?;
        tracing::trace!("{} candidate route(s) {} -> {}", routes.len(), start, end);
        Ok(routes)
    }

    /// Decode `descriptor` into the hops from `start` to `end`.
    ///
    /// A `$virtual` destination is always local delivery. An empty result
    /// (including an unrecognised descriptor) becomes `[start, end]`.
    pub fn get_route_nodes(
        &self,
        start: &str,
        end: &str,
        descriptor: &str,
    ) -> Result<Vec<String>, RouteError> {
        if end == VIRTUAL_NODE {
            return Ok(vec![start.to_string()]);
        }

        let nodes = match RouteDescriptor::parse(descriptor) {
            RouteDescriptor::Nodes(nodes) => nodes,
            RouteDescriptor::Factory(name) => {
                let strategy = self.strategies.get(&name)?;
                strategy.route_nodes(start, end)?
            }
            RouteDescriptor::Packed(payload) => self.unpacker.unpack(&payload)?,
            RouteDescriptor::Unrecognised(raw) => {
                tracing::warn!(
                    "Unrecognised route descriptor '{}' for {} -> {}, using direct route",
                    raw,
                    start,
                    end
                );
                Vec::new()
            }
        };

        if nodes.is_empty() {
            return Ok(vec![start.to_string(), end.to_string()]);
        }
        Ok(nodes)
    }

    /// Hops of the first candidate route that decodes.
    ///
    /// Fails with `NoRoute` when there are no candidates, otherwise with
    /// the error of the last candidate tried.
    pub fn resolve(&self, start: &str, end: &str) -> Result<Vec<String>, RouteError> {
        let mut last_error = None;
        for route in self.get_routes(start, end)? {
            match self.get_route_nodes(start, end, &route.route) {
                Ok(nodes) => {
                    tracing::debug!(
                        "Resolved {} -> {} via ordinal {}: {}",
                        start,
                        end,
                        route.ordinal,
                        nodes.join(",")
                    );
                    return Ok(nodes);
                }
                Err(e) => {
                    tracing::warn!(
                        "Route {} -> {} (ordinal {}) failed: {}",
                        start,
                        end,
                        route.ordinal,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RouteError::NoRoute {
            start: start.to_string(),
            end: end.to_string(),
        }))
    }
}
