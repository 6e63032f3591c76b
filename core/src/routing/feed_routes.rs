//! Feed routes: which nodes host the feeds a task uses, and the routes
//! from a given node towards each of them.
//!
//! The result joins three tables:
//! - task services (task → platform, system, feed)
//! - platforms (platform → hosting node)
//! - routes (start node → hosting node, or the `*`→`*` wildcard)
//!
//! Rows come back ordered by task, platform, system, feed, destination node
//! and ordinal, so each destination's candidates are ranked best first.

use super::RouteDescriptor;
use crate::config::RegistryConfig;
use crate::registry::route::{synthesize_descriptor, WILDCARD};
use crate::registry::{Platform, RegistryError, Repository, Route, TaskService, Tracked};
use crate::store::schema::{routes, task_services};
use crate::store::{Predicate, Select, Table};
use std::collections::HashMap;
use std::fmt;

/// Which task feeds to look up; `*` in any position matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelector {
    pub task_id: String,
    pub platform_id: String,
    pub system_id: String,
    pub feed_id: String,
}

impl FeedSelector {
    pub fn new(
        task_id: impl Into<String>,
        platform_id: impl Into<String>,
        system_id: impl Into<String>,
        feed_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            platform_id: platform_id.into(),
            system_id: system_id.into(),
            feed_id: feed_id.into(),
        }
    }

    /// Every feed of every task
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD, WILDCARD, WILDCARD)
    }

    /// Equality filter on each non-wildcard field
    fn filter(&self) -> Predicate {
        Predicate::all(
            [
                (task_services::TASK_ID, &self.task_id),
                (task_services::PLATFORM_ID, &self.platform_id),
                (task_services::SERVICE_ID, &self.system_id),
                (task_services::DATA_FEED_ID, &self.feed_id),
            ]
            .into_iter()
            .filter(|(_, value)| value.as_str() != WILDCARD)
            .map(|(column, value)| Predicate::eq(column, value.as_str())),
        )
    }
}

impl Default for FeedSelector {
    fn default() -> Self {
        Self::any()
    }
}

/// One candidate route towards the node hosting a task's feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRoutes {
    pub task_id: String,
    pub platform_id: String,
    pub system_id: String,
    pub feed_id: String,
    /// Node hosting the feed's platform
    pub end_node_id: String,
    pub ordinal: i64,
    pub route: String,
}

impl FeedRoutes {
    pub fn descriptor(&self) -> RouteDescriptor {
        RouteDescriptor::parse(&self.route)
    }
}

impl fmt::Display for FeedRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{} @ {} [{}] {}",
            self.task_id,
            self.platform_id,
            self.system_id,
            self.feed_id,
            self.end_node_id,
            self.ordinal,
            self.route
        )
    }
}

pub struct FeedRouteQuery {
    task_services: Repository<TaskService>,
    platforms: Repository<Platform>,
    routes: Repository<Route>,
    root_node: String,
    default_strategy: String,
}

impl FeedRouteQuery {
    pub fn new(
        task_services: Repository<TaskService>,
        platforms: Repository<Platform>,
        routes: Repository<Route>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            task_services,
            platforms,
            routes,
            root_node: config.root_node.clone(),
            default_strategy: config.default_strategy.clone(),
        }
    }

    /// Routes from `start_node` towards every feed matching `selector`.
    ///
    /// Wildcard route rows carry a synthesized descriptor: `nodes=<start>`
    /// when the feed is hosted on `start_node` itself, otherwise
    /// `factory=<default strategy>`. Query failures propagate.
    pub fn get_feed_routes(
        &self,
        selector: &FeedSelector,
        start_node: &str,
    ) -> Result<Vec<FeedRoutes>, RegistryError> {
        let feeds = self.task_services.query(
            &Select::from(Table::TaskServices)
                .filter(selector.filter())
                .order_by(task_services::TASK_ID)
                .order_by(task_services::PLATFORM_ID)
                .order_by(task_services::SERVICE_ID)
                .order_by(task_services::DATA_FEED_ID),
        )?;
        if feeds.is_empty() {
            return Ok(Vec::new());
        }

        let mut hosts: HashMap<String, Vec<String>> = HashMap::new();
        for platform in self.platforms.query(&Select::from(Table::Platforms))? {
            let platform = platform.into_inner();
            let nodes = hosts.entry(platform.id).or_default();
            if !nodes.contains(&platform.node_id) {
                nodes.push(platform.node_id);
            }
        }

        let candidates = self.routes.query(
            &Select::from(Table::Routes)
                .filter(
                    Predicate::eq(routes::START_NODE_ID, start_node).or(Predicate::eq(
                        routes::START_NODE_ID,
                        WILDCARD,
                    )
                    .and(Predicate::eq(routes::END_NODE_ID, WILDCARD))),
                )
                .order_by(routes::ORDINAL),
        )?;

        let mut result = Vec::new();
        for feed in &feeds {
            let Some(nodes) = hosts.get(&feed.platform_id) else {
                continue;
            };
            for node in nodes {
                for route in candidates.iter().filter(|r| self.applies(r, start_node, node)) {
                    result.push(self.feed_route(feed, node, route, start_node));
                }
            }
        }

        result.sort_by(|a, b| {
            (&a.task_id, &a.platform_id, &a.system_id, &a.feed_id, &a.end_node_id, a.ordinal).cmp(
                &(&b.task_id, &b.platform_id, &b.system_id, &b.feed_id, &b.end_node_id, b.ordinal),
            )
        });
        tracing::debug!(
            "{} feed route(s) from {} for {}/{}/{}/{}",
            result.len(),
            start_node,
            selector.task_id,
            selector.platform_id,
            selector.system_id,
            selector.feed_id
        );
        Ok(result)
    }

    /// Whether `route` leads from `start_node` to a feed hosted on `node`.
    fn applies(&self, route: &Route, start_node: &str, node: &str) -> bool {
        let wildcard_pair = route.start_node == WILDCARD && route.end_node == WILDCARD;
        (node == self.root_node && wildcard_pair)
            || (route.start_node == start_node && route.end_node == node)
            || wildcard_pair
    }

    fn feed_route(
        &self,
        feed: &Tracked<TaskService>,
        node: &str,
        route: &Route,
        start_node: &str,
    ) -> FeedRoutes {
        let descriptor = if route.is_wildcard() {
            synthesize_descriptor(start_node, node, &self.default_strategy)
        } else {
            route.route.clone()
        };
        FeedRoutes {
            task_id: feed.task_id.clone(),
            platform_id: feed.platform_id.clone(),
            system_id: feed.system_id.clone(),
            feed_id: feed.feed_id.clone(),
            end_node_id: node.to_string(),
            ordinal: route.ordinal,
            route: descriptor,
        }
    }
}
