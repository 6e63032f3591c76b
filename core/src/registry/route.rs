// Routes: ranked path descriptors between pairs of nodes

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::routes as col;
use crate::store::{Predicate, Row, Select, Table};

/// Start/end value meaning "any node"
pub const WILDCARD: &str = "*";

const BY_START: &str = "by_start";
const FOR_PAIR: &str = "for_pair";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub start_node: String,
    pub end_node: String,
    /// Rank among routes for the same pair; lower is preferred
    pub ordinal: i64,
    pub route: String,
}

impl Route {
    pub fn new(
        start_node: impl Into<String>,
        end_node: impl Into<String>,
        ordinal: i64,
        route: impl Into<String>,
    ) -> Self {
        Self {
            start_node: start_node.into(),
            end_node: end_node.into(),
            ordinal,
            route: route.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.start_node == WILDCARD
    }
}

/// Descriptor to use for a wildcard row matched on behalf of
/// `target_start` → `target_end`: local delivery when both are the same
/// node, otherwise deferred to the named strategy.
pub(crate) fn synthesize_descriptor(
    target_start: &str,
    target_end: &str,
    default_strategy: &str,
) -> String {
    if target_start == target_end {
        format!("nodes={}", target_start)
    } else {
        format!("factory={}", default_strategy)
    }
}

impl Entity for Route {
    const TABLE: Table = Table::Routes;
    const KIND: &'static str = "route";

    fn from_row(row: &Row) -> Self {
        Self {
            start_node: row.get_string(col::START_NODE_ID).unwrap_or_default(),
            end_node: row.get_string(col::END_NODE_ID).unwrap_or_default(),
            ordinal: row.get_i64(col::ORDINAL).unwrap_or_default(),
            route: row.get_string(col::ROUTE).unwrap_or_default(),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::START_NODE_ID, &self.start_node)
            .with(col::END_NODE_ID, &self.end_node)
            .with(col::ORDINAL, self.ordinal)
            .with(col::ROUTE, &self.route)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "start node", &self.start_node)?;
        require(Self::KIND, "end node", &self.end_node)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let wildcard_pair = Predicate::eq(col::START_NODE_ID, WILDCARD)
            .and(Predicate::eq(col::END_NODE_ID, WILDCARD));
        let exact_pair = Predicate::eq_param(col::START_NODE_ID, 0)
            .and(Predicate::eq_param(col::END_NODE_ID, 1));
        vec![
            (
                BY_START,
                Select::from(Table::Routes)
                    .filter(Predicate::eq_param(col::START_NODE_ID, 0))
                    .order_by(col::END_NODE_ID)
                    .order_by(col::ORDINAL),
            ),
            (
                FOR_PAIR,
                Select::from(Table::Routes)
                    .filter(exact_pair.or(wildcard_pair))
                    .order_by(col::ORDINAL),
            ),
        ]
    }
}

impl Repository<Route> {
    pub fn get_all_routes(&self) -> Vec<Tracked<Route>> {
        self.get_all()
    }

    pub fn get_routes_by_start_node(&self, start_node: &str) -> Vec<Tracked<Route>> {
        self.find_or_empty(BY_START, &[start_node.into()])
    }

    /// Candidate routes from `start` to `end`, most preferred first.
    ///
    /// Rows for the `*`→`*` pair always match. Their descriptor is replaced
    /// before the shadow is taken: `nodes=<start>` when `start == end`,
    /// otherwise `factory=<default_strategy>`.
    pub fn get_routes(
        &self,
        start: &str,
        end: &str,
        default_strategy: &str,
    ) -> Result<Vec<Tracked<Route>>, RegistryError> {
        let routes = self.find(FOR_PAIR, &[start.into(), end.into()])?;
        Ok(routes
            .into_iter()
            .map(|mut route| {
                if route.is_wildcard() {
                    route.route = synthesize_descriptor(start, end, default_strategy);
                    route.snapshot();
                }
                route
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Scope, TableStore};
    use std::sync::Arc;

    fn repo_with(routes: &[Route]) -> Repository<Route> {
        let repo = Repository::new(Arc::new(TableStore::memory()), Scope::Local);
        for route in routes {
            assert!(repo.save(&mut repo.create_with(route.clone())).unwrap());
        }
        repo
    }

    #[test]
    fn test_get_routes_orders_by_ordinal() {
        let repo = repo_with(&[
            Route::new("a", "b", 3, "nodes=a,x,b"),
            Route::new("a", "b", 1, "nodes=a,b"),
            Route::new("a", "b", 2, "nodes=a,y,b"),
            Route::new("a", "c", 0, "nodes=a,c"),
        ]);
        let ordinals: Vec<i64> = repo
            .get_routes("a", "b", "DynamicRouting")
            .unwrap()
            .iter()
            .map(|r| r.ordinal)
            .collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn test_wildcard_row_is_synthesized() {
        let repo = repo_with(&[Route::new("*", "*", 5, "nodes=ignored")]);

        let local = repo.get_routes("n1", "n1", "DynamicRouting").unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].route, "nodes=n1");
        assert!(!local[0].has_changed());

        let remote = repo.get_routes("n2", "n1", "DynamicRouting").unwrap();
        assert_eq!(remote[0].route, "factory=DynamicRouting");
        assert_eq!(remote[0].start_node, "*");
    }

    #[test]
    fn test_routes_by_start_node() {
        let repo = repo_with(&[
            Route::new("a", "c", 2, "nodes=a,c"),
            Route::new("a", "b", 1, "nodes=a,b"),
            Route::new("b", "a", 1, "nodes=b,a"),
        ]);
        let ends: Vec<String> = repo
            .get_routes_by_start_node("a")
            .iter()
            .map(|r| r.end_node.clone())
            .collect();
        assert_eq!(ends, vec!["b", "c"]);
        assert_eq!(repo.get_all_routes().len(), 3);
    }

    #[test]
    fn test_synthesize_descriptor() {
        assert_eq!(synthesize_descriptor("x", "x", "S"), "nodes=x");
        assert_eq!(synthesize_descriptor("x", "y", "S"), "factory=S");
    }
}
