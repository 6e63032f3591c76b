//! Default dynamic routing strategy: fewest hops over the mesh topology.
//!
//! The graph is rebuilt from the registry on every call:
//! - vertices are the nodes whose availability is AVAILABLE
//! - edges are AVAILABLE neighbour records between two such nodes
//!
//! Equal-length paths are broken by neighbour id order, so the same
//! topology always yields the same path.

use super::{RouteError, RoutingStrategy};
use crate::registry::{Node, NodeNeighbour, Repository};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

pub struct ShortestPathStrategy {
    nodes: Repository<Node>,
    neighbours: Repository<NodeNeighbour>,
}

impl ShortestPathStrategy {
    pub fn new(nodes: Repository<Node>, neighbours: Repository<NodeNeighbour>) -> Self {
        Self { nodes, neighbours }
    }

    fn topology(&self) -> BTreeMap<String, BTreeSet<String>> {
        let available: HashSet<String> = self
            .nodes
            .get_available()
            .into_iter()
            .map(|node| node.into_inner().id)
            .collect();

        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in self.neighbours.get_all() {
            if edge.is_available()
                && available.contains(&edge.node_id)
                && available.contains(&edge.neighbour_id)
            {
                graph
                    .entry(edge.node_id.clone())
                    .or_default()
                    .insert(edge.neighbour_id.clone());
            }
        }
        graph
    }
}

/// Breadth-first search from `start`; `None` if `end` is unreachable.
fn shortest_path(
    graph: &BTreeMap<String, BTreeSet<String>>,
    start: &str,
    end: &str,
) -> Option<Vec<String>> {
    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        if current == end {
            let mut path = vec![end.to_string()];
            let mut hop = end;
            while let Some(&prev) = previous.get(hop) {
                path.push(prev.to_string());
                hop = prev;
            }
            path.reverse();
            return Some(path);
        }
        let Some(next_hops) = graph.get(current) else {
            continue;
        };
        for next in next_hops {
            if visited.insert(next.as_str()) {
                previous.insert(next.as_str(), current);
                queue.push_back(next.as_str());
            }
        }
    }
    None
}

impl RoutingStrategy for ShortestPathStrategy {
    fn route_nodes(&self, start: &str, end: &str) -> Result<Vec<String>, RouteError> {
        if start == end {
            return Ok(vec![start.to_string()]);
        }
        let graph = self.topology();
        match shortest_path(&graph, start, end) {
            Some(path) => {
                tracing::debug!("Shortest path {} -> {}: {}", start, end, path.join(","));
                Ok(path)
            }
            None => {
                tracing::debug!("No path from {} to {} in current topology", start, end);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Availability, DiscoveredBy};
    use crate::store::{RegistryStore, Scope, TableStore};
    use std::sync::Arc;

    struct Mesh {
        nodes: Repository<Node>,
        neighbours: Repository<NodeNeighbour>,
    }

    impl Mesh {
        fn new() -> Self {
            let store: Arc<dyn RegistryStore> = Arc::new(TableStore::memory());
            Self {
                nodes: Repository::new(store.clone(), Scope::Distributed),
                neighbours: Repository::new(store, Scope::Distributed),
            }
        }

        fn node(&self, id: &str, available: bool) -> &Self {
            let mut node = Node::new(id, "broker");
            if available {
                node.availability = Some(crate::registry::node::AVAILABLE.into());
            }
            self.nodes.save(&mut self.nodes.create_with(node)).unwrap();
            self
        }

        fn link(&self, from: &str, to: &str, availability: Availability) -> &Self {
            for (a, b) in [(from, to), (to, from)] {
                let edge =
                    NodeNeighbour::new(a, "eth0", b, "eth0", DiscoveredBy::Static, availability);
                self.neighbours
                    .save(&mut self.neighbours.create_with(edge))
                    .unwrap();
            }
            self
        }

        fn strategy(&self) -> ShortestPathStrategy {
            ShortestPathStrategy::new(self.nodes.clone(), self.neighbours.clone())
        }
    }

    #[test]
    fn test_fewest_hops_wins() {
        let mesh = Mesh::new();
        for id in ["a", "b", "c", "d"] {
            mesh.node(id, true);
        }
        mesh.link("a", "b", Availability::Available)
            .link("b", "c", Availability::Available)
            .link("c", "d", Availability::Available)
            .link("a", "d", Availability::Available);

        let path = mesh.strategy().route_nodes("a", "d").unwrap();
        assert_eq!(path, vec!["a", "d"]);
        let path = mesh.strategy().route_nodes("a", "c").unwrap();
        assert_eq!(path, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tie_broken_by_neighbour_id() {
        let mesh = Mesh::new();
        for id in ["s", "m2", "m1", "t"] {
            mesh.node(id, true);
        }
        mesh.link("s", "m2", Availability::Available)
            .link("s", "m1", Availability::Available)
            .link("m2", "t", Availability::Available)
            .link("m1", "t", Availability::Available);

        assert_eq!(
            mesh.strategy().route_nodes("s", "t").unwrap(),
            vec!["s", "m1", "t"]
        );
    }

    #[test]
    fn test_unavailable_nodes_and_edges_are_skipped() {
        let mesh = Mesh::new();
        mesh.node("a", true).node("b", false).node("c", true).node("d", true);
        mesh.link("a", "b", Availability::Available)
            .link("b", "c", Availability::Available)
            .link("a", "d", Availability::Unavailable)
            .link("d", "c", Availability::Available);

        assert!(mesh.strategy().route_nodes("a", "c").unwrap().is_empty());
    }

    #[test]
    fn test_same_node_is_local() {
        let mesh = Mesh::new();
        assert_eq!(mesh.strategy().route_nodes("a", "a").unwrap(), vec!["a"]);
    }
}
