//! Neighbour discovery state
//!
//! Tracks the directed edges between this node and its neighbours:
//! whether each edge was configured (STATIC) or found at runtime (DYNAMIC),
//! whether it is currently usable, and how to reach the far end.
//!
//! Bulk state transitions never fail loudly. A store failure is logged and
//! reported as `false`, meaning "state unchanged, try again later".

use crate::registry::neighbour::{AVAILABLE_ENTRIES, BY_NODE};
use crate::registry::{
    Availability, DiscoveredBy, NodeIpMapping, NodeNeighbour, RegistryError, Repository, Tracked,
};
use crate::store::schema::neighbours as col;
use crate::store::{Predicate, Row, Statement, Table};
use std::fmt;

/// State of one (node, interface, neighbour, interface) edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighbourState {
    /// No record of the edge
    Unknown,
    StaticAvailable,
    DynamicAvailable,
    Unavailable,
}

impl NeighbourState {
    pub fn of(edge: Option<&NodeNeighbour>) -> Self {
        let Some(edge) = edge else {
            return NeighbourState::Unknown;
        };
        match (edge.availability, edge.discovered_by) {
            (Some(Availability::Available), Some(DiscoveredBy::Static)) => {
                NeighbourState::StaticAvailable
            }
            (Some(Availability::Available), Some(DiscoveredBy::Dynamic)) => {
                NeighbourState::DynamicAvailable
            }
            // An available edge of unknown origin is treated as discovered
            (Some(Availability::Available), None) => NeighbourState::DynamicAvailable,
            _ => NeighbourState::Unavailable,
        }
    }
}

/// The far end of an edge as seen from the local node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighbourDescriptor {
    pub neighbour_id: String,
    pub interface: String,
}

impl NeighbourDescriptor {
    pub fn new(neighbour_id: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            neighbour_id: neighbour_id.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for NeighbourDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.neighbour_id, self.interface)
    }
}

pub struct NeighbourDiscovery {
    neighbours: Repository<NodeNeighbour>,
    ip_mappings: Repository<NodeIpMapping>,
}

impl NeighbourDiscovery {
    /// `ip_mappings` should be bound to the local scope.
    pub fn new(
        neighbours: Repository<NodeNeighbour>,
        ip_mappings: Repository<NodeIpMapping>,
    ) -> Self {
        Self {
            neighbours,
            ip_mappings,
        }
    }

    pub fn neighbours(&self) -> &Repository<NodeNeighbour> {
        &self.neighbours
    }

    // ------------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------------

    /// Record (or overwrite) an edge.
    pub fn record_neighbour(&self, edge: NodeNeighbour) -> Result<bool, RegistryError> {
        let mut edge = self.neighbours.create_with(edge);
        self.neighbours.save(&mut edge)
    }

    /// Mark every STATIC edge out of `node_id` AVAILABLE. Used when the
    /// node starts or recovers.
    pub fn mark_static_neighbours_as_available(&self, node_id: &str) -> bool {
        let statement = Statement::update(
            Table::NodeNeighbours,
            Row::new().with(col::AVAILABILITY, Availability::Available.as_str()),
            Predicate::eq(col::DISCOVEREDBY, DiscoveredBy::Static.as_str())
                .and(Predicate::eq(col::NODE_ID, node_id)),
        );
        let done = self.neighbours.execute_logged(&statement);
        if done {
            tracing::info!("Static neighbours of {} marked available", node_id);
        }
        done
    }

    /// Mark the edge from `node_id` to `neighbour` UNAVAILABLE. The record
    /// itself is kept.
    pub fn mark_unavailable(&self, node_id: &str, neighbour: &NeighbourDescriptor) -> bool {
        let statement = Statement::update(
            Table::NodeNeighbours,
            Row::new().with(col::AVAILABILITY, Availability::Unavailable.as_str()),
            Predicate::all([
                Predicate::eq(col::NODE_ID, node_id),
                Predicate::eq(col::NEIGHBOUR_ID, neighbour.neighbour_id.as_str()),
                Predicate::eq(col::NEIGHBOUR_INTERFACE, neighbour.interface.as_str()),
            ]),
        );
        let done = self.neighbours.execute_logged(&statement);
        if done {
            tracing::info!("Neighbour {} of {} marked unavailable", neighbour, node_id);
        }
        done
    }

    /// Remove every edge originating at `node_id`.
    pub fn delete_neighbours_for_node(&self, node_id: &str) -> bool {
        let statement = Statement::delete(
            Table::NodeNeighbours,
            Predicate::eq(col::NODE_ID, node_id),
        );
        self.neighbours.execute_logged(&statement)
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn get_all_neighbours(&self) -> Vec<Tracked<NodeNeighbour>> {
        self.neighbours.get_all()
    }

    /// Edges recorded for `id`.
    ///
    /// Matches on the edge's node id column, not the neighbour id, so this
    /// returns the edges leaving `id`.
    pub fn get_unique_neighbours_by_neighbour_id(&self, id: &str) -> Vec<Tracked<NodeNeighbour>> {
        self.neighbours.find_or_empty(BY_NODE, &[id.into()])
    }

    /// AVAILABLE edges from `node_id` to `neighbour_id`, over any interface
    pub fn get_available_neighbours_entries(
        &self,
        node_id: &str,
        neighbour_id: &str,
    ) -> Vec<Tracked<NodeNeighbour>> {
        self.neighbours
            .find_or_empty(AVAILABLE_ENTRIES, &[node_id.into(), neighbour_id.into()])
    }

    /// Edges matching a raw filter fragment; failures propagate.
    pub fn get_neighbours(&self, predicate: &str) -> Result<Vec<Tracked<NodeNeighbour>>, RegistryError> {
        self.neighbours.get_by_predicate(predicate)
    }

    /// Transport endpoint for the far end of `edge`.
    pub fn get_ip_mapping_for_neighbour(
        &self,
        edge: &NodeNeighbour,
    ) -> Option<Tracked<NodeIpMapping>> {
        self.ip_mappings
            .get_mapping_for_node(&edge.neighbour_id, &edge.neighbour_interface)
    }

    pub fn state_of(
        &self,
        node_id: &str,
        node_interface: &str,
        neighbour_id: &str,
        neighbour_interface: &str,
    ) -> NeighbourState {
        let edge = self.neighbours.get_by_key(&[
            node_id.into(),
            node_interface.into(),
            neighbour_id.into(),
            neighbour_interface.into(),
        ]);
        NeighbourState::of(edge.as_deref())
    }
}
