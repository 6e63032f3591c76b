// Neighbour edges between nodes

use super::{require, Entity, RegistryError};
use crate::store::schema::neighbours as col;
use crate::store::{Predicate, Row, Select, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) const BY_NODE: &str = "by_node";
pub(crate) const AVAILABLE_ENTRIES: &str = "available_entries";

/// How an edge became known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscoveredBy {
    /// Configured by an operator
    Static,
    /// Found at runtime
    Dynamic,
}

impl DiscoveredBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveredBy::Static => "STATIC",
            DiscoveredBy::Dynamic => "DYNAMIC",
        }
    }
}

impl fmt::Display for DiscoveredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveredBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STATIC" => Ok(DiscoveredBy::Static),
            "DYNAMIC" => Ok(DiscoveredBy::Dynamic),
            other => Err(format!("unknown discovery kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "AVAILABLE",
            Availability::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Availability::Available),
            "UNAVAILABLE" => Ok(Availability::Unavailable),
            other => Err(format!("unknown availability '{}'", other)),
        }
    }
}

/// Directed adjacency from `node_id` to `neighbour_id` over an interface
/// pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeNeighbour {
    pub node_id: String,
    pub node_interface: String,
    pub neighbour_id: String,
    pub neighbour_interface: String,
    pub discovered_by: Option<DiscoveredBy>,
    pub availability: Option<Availability>,
    pub bearer_id: Option<String>,
    pub connection_attributes: Option<String>,
    pub connection_attributes_uri: Option<String>,
}

impl NodeNeighbour {
    pub fn new(
        node_id: impl Into<String>,
        node_interface: impl Into<String>,
        neighbour_id: impl Into<String>,
        neighbour_interface: impl Into<String>,
        discovered_by: DiscoveredBy,
        availability: Availability,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_interface: node_interface.into(),
            neighbour_id: neighbour_id.into(),
            neighbour_interface: neighbour_interface.into(),
            discovered_by: Some(discovered_by),
            availability: Some(availability),
            ..Default::default()
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == Some(Availability::Available)
    }
}

fn parse_column<T: FromStr<Err = String>>(row: &Row, column: &str) -> Option<T> {
    let raw = row.get_string(column)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring {} on neighbour row: {}", column, e);
            None
        }
    }
}

impl Entity for NodeNeighbour {
    const TABLE: Table = Table::NodeNeighbours;
    const KIND: &'static str = "node neighbour";

    fn from_row(row: &Row) -> Self {
        Self {
            node_id: row.get_string(col::NODE_ID).unwrap_or_default(),
            node_interface: row.get_string(col::NODE_INTERFACE).unwrap_or_default(),
            neighbour_id: row.get_string(col::NEIGHBOUR_ID).unwrap_or_default(),
            neighbour_interface: row.get_string(col::NEIGHBOUR_INTERFACE).unwrap_or_default(),
            discovered_by: parse_column(row, col::DISCOVEREDBY),
            availability: parse_column(row, col::AVAILABILITY),
            bearer_id: row.get_string(col::BEARER_ID),
            connection_attributes: row.get_string(col::CONNECTION_ATTRIBUTES),
            connection_attributes_uri: row.get_string(col::CONNECTION_ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::NODE_ID, &self.node_id)
            .with(col::NODE_INTERFACE, &self.node_interface)
            .with(col::NEIGHBOUR_ID, &self.neighbour_id)
            .with(col::NEIGHBOUR_INTERFACE, &self.neighbour_interface)
            .with(col::DISCOVEREDBY, self.discovered_by.map(|d| d.as_str()))
            .with(col::AVAILABILITY, self.availability.map(|a| a.as_str()))
            .with(col::BEARER_ID, self.bearer_id.clone())
            .with(col::CONNECTION_ATTRIBUTES, self.connection_attributes.clone())
            .with(col::CONNECTION_ATTRIBUTES_URI, self.connection_attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "node id", &self.node_id)?;
        require(Self::KIND, "neighbour id", &self.neighbour_id)?;
        require(Self::KIND, "neighbour interface", &self.neighbour_interface)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || {
            Select::from(Table::NodeNeighbours)
                .order_by(col::NEIGHBOUR_ID)
                .order_by(col::NEIGHBOUR_INTERFACE)
                .order_by(col::NODE_INTERFACE)
        };
        vec![
            (BY_NODE, base().filter(Predicate::eq_param(col::NODE_ID, 0))),
            (
                AVAILABLE_ENTRIES,
                base().filter(Predicate::all([
                    Predicate::eq_param(col::NODE_ID, 0),
                    Predicate::eq_param(col::NEIGHBOUR_ID, 1),
                    Predicate::eq(col::AVAILABILITY, Availability::Available.as_str()),
                ])),
            ),
        ]
    }
}
