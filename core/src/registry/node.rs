// Nodes: brokers participating in the mesh

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::nodes as col;
use crate::store::{Predicate, Row, Select, Table};

/// Availability value marking a node as reachable
pub const AVAILABLE: &str = "AVAILABLE";

const BY_ID: &str = "by_id";
const BY_TYPE: &str = "by_type";
const AVAILABLE_NODES: &str = "available";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub id: String,
    pub type_id: String,
    pub affiliation: Option<String>,
    pub security_classification: Option<String>,
    pub readiness: Option<String>,
    pub availability: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub bearing: Option<f64>,
    pub velocity: Option<f64>,
    pub description: Option<String>,
    pub attributes: Option<String>,
    pub attributes_uri: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            ..Default::default()
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability.as_deref() == Some(AVAILABLE)
    }
}

impl Entity for Node {
    const TABLE: Table = Table::Nodes;
    const KIND: &'static str = "node";

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_string(col::NODE_ID).unwrap_or_default(),
            type_id: row.get_string(col::TYPE_ID).unwrap_or_default(),
            affiliation: row.get_string(col::AFFILIATION),
            security_classification: row.get_string(col::SECURITY_CLASSIFICATION),
            readiness: row.get_string(col::READINESS),
            availability: row.get_string(col::AVAILABILITY),
            latitude: row.get_f64(col::LATITUDE),
            longitude: row.get_f64(col::LONGITUDE),
            altitude: row.get_f64(col::ALTITUDE),
            bearing: row.get_f64(col::BEARING),
            velocity: row.get_f64(col::VELOCITY),
            description: row.get_string(col::DESCRIPTION),
            attributes: row.get_string(col::ATTRIBUTES),
            attributes_uri: row.get_string(col::ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::NODE_ID, &self.id)
            .with(col::TYPE_ID, &self.type_id)
            .with(col::AFFILIATION, self.affiliation.clone())
            .with(col::SECURITY_CLASSIFICATION, self.security_classification.clone())
            .with(col::READINESS, self.readiness.clone())
            .with(col::AVAILABILITY, self.availability.clone())
            .with(col::LATITUDE, self.latitude)
            .with(col::LONGITUDE, self.longitude)
            .with(col::ALTITUDE, self.altitude)
            .with(col::BEARING, self.bearing)
            .with(col::VELOCITY, self.velocity)
            .with(col::DESCRIPTION, self.description.clone())
            .with(col::ATTRIBUTES, self.attributes.clone())
            .with(col::ATTRIBUTES_URI, self.attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "id", &self.id)?;
        require(Self::KIND, "type id", &self.type_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || Select::from(Table::Nodes).order_by(col::NODE_ID);
        vec![
            (BY_ID, base().filter(Predicate::eq_param(col::NODE_ID, 0))),
            (BY_TYPE, base().filter(Predicate::eq_param(col::TYPE_ID, 0))),
            (
                AVAILABLE_NODES,
                base().filter(Predicate::eq(col::AVAILABILITY, AVAILABLE)),
            ),
        ]
    }
}

impl Repository<Node> {
    pub fn get_by_id(&self, id: &str) -> Option<Tracked<Node>> {
        self.find_or_empty(BY_ID, &[id.into()]).into_iter().next()
    }

    pub fn get_by_type(&self, type_id: &str) -> Vec<Tracked<Node>> {
        self.find_or_empty(BY_TYPE, &[type_id.into()])
    }

    /// Nodes whose availability is `AVAILABLE`
    pub fn get_available(&self) -> Vec<Tracked<Node>> {
        self.find_or_empty(AVAILABLE_NODES, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Scope, TableStore};
    use std::sync::Arc;

    #[test]
    fn test_node_finders() {
        let repo: Repository<Node> = Repository::new(Arc::new(TableStore::memory()), Scope::Local);
        let mut a = Node::new("a", "broker");
        a.availability = Some(AVAILABLE.into());
        a.latitude = Some(51.5);
        let mut b = Node::new("b", "relay");
        b.availability = Some("UNAVAILABLE".into());
        for node in [a, b] {
            repo.save(&mut repo.create_with(node)).unwrap();
        }

        let a = repo.get_by_id("a").unwrap();
        assert_eq!(a.latitude, Some(51.5));
        assert!(a.is_available());
        assert_eq!(repo.get_by_type("relay").len(), 1);
        let available: Vec<String> = repo.get_available().iter().map(|n| n.id.clone()).collect();
        assert_eq!(available, vec!["a"]);
        assert!(repo.get_by_id("zzz").is_none());
    }
}
