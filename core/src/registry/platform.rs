// Platforms: hosts of systems, each placed on a node

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::platforms as col;
use crate::store::{Predicate, Row, Select, Table};

const BY_ID: &str = "by_id";
const BY_NODE: &str = "by_node";
const BY_TYPE: &str = "by_type";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Platform {
    pub id: String,
    pub type_id: String,
    /// Node the platform is attached to
    pub node_id: String,
    pub affiliation: Option<String>,
    pub credentials: Option<String>,
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

impl Platform {
    pub fn new(
        id: impl Into<String>,
        type_id: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            node_id: node_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for Platform {
    const TABLE: Table = Table::Platforms;
    const KIND: &'static str = "platform";

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_string(col::PLATFORM_ID).unwrap_or_default(),
            type_id: row.get_string(col::TYPE_ID).unwrap_or_default(),
            node_id: row.get_string(col::NODE_ID).unwrap_or_default(),
            affiliation: row.get_string(col::AFFILIATION),
            credentials: row.get_string(col::CREDENTIALS),
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
            .with(col::PLATFORM_ID, &self.id)
            .with(col::TYPE_ID, &self.type_id)
            .with(col::NODE_ID, &self.node_id)
            .with(col::AFFILIATION, self.affiliation.clone())
            .with(col::CREDENTIALS, self.credentials.clone())
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
        require(Self::KIND, "type id", &self.type_id)?;
        require(Self::KIND, "node id", &self.node_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || Select::from(Table::Platforms).order_by(col::PLATFORM_ID);
        vec![
            (BY_ID, base().filter(Predicate::eq_param(col::PLATFORM_ID, 0))),
            (BY_NODE, base().filter(Predicate::eq_param(col::NODE_ID, 0))),
            (BY_TYPE, base().filter(Predicate::eq_param(col::TYPE_ID, 0))),
        ]
    }
}

impl Repository<Platform> {
    pub fn get_by_id(&self, id: &str) -> Option<Tracked<Platform>> {
        self.find_or_empty(BY_ID, &[id.into()]).into_iter().next()
    }

    /// Platforms attached to `node_id`
    pub fn get_by_node(&self, node_id: &str) -> Vec<Tracked<Platform>> {
        self.find_or_empty(BY_NODE, &[node_id.into()])
    }

    pub fn get_by_type(&self, type_id: &str) -> Vec<Tracked<Platform>> {
        self.find_or_empty(BY_TYPE, &[type_id.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Scope, TableStore};
    use std::sync::Arc;

    #[test]
    fn test_platform_finders() {
        let repo: Repository<Platform> =
            Repository::new(Arc::new(TableStore::memory()), Scope::Local);
        for platform in [
            Platform::new("p1", "sensor", "n1"),
            Platform::new("p2", "sensor", "n2"),
            Platform::new("p3", "camera", "n1"),
        ] {
            repo.save(&mut repo.create_with(platform)).unwrap();
        }

        assert_eq!(repo.get_by_id("p2").unwrap().node_id, "n2");
        let on_n1: Vec<String> = repo.get_by_node("n1").iter().map(|p| p.id.clone()).collect();
        assert_eq!(on_n1, vec!["p1", "p3"]);
        assert_eq!(repo.get_by_type("sensor").len(), 2);
    }

    #[test]
    fn test_platform_requires_node() {
        assert!(Platform::new("p1", "sensor", "").validate().is_err());
    }
}
