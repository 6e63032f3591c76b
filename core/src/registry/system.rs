// Systems (services) running on a platform

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::services as col;
use crate::store::{Predicate, Row, Select, Table};

const BY_ID: &str = "by_id";
const BY_PLATFORM: &str = "by_platform";
const BY_TYPE: &str = "by_type";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct System {
    pub platform_id: String,
    pub id: String,
    pub type_id: String,
    pub kind: Option<String>,
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

impl System {
    pub fn new(
        platform_id: impl Into<String>,
        id: impl Into<String>,
        type_id: impl Into<String>,
    ) -> Self {
        Self {
            platform_id: platform_id.into(),
            id: id.into(),
            type_id: type_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for System {
    const TABLE: Table = Table::Services;
    const KIND: &'static str = "system";

    fn from_row(row: &Row) -> Self {
        Self {
            platform_id: row.get_string(col::PLATFORM_ID).unwrap_or_default(),
            id: row.get_string(col::ID).unwrap_or_default(),
            type_id: row.get_string(col::TYPE_ID).unwrap_or_default(),
            kind: row.get_string(col::KIND),
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
            .with(col::PLATFORM_ID, &self.platform_id)
            .with(col::ID, &self.id)
            .with(col::TYPE_ID, &self.type_id)
            .with(col::KIND, self.kind.clone())
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
        require(Self::KIND, "platform id", &self.platform_id)?;
        require(Self::KIND, "id", &self.id)?;
        require(Self::KIND, "type id", &self.type_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || {
            Select::from(Table::Services)
                .order_by(col::PLATFORM_ID)
                .order_by(col::ID)
        };
        vec![
            (
                BY_ID,
                base().filter(
                    Predicate::eq_param(col::PLATFORM_ID, 0).and(Predicate::eq_param(col::ID, 1)),
                ),
            ),
            (BY_PLATFORM, base().filter(Predicate::eq_param(col::PLATFORM_ID, 0))),
            (BY_TYPE, base().filter(Predicate::eq_param(col::TYPE_ID, 0))),
        ]
    }
}

impl Repository<System> {
    pub fn get_by_id(&self, platform_id: &str, id: &str) -> Option<Tracked<System>> {
        self.find_or_empty(BY_ID, &[platform_id.into(), id.into()])
            .into_iter()
            .next()
    }

    pub fn get_by_platform(&self, platform_id: &str) -> Vec<Tracked<System>> {
        self.find_or_empty(BY_PLATFORM, &[platform_id.into()])
    }

    pub fn get_by_type(&self, type_id: &str) -> Vec<Tracked<System>> {
        self.find_or_empty(BY_TYPE, &[type_id.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Scope, TableStore};
    use std::sync::Arc;

    #[test]
    fn test_system_finders() {
        let repo: Repository<System> =
            Repository::new(Arc::new(TableStore::memory()), Scope::Local);
        for system in [
            System::new("p1", "s1", "thermometer"),
            System::new("p1", "s2", "camera"),
            System::new("p2", "s1", "thermometer"),
        ] {
            repo.save(&mut repo.create_with(system)).unwrap();
        }

        assert_eq!(repo.get_by_id("p2", "s1").unwrap().type_id, "thermometer");
        assert!(repo.get_by_id("p2", "s2").is_none());
        assert_eq!(repo.get_by_platform("p1").len(), 2);
        assert_eq!(repo.get_by_type("thermometer").len(), 2);
    }
}
