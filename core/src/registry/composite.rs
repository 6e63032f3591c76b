// Composite services and the systems they are assembled from

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::{composite_parts, composite_services};
use crate::store::{Predicate, Row, Select, Table};

const BY_ID: &str = "by_id";
const BY_TYPE: &str = "by_type";
const PARTS_FOR: &str = "parts_for";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeService {
    pub id: String,
    pub type_id: Option<String>,
    pub affiliation: Option<String>,
    pub credentials: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<String>,
    pub attributes_uri: Option<String>,
}

impl CompositeService {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for CompositeService {
    const TABLE: Table = Table::CompositeServices;
    const KIND: &'static str = "composite service";

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_string(composite_services::ID).unwrap_or_default(),
            type_id: row.get_string(composite_services::TYPE),
            affiliation: row.get_string(composite_services::AFFILIATION),
            credentials: row.get_string(composite_services::CREDENTIALS),
            description: row.get_string(composite_services::DESCRIPTION),
            attributes: row.get_string(composite_services::ATTRIBUTES),
            attributes_uri: row.get_string(composite_services::ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(composite_services::ID, &self.id)
            .with(composite_services::TYPE, self.type_id.clone())
            .with(composite_services::AFFILIATION, self.affiliation.clone())
            .with(composite_services::CREDENTIALS, self.credentials.clone())
            .with(composite_services::DESCRIPTION, self.description.clone())
            .with(composite_services::ATTRIBUTES, self.attributes.clone())
            .with(composite_services::ATTRIBUTES_URI, self.attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "id", &self.id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || Select::from(Table::CompositeServices).order_by(composite_services::ID);
        vec![
            (BY_ID, base().filter(Predicate::eq_param(composite_services::ID, 0))),
            (BY_TYPE, base().filter(Predicate::eq_param(composite_services::TYPE, 0))),
        ]
    }
}

impl Repository<CompositeService> {
    pub fn get_by_id(&self, id: &str) -> Option<Tracked<CompositeService>> {
        self.find_or_empty(BY_ID, &[id.into()]).into_iter().next()
    }

    pub fn get_by_type(&self, type_id: &str) -> Vec<Tracked<CompositeService>> {
        self.find_or_empty(BY_TYPE, &[type_id.into()])
    }
}

/// Membership of a system in a composite service
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositePart {
    pub composite_id: String,
    pub platform_id: String,
    pub system_id: String,
    pub attributes: Option<String>,
    pub attributes_uri: Option<String>,
}

impl CompositePart {
    pub fn new(
        composite_id: impl Into<String>,
        platform_id: impl Into<String>,
        system_id: impl Into<String>,
    ) -> Self {
        Self {
            composite_id: composite_id.into(),
            platform_id: platform_id.into(),
            system_id: system_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for CompositePart {
    const TABLE: Table = Table::CompositeParts;
    const KIND: &'static str = "composite part";

    fn from_row(row: &Row) -> Self {
        Self {
            composite_id: row
                .get_string(composite_parts::COMPOSITE_ID)
                .unwrap_or_default(),
            platform_id: row
                .get_string(composite_parts::SERVICE_PLATFORM_ID)
                .unwrap_or_default(),
            system_id: row.get_string(composite_parts::SERVICE_ID).unwrap_or_default(),
            attributes: row.get_string(composite_parts::ATTRIBUTES),
            attributes_uri: row.get_string(composite_parts::ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(composite_parts::COMPOSITE_ID, &self.composite_id)
            .with(composite_parts::SERVICE_PLATFORM_ID, &self.platform_id)
            .with(composite_parts::SERVICE_ID, &self.system_id)
            .with(composite_parts::ATTRIBUTES, self.attributes.clone())
            .with(composite_parts::ATTRIBUTES_URI, self.attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "composite id", &self.composite_id)?;
        require(Self::KIND, "platform id", &self.platform_id)?;
        require(Self::KIND, "system id", &self.system_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        vec![(
            PARTS_FOR,
            Select::from(Table::CompositeParts)
                .filter(Predicate::eq_param(composite_parts::COMPOSITE_ID, 0))
                .order_by(composite_parts::SERVICE_PLATFORM_ID)
                .order_by(composite_parts::SERVICE_ID),
        )]
    }
}

impl Repository<CompositePart> {
    pub fn get_parts_for(&self, composite_id: &str) -> Vec<Tracked<CompositePart>> {
        self.find_or_empty(PARTS_FOR, &[composite_id.into()])
    }

    pub fn get_by_id(
        &self,
        composite_id: &str,
        platform_id: &str,
        system_id: &str,
    ) -> Option<Tracked<CompositePart>> {
        self.get_by_key(&[composite_id.into(), platform_id.into(), system_id.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RegistryStore, Scope, TableStore};
    use std::sync::Arc;

    #[test]
    fn test_composite_lookups() {
        let store: Arc<dyn RegistryStore> = Arc::new(TableStore::memory());
        let services: Repository<CompositeService> = Repository::new(store.clone(), Scope::Local);
        let parts: Repository<CompositePart> = Repository::new(store, Scope::Local);

        let mut weather = CompositeService::new("weather");
        weather.type_id = Some("aggregate".into());
        services.save(&mut services.create_with(weather)).unwrap();
        for part in [
            CompositePart::new("weather", "p1", "thermo"),
            CompositePart::new("weather", "p2", "wind"),
            CompositePart::new("traffic", "p3", "camera"),
        ] {
            parts.save(&mut parts.create_with(part)).unwrap();
        }

        assert!(services.get_by_id("weather").is_some());
        assert_eq!(services.get_by_type("aggregate").len(), 1);
        assert_eq!(parts.get_parts_for("weather").len(), 2);
        assert!(parts.get_by_id("traffic", "p3", "camera").is_some());
        assert!(parts.get_by_id("traffic", "p3", "wind").is_none());
    }
}
