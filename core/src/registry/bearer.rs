// Bearers: transport media a neighbour edge runs over

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::bearers as col;
use crate::store::{Predicate, Row, Select, Table};

const BY_ID: &str = "by_id";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bearer {
    pub id: String,
    pub available: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<String>,
    pub attributes_uri: Option<String>,
}

impl Bearer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for Bearer {
    const TABLE: Table = Table::Bearers;
    const KIND: &'static str = "bearer";

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_string(col::BEARER_ID).unwrap_or_default(),
            available: row.get_string(col::AVAILABLE),
            description: row.get_string(col::DESCRIPTION),
            attributes: row.get_string(col::ATTRIBUTES),
            attributes_uri: row.get_string(col::ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::BEARER_ID, &self.id)
            .with(col::AVAILABLE, self.available.clone())
            .with(col::DESCRIPTION, self.description.clone())
            .with(col::ATTRIBUTES, self.attributes.clone())
            .with(col::ATTRIBUTES_URI, self.attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "id", &self.id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        vec![(
            BY_ID,
            Select::from(Table::Bearers).filter(Predicate::eq_param(col::BEARER_ID, 0)),
        )]
    }
}

impl Repository<Bearer> {
    pub fn get_by_id(&self, id: &str) -> Option<Tracked<Bearer>> {
        self.find_or_empty(BY_ID, &[id.into()]).into_iter().next()
    }
}
