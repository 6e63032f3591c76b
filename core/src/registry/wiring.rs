// Wiring between system interfaces inside a composite service

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::service_wiring as col;
use crate::store::{Predicate, Row, Select, Table};

const WIRING_FOR: &str = "wiring_for";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemWiring {
    pub composite_id: String,
    pub from_platform_id: String,
    pub from_system_id: String,
    pub from_interface_id: String,
    pub to_platform_id: String,
    pub to_system_id: String,
    pub to_interface_id: String,
    pub attributes: Option<String>,
    pub attributes_uri: Option<String>,
}

impl SystemWiring {
    /// Wire `from` (platform, system, interface) to `to` inside a composite.
    pub fn new(
        composite_id: impl Into<String>,
        from: (&str, &str, &str),
        to: (&str, &str, &str),
    ) -> Self {
        Self {
            composite_id: composite_id.into(),
            from_platform_id: from.0.to_string(),
            from_system_id: from.1.to_string(),
            from_interface_id: from.2.to_string(),
            to_platform_id: to.0.to_string(),
            to_system_id: to.1.to_string(),
            to_interface_id: to.2.to_string(),
            ..Default::default()
        }
    }
}

impl Entity for SystemWiring {
    const TABLE: Table = Table::ServiceWiring;
    const KIND: &'static str = "system wiring";

    fn from_row(row: &Row) -> Self {
        let text = |column: &str| row.get_string(column).unwrap_or_default();
        Self {
            composite_id: text(col::COMPOSITE_ID),
            from_platform_id: text(col::FROM_SERVICE_PLATFORM_ID),
            from_system_id: text(col::FROM_SERVICE_ID),
            from_interface_id: text(col::FROM_INTERFACE_ID),
            to_platform_id: text(col::TO_SERVICE_PLATFORM_ID),
            to_system_id: text(col::TO_SERVICE_ID),
            to_interface_id: text(col::TO_INTERFACE_ID),
            attributes: row.get_string(col::ATTRIBUTES),
            attributes_uri: row.get_string(col::ATTRIBUTES_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::COMPOSITE_ID, &self.composite_id)
            .with(col::FROM_SERVICE_PLATFORM_ID, &self.from_platform_id)
            .with(col::FROM_SERVICE_ID, &self.from_system_id)
            .with(col::FROM_INTERFACE_ID, &self.from_interface_id)
            .with(col::TO_SERVICE_PLATFORM_ID, &self.to_platform_id)
            .with(col::TO_SERVICE_ID, &self.to_system_id)
            .with(col::TO_INTERFACE_ID, &self.to_interface_id)
            .with(col::ATTRIBUTES, self.attributes.clone())
            .with(col::ATTRIBUTES_URI, self.attributes_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "composite id", &self.composite_id)?;
        require(Self::KIND, "from platform id", &self.from_platform_id)?;
        require(Self::KIND, "from system id", &self.from_system_id)?;
        require(Self::KIND, "from interface id", &self.from_interface_id)?;
        require(Self::KIND, "to platform id", &self.to_platform_id)?;
        require(Self::KIND, "to system id", &self.to_system_id)?;
        require(Self::KIND, "to interface id", &self.to_interface_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        vec![(
            WIRING_FOR,
            Select::from(Table::ServiceWiring)
                .filter(Predicate::eq_param(col::COMPOSITE_ID, 0))
                .order_by(col::FROM_SERVICE_PLATFORM_ID)
                .order_by(col::FROM_SERVICE_ID)
                .order_by(col::FROM_INTERFACE_ID),
        )]
    }
}

impl Repository<SystemWiring> {
    pub fn get_wiring_for(&self, composite_id: &str) -> Vec<Tracked<SystemWiring>> {
        self.find_or_empty(WIRING_FOR, &[composite_id.into()])
    }
}
