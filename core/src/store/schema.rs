//! Registry table catalogue
//!
//! Each table has a fixed, ordered column list and a set of unique key
//! columns. The store enforces uniqueness on the key columns; repositories
//! use them to target updates and deletes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column added to rows returned through the distributed scope, naming the
/// node whose store produced the row.
pub const ORIGIN_NODE: &str = "ORIGIN_NODE";

pub mod nodes {
    pub const NODE_ID: &str = "NODE_ID";
    pub const TYPE_ID: &str = "TYPE_ID";
    pub const AFFILIATION: &str = "AFFILIATION";
    pub const SECURITY_CLASSIFICATION: &str = "SECURITY_CLASSIFICATION";
    pub const READINESS: &str = "READINESS";
    pub const AVAILABILITY: &str = "AVAILABILITY";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const ALTITUDE: &str = "ALTITUDE";
    pub const BEARING: &str = "BEARING";
    pub const VELOCITY: &str = "VELOCITY";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod neighbours {
    pub const NODE_ID: &str = "NODE_ID";
    pub const NODE_INTERFACE: &str = "NODE_INTERFACE";
    pub const NEIGHBOUR_ID: &str = "NEIGHBOUR_ID";
    pub const NEIGHBOUR_INTERFACE: &str = "NEIGHBOUR_INTERFACE";
    pub const DISCOVEREDBY: &str = "DISCOVEREDBY";
    pub const AVAILABILITY: &str = "AVAILABILITY";
    pub const BEARER_ID: &str = "BEARER_ID";
    pub const CONNECTION_ATTRIBUTES: &str = "CONNECTION_ATTRIBUTES";
    pub const CONNECTION_ATTRIBUTES_URI: &str = "CONNECTION_ATTRIBUTES_URI";
}

pub mod ip_mapping {
    pub const NODE_ID: &str = "NODE_ID";
    pub const NODE_INTERFACE: &str = "NODE_INTERFACE";
    pub const IP: &str = "IP";
    pub const PORT: &str = "PORT";
}

pub mod bearers {
    pub const BEARER_ID: &str = "BEARER_ID";
    pub const AVAILABLE: &str = "AVAILABLE";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod routes {
    pub const START_NODE_ID: &str = "START_NODE_ID";
    pub const END_NODE_ID: &str = "END_NODE_ID";
    pub const ORDINAL: &str = "ORDINAL";
    pub const ROUTE: &str = "ROUTE";
}

pub mod platforms {
    pub const PLATFORM_ID: &str = "PLATFORM_ID";
    pub const TYPE_ID: &str = "TYPE_ID";
    pub const NODE_ID: &str = "NODE_ID";
    pub const AFFILIATION: &str = "AFFILIATION";
    pub const CREDENTIALS: &str = "CREDENTIALS";
    pub const READINESS: &str = "READINESS";
    pub const AVAILABILITY: &str = "AVAILABILITY";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const ALTITUDE: &str = "ALTITUDE";
    pub const BEARING: &str = "BEARING";
    pub const VELOCITY: &str = "VELOCITY";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod services {
    pub const PLATFORM_ID: &str = "PLATFORM_ID";
    pub const ID: &str = "ID";
    pub const TYPE_ID: &str = "TYPE_ID";
    pub const KIND: &str = "KIND";
    pub const CREDENTIALS: &str = "CREDENTIALS";
    pub const READINESS: &str = "READINESS";
    pub const AVAILABILITY: &str = "AVAILABILITY";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const ALTITUDE: &str = "ALTITUDE";
    pub const BEARING: &str = "BEARING";
    pub const VELOCITY: &str = "VELOCITY";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod tasks {
    pub const TASK_ID: &str = "TASK_ID";
    pub const PRIORITY: &str = "PRIORITY";
    pub const AFFILIATION: &str = "AFFILIATION";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const DETAIL: &str = "DETAIL";
    pub const DETAIL_URI: &str = "DETAIL_URI";
}

pub mod task_services {
    pub const TASK_ID: &str = "TASK_ID";
    pub const PLATFORM_ID: &str = "PLATFORM_ID";
    pub const SERVICE_ID: &str = "SERVICE_ID";
    pub const DATA_FEED_ID: &str = "DATA_FEED_ID";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const CONFIGURATION_URI: &str = "CONFIGURATION_URI";
    pub const CONFIGURATION: &str = "CONFIGURATION";
}

pub mod task_subscriptions {
    pub const TASK_ID: &str = "TASK_ID";
    pub const ACTOR_ID: &str = "ACTOR_ID";
    pub const PLATFORM_ID: &str = "PLATFORM_ID";
    pub const SERVICE_ID: &str = "SERVICE_ID";
    pub const DATA_FEED_ID: &str = "DATA_FEED_ID";
    pub const ACTOR_PLATFORM_ID: &str = "ACTOR_PLATFORM_ID";
}

pub mod composite_services {
    pub const ID: &str = "ID";
    pub const TYPE: &str = "TYPE";
    pub const AFFILIATION: &str = "AFFILIATION";
    pub const CREDENTIALS: &str = "CREDENTIALS";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod composite_parts {
    pub const COMPOSITE_ID: &str = "COMPOSITE_ID";
    pub const SERVICE_PLATFORM_ID: &str = "SERVICE_PLATFORM_ID";
    pub const SERVICE_ID: &str = "SERVICE_ID";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

pub mod service_wiring {
    pub const COMPOSITE_ID: &str = "COMPOSITE_ID";
    pub const FROM_SERVICE_PLATFORM_ID: &str = "FROM_SERVICE_PLATFORM_ID";
    pub const FROM_SERVICE_ID: &str = "FROM_SERVICE_ID";
    pub const FROM_INTERFACE_ID: &str = "FROM_INTERFACE_ID";
    pub const TO_SERVICE_PLATFORM_ID: &str = "TO_SERVICE_PLATFORM_ID";
    pub const TO_SERVICE_ID: &str = "TO_SERVICE_ID";
    pub const TO_INTERFACE_ID: &str = "TO_INTERFACE_ID";
    pub const ATTRIBUTES: &str = "ATTRIBUTES";
    pub const ATTRIBUTES_URI: &str = "ATTRIBUTES_URI";
}

/// Tables held by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    Nodes,
    NodeNeighbours,
    NodeIpMapping,
    Bearers,
    Routes,
    Platforms,
    Services,
    Tasks,
    TaskServices,
    TaskSubscriptions,
    CompositeServices,
    CompositeParts,
    ServiceWiring,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Nodes,
        Table::NodeNeighbours,
        Table::NodeIpMapping,
        Table::Bearers,
        Table::Routes,
        Table::Platforms,
        Table::Services,
        Table::Tasks,
        Table::TaskServices,
        Table::TaskSubscriptions,
        Table::CompositeServices,
        Table::CompositeParts,
        Table::ServiceWiring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Nodes => "FABRIC.NODES",
            Table::NodeNeighbours => "FABRIC.NODE_NEIGHBOURS",
            Table::NodeIpMapping => "FABRIC.NODE_IP_MAPPING",
            Table::Bearers => "FABRIC.BEARERS",
            Table::Routes => "FABRIC.ROUTES",
            Table::Platforms => "FABRIC.PLATFORMS",
            Table::Services => "FABRIC.SERVICES",
            Table::Tasks => "FABRIC.TASKS",
            Table::TaskServices => "FABRIC.TASK_SERVICES",
            Table::TaskSubscriptions => "FABRIC.TASK_SUBSCRIPTIONS",
            Table::CompositeServices => "FABRIC.COMPOSITE_SERVICES",
            Table::CompositeParts => "FABRIC.COMPOSITE_PARTS",
            Table::ServiceWiring => "FABRIC.SERVICE_WIRING",
        }
    }

    /// Ordered column list
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Nodes => &[
                nodes::NODE_ID,
                nodes::TYPE_ID,
                nodes::AFFILIATION,
                nodes::SECURITY_CLASSIFICATION,
                nodes::READINESS,
                nodes::AVAILABILITY,
                nodes::LATITUDE,
                nodes::LONGITUDE,
                nodes::ALTITUDE,
                nodes::BEARING,
                nodes::VELOCITY,
                nodes::DESCRIPTION,
                nodes::ATTRIBUTES,
                nodes::ATTRIBUTES_URI,
            ],
            Table::NodeNeighbours => &[
                neighbours::NODE_ID,
                neighbours::NODE_INTERFACE,
                neighbours::NEIGHBOUR_ID,
                neighbours::NEIGHBOUR_INTERFACE,
                neighbours::DISCOVEREDBY,
                neighbours::AVAILABILITY,
                neighbours::BEARER_ID,
                neighbours::CONNECTION_ATTRIBUTES,
                neighbours::CONNECTION_ATTRIBUTES_URI,
            ],
            Table::NodeIpMapping => &[
                ip_mapping::NODE_ID,
                ip_mapping::NODE_INTERFACE,
                ip_mapping::IP,
                ip_mapping::PORT,
            ],
            Table::Bearers => &[
                bearers::BEARER_ID,
                bearers::AVAILABLE,
                bearers::DESCRIPTION,
                bearers::ATTRIBUTES,
                bearers::ATTRIBUTES_URI,
            ],
            Table::Routes => &[
                routes::START_NODE_ID,
                routes::END_NODE_ID,
                routes::ORDINAL,
                routes::ROUTE,
            ],
            Table::Platforms => &[
                platforms::PLATFORM_ID,
                platforms::TYPE_ID,
                platforms::NODE_ID,
                platforms::AFFILIATION,
                platforms::CREDENTIALS,
                platforms::READINESS,
                platforms::AVAILABILITY,
                platforms::LATITUDE,
                platforms::LONGITUDE,
                platforms::ALTITUDE,
                platforms::BEARING,
                platforms::VELOCITY,
                platforms::DESCRIPTION,
                platforms::ATTRIBUTES,
                platforms::ATTRIBUTES_URI,
            ],
            Table::Services => &[
                services::PLATFORM_ID,
                services::ID,
                services::TYPE_ID,
                services::KIND,
                services::CREDENTIALS,
                services::READINESS,
                services::AVAILABILITY,
                services::LATITUDE,
                services::LONGITUDE,
                services::ALTITUDE,
                services::BEARING,
                services::VELOCITY,
                services::DESCRIPTION,
                services::ATTRIBUTES,
                services::ATTRIBUTES_URI,
            ],
            Table::Tasks => &[
                tasks::TASK_ID,
                tasks::PRIORITY,
                tasks::AFFILIATION,
                tasks::DESCRIPTION,
                tasks::DETAIL,
                tasks::DETAIL_URI,
            ],
            Table::TaskServices => &[
                task_services::TASK_ID,
                task_services::PLATFORM_ID,
                task_services::SERVICE_ID,
                task_services::DATA_FEED_ID,
                task_services::DESCRIPTION,
                task_services::CONFIGURATION_URI,
                task_services::CONFIGURATION,
            ],
            Table::TaskSubscriptions => &[
                task_subscriptions::TASK_ID,
                task_subscriptions::ACTOR_ID,
                task_subscriptions::PLATFORM_ID,
                task_subscriptions::SERVICE_ID,
                task_subscriptions::DATA_FEED_ID,
                task_subscriptions::ACTOR_PLATFORM_ID,
            ],
            Table::CompositeServices => &[
                composite_services::ID,
                composite_services::TYPE,
                composite_services::AFFILIATION,
                composite_services::CREDENTIALS,
                composite_services::DESCRIPTION,
                composite_services::ATTRIBUTES,
                composite_services::ATTRIBUTES_URI,
            ],
            Table::CompositeParts => &[
                composite_parts::COMPOSITE_ID,
                composite_parts::SERVICE_PLATFORM_ID,
                composite_parts::SERVICE_ID,
                composite_parts::ATTRIBUTES,
                composite_parts::ATTRIBUTES_URI,
            ],
            Table::ServiceWiring => &[
                service_wiring::COMPOSITE_ID,
                service_wiring::FROM_SERVICE_PLATFORM_ID,
                service_wiring::FROM_SERVICE_ID,
                service_wiring::FROM_INTERFACE_ID,
                service_wiring::TO_SERVICE_PLATFORM_ID,
                service_wiring::TO_SERVICE_ID,
                service_wiring::TO_INTERFACE_ID,
                service_wiring::ATTRIBUTES,
                service_wiring::ATTRIBUTES_URI,
            ],
        }
    }

    /// Columns forming the unique key
    pub fn key_columns(&self) -> &'static [&'static str] {
        let columns = self.columns();
        match self {
            Table::Nodes => &columns[..2],
            Table::NodeNeighbours => &columns[..4],
            Table::NodeIpMapping => &columns[..2],
            Table::Bearers => &columns[..1],
            Table::Routes => &columns[..3],
            Table::Platforms => &columns[..1],
            Table::Services => &columns[..2],
            Table::Tasks => &columns[..1],
            Table::TaskServices => &columns[..4],
            Table::TaskSubscriptions => &columns[..6],
            Table::CompositeServices => &columns[..1],
            Table::CompositeParts => &columns[..3],
            Table::ServiceWiring => &columns[..7],
        }
    }

    /// Canonical column name if `column` belongs to this table. The
    /// provenance column is accepted on every table.
    pub fn resolve_column(&self, column: &str) -> Option<&'static str> {
        let upper = column.to_ascii_uppercase();
        if upper == ORIGIN_NODE {
            return Some(ORIGIN_NODE);
        }
        self.columns().iter().copied().find(|c| *c == upper)
    }

    pub fn from_name(name: &str) -> Option<Table> {
        let upper = name.to_ascii_uppercase();
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name() == upper || t.name().trim_start_matches("FABRIC.") == upper)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
