// Node interface to IP endpoint mappings

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::ip_mapping as col;
use crate::store::{Predicate, Row, Select, Table};

const FOR_NODE: &str = "for_node";
const FOR_INTERFACE: &str = "for_interface";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeIpMapping {
    pub node_id: String,
    pub node_interface: String,
    pub ip: String,
    pub port: Option<u16>,
}

impl NodeIpMapping {
    pub fn new(
        node_id: impl Into<String>,
        node_interface: impl Into<String>,
        ip: impl Into<String>,
        port: Option<u16>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_interface: node_interface.into(),
            ip: ip.into(),
            port,
        }
    }

    /// `ip:port`, or just the address when no port is recorded
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.ip, port),
            None => self.ip.clone(),
        }
    }
}

impl Entity for NodeIpMapping {
    const TABLE: Table = Table::NodeIpMapping;
    const KIND: &'static str = "node IP mapping";

    fn from_row(row: &Row) -> Self {
        Self {
            node_id: row.get_string(col::NODE_ID).unwrap_or_default(),
            node_interface: row.get_string(col::NODE_INTERFACE).unwrap_or_default(),
            ip: row.get_string(col::IP).unwrap_or_default(),
            port: row
                .get_i64(col::PORT)
                .and_then(|p| u16::try_from(p).ok()),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::NODE_ID, &self.node_id)
            .with(col::NODE_INTERFACE, &self.node_interface)
            .with(col::IP, &self.ip)
            .with(col::PORT, self.port)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "node id", &self.node_id)?;
        require(Self::KIND, "node interface", &self.node_interface)?;
        require(Self::KIND, "ip", &self.ip)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || Select::from(Table::NodeIpMapping).order_by(col::NODE_INTERFACE);
        vec![
            (FOR_NODE, base().filter(Predicate::eq_param(col::NODE_ID, 0))),
            (
                FOR_INTERFACE,
                base().filter(
                    Predicate::eq_param(col::NODE_ID, 0)
                        .and(Predicate::eq_param(col::NODE_INTERFACE, 1)),
                ),
            ),
        ]
    }
}

impl Repository<NodeIpMapping> {
    pub fn get_all_mappings_for_node(&self, node_id: &str) -> Vec<Tracked<NodeIpMapping>> {
        self.find_or_empty(FOR_NODE, &[node_id.into()])
    }

    /// First mapping recorded for the node, whatever the interface
    pub fn get_any_mapping_for_node(&self, node_id: &str) -> Option<Tracked<NodeIpMapping>> {
        self.get_all_mappings_for_node(node_id).into_iter().next()
    }

    pub fn get_mapping_for_node(
        &self,
        node_id: &str,
        interface: &str,
    ) -> Option<Tracked<NodeIpMapping>> {
        self.find_or_empty(FOR_INTERFACE, &[node_id.into(), interface.into()])
            .into_iter()
            .next()
    }
}
