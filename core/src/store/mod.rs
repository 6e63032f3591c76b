// Store module: registry tables, queries and the local/distributed scopes

pub mod backend;
pub mod federated;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod table_store;
pub mod value;

pub use backend::{MemoryStorage, SledStorage, StorageBackend};
pub use federated::FederatedStore;
pub use query::{CmpOp, Operand, OrderBy, Predicate, Select, Statement};
pub use schema::Table;
pub use table_store::TableStore;
pub use value::{Row, Value};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Query scope: this node only, or this node plus every reachable peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    #[default]
    Distributed,
}

impl Scope {
    pub fn is_distributed(&self) -> bool {
        matches!(self, Scope::Distributed)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => write!(f, "local"),
            Scope::Distributed => write!(f, "distributed"),
        }
    }
}

impl FromStr for Scope {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Scope::Local),
            "distributed" => Ok(Scope::Distributed),
            other => Err(StoreError::MalformedQuery(format!("unknown scope '{}'", other))),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: String, key: String },
    #[error("Malformed query: {0}")]
    MalformedQuery(String),
    #[error("Unknown column {column} in {table}")]
    UnknownColumn { table: String, column: String },
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Row encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// The query/command surface of the registry's backing store.
///
/// `execute` returns `Ok(true)` once the statement has been applied, even if
/// it touched no rows.
pub trait RegistryStore: Send + Sync {
    fn query(&self, select: &Select, scope: Scope) -> Result<Vec<Row>, StoreError>;
    fn execute(&self, statement: &Statement) -> Result<bool, StoreError>;
    /// Apply all statements or none of them.
    fn execute_batch(&self, statements: &[Statement]) -> Result<bool, StoreError>;
}
