// Federated store: local tables plus the registries of joined peers
//
// LOCAL queries see only this node's tables. DISTRIBUTED queries fan out to
// every peer, tag each row with the node it came from and merge the results
// in the requested order. Writes always land locally.

use super::query::{Select, Statement};
use super::schema::ORIGIN_NODE;
use super::table_store::TableStore;
use super::value::Row;
use super::{RegistryStore, Scope, StoreError};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct FederatedStore {
    node_id: String,
    local: Arc<TableStore>,
    peers: RwLock<Vec<(String, Arc<dyn RegistryStore>)>>,
}

impl FederatedStore {
    pub fn new(node_id: impl Into<String>, local: Arc<TableStore>) -> Self {
        Self {
            node_id: node_id.into(),
            local,
            peers: RwLock::new(Vec::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn local(&self) -> &Arc<TableStore> {
        &self.local
    }

    /// Add (or replace) a peer's registry in the distributed scope.
    pub fn join_peer(&self, peer_id: impl Into<String>, store: Arc<dyn RegistryStore>) {
        let peer_id = peer_id.into();
        let mut peers = self.peers.write();
        peers.retain(|(id, _)| *id != peer_id);
        tracing::info!("Peer {} joined the distributed registry", peer_id);
        peers.push((peer_id, store));
    }

    pub fn leave_peer(&self, peer_id: &str) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|(id, _)| id != peer_id);
        let removed = peers.len() != before;
        if removed {
            tracing::info!("Peer {} left the distributed registry", peer_id);
        }
        removed
    }

    pub fn peer_ids(&self) -> Vec<String> {
        self.peers.read().iter().map(|(id, _)| id.clone()).collect()
    }
}

fn tag(rows: Vec<Row>, origin: &str) -> impl Iterator<Item = Row> + '_ {
    rows.into_iter().map(move |mut row| {
        if !row.contains(ORIGIN_NODE) {
            row.set(ORIGIN_NODE, origin);
        }
        row
    })
}

impl RegistryStore for FederatedStore {
    fn query(&self, select: &Select, scope: Scope) -> Result<Vec<Row>, StoreError> {
        let local = self.local.query(select, Scope::Local)?;
        if scope == Scope::Local {
            return Ok(local);
        }

        let mut rows: Vec<Row> = tag(local, &self.node_id).collect();
        // Snapshot the peer list so a slow peer never blocks join/leave.
        let peers = self.peers.read().clone();
        for (peer_id, peer) in peers {
            match peer.query(select, Scope::Local) {
                Ok(found) => rows.extend(tag(found, &peer_id)),
                Err(e) => {
                    tracing::warn!("Peer {} failed distributed query: {}", peer_id, e);
                }
            }
        }
        select.sort(&mut rows);
        Ok(rows)
    }

    fn execute(&self, statement: &Statement) -> Result<bool, StoreError> {
        self.local.execute(statement)
    }

    fn execute_batch(&self, statements: &[Statement]) -> Result<bool, StoreError> {
        self.local.execute_batch(statements)
    }
}
