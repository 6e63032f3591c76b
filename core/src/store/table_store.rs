// Table store: registry tables on top of a key/value backend
//
// Rows are JSON-encoded under `<table>\0<key literal>\0<key literal>...`,
// so a prefix scan returns one table and uniqueness of the key columns is
// enforced by the key itself.

use super::backend::{MemoryStorage, SledStorage, StorageBackend};
use super::query::{Select, Statement};
use super::schema::{Table, ORIGIN_NODE};
use super::value::{Row, Value};
use super::{RegistryStore, Scope, StoreError};
use parking_lot::RwLock;
use std::sync::Arc;

/// A single node's registry tables
pub struct TableStore {
    backend: Arc<dyn StorageBackend>,
    /// Writers hold this exclusively so statements and batches apply in
    /// isolation from each other and from readers.
    guard: RwLock<()>,
}

/// Prior state of a storage key, replayed if a batch fails
struct UndoEntry {
    key: Vec<u8>,
    previous: Option<Vec<u8>>,
}

impl TableStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            guard: RwLock::new(()),
        }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Open a sled-backed store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let backend = SledStorage::new(path).map_err(StoreError::Backend)?;
        tracing::info!("Opened registry store at {}", path);
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush().map_err(StoreError::Backend)
    }

    /// Number of rows held in `table`
    pub fn count(&self, table: Table) -> Result<usize, StoreError> {
        self.backend
            .count_prefix(&table_prefix(table))
            .map_err(StoreError::Backend)
    }

    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Row)>, StoreError> {
        let entries = self
            .backend
            .scan_prefix(&table_prefix(table))
            .map_err(StoreError::Backend)?;
        entries
            .into_iter()
            .map(|(k, v)| Ok((k, serde_json::from_slice::<Row>(&v)?)))
            .collect()
    }

    fn select_rows(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        let filter = select.filter.resolve(select.table)?;
        for key in &select.order_by {
            if select.table.resolve_column(&key.column).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: select.table.name().to_string(),
                    column: key.column.clone(),
                });
            }
        }

        let mut rows = Vec::new();
        for (_, row) in self.scan(select.table)? {
            if filter.matches(&row)? {
                rows.push(row);
            }
        }
        select.sort(&mut rows);
        Ok(rows)
    }

    fn put_row(
        &self,
        table: Table,
        row: &Row,
        undo: &mut Vec<UndoEntry>,
    ) -> Result<Vec<u8>, StoreError> {
        let key = row_key(table, row)?;
        let bytes = serde_json::to_vec(row)?;
        let previous = self.backend.get(&key).map_err(StoreError::Backend)?;
        self.backend.put(&key, &bytes).map_err(StoreError::Backend)?;
        undo.push(UndoEntry {
            key: key.clone(),
            previous,
        });
        Ok(key)
    }

    fn remove_key(&self, key: &[u8], undo: &mut Vec<UndoEntry>) -> Result<(), StoreError> {
        let previous = self.backend.get(key).map_err(StoreError::Backend)?;
        if previous.is_some() {
            self.backend.remove(key).map_err(StoreError::Backend)?;
            undo.push(UndoEntry {
                key: key.to_vec(),
                previous,
            });
        }
        Ok(())
    }

    fn apply(&self, statement: &Statement, undo: &mut Vec<UndoEntry>) -> Result<(), StoreError> {
        match statement {
            Statement::Insert { table, row } => {
                let row = normalise(*table, row)?;
                let key = row_key(*table, &row)?;
                if self.backend.get(&key).map_err(StoreError::Backend)?.is_some() {
                    return Err(duplicate(*table, &row));
                }
                self.put_row(*table, &row, undo)?;
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let assignments = normalise_assignments(*table, assignments)?;
                let filter = filter.resolve(*table)?;
                let matching: Vec<(Vec<u8>, Row)> = self
                    .scan(*table)?
                    .into_iter()
                    .filter_map(|(k, row)| match filter.matches(&row) {
                        Ok(true) => Some(Ok((k, row))),
                        Ok(false) => None,
                        Err(e) => Some(Err(e)),
                    })
                    .collect::<Result<_, _>>()?;

                // Remove every matched row first so rows can swap keys
                // within a single update.
                for (key, _) in &matching {
                    self.remove_key(key, undo)?;
                }
                for (_, mut row) in matching {
                    for (column, value) in assignments.columns() {
                        row.set(column, value.clone());
                    }
                    let key = row_key(*table, &row)?;
                    if self.backend.get(&key).map_err(StoreError::Backend)?.is_some() {
                        return Err(duplicate(*table, &row));
                    }
                    self.put_row(*table, &row, undo)?;
                }
            }
            Statement::Delete { table, filter } => {
                let filter = filter.resolve(*table)?;
                for (key, row) in self.scan(*table)? {
                    if filter.matches(&row)? {
                        self.remove_key(&key, undo)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&self, undo: Vec<UndoEntry>) {
        for entry in undo.into_iter().rev() {
            let restored = match entry.previous {
                Some(bytes) => self.backend.put(&entry.key, &bytes),
                None => self.backend.remove(&entry.key),
            };
            if let Err(e) = restored {
                tracing::error!("Failed to roll back registry write: {}", e);
            }
        }
    }

    fn apply_all(&self, statements: &[Statement]) -> Result<bool, StoreError> {
        let _writer = self.guard.write();
        let mut undo = Vec::new();
        for statement in statements {
            tracing::debug!("Executing: {}", statement);
            if let Err(e) = self.apply(statement, &mut undo) {
                tracing::debug!("Rolling back {} write(s) after: {}", undo.len(), e);
                self.rollback(undo);
                return Err(e);
            }
        }
        Ok(true)
    }
}

impl RegistryStore for TableStore {
    fn query(&self, select: &Select, _scope: Scope) -> Result<Vec<Row>, StoreError> {
        let _reader = self.guard.read();
        tracing::trace!("Query: {}", select);
        self.select_rows(select)
    }

    fn execute(&self, statement: &Statement) -> Result<bool, StoreError> {
        self.apply_all(std::slice::from_ref(statement))
    }

    fn execute_batch(&self, statements: &[Statement]) -> Result<bool, StoreError> {
        self.apply_all(statements)
    }
}

fn table_prefix(table: Table) -> Vec<u8> {
    let mut prefix = table.name().as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn row_key(table: Table, row: &Row) -> Result<Vec<u8>, StoreError> {
    let mut key = table_prefix(table);
    for (i, column) in table.key_columns().iter().enumerate() {
        let value = row.get(column).cloned().unwrap_or_default();
        if value.is_null() {
            return Err(StoreError::MalformedQuery(format!(
                "key column {}.{} is NULL",
                table, column
            )));
        }
        if i > 0 {
            key.push(0);
        }
        key.extend_from_slice(value.to_sql_literal().as_bytes());
    }
    Ok(key)
}

fn duplicate(table: Table, row: &Row) -> StoreError {
    let key: Vec<String> = table
        .key_columns()
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or_default().to_string())
        .collect();
    StoreError::DuplicateKey {
        table: table.name().to_string(),
        key: key.join("/"),
    }
}

/// Full-width row for `table`; missing columns become NULL and the
/// provenance column is never stored.
fn normalise(table: Table, row: &Row) -> Result<Row, StoreError> {
    let given = normalise_assignments(table, row)?;
    let mut full = Row::new();
    for column in table.columns() {
        full.set(column, given.get(column).cloned().unwrap_or(Value::Null));
    }
    Ok(full)
}

fn normalise_assignments(table: Table, row: &Row) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for (column, value) in row.columns() {
        match table.resolve_column(column) {
            Some(ORIGIN_NODE) => {}
            Some(c) => out.set(c, value.clone()),
            None => {
                return Err(StoreError::UnknownColumn {
                    table: table.name().to_string(),
                    column: column.to_string(),
                })
            }
        }
    }
    Ok(out)
}
