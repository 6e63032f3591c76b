// Generic repository over one entity table in one scope

use super::{Entity, RegistryError, Tracked};
use crate::store::predicate;
use crate::store::schema::ORIGIN_NODE;
use crate::store::{Predicate, RegistryStore, Row, Scope, Select, Statement, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Query templates fixed when the repository is built
struct QueryTemplates {
    all: Select,
    by_key: Select,
    named: HashMap<&'static str, Select>,
}

impl QueryTemplates {
    fn build<E: Entity>() -> Self {
        let keys = E::TABLE.key_columns();
        let all = keys
            .iter()
            .fold(Select::from(E::TABLE), |select, column| select.order_by(column));
        let by_key = Select::from(E::TABLE).filter(Predicate::all(
            keys.iter()
                .enumerate()
                .map(|(i, column)| Predicate::eq_param(column, i)),
        ));
        Self {
            all,
            by_key,
            named: E::finders().into_iter().collect(),
        }
    }
}

/// Create/insert/update/save/delete and finders for entity `E`.
///
/// Bulk getters log store failures and return empty results; predicate
/// and template queries propagate them as [`RegistryError::Query`].
pub struct Repository<E: Entity> {
    store: Arc<dyn RegistryStore>,
    scope: Scope,
    templates: Arc<QueryTemplates>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            scope: self.scope,
            templates: self.templates.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn RegistryStore>, scope: Scope) -> Self {
        Self {
            store,
            scope,
            templates: Arc::new(QueryTemplates::build::<E>()),
            _entity: PhantomData,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Map a store row to an entity and snapshot it.
    pub fn create(&self, row: &Row) -> Tracked<E> {
        Tracked::loaded(E::from_row(row)).with_origin(row.get_string(ORIGIN_NODE))
    }

    /// Wrap a freshly built entity; it has no shadow until written.
    pub fn create_with(&self, entity: E) -> Tracked<E> {
        Tracked::new(entity)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    pub fn insert(&self, item: &mut Tracked<E>) -> Result<bool, RegistryError> {
        item.validate()?;
        let applied = self
            .store
            .execute(&Statement::insert(E::TABLE, item.to_row()))?;
        if applied {
            item.snapshot();
        }
        Ok(applied)
    }

    /// Overwrite the stored row identified by the shadow's key (or the live
    /// key when there is no shadow).
    pub fn update(&self, item: &mut Tracked<E>) -> Result<bool, RegistryError> {
        item.validate()?;
        let statement = Statement::update(E::TABLE, item.to_row(), item.key_source().key_filter());
        let applied = self.store.execute(&statement)?;
        if applied {
            item.snapshot();
        }
        Ok(applied)
    }

    /// Insert when the entity has no shadow, otherwise update. An insert
    /// that collides on the key is retried once as an update.
    ///
    /// Validation failures are returned; other store failures are logged
    /// and reported as `Ok(false)`.
    pub fn save(&self, item: &mut Tracked<E>) -> Result<bool, RegistryError> {
        item.validate()?;

        let result = if item.has_shadow() {
            self.update(item)
        } else {
            match self.insert(item) {
                Err(RegistryError::DuplicateKey { key, .. }) => {
                    tracing::debug!(
                        "{} {} already exists, updating instead",
                        E::KIND,
                        key
                    );
                    self.update(item)
                }
                other => other,
            }
        };

        match result {
            Err(e @ RegistryError::IncompleteObject { .. }) => Err(e),
            Err(e) => {
                tracing::warn!("Failed to save {}: {}", E::KIND, e);
                Ok(false)
            }
            ok => ok,
        }
    }

    /// Delete the stored row this entity came from. Failures are logged.
    pub fn delete(&self, item: &Tracked<E>) -> bool {
        if let Err(e) = item.key_source().validate() {
            tracing::warn!("Refusing to delete {}: {}", E::KIND, e);
            return false;
        }
        let statement = Statement::delete(E::TABLE, item.key_source().key_filter());
        self.execute_logged(&statement)
    }

    /// Delete all `items` in one batch; nothing is deleted if any is invalid.
    pub fn delete_all(&self, items: &[Tracked<E>]) -> bool {
        let mut statements = Vec::with_capacity(items.len());
        for item in items {
            if let Err(e) = item.key_source().validate() {
                tracing::warn!("Refusing to delete {}: {}", E::KIND, e);
                return false;
            }
            statements.push(Statement::delete(E::TABLE, item.key_source().key_filter()));
        }
        match self.store.execute_batch(&statements) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("Failed to delete {} {}(s): {}", statements.len(), E::KIND, e);
                false
            }
        }
    }

    /// Run a statement, logging failures as `false`.
    pub fn execute_logged(&self, statement: &Statement) -> bool {
        match self.store.execute(statement) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("Registry update failed ({}): {}", statement, e);
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Run `select` in this repository's scope.
    pub fn query(&self, select: &Select) -> Result<Vec<Tracked<E>>, RegistryError> {
        let rows = self
            .store
            .query(select, self.scope)
            .map_err(RegistryError::Query)?;
        Ok(rows.iter().map(|row| self.create(row)).collect())
    }

    /// Like `query`, but a failure is logged and reads as no matches.
    pub fn query_or_empty(&self, select: &Select) -> Vec<Tracked<E>> {
        self.query(select).unwrap_or_else(|e| {
            tracing::warn!("{} lookup failed: {}", E::KIND, e);
            Vec::new()
        })
    }

    pub fn get_all(&self) -> Vec<Tracked<E>> {
        self.query_or_empty(&self.templates.all)
    }

    /// Entity with exactly these key values, in key column order
    pub fn get_by_key(&self, key: &[Value]) -> Option<Tracked<E>> {
        let select = match self.templates.by_key.bind(key) {
            Ok(select) => select,
            Err(e) => {
                tracing::warn!("Bad {} key: {}", E::KIND, e);
                return None;
            }
        };
        self.query_or_empty(&select).into_iter().next()
    }

    /// Run the named finder template with `params`.
    pub fn find(&self, name: &str, params: &[Value]) -> Result<Vec<Tracked<E>>, RegistryError> {
        let template = self.templates.named.get(name).ok_or_else(|| {
            RegistryError::MalformedPredicate(format!("no {} finder named {}", E::KIND, name))
        })?;
        let select = template.bind(params).map_err(RegistryError::Query)?;
        self.query(&select)
    }

    /// Like `find`, with failures logged and read as no matches.
    pub fn find_or_empty(&self, name: &str, params: &[Value]) -> Vec<Tracked<E>> {
        self.find(name, params).unwrap_or_else(|e| {
            tracing::warn!("{} lookup failed: {}", E::KIND, e);
            Vec::new()
        })
    }

    /// Check and parse a caller-supplied filter fragment.
    ///
    /// Empty fragments and fragments containing `*` are rejected; double
    /// quotes are rewritten to single quotes.
    pub fn parse_predicate(&self, raw: &str) -> Result<Predicate, RegistryError> {
        if raw.trim().is_empty() {
            return Err(RegistryError::MalformedPredicate(
                "predicate is empty".to_string(),
            ));
        }
        if raw.contains('*') {
            return Err(RegistryError::MalformedPredicate(format!(
                "predicate must not contain '*': {}",
                raw
            )));
        }
        let text = if raw.contains('"') {
            tracing::warn!("Replacing double quotes in predicate: {}", raw);
            raw.replace('"', "'")
        } else {
            raw.to_string()
        };
        predicate::parse(&text).map_err(|e| RegistryError::MalformedPredicate(e.to_string()))
    }

    /// `SELECT * FROM <table> WHERE <raw>`; all failures propagate.
    pub fn get_by_predicate(&self, raw: &str) -> Result<Vec<Tracked<E>>, RegistryError> {
        let filter = self.parse_predicate(raw)?;
        self.query(&Select::from(E::TABLE).filter(filter))
    }
}
