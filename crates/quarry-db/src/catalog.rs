//! The table catalog.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::relation::{MaterialRelation, Table};
use crate::schema::Schema;

/// A mapping from lower-case table name to the base relation storing its
/// tuples. The catalog exclusively owns base relations; operator trees
/// reference them through shared [`Table`] handles.
#[derive(Default)]
pub struct Catalog {
    tables: HashMap<String, Rc<RefCell<MaterialRelation>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty base relation under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken.
    pub fn create(&mut self, name: &str, schema: Schema) -> Result<()> {
        let key = name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::TableExists(key));
        }
        debug!(table = %key, columns = schema.len(), "creating table");
        let relation = MaterialRelation::new(Some(key.clone()), schema);
        self.tables.insert(key, Rc::new(RefCell::new(relation)));
        Ok(())
    }

    /// Returns the shared base relation under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such table exists.
    pub fn get(&self, name: &str) -> Result<&Rc<RefCell<MaterialRelation>>> {
        let key = name.to_lowercase();
        self.tables
            .get(&key)
            .ok_or(Error::TableNotFound(key))
    }

    /// Returns a [`Table`] handle suitable for building operator trees.
    ///
    /// # Errors
    ///
    /// Returns an error if no such table exists.
    pub fn table(&self, name: &str) -> Result<Table> {
        Ok(Table::new(Rc::clone(self.get(name)?)))
    }

    /// Returns true if a table with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// The number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when the catalog holds no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
