//! The database façade: statement dispatch and cursors.

use quarry_sql::ast::{CreateTableStatement, InsertStatement, Query, Statement};
use quarry_sql::Parser;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::compiler::expression::{data_type, literal_value};
use crate::compiler::compile_query;
use crate::error::{Error, Result};
use crate::relation::{Relation, Rows, Tuple};
use crate::schema::{Column, Schema};

/// A pull-based iterator over the output of a compiled query plan.
///
/// Nothing executes until the cursor is iterated; each full iteration is a
/// fresh pass over the plan.
pub struct Cursor {
    plan: Box<dyn Relation>,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

impl Cursor {
    pub(crate) fn new(plan: Box<dyn Relation>) -> Self {
        Self { plan }
    }

    /// The result schema.
    #[must_use]
    pub fn columns(&self) -> &Schema {
        self.plan.schema()
    }

    /// Starts a pass over the result tuples.
    pub fn rows(&self) -> Rows<'_> {
        self.plan.rows()
    }

    /// Collects one full pass.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation error of the pass.
    pub fn fetch_all(&self) -> Result<Vec<Tuple>> {
        self.rows().collect()
    }
}

impl<'a> IntoIterator for &'a Cursor {
    type Item = Result<Tuple>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

/// An in-process database: a catalog plus the statement dispatcher.
#[derive(Default)]
pub struct Database {
    catalog: Catalog,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The table catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses and executes a single statement.
    ///
    /// CREATE TABLE and INSERT mutate the catalog and return `None`;
    /// queries return a [`Cursor`] without executing it.
    ///
    /// # Errors
    ///
    /// Returns syntax, name, type, or invalid-operation errors. Only
    /// INSERT mutates state, and it rolls back on failure; every other
    /// statement leaves the catalog untouched when it errors.
    pub fn execute(&mut self, sql: &str) -> Result<Option<Cursor>> {
        let statement = Parser::new(sql).parse_statement()?;
        debug!(%statement, "executing");
        match statement {
            Statement::CreateTable(create) => {
                self.create_table(&create)?;
                Ok(None)
            }
            Statement::Insert(insert) => {
                self.insert(&insert)?;
                Ok(None)
            }
            Statement::Query(query) => Ok(Some(self.query(&query)?)),
        }
    }

    /// Compiles a query AST into a cursor.
    ///
    /// # Errors
    ///
    /// Returns name, type, or invalid-operation errors from compilation.
    pub fn query(&self, query: &Query) -> Result<Cursor> {
        Ok(Cursor::new(compile_query(query, &self.catalog)?))
    }

    fn create_table(&mut self, create: &CreateTableStatement) -> Result<()> {
        let mut columns = Vec::with_capacity(create.columns.len());
        for def in &create.columns {
            if columns
                .iter()
                .any(|c: &Column| c.name.as_deref() == Some(def.name.as_str()))
            {
                return Err(Error::DuplicateColumn(def.name.clone()));
            }
            columns.push(
                Column::new(def.name.clone(), data_type(def.data_type))
                    .with_nullable(def.nullable),
            );
        }
        self.catalog.create(&create.name, Schema::new(columns))?;
        info!(table = %create.name, "created table");
        Ok(())
    }

    /// Validates and appends the statement's rows atomically: on any
    /// failure the relation is restored to its size before the statement.
    fn insert(&mut self, insert: &InsertStatement) -> Result<()> {
        let relation = self.catalog.get(&insert.table)?;
        let mut relation = relation.borrow_mut();

        let checkpoint = relation.len();
        for row in &insert.rows {
            let values: Tuple = row.iter().map(literal_value).collect();
            if let Err(e) = relation.insert(values) {
                relation.truncate(checkpoint);
                return Err(e);
            }
        }
        debug!(table = %insert.table, rows = insert.rows.len(), "inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rows(database: &mut Database, sql: &str) -> Vec<Tuple> {
        database
            .execute(sql)
            .unwrap()
            .expect("expected a cursor")
            .fetch_all()
            .unwrap()
    }

    #[test]
    fn test_create_insert_select() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER, b STRING);").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'a'), (2, 'b');")
            .unwrap();

        assert_eq!(
            rows(&mut db, "SELECT a, b FROM t;"),
            vec![
                vec![Value::Int(1), Value::Str("a".into())],
                vec![Value::Int(2), Value::Str("b".into())],
            ]
        );
    }

    #[test]
    fn test_create_duplicate_table() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER);").unwrap();
        assert_eq!(
            db.execute("CREATE TABLE t (a INTEGER);").unwrap_err(),
            Error::TableExists(String::from("t"))
        );
    }

    #[test]
    fn test_create_duplicate_column() {
        let mut db = Database::new();
        assert_eq!(
            db.execute("CREATE TABLE t (a INTEGER, a STRING);")
                .unwrap_err(),
            Error::DuplicateColumn(String::from("a"))
        );
        // The failed statement left no table behind.
        assert!(!db.catalog().contains("t"));
    }

    #[test]
    fn test_insert_into_missing_table() {
        let mut db = Database::new();
        assert!(matches!(
            db.execute("INSERT INTO dne VALUES (1);").unwrap_err(),
            Error::TableNotFound(_)
        ));
    }

    #[test]
    fn test_insert_type_mismatch() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER, b STRING);").unwrap();
        assert!(matches!(
            db.execute("INSERT INTO t VALUES ('hi', true);").unwrap_err(),
            Error::Type(_)
        ));
    }

    #[test]
    fn test_insert_null_into_not_null() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER NOT NULL, b STRING);")
            .unwrap();
        assert!(matches!(
            db.execute("INSERT INTO t VALUES (NULL, 'hi');").unwrap_err(),
            Error::Type(_)
        ));
    }

    #[test]
    fn test_insert_wrong_arity() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER, b STRING);").unwrap();
        assert!(matches!(
            db.execute("INSERT INTO t VALUES (1, 'a', true);").unwrap_err(),
            Error::Type(_)
        ));
    }

    #[test]
    fn test_insert_is_atomic() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER NOT NULL, b STRING);")
            .unwrap();
        db.execute("INSERT INTO t VALUES (1, 'a'), (2, 'b');")
            .unwrap();

        // The valid row (3, 'c') must not survive the failing statement.
        assert!(db
            .execute("INSERT INTO t VALUES (3, 'c'), (NULL, 'd');")
            .is_err());

        assert_eq!(
            rows(&mut db, "SELECT a, b FROM t;"),
            vec![
                vec![Value::Int(1), Value::Str("a".into())],
                vec![Value::Int(2), Value::Str("b".into())],
            ]
        );
    }

    #[test]
    fn test_cursor_is_lazy_and_restartable() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER);").unwrap();
        let cursor = db.execute("SELECT a FROM t;").unwrap().unwrap();

        // Rows inserted after compilation are visible at iteration time.
        db.execute("INSERT INTO t VALUES (5);").unwrap();
        assert_eq!(cursor.fetch_all().unwrap(), vec![vec![Value::Int(5)]]);

        db.execute("INSERT INTO t VALUES (6);").unwrap();
        assert_eq!(cursor.fetch_all().unwrap().len(), 2);
    }

    #[test]
    fn test_cursor_exposes_schema() {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INTEGER, b STRING);").unwrap();
        let cursor = db.execute("SELECT b AS name FROM t;").unwrap().unwrap();
        assert_eq!(cursor.columns().columns()[0].name.as_deref(), Some("name"));
    }
}
