//! # quarry-db
//!
//! An in-process relational query engine over in-memory tables.
//!
//! Statements go in as text; query results come back as a streaming
//! [`Cursor`] over tuples. The engine is built from three layers:
//!
//! - a value and schema model with first-class nullability;
//! - typed expression trees evaluating with SQL three-valued logic;
//! - a pull-based tree of relational operators (selection, projection,
//!   sort, sort-merge set operations, grouped aggregation, cross-join)
//!   compiled from the `quarry-sql` AST by the semantic compiler.
//!
//! Scheduling is single-threaded and cooperative: iterating the outermost
//! operator drives recursive pulls down the tree, one tuple at a time.
//!
//! ```rust
//! use quarry_db::Database;
//!
//! let mut db = Database::new();
//! db.execute("CREATE TABLE t (a INTEGER, b STRING);").unwrap();
//! db.execute("INSERT INTO t VALUES (1, 'a'), (2, 'b');").unwrap();
//!
//! let cursor = db.execute("SELECT a FROM t WHERE b = 'a';").unwrap().unwrap();
//! let rows = cursor.fetch_all().unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod aggregate;
pub mod catalog;
pub mod compiler;
pub mod db;
pub mod error;
pub mod expr;
pub mod relation;
pub mod schema;
pub mod value;

pub use catalog::Catalog;
pub use db::{Cursor, Database};
pub use error::{Error, Result};
pub use expr::Expr;
pub use relation::{MaterialRelation, Relation, Tuple};
pub use schema::{Column, Schema};
pub use value::{DataType, Value};
