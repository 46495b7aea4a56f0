//! Abstract syntax tree for the engine's SQL dialect.
//!
//! The parser produces these types; the `quarry-db` semantic compiler
//! consumes them. All identifiers in the tree are already lower-cased by
//! the lexer.

mod expression;
mod statement;
mod types;

pub use expression::{AggregateFunc, BinaryOp, ColumnRef, Expr, Literal, UnaryOp};
pub use statement::{
    CreateTableStatement, FromItem, InsertStatement, Query, SelectItem, SelectStatement, SetOp,
    Statement, TableSource,
};
pub use types::{ColumnDef, DataType};
