//! The semantic compiler.
//!
//! Translates a parsed query AST into a tree of relational operators bound
//! to the catalog. The pipeline per SELECT block:
//!
//! 1. build the column environment from the FROM items (alias or table
//!    name as qualifier, duplicate qualifiers rejected) and cross-join the
//!    sources left to right;
//! 2. apply the WHERE predicate against the post-join environment;
//! 3. collect aggregate calls from the SELECT expressions; if any exist or
//!    GROUP BY is non-empty, insert a [`crate::relation::GroupBy`] and
//!    rewrite the environment to the grouping columns plus the aggregate
//!    outputs, substituting each call with an attribute reference;
//! 4. expand wildcards against the (possibly rewritten) environment;
//! 5. emit the final projection.
//!
//! Set-operation nodes compile both sides and wrap them in the sort-merge
//! combination operator.

mod environment;
pub(crate) mod expression;
mod query;

pub use environment::{ColumnEnvironment, EnvEntry};
pub use query::compile_query;
