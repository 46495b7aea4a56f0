//! Error types for the query engine.

use quarry_sql::ParseError;

/// Errors surfaced by the engine.
///
/// The variants group into the engine's error kinds: syntax (from the
/// parser), name resolution, typing, operator construction, and runtime
/// arithmetic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The statement failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// CREATE TABLE with a name that is already taken.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// A statement referenced a table the catalog does not know.
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// CREATE TABLE repeated a column name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A column reference matched nothing in scope.
    #[error("column '{0}' does not exist")]
    ColumnNotFound(String),

    /// An unqualified column reference matched more than one column.
    #[error("column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),

    /// Two FROM entries share a table name or alias.
    #[error("non-unique table name or alias '{0}' in FROM clause")]
    DuplicateAlias(String),

    /// Operand or value type mismatch.
    #[error("type error: {0}")]
    Type(String),

    /// Invariant breach caught at operator construction.
    #[error("invalid operation: {0}")]
    Invalid(String),

    /// Division or modulo by zero at evaluation time.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    IntegerOverflow,
}

impl Error {
    /// Shorthand for a type error with a formatted message.
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
