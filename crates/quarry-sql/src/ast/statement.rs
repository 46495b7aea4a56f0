//! SQL statement AST types.

use core::fmt;

use super::expression::{ColumnRef, Expr, Literal};
use super::types::ColumnDef;

/// A set operation combining two queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// UNION.
    Union,
    /// INTERSECT.
    Intersect,
    /// EXCEPT.
    Except,
}

impl SetOp {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query: a single SELECT or a set-operation combination of queries.
///
/// `UNION` and `EXCEPT` share the lowest precedence level and are
/// left-associative; `INTERSECT` binds tighter. The parser encodes that
/// precedence into the tree, so consumers never deal with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A single SELECT block.
    Select(Box<SelectStatement>),
    /// Two queries combined by a set operation.
    Compound {
        /// The set operation.
        op: SetOp,
        /// Whether duplicates are removed (`ALL` disables this; the default
        /// and explicit `DISTINCT` enable it).
        distinct: bool,
        /// Left operand.
        left: Box<Query>,
        /// Right operand.
        right: Box<Query>,
    },
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// The selected items.
    pub items: Vec<SelectItem>,
    /// The FROM sources; at least one, cross-joined in order.
    pub from: Vec<FromItem>,
    /// The WHERE predicate.
    pub predicate: Option<Expr>,
    /// GROUP BY column references.
    pub group_by: Vec<ColumnRef>,
}

/// An item in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*` or `t.*`.
    Wildcard {
        /// Table qualifier for `t.*`, absent for bare `*`.
        qualifier: Option<String>,
    },
    /// An expression, optionally aliased with `AS`.
    Expression {
        /// The expression.
        expr: Expr,
        /// Output column alias.
        alias: Option<String>,
    },
}

/// A source in the FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A named table.
    Table(String),
    /// A parenthesized subquery.
    Subquery(Box<Query>),
}

/// A FROM clause entry: a source with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    /// The table or subquery.
    pub source: TableSource,
    /// Alias (`AS` optional in the grammar).
    pub alias: Option<String>,
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name.
    pub name: String,
    /// Column definitions.
    pub columns: Vec<ColumnDef>,
}

/// An INSERT statement. Rows hold literals only; there are no expressions
/// in VALUES.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name.
    pub table: String,
    /// The rows to insert.
    pub rows: Vec<Vec<Literal>>,
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement.
    CreateTable(CreateTableStatement),
    /// INSERT statement.
    Insert(InsertStatement),
    /// Query statement.
    Query(Query),
}

// ===================================================================
// Display implementations
// ===================================================================

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Compound {
                op,
                distinct,
                left,
                right,
            } => {
                write!(f, "({left}) {op}")?;
                if !distinct {
                    write!(f, " ALL")?;
                }
                write!(f, " ({right})")
            }
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard { qualifier: None } => write!(f, "*"),
            Self::Wildcard {
                qualifier: Some(q), ..
            } => write!(f, "{q}.*"),
            Self::Expression { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(a) = alias {
                    write!(f, " AS {a}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(name) => f.write_str(name),
            Self::Subquery(query) => write!(f, "({query})"),
        }
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(a) = &self.alias {
            write!(f, " AS {a}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {item}")?;
        }
        write!(f, " FROM")?;
        for (i, from) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {from}")?;
        }
        if let Some(p) = &self.predicate {
            write!(f, " WHERE {p}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY")?;
            for (i, g) in self.group_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {g}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CreateTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE {} (", self.name)?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {} VALUES", self.table)?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " (")?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(c) => write!(f, "{c}"),
            Self::Insert(i) => write!(f, "{i}"),
            Self::Query(q) => write!(f, "{q}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_op_display() {
        assert_eq!(SetOp::Union.as_str(), "UNION");
        assert_eq!(SetOp::Except.as_str(), "EXCEPT");
    }

    #[test]
    fn test_create_table_display() {
        let stmt = CreateTableStatement {
            name: String::from("t"),
            columns: vec![
                ColumnDef::new("a", crate::ast::DataType::Integer).not_null(),
                ColumnDef::new("b", crate::ast::DataType::String),
            ],
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE t (a INTEGER NOT NULL, b STRING)"
        );
    }

    #[test]
    fn test_insert_display() {
        let stmt = InsertStatement {
            table: String::from("t"),
            rows: vec![
                vec![Literal::Integer(1), Literal::String(String::from("a"))],
                vec![Literal::Integer(2), Literal::Null],
            ],
        };
        assert_eq!(stmt.to_string(), "INSERT INTO t VALUES (1, 'a'), (2, NULL)");
    }
}
