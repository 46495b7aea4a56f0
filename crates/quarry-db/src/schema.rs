//! Columns and schemas.
//!
//! A schema is an ordered list of columns; the position of a column in the
//! schema is its index, assigned when the column enters the schema. Bare
//! columns (index `None`) exist only while building expressions or schemas
//! and must be bound before evaluation.

use crate::error::{Error, Result};
use crate::value::{DataType, Value};

/// A column: optional lower-case name, ground type, nullability, and the
/// position in its owning schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name. Derived columns (projections of non-attribute
    /// expressions, aggregate outputs) are unnamed.
    pub name: Option<String>,
    /// The column's ground type.
    pub data_type: DataType,
    /// Whether NULL is admissible.
    pub nullable: bool,
    /// Position in the owning schema; `None` until bound.
    pub index: Option<usize>,
}

impl Column {
    /// Creates a new nullable, unbound column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Some(name.into()),
            data_type,
            nullable: true,
            index: None,
        }
    }

    /// Creates a new unnamed, unbound column.
    #[must_use]
    pub const fn unnamed(data_type: DataType, nullable: bool) -> Self {
        Self {
            name: None,
            data_type,
            nullable,
            index: None,
        }
    }

    /// Sets the nullability.
    #[must_use]
    pub const fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Binds the column to a schema position.
    #[must_use]
    pub const fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Checks that a value is admissible for this column.
    ///
    /// # Errors
    ///
    /// Returns a type error for NULL in a non-nullable column or for a
    /// value of the wrong ground type.
    pub fn check_value(&self, value: &Value) -> Result<()> {
        match value.data_type() {
            None => {
                if self.nullable {
                    Ok(())
                } else {
                    Err(Error::type_error(format!(
                        "cannot use NULL value for column '{}'",
                        self.display_name()
                    )))
                }
            }
            Some(actual) if actual == self.data_type => Ok(()),
            Some(actual) => Err(Error::type_error(format!(
                "value {value} of type {actual} is the wrong type for column '{}' ({})",
                self.display_name(),
                self.data_type
            ))),
        }
    }

    /// Returns the name for diagnostics, or a positional placeholder.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.name, self.index) {
            (Some(name), _) => name.clone(),
            (None, Some(index)) => format!("#{index}"),
            (None, None) => String::from("?"),
        }
    }
}

/// An ordered list of columns with positions assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from columns, assigning each its position.
    #[must_use]
    pub fn new(columns: Vec<Column>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, column)| column.at_index(i))
            .collect();
        Self { columns }
    }

    /// Returns the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }

    /// Validates a tuple against this schema: arity, per-position type,
    /// and nullability.
    ///
    /// # Errors
    ///
    /// Returns a type error on any violation.
    pub fn check_tuple(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::type_error(format!(
                "wrong number of columns: expected {}, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        for (value, column) in values.iter().zip(&self.columns) {
            column.check_value(value)?;
        }
        Ok(())
    }

    /// Builds the schema shared by both sides of a set operation.
    ///
    /// The inputs must have the same length and pairwise equal types.
    /// Names come from the left side; a position is nullable if it is
    /// nullable on either side.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error when the schemas are not
    /// compatible.
    pub fn merge_compatible(lhs: &Self, rhs: &Self) -> Result<Self> {
        if lhs.len() != rhs.len() {
            return Err(Error::Invalid(String::from(
                "relations must have the same number of columns",
            )));
        }
        let mut columns = Vec::with_capacity(lhs.len());
        for (l, r) in lhs.columns.iter().zip(&rhs.columns) {
            if l.data_type != r.data_type {
                return Err(Error::Invalid(String::from(
                    "relations must have the same column types",
                )));
            }
            columns.push(l.clone().with_nullable(l.nullable || r.nullable));
        }
        Ok(Self::new(columns))
    }
}

impl FromIterator<Column> for Schema {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            Column::new("a", DataType::Integer).with_nullable(false),
            Column::new("b", DataType::Text),
        ])
    }

    #[test]
    fn test_schema_assigns_indices() {
        let schema = sample();
        assert_eq!(schema.columns()[0].index, Some(0));
        assert_eq!(schema.columns()[1].index, Some(1));
    }

    #[test]
    fn test_column_lookup() {
        let schema = sample();
        assert_eq!(schema.column("b").and_then(|c| c.index), Some(1));
        assert!(schema.column("dne").is_none());
    }

    #[test]
    fn test_check_tuple_accepts_valid() {
        let schema = sample();
        assert!(schema
            .check_tuple(&[Value::Int(1), Value::Str("x".into())])
            .is_ok());
        assert!(schema.check_tuple(&[Value::Int(1), Value::Null]).is_ok());
    }

    #[test]
    fn test_check_tuple_rejects_arity() {
        let schema = sample();
        assert!(schema.check_tuple(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_check_tuple_rejects_wrong_type() {
        let schema = sample();
        let err = schema
            .check_tuple(&[Value::Str("x".into()), Value::Str("y".into())])
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_check_tuple_rejects_null_in_not_null() {
        let schema = sample();
        let err = schema
            .check_tuple(&[Value::Null, Value::Str("y".into())])
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_merge_compatible() {
        let lhs = Schema::new(vec![
            Column::new("a", DataType::Integer).with_nullable(false),
            Column::new("b", DataType::Text),
        ]);
        let rhs = Schema::new(vec![
            Column::new("x", DataType::Integer),
            Column::new("y", DataType::Text).with_nullable(false),
        ]);
        let merged = Schema::merge_compatible(&lhs, &rhs).unwrap();
        // Names from the left, nullability OR-combined.
        assert_eq!(merged.columns()[0].name.as_deref(), Some("a"));
        assert!(merged.columns()[0].nullable);
        assert!(merged.columns()[1].nullable);
    }

    #[test]
    fn test_merge_incompatible() {
        let lhs = Schema::new(vec![Column::new("a", DataType::Integer)]);
        let rhs = Schema::new(vec![Column::new("a", DataType::Text)]);
        assert!(matches!(
            Schema::merge_compatible(&lhs, &rhs),
            Err(Error::Invalid(_))
        ));

        let short = Schema::new(vec![]);
        assert!(Schema::merge_compatible(&lhs, &short).is_err());
    }
}
