//! Streaming relational operators.
//!
//! A relation pairs a schema with a restartable stream of tuples: every
//! call to [`Relation::rows`] starts a fresh pass over the operator's
//! output. Operators pull from their children recursively, one tuple per
//! step, and control returns to the consumer after each emitted tuple.
//!
//! Base relations are owned by the catalog; operator trees reference them
//! through shared [`Table`] handles so inserts stay visible to live trees.
//! Derived operators own their children outright.

mod filter;
mod group;
mod join;
mod setops;
mod sort;

pub use filter::{Projection, Selection};
pub use group::GroupBy;
pub use join::CrossJoin;
pub use setops::SetCombination;
pub use sort::Sort;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::schema::Schema;
use crate::value::Value;

/// A row of values matching some schema.
pub type Tuple = Vec<Value>;

/// One pass over a relation's tuples. Evaluation errors surface as `Err`
/// items and end the pass.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Tuple>> + 'a>;

/// A schema-bearing, finitely iterable multiset of tuples.
pub trait Relation {
    /// The relation's output schema.
    fn schema(&self) -> &Schema;

    /// Starts a new pass over the relation's tuples.
    fn rows(&self) -> Rows<'_>;
}

/// A relation backed by an owned vector of tuples. All other relations
/// are derived from other relations.
#[derive(Debug)]
pub struct MaterialRelation {
    name: Option<String>,
    schema: Schema,
    rows: Vec<Tuple>,
}

impl MaterialRelation {
    /// Creates an empty material relation.
    #[must_use]
    pub const fn new(name: Option<String>, schema: Schema) -> Self {
        Self {
            name,
            schema,
            rows: Vec::new(),
        }
    }

    /// The relation's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The number of stored tuples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when no tuples are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a tuple after validating arity, per-position type, and
    /// nullability against the schema.
    ///
    /// # Errors
    ///
    /// Returns a type error when the tuple does not fit the schema.
    pub fn insert(&mut self, values: Tuple) -> Result<()> {
        self.schema.check_tuple(&values)?;
        self.rows.push(values);
        Ok(())
    }

    /// Returns the tuple at `index`, if present.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Tuple> {
        self.rows.get(index)
    }

    /// Discards every tuple past `len`. Used to restore the pre-statement
    /// state when a multi-row insert fails partway.
    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }
}

impl Relation for MaterialRelation {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(self.rows.iter().map(|row| Ok(row.clone())))
    }
}

/// A shared handle to a catalog-owned base relation.
///
/// The handle clones the schema (immutable after creation) but reads rows
/// through the shared buffer, so an insert through the catalog is visible
/// to every operator tree holding the handle.
#[derive(Debug, Clone)]
pub struct Table {
    relation: Rc<RefCell<MaterialRelation>>,
    schema: Schema,
}

impl Table {
    /// Creates a handle to a shared base relation.
    #[must_use]
    pub fn new(relation: Rc<RefCell<MaterialRelation>>) -> Self {
        let schema = relation.borrow().schema().clone();
        Self { relation, schema }
    }
}

impl Relation for Table {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(TableRows {
            relation: Rc::clone(&self.relation),
            position: 0,
        })
    }
}

/// Index-based pass over a shared base relation. Borrows the buffer only
/// for the duration of each step.
struct TableRows {
    relation: Rc<RefCell<MaterialRelation>>,
    position: usize,
}

impl Iterator for TableRows {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.relation.borrow().row(self.position).cloned()?;
        self.position += 1;
        Some(Ok(row))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::schema::Column;
    use crate::value::DataType;

    /// Builds a two-column (a INTEGER, b STRING) relation with the given
    /// rows, for operator tests.
    pub(crate) fn int_str_relation(rows: &[(i64, &str)]) -> MaterialRelation {
        let schema = Schema::new(vec![
            Column::new("a", DataType::Integer),
            Column::new("b", DataType::Text),
        ]);
        let mut relation = MaterialRelation::new(Some(String::from("t")), schema);
        for (a, b) in rows {
            relation
                .insert(vec![Value::Int(*a), Value::Str((*b).to_string())])
                .unwrap();
        }
        relation
    }

    /// Builds a single-column nullable INTEGER relation.
    pub(crate) fn int_relation(rows: &[Option<i64>]) -> MaterialRelation {
        let schema = Schema::new(vec![Column::new("a", DataType::Integer)]);
        let mut relation = MaterialRelation::new(Some(String::from("t")), schema);
        for row in rows {
            relation
                .insert(vec![row.map_or(Value::Null, Value::Int)])
                .unwrap();
        }
        relation
    }

    /// Collects a full pass, panicking on evaluation errors.
    pub(crate) fn collect(relation: &dyn Relation) -> Vec<Tuple> {
        relation.rows().map(Result::unwrap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{collect, int_str_relation};
    use super::*;
    use crate::error::Error;
    use crate::schema::Column;
    use crate::value::DataType;

    #[test]
    fn test_insert_and_iterate_in_order() {
        let relation = int_str_relation(&[(1, "a"), (2, "b")]);
        assert_eq!(relation.len(), 2);
        assert_eq!(
            collect(&relation),
            vec![
                vec![Value::Int(1), Value::Str("a".into())],
                vec![Value::Int(2), Value::Str("b".into())],
            ]
        );
    }

    #[test]
    fn test_insert_validates() {
        let mut relation = int_str_relation(&[]);
        assert!(matches!(
            relation.insert(vec![Value::Int(1)]),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            relation.insert(vec![Value::Str("x".into()), Value::Str("y".into())]),
            Err(Error::Type(_))
        ));
        assert!(relation.is_empty());
    }

    #[test]
    fn test_not_null_column_rejects_null() {
        let schema = Schema::new(vec![
            Column::new("a", DataType::Integer).with_nullable(false)
        ]);
        let mut relation = MaterialRelation::new(None, schema);
        assert!(relation.insert(vec![Value::Null]).is_err());
        assert!(relation.insert(vec![Value::Int(1)]).is_ok());
    }

    #[test]
    fn test_restartable_passes() {
        let relation = int_str_relation(&[(1, "a")]);
        assert_eq!(collect(&relation).len(), 1);
        assert_eq!(collect(&relation).len(), 1);
    }

    #[test]
    fn test_table_handle_sees_inserts() {
        let relation = Rc::new(RefCell::new(int_str_relation(&[(1, "a")])));
        let table = Table::new(Rc::clone(&relation));
        assert_eq!(collect(&table).len(), 1);

        relation
            .borrow_mut()
            .insert(vec![Value::Int(2), Value::Str("b".into())])
            .unwrap();
        assert_eq!(collect(&table).len(), 2);
    }

    #[test]
    fn test_truncate_restores_size() {
        let mut relation = int_str_relation(&[(1, "a"), (2, "b"), (3, "c")]);
        relation.truncate(1);
        assert_eq!(relation.len(), 1);
    }
}
