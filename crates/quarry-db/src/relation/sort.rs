//! Materializing sort.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::{Relation, Rows, Tuple};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::{compare_tuples, compare_values};

/// Sorts its input on first pull and replays the buffered order on every
/// later pass.
///
/// With a key, tuples compare pairwise on the key positions; without one,
/// in full lexicographic tuple order. NULL sorts after every non-null
/// value when `nulls_last`, before otherwise; two NULLs compare equal.
/// The sort is stable: equal-key tuples keep their input order.
pub struct Sort {
    input: Box<dyn Relation>,
    schema: Schema,
    key: Option<Vec<usize>>,
    descending: bool,
    nulls_last: bool,
    buffer: RefCell<Option<Rc<Vec<Tuple>>>>,
}

impl Sort {
    /// Creates a sort over `input` by the given key positions, or by whole
    /// tuples when `key` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error if a key position is outside the
    /// input schema.
    pub fn new(
        input: Box<dyn Relation>,
        key: Option<Vec<usize>>,
        descending: bool,
        nulls_last: bool,
    ) -> Result<Self> {
        if let Some(key) = &key {
            for &index in key {
                if index >= input.schema().len() {
                    return Err(Error::Invalid(format!(
                        "sort key position {index} is not a column of the relation"
                    )));
                }
            }
        }
        let schema = input.schema().clone();
        Ok(Self {
            input,
            schema,
            key,
            descending,
            nulls_last,
            buffer: RefCell::new(None),
        })
    }

    /// Ascending whole-tuple sort with NULLs last; the shape the sort-merge
    /// set operations and grouping rely on.
    ///
    /// # Errors
    ///
    /// Never fails for a whole-tuple key; kept fallible for uniformity.
    pub fn by_tuple(input: Box<dyn Relation>) -> Result<Self> {
        Self::new(input, None, false, true)
    }

    fn compare(&self, lhs: &Tuple, rhs: &Tuple) -> Ordering {
        let ordering = match &self.key {
            Some(key) => {
                let mut ordering = Ordering::Equal;
                for &index in key {
                    ordering = compare_values(&lhs[index], &rhs[index], self.nulls_last);
                    if ordering != Ordering::Equal {
                        break;
                    }
                }
                ordering
            }
            None => compare_tuples(lhs, rhs, self.nulls_last),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }

    fn materialize(&self) -> Result<Vec<Tuple>> {
        let mut rows = Vec::new();
        for row in self.input.rows() {
            rows.push(row?);
        }
        rows.sort_by(|a, b| self.compare(a, b));
        Ok(rows)
    }
}

impl Relation for Sort {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        let cached = self.buffer.borrow().clone();
        let rows = match cached {
            Some(rows) => rows,
            None => match self.materialize() {
                Ok(rows) => {
                    let rows = Rc::new(rows);
                    *self.buffer.borrow_mut() = Some(Rc::clone(&rows));
                    rows
                }
                // Errors are not cached; a later pass retries.
                Err(e) => return Box::new(std::iter::once(Err(e))),
            },
        };
        Box::new(BufferRows { rows, position: 0 })
    }
}

/// Replays a materialized buffer.
struct BufferRows {
    rows: Rc<Vec<Tuple>>,
    position: usize,
}

impl Iterator for BufferRows {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.position).cloned()?;
        self.position += 1;
        Some(Ok(row))
    }
}
