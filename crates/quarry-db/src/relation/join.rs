//! Cartesian product.

use super::{Relation, Rows, Tuple};
use crate::schema::Schema;

/// The Cartesian product of two relations.
///
/// The output schema is the left columns followed by the right columns
/// with positions renumbered; emission is left-major, right-minor. Column
/// names may collide here; qualifying references is the compiler's job.
pub struct CrossJoin {
    lhs: Box<dyn Relation>,
    rhs: Box<dyn Relation>,
    schema: Schema,
}

impl CrossJoin {
    /// Creates the product of `lhs` and `rhs`.
    #[must_use]
    pub fn new(lhs: Box<dyn Relation>, rhs: Box<dyn Relation>) -> Self {
        let schema: Schema = lhs
            .schema()
            .columns()
            .iter()
            .chain(rhs.schema().columns())
            .cloned()
            .collect();
        Self { lhs, rhs, schema }
    }
}

impl Relation for CrossJoin {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(JoinRows {
            lhs: self.lhs.rows(),
            rhs: &*self.rhs,
            current: None,
            rhs_rows: None,
            failed: false,
        })
    }
}

/// Left-major iteration: each left tuple drives one full pass of the
/// right relation.
struct JoinRows<'a> {
    lhs: Rows<'a>,
    rhs: &'a dyn Relation,
    current: Option<Tuple>,
    rhs_rows: Option<Rows<'a>>,
    failed: bool,
}

impl Iterator for JoinRows<'_> {
    type Item = crate::error::Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.current.is_none() {
                match self.lhs.next()? {
                    Ok(row) => {
                        self.current = Some(row);
                        self.rhs_rows = Some(self.rhs.rows());
                    }
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }

            let Some(current) = self.current.as_ref() else {
                continue;
            };
            match self.rhs_rows.as_mut().and_then(Iterator::next) {
                Some(Ok(right)) => {
                    let mut output = current.clone();
                    output.extend(right);
                    return Some(Ok(output));
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                None => {
                    self.current = None;
                    self.rhs_rows = None;
                }
            }
        }
    }
}
