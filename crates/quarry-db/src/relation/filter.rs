//! Selection and generalized projection.

use super::{Relation, Rows, Tuple};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::schema::{Column, Schema};
use crate::value::{DataType, Value};

/// All tuples of the input relation for which the predicate evaluates to
/// exactly `true`; `false` and NULL both exclude.
pub struct Selection {
    input: Box<dyn Relation>,
    predicate: Expr,
    schema: Schema,
}

impl Selection {
    /// Creates a selection over `input`.
    ///
    /// # Errors
    ///
    /// Returns a type error unless the predicate is boolean-valued.
    pub fn new(input: Box<dyn Relation>, predicate: Expr) -> Result<Self> {
        if predicate.value_type() != Some(DataType::Boolean) {
            return Err(Error::type_error(
                "predicate must be a boolean valued expression",
            ));
        }
        let schema = input.schema().clone();
        Ok(Self {
            input,
            predicate,
            schema,
        })
    }
}

impl Relation for Selection {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(self.input.rows().filter_map(move |item| match item {
            Ok(row) => match self.predicate.evaluate(&row) {
                Ok(Value::Bool(true)) => Some(Ok(row)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    }
}

/// One output tuple per input tuple, with attributes computed by
/// expressions over the input tuple.
///
/// Output columns take the attribute's name when an expression is a bare
/// attribute (or an explicit alias when given), and are unnamed otherwise;
/// type and nullability come from the expression.
pub struct Projection {
    input: Box<dyn Relation>,
    exprs: Vec<Expr>,
    schema: Schema,
}

impl Projection {
    /// Creates a projection with derived output names.
    #[must_use]
    pub fn new(input: Box<dyn Relation>, exprs: Vec<Expr>) -> Self {
        Self::with_aliases(input, exprs.into_iter().map(|e| (e, None)).collect())
    }

    /// Creates a projection with optional per-column aliases. An alias
    /// overrides the derived name of its column.
    #[must_use]
    pub fn with_aliases(input: Box<dyn Relation>, items: Vec<(Expr, Option<String>)>) -> Self {
        let mut exprs = Vec::with_capacity(items.len());
        let mut columns = Vec::with_capacity(items.len());
        for (expr, alias) in items {
            let name = alias.or_else(|| derived_name(&expr));
            // A bare NULL constant has no ground type of its own; its
            // output column is typed as STRING, always nullable.
            let data_type = expr.value_type().unwrap_or(DataType::Text);
            columns.push(Column::unnamed(data_type, expr.nullable()).with_name(name));
            exprs.push(expr);
        }
        let schema = Schema::new(columns);
        Self {
            input,
            exprs,
            schema,
        }
    }
}

/// Bare attributes keep their column name; everything else is unnamed.
fn derived_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Attribute { column, .. } => column.name.clone(),
        _ => None,
    }
}

impl Relation for Projection {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(self.input.rows().map(move |item| {
            let row = item?;
            self.exprs
                .iter()
                .map(|expr| expr.evaluate(&row))
                .collect::<Result<Tuple>>()
        }))
    }
}
