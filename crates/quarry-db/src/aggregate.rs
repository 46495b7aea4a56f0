//! Aggregate functions.
//!
//! Each aggregate is split into a factory and an accumulator: the factory
//! reports the output type and nullability up front and stamps out a fresh
//! accumulator for every group, so group state never leaks between runs.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::value::{compare_values, DataType, Value};
use std::cmp::Ordering;

/// The computation of a single aggregate over one group.
pub trait Aggregate {
    /// Folds a row into the aggregate.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors from the argument expression.
    fn update(&mut self, row: &[Value]) -> Result<()>;

    /// The final value of the aggregate.
    fn finish(&self) -> Value;
}

/// Produces fresh [`Aggregate`] accumulators and reports their output
/// column type.
pub trait AggregateFactory {
    /// The type of the aggregate's output.
    fn value_type(&self) -> DataType;

    /// Whether the output can be NULL.
    fn nullable(&self) -> bool;

    /// Creates a fresh accumulator.
    fn make(&self) -> Box<dyn Aggregate>;
}

// --- COUNT ---

/// `COUNT(*)` / `COUNT(expr)`: number of rows, or of rows where the
/// expression is non-null.
pub struct CountFactory {
    expr: Option<Rc<Expr>>,
}

impl CountFactory {
    /// `COUNT(*)`.
    #[must_use]
    pub const fn star() -> Self {
        Self { expr: None }
    }

    /// `COUNT(expr)`, counting non-null evaluations.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self {
            expr: Some(Rc::new(expr)),
        }
    }
}

impl AggregateFactory for CountFactory {
    fn value_type(&self) -> DataType {
        DataType::Integer
    }

    fn nullable(&self) -> bool {
        false
    }

    fn make(&self) -> Box<dyn Aggregate> {
        Box::new(Count {
            expr: self.expr.clone(),
            count: 0,
        })
    }
}

struct Count {
    expr: Option<Rc<Expr>>,
    count: i64,
}

impl Aggregate for Count {
    fn update(&mut self, row: &[Value]) -> Result<()> {
        let counts = match &self.expr {
            None => true,
            Some(expr) => !expr.evaluate(row)?.is_null(),
        };
        if counts {
            self.count += 1;
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Int(self.count)
    }
}

// --- MIN / MAX ---

/// `MIN(expr)`: the least non-null value, NULL when there is none.
pub struct MinFactory {
    expr: Rc<Expr>,
}

impl MinFactory {
    /// Creates the factory.
    ///
    /// # Errors
    ///
    /// Returns a type error if the argument has no ground type.
    pub fn new(expr: Expr) -> Result<Self> {
        require_typed(&expr, "MIN")?;
        Ok(Self {
            expr: Rc::new(expr),
        })
    }
}

impl AggregateFactory for MinFactory {
    fn value_type(&self) -> DataType {
        // Guarded at construction.
        self.expr.value_type().unwrap_or(DataType::Integer)
    }

    fn nullable(&self) -> bool {
        // NULL when there are no non-null input rows.
        true
    }

    fn make(&self) -> Box<dyn Aggregate> {
        Box::new(Extremum {
            expr: Rc::clone(&self.expr),
            keep: Ordering::Less,
            best: Value::Null,
        })
    }
}

/// `MAX(expr)`: the greatest non-null value, NULL when there is none.
pub struct MaxFactory {
    expr: Rc<Expr>,
}

impl MaxFactory {
    /// Creates the factory.
    ///
    /// # Errors
    ///
    /// Returns a type error if the argument has no ground type.
    pub fn new(expr: Expr) -> Result<Self> {
        require_typed(&expr, "MAX")?;
        Ok(Self {
            expr: Rc::new(expr),
        })
    }
}

impl AggregateFactory for MaxFactory {
    fn value_type(&self) -> DataType {
        self.expr.value_type().unwrap_or(DataType::Integer)
    }

    fn nullable(&self) -> bool {
        true
    }

    fn make(&self) -> Box<dyn Aggregate> {
        Box::new(Extremum {
            expr: Rc::clone(&self.expr),
            keep: Ordering::Greater,
            best: Value::Null,
        })
    }
}

/// Shared accumulator for MIN and MAX: keeps the value that compares
/// `keep`-wards against the current best, skipping NULL inputs.
struct Extremum {
    expr: Rc<Expr>,
    keep: Ordering,
    best: Value,
}

impl Aggregate for Extremum {
    fn update(&mut self, row: &[Value]) -> Result<()> {
        let value = self.expr.evaluate(row)?;
        if value.is_null() {
            return Ok(());
        }
        if self.best.is_null() || compare_values(&value, &self.best, true) == self.keep {
            self.best = value;
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        self.best.clone()
    }
}

// --- SUM ---

/// `SUM(expr)`: sum of the non-null values, a typed zero when there are
/// none.
pub struct SumFactory {
    expr: Rc<Expr>,
    output: DataType,
}

impl SumFactory {
    /// Creates the factory.
    ///
    /// # Errors
    ///
    /// Returns a type error unless the argument is numeric.
    pub fn new(expr: Expr) -> Result<Self> {
        let output = require_numeric(&expr, "SUM")?;
        Ok(Self {
            expr: Rc::new(expr),
            output,
        })
    }
}

impl AggregateFactory for SumFactory {
    fn value_type(&self) -> DataType {
        self.output
    }

    fn nullable(&self) -> bool {
        false
    }

    fn make(&self) -> Box<dyn Aggregate> {
        let zero = match self.output {
            DataType::Float => Value::Float(0.0),
            _ => Value::Int(0),
        };
        Box::new(Sum {
            expr: Rc::clone(&self.expr),
            acc: zero,
        })
    }
}

struct Sum {
    expr: Rc<Expr>,
    acc: Value,
}

impl Aggregate for Sum {
    fn update(&mut self, row: &[Value]) -> Result<()> {
        let value = self.expr.evaluate(row)?;
        self.acc = match (&self.acc, &value) {
            (_, Value::Null) => return Ok(()),
            (Value::Int(acc), Value::Int(v)) => {
                Value::Int(acc.checked_add(*v).ok_or(Error::IntegerOverflow)?)
            }
            (Value::Float(acc), Value::Int(v)) => Value::Float(acc + *v as f64),
            (Value::Float(acc), Value::Float(v)) => Value::Float(acc + v),
            (acc, v) => {
                return Err(Error::type_error(format!("cannot add {v} to {acc}")));
            }
        };
        Ok(())
    }

    fn finish(&self) -> Value {
        self.acc.clone()
    }
}

// --- AVG ---

/// `AVG(expr)`: float mean of the non-null values, NULL when there are
/// none.
pub struct AvgFactory {
    expr: Rc<Expr>,
}

impl AvgFactory {
    /// Creates the factory.
    ///
    /// # Errors
    ///
    /// Returns a type error unless the argument is numeric.
    pub fn new(expr: Expr) -> Result<Self> {
        require_numeric(&expr, "AVG")?;
        Ok(Self {
            expr: Rc::new(expr),
        })
    }
}

impl AggregateFactory for AvgFactory {
    fn value_type(&self) -> DataType {
        DataType::Float
    }

    fn nullable(&self) -> bool {
        true
    }

    fn make(&self) -> Box<dyn Aggregate> {
        Box::new(Avg {
            expr: Rc::clone(&self.expr),
            sum: 0.0,
            count: 0,
        })
    }
}

struct Avg {
    expr: Rc<Expr>,
    sum: f64,
    count: u64,
}

impl Aggregate for Avg {
    fn update(&mut self, row: &[Value]) -> Result<()> {
        match self.expr.evaluate(row)? {
            Value::Null => {}
            Value::Int(i) => {
                self.sum += i as f64;
                self.count += 1;
            }
            Value::Float(x) => {
                self.sum += x;
                self.count += 1;
            }
            other => {
                return Err(Error::type_error(format!("cannot average {other}")));
            }
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float(self.sum / self.count as f64)
        }
    }
}

fn require_typed(expr: &Expr, name: &str) -> Result<DataType> {
    expr.value_type()
        .ok_or_else(|| Error::type_error(format!("{name} requires a typed expression")))
}

fn require_numeric(expr: &Expr, name: &str) -> Result<DataType> {
    let data_type = require_typed(expr, name)?;
    if data_type.is_numeric() {
        Ok(data_type)
    } else {
        Err(Error::type_error(format!(
            "{name} requires a numeric expression"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Schema};

    fn int_attr() -> Expr {
        let schema = Schema::new(vec![Column::new("a", DataType::Integer)]);
        Expr::attribute(schema.columns()[0].clone()).unwrap()
    }

    fn run(factory: &dyn AggregateFactory, rows: &[Option<i64>]) -> Value {
        let mut aggregate = factory.make();
        for row in rows {
            aggregate
                .update(&[row.map_or(Value::Null, Value::Int)])
                .unwrap();
        }
        aggregate.finish()
    }

    #[test]
    fn test_count_star_counts_everything() {
        let factory = CountFactory::star();
        assert_eq!(factory.value_type(), DataType::Integer);
        assert!(!factory.nullable());
        assert_eq!(run(&factory, &[Some(1), None, Some(3)]), Value::Int(3));
        assert_eq!(run(&factory, &[]), Value::Int(0));
    }

    #[test]
    fn test_count_expr_skips_nulls() {
        let factory = CountFactory::new(int_attr());
        assert_eq!(run(&factory, &[Some(1), None, Some(3)]), Value::Int(2));
        assert_eq!(run(&factory, &[None, None]), Value::Int(0));
    }

    #[test]
    fn test_min_max() {
        let min = MinFactory::new(int_attr()).unwrap();
        let max = MaxFactory::new(int_attr()).unwrap();
        let rows = &[Some(5), None, Some(2), Some(9)];
        assert_eq!(run(&min, rows), Value::Int(2));
        assert_eq!(run(&max, rows), Value::Int(9));
    }

    #[test]
    fn test_min_max_all_null_is_null() {
        let min = MinFactory::new(int_attr()).unwrap();
        assert!(min.nullable());
        assert_eq!(run(&min, &[None, None]), Value::Null);
        assert_eq!(run(&min, &[]), Value::Null);
    }

    #[test]
    fn test_min_accepts_strings() {
        let schema = Schema::new(vec![Column::new("s", DataType::Text)]);
        let attr = Expr::attribute(schema.columns()[0].clone()).unwrap();
        let factory = MinFactory::new(attr).unwrap();
        let mut aggregate = factory.make();
        for s in ["pear", "apple", "plum"] {
            aggregate.update(&[Value::Str(s.into())]).unwrap();
        }
        assert_eq!(aggregate.finish(), Value::Str("apple".into()));
    }

    #[test]
    fn test_sum_skips_nulls_but_not_zeros() {
        let factory = SumFactory::new(int_attr()).unwrap();
        assert_eq!(factory.value_type(), DataType::Integer);
        assert!(!factory.nullable());
        assert_eq!(run(&factory, &[Some(1), Some(0), None, Some(4)]), Value::Int(5));
    }

    #[test]
    fn test_sum_empty_is_typed_zero() {
        let int_sum = SumFactory::new(int_attr()).unwrap();
        assert_eq!(run(&int_sum, &[]), Value::Int(0));

        let schema = Schema::new(vec![Column::new("x", DataType::Float)]);
        let float_attr = Expr::attribute(schema.columns()[0].clone()).unwrap();
        let float_sum = SumFactory::new(float_attr).unwrap();
        assert_eq!(float_sum.value_type(), DataType::Float);
        assert_eq!(float_sum.make().finish(), Value::Float(0.0));
    }

    #[test]
    fn test_sum_rejects_non_numeric() {
        let schema = Schema::new(vec![Column::new("s", DataType::Text)]);
        let attr = Expr::attribute(schema.columns()[0].clone()).unwrap();
        assert!(SumFactory::new(attr).is_err());
    }

    #[test]
    fn test_avg_skips_nulls_and_counts_zeros() {
        let factory = AvgFactory::new(int_attr()).unwrap();
        assert_eq!(factory.value_type(), DataType::Float);
        assert!(factory.nullable());
        assert_eq!(
            run(&factory, &[Some(11), Some(12), None]),
            Value::Float(11.5)
        );
        // A zero participates in the mean; it is not "missing".
        assert_eq!(run(&factory, &[Some(0), Some(2)]), Value::Float(1.0));
    }

    #[test]
    fn test_avg_empty_is_null() {
        let factory = AvgFactory::new(int_attr()).unwrap();
        assert_eq!(run(&factory, &[]), Value::Null);
        assert_eq!(run(&factory, &[None]), Value::Null);
    }

    #[test]
    fn test_avg_rejects_non_numeric() {
        let schema = Schema::new(vec![Column::new("b", DataType::Boolean)]);
        let attr = Expr::attribute(schema.columns()[0].clone()).unwrap();
        assert!(AvgFactory::new(attr).is_err());
    }

    #[test]
    fn test_factories_make_independent_accumulators() {
        let factory = CountFactory::star();
        let mut first = factory.make();
        first.update(&[Value::Int(1)]).unwrap();
        let second = factory.make();
        assert_eq!(first.finish(), Value::Int(1));
        assert_eq!(second.finish(), Value::Int(0));
    }
}
