//! Typed expression trees with SQL three-valued logic.
//!
//! Expressions type-check at construction: every constructor rejects
//! operands whose reported types are incompatible, so a built tree is
//! always well-typed. Evaluation against a row is pure; NULL propagates
//! according to the three-valued-logic rules, with the usual AND/OR
//! short circuits.

use crate::error::{Error, Result};
use crate::schema::Column;
use crate::value::{compare_values, DataType, Value};
use core::cmp::Ordering;

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    LtEq,
    Eq,
    GtEq,
    Gt,
    NotEq,
}

/// A typed expression over the columns of one schema.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant value.
    Constant(Value),
    /// A bound column reference.
    Attribute {
        /// The referenced column.
        column: Column,
        /// The column's position, extracted at construction.
        index: usize,
    },
    /// A cast to a target type.
    Cast {
        /// The input expression.
        input: Box<Expr>,
        /// The target type.
        target: DataType,
    },
    /// A binary arithmetic operation over numeric operands.
    Arithmetic {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        /// Float if either operand is Float, else Integer.
        output: DataType,
    },
    /// Numeric negation.
    UnaryMinus(Box<Expr>),
    /// A comparison between two operands of the same ground type.
    Comparison {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Logical AND.
    And(Box<Expr>, Box<Expr>),
    /// Logical OR.
    Or(Box<Expr>, Box<Expr>),
    /// Logical NOT.
    Not(Box<Expr>),
    /// IS NULL.
    IsNull(Box<Expr>),
    /// IS NOT NULL.
    IsNotNull(Box<Expr>),
}

impl Expr {
    /// Creates a constant expression.
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// The NULL constant.
    #[must_use]
    pub const fn null() -> Self {
        Self::Constant(Value::Null)
    }

    /// Creates an attribute reference from a bound column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column has not been bound to a schema
    /// position.
    pub fn attribute(column: Column) -> Result<Self> {
        let index = column.index.ok_or_else(|| {
            Error::Invalid(format!(
                "column '{}' is not bound to a schema position",
                column.display_name()
            ))
        })?;
        Ok(Self::Attribute { column, index })
    }

    /// Creates a cast expression.
    ///
    /// The cast matrix admits everything except BOOLEAN↔FLOAT and casting
    /// the NULL constant; identity casts are permitted. String parses fail
    /// at evaluation time, not here.
    ///
    /// # Errors
    ///
    /// Returns a type error for a cast outside the matrix.
    pub fn cast(input: Self, target: DataType) -> Result<Self> {
        let source = input
            .value_type()
            .ok_or_else(|| Error::type_error("cannot cast NULL"))?;
        match (source, target) {
            (DataType::Boolean, DataType::Float) => {
                Err(Error::type_error("cannot cast BOOLEAN to FLOAT"))
            }
            (DataType::Float, DataType::Boolean) => {
                Err(Error::type_error("cannot cast FLOAT to BOOLEAN"))
            }
            _ => Ok(Self::Cast {
                input: Box::new(input),
                target,
            }),
        }
    }

    /// Creates an arithmetic expression over numeric operands.
    ///
    /// # Errors
    ///
    /// Returns a type error if either operand is non-numeric.
    pub fn arithmetic(op: ArithOp, lhs: Self, rhs: Self) -> Result<Self> {
        let (l, r) = (lhs.value_type(), rhs.value_type());
        if !(is_numeric(l) && is_numeric(r)) {
            return Err(Error::type_error(format!(
                "operands to '{}' must be numeric",
                op.as_str()
            )));
        }
        let output = if l == Some(DataType::Float) || r == Some(DataType::Float) {
            DataType::Float
        } else {
            DataType::Integer
        };
        Ok(Self::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            output,
        })
    }

    /// Creates a numeric negation.
    ///
    /// # Errors
    ///
    /// Returns a type error if the operand is non-numeric.
    pub fn unary_minus(input: Self) -> Result<Self> {
        if !is_numeric(input.value_type()) {
            return Err(Error::type_error("operand to unary minus must be numeric"));
        }
        Ok(Self::UnaryMinus(Box::new(input)))
    }

    /// Creates a comparison expression.
    ///
    /// Both operands must have the same ground type; there is no numeric
    /// promotion here, and NULL-typed operands are rejected (use IS NULL).
    ///
    /// # Errors
    ///
    /// Returns a type error on mismatched or NULL-typed operands.
    pub fn comparison(op: CmpOp, lhs: Self, rhs: Self) -> Result<Self> {
        match (lhs.value_type(), rhs.value_type()) {
            (Some(l), Some(r)) if l == r => Ok(Self::Comparison {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
            _ => Err(Error::type_error(
                "comparison operands must have the same type",
            )),
        }
    }

    /// Creates a logical AND.
    ///
    /// # Errors
    ///
    /// Returns a type error unless both operands are boolean.
    pub fn and(lhs: Self, rhs: Self) -> Result<Self> {
        require_boolean(&lhs, "AND")?;
        require_boolean(&rhs, "AND")?;
        Ok(Self::And(Box::new(lhs), Box::new(rhs)))
    }

    /// Creates a logical OR.
    ///
    /// # Errors
    ///
    /// Returns a type error unless both operands are boolean.
    pub fn or(lhs: Self, rhs: Self) -> Result<Self> {
        require_boolean(&lhs, "OR")?;
        require_boolean(&rhs, "OR")?;
        Ok(Self::Or(Box::new(lhs), Box::new(rhs)))
    }

    /// Creates a logical NOT.
    ///
    /// # Errors
    ///
    /// Returns a type error unless the operand is boolean.
    pub fn not(input: Self) -> Result<Self> {
        require_boolean(&input, "NOT")?;
        Ok(Self::Not(Box::new(input)))
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(input: Self) -> Self {
        Self::IsNull(Box::new(input))
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(input: Self) -> Self {
        Self::IsNotNull(Box::new(input))
    }

    /// Returns the type the expression evaluates to, or `None` for the
    /// NULL constant.
    #[must_use]
    pub fn value_type(&self) -> Option<DataType> {
        match self {
            Self::Constant(v) => v.data_type(),
            Self::Attribute { column, .. } => Some(column.data_type),
            Self::Cast { target, .. } => Some(*target),
            Self::Arithmetic { output, .. } => Some(*output),
            Self::UnaryMinus(e) => e.value_type(),
            Self::Comparison { .. }
            | Self::And(..)
            | Self::Or(..)
            | Self::Not(_)
            | Self::IsNull(_)
            | Self::IsNotNull(_) => Some(DataType::Boolean),
        }
    }

    /// Returns true if the expression can evaluate to NULL.
    #[must_use]
    pub fn nullable(&self) -> bool {
        match self {
            Self::Constant(v) => v.is_null(),
            Self::Attribute { column, .. } => column.nullable,
            Self::Cast { input, .. } => input.nullable(),
            Self::Arithmetic { lhs, rhs, .. } => lhs.nullable() || rhs.nullable(),
            Self::UnaryMinus(e) | Self::Not(e) => e.nullable(),
            Self::Comparison { lhs, rhs, .. } | Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.nullable() || rhs.nullable()
            }
            Self::IsNull(_) | Self::IsNotNull(_) => false,
        }
    }

    /// Evaluates the expression against a row.
    ///
    /// # Errors
    ///
    /// Returns an arithmetic error for division by zero or integer
    /// overflow, and a type error for failed string-to-value casts.
    pub fn evaluate(&self, row: &[Value]) -> Result<Value> {
        match self {
            Self::Constant(v) => Ok(v.clone()),
            Self::Attribute { index, column } => row.get(*index).cloned().ok_or_else(|| {
                Error::Invalid(format!(
                    "row has no position {index} for column '{}'",
                    column.display_name()
                ))
            }),
            Self::Cast { input, target } => {
                let value = input.evaluate(row)?;
                cast_value(value, *target)
            }
            Self::Arithmetic { op, lhs, rhs, .. } => {
                let l = lhs.evaluate(row)?;
                if l.is_null() {
                    return Ok(Value::Null);
                }
                let r = rhs.evaluate(row)?;
                if r.is_null() {
                    return Ok(Value::Null);
                }
                eval_arithmetic(*op, &l, &r)
            }
            Self::UnaryMinus(e) => match e.evaluate(row)? {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(Error::IntegerOverflow),
                Value::Float(x) => Ok(Value::Float(-x)),
                other => Err(Error::type_error(format!("cannot negate {other}"))),
            },
            Self::Comparison { op, lhs, rhs } => {
                let l = lhs.evaluate(row)?;
                if l.is_null() {
                    return Ok(Value::Null);
                }
                let r = rhs.evaluate(row)?;
                if r.is_null() {
                    return Ok(Value::Null);
                }
                let ordering = compare_values(&l, &r, true);
                Ok(Value::Bool(match op {
                    CmpOp::Lt => ordering == Ordering::Less,
                    CmpOp::LtEq => ordering != Ordering::Greater,
                    CmpOp::Eq => ordering == Ordering::Equal,
                    CmpOp::GtEq => ordering != Ordering::Less,
                    CmpOp::Gt => ordering == Ordering::Greater,
                    CmpOp::NotEq => ordering != Ordering::Equal,
                }))
            }
            Self::And(lhs, rhs) => match lhs.evaluate(row)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => rhs.evaluate(row),
                _ => match rhs.evaluate(row)? {
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    _ => Ok(Value::Null),
                },
            },
            Self::Or(lhs, rhs) => match lhs.evaluate(row)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => rhs.evaluate(row),
                _ => match rhs.evaluate(row)? {
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    _ => Ok(Value::Null),
                },
            },
            Self::Not(e) => match e.evaluate(row)? {
                Value::Null => Ok(Value::Null),
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(Error::type_error(format!("cannot apply NOT to {other}"))),
            },
            Self::IsNull(e) => Ok(Value::Bool(e.evaluate(row)?.is_null())),
            Self::IsNotNull(e) => Ok(Value::Bool(!e.evaluate(row)?.is_null())),
        }
    }
}

fn is_numeric(data_type: Option<DataType>) -> bool {
    data_type.is_some_and(|t| t.is_numeric())
}

fn require_boolean(expr: &Expr, op: &str) -> Result<()> {
    if expr.value_type() == Some(DataType::Boolean) {
        Ok(())
    } else {
        Err(Error::type_error(format!(
            "operands of {op} must be booleans"
        )))
    }
}

/// Applies an arithmetic operator to two non-null numeric values.
/// Integer/Integer stays in integer arithmetic with truncated division;
/// any Float operand promotes the operation to floats.
fn eval_arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            ArithOp::Add => a.checked_add(*b),
            ArithOp::Sub => a.checked_sub(*b),
            ArithOp::Mul => a.checked_mul(*b),
            ArithOp::Div => {
                if *b == 0 {
                    return Err(Error::DivisionByZero);
                }
                a.checked_div(*b)
            }
            ArithOp::Mod => {
                if *b == 0 {
                    return Err(Error::DivisionByZero);
                }
                a.checked_rem(*b)
            }
        };
        return result.map(Value::Int).ok_or(Error::IntegerOverflow);
    }

    let a = numeric_as_f64(lhs)?;
    let b = numeric_as_f64(rhs)?;
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            a / b
        }
        ArithOp::Mod => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            a % b
        }
    };
    Ok(Value::Float(result))
}

fn numeric_as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(x) => Ok(*x),
        other => Err(Error::type_error(format!("{other} is not numeric"))),
    }
}

/// Casts a runtime value to a target type. NULL passes through every
/// allowed cast; the construction-time matrix has already excluded the
/// illegal type pairs.
fn cast_value(value: Value, target: DataType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match (value, target) {
        (v @ Value::Bool(_), DataType::Boolean)
        | (v @ Value::Int(_), DataType::Integer)
        | (v @ Value::Float(_), DataType::Float)
        | (v @ Value::Str(_), DataType::Text) => Ok(v),

        (Value::Bool(b), DataType::Integer) => Ok(Value::Int(i64::from(b))),
        (Value::Bool(b), DataType::Text) => {
            Ok(Value::Str(String::from(if b { "true" } else { "false" })))
        }

        (Value::Int(i), DataType::Boolean) => Ok(Value::Bool(i != 0)),
        (Value::Int(i), DataType::Float) => Ok(Value::Float(i as f64)),
        (Value::Int(i), DataType::Text) => Ok(Value::Str(i.to_string())),

        (Value::Float(x), DataType::Integer) => {
            if x.is_finite() {
                Ok(Value::Int(x.trunc() as i64))
            } else {
                Err(Error::type_error(format!(
                    "cannot cast non-finite float {x} to INTEGER"
                )))
            }
        }
        (Value::Float(x), DataType::Text) => Ok(Value::Str(x.to_string())),

        (Value::Str(s), DataType::Boolean) => match s.to_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(Error::type_error(format!(
                "string '{s}' is an invalid boolean"
            ))),
        },
        (Value::Str(s), DataType::Integer) => s.parse::<i64>().map(Value::Int).map_err(|_| {
            Error::type_error(format!("string '{s}' is an invalid integer"))
        }),
        (Value::Str(s), DataType::Float) => s.parse::<f64>().map(Value::Float).map_err(|_| {
            Error::type_error(format!("string '{s}' is an invalid float"))
        }),

        (value, target) => Err(Error::type_error(format!(
            "unsupported cast of {value} to {target}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn int_col(name: &str, nullable: bool) -> Column {
        Column::new(name, DataType::Integer).with_nullable(nullable)
    }

    fn attr(schema: &Schema, name: &str) -> Expr {
        Expr::attribute(schema.column(name).cloned().unwrap()).unwrap()
    }

    fn schema_ab() -> Schema {
        Schema::new(vec![int_col("a", true), int_col("b", false)])
    }

    #[test]
    fn test_constant() {
        let c = Expr::constant(42i64);
        assert_eq!(c.value_type(), Some(DataType::Integer));
        assert!(!c.nullable());
        assert_eq!(c.evaluate(&[]).unwrap(), Value::Int(42));

        let n = Expr::null();
        assert_eq!(n.value_type(), None);
        assert!(n.nullable());
    }

    #[test]
    fn test_attribute_requires_binding() {
        let unbound = Column::new("x", DataType::Integer);
        assert!(Expr::attribute(unbound).is_err());

        let schema = schema_ab();
        let a = attr(&schema, "a");
        assert_eq!(a.value_type(), Some(DataType::Integer));
        assert!(a.nullable());
        assert_eq!(
            a.evaluate(&[Value::Int(7), Value::Int(8)]).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn test_arithmetic_types_and_promotion() {
        let int_int = Expr::arithmetic(
            ArithOp::Add,
            Expr::constant(1i64),
            Expr::constant(2i64),
        )
        .unwrap();
        assert_eq!(int_int.value_type(), Some(DataType::Integer));

        let mixed = Expr::arithmetic(
            ArithOp::Mul,
            Expr::constant(1i64),
            Expr::constant(2.5f64),
        )
        .unwrap();
        assert_eq!(mixed.value_type(), Some(DataType::Float));
        assert_eq!(mixed.evaluate(&[]).unwrap(), Value::Float(2.5));

        assert!(Expr::arithmetic(
            ArithOp::Add,
            Expr::constant("x"),
            Expr::constant(1i64)
        )
        .is_err());
        assert!(
            Expr::arithmetic(ArithOp::Add, Expr::null(), Expr::constant(1i64)).is_err()
        );
    }

    #[test]
    fn test_integer_division_truncates() {
        let div = |a: i64, b: i64| {
            Expr::arithmetic(ArithOp::Div, Expr::constant(a), Expr::constant(b))
                .unwrap()
                .evaluate(&[])
                .unwrap()
        };
        assert_eq!(div(7, 2), Value::Int(3));
        assert_eq!(div(-7, 2), Value::Int(-3));
        assert_eq!(div(20, 2), Value::Int(10));
    }

    #[test]
    fn test_true_division_on_floats() {
        let div = Expr::arithmetic(
            ArithOp::Div,
            Expr::constant(7.0f64),
            Expr::constant(2.0f64),
        )
        .unwrap();
        assert_eq!(div.evaluate(&[]).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn test_division_by_zero() {
        let int_div =
            Expr::arithmetic(ArithOp::Div, Expr::constant(1i64), Expr::constant(0i64)).unwrap();
        assert_eq!(int_div.evaluate(&[]), Err(Error::DivisionByZero));

        let float_mod = Expr::arithmetic(
            ArithOp::Mod,
            Expr::constant(1.0f64),
            Expr::constant(0.0f64),
        )
        .unwrap();
        assert_eq!(float_mod.evaluate(&[]), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_integer_overflow() {
        let add = Expr::arithmetic(
            ArithOp::Add,
            Expr::constant(i64::MAX),
            Expr::constant(1i64),
        )
        .unwrap();
        assert_eq!(add.evaluate(&[]), Err(Error::IntegerOverflow));
    }

    #[test]
    fn test_arithmetic_null_propagates() {
        let schema = schema_ab();
        let add = Expr::arithmetic(ArithOp::Add, attr(&schema, "a"), Expr::constant(1i64))
            .unwrap();
        assert!(add.nullable());
        assert_eq!(
            add.evaluate(&[Value::Null, Value::Int(0)]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_unary_minus() {
        let neg = Expr::unary_minus(Expr::constant(5i64)).unwrap();
        assert_eq!(neg.evaluate(&[]).unwrap(), Value::Int(-5));
        assert!(Expr::unary_minus(Expr::constant(true)).is_err());
    }

    #[test]
    fn test_comparison_requires_same_type() {
        assert!(Expr::comparison(CmpOp::Eq, Expr::constant(1i64), Expr::constant("a")).is_err());
        assert!(Expr::comparison(CmpOp::Eq, Expr::constant(1i64), Expr::null()).is_err());

        let eq = Expr::comparison(CmpOp::Eq, Expr::constant(1i64), Expr::constant(1i64)).unwrap();
        assert_eq!(eq.value_type(), Some(DataType::Boolean));
        assert_eq!(eq.evaluate(&[]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_comparison_operators() {
        let cmp = |op, a: i64, b: i64| {
            Expr::comparison(op, Expr::constant(a), Expr::constant(b))
                .unwrap()
                .evaluate(&[])
                .unwrap()
        };
        assert_eq!(cmp(CmpOp::Lt, 1, 2), Value::Bool(true));
        assert_eq!(cmp(CmpOp::LtEq, 2, 2), Value::Bool(true));
        assert_eq!(cmp(CmpOp::Eq, 2, 3), Value::Bool(false));
        assert_eq!(cmp(CmpOp::GtEq, 2, 3), Value::Bool(false));
        assert_eq!(cmp(CmpOp::Gt, 3, 2), Value::Bool(true));
        assert_eq!(cmp(CmpOp::NotEq, 3, 2), Value::Bool(true));
    }

    #[test]
    fn test_comparison_null_propagates() {
        let schema = schema_ab();
        let lt =
            Expr::comparison(CmpOp::Lt, attr(&schema, "a"), Expr::constant(3i64)).unwrap();
        assert_eq!(
            lt.evaluate(&[Value::Null, Value::Int(0)]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_and_three_valued() {
        let schema = Schema::new(vec![
            Column::new("p", DataType::Boolean),
            Column::new("q", DataType::Boolean),
        ]);
        let and = Expr::and(attr(&schema, "p"), attr(&schema, "q")).unwrap();

        let eval = |p: Value, q: Value| and.evaluate(&[p, q]).unwrap();
        assert_eq!(eval(Value::Bool(false), Value::Null), Value::Bool(false));
        assert_eq!(eval(Value::Null, Value::Bool(false)), Value::Bool(false));
        assert_eq!(eval(Value::Bool(true), Value::Null), Value::Null);
        assert_eq!(eval(Value::Null, Value::Bool(true)), Value::Null);
        assert_eq!(eval(Value::Null, Value::Null), Value::Null);
        assert_eq!(
            eval(Value::Bool(true), Value::Bool(true)),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_or_three_valued() {
        let schema = Schema::new(vec![
            Column::new("p", DataType::Boolean),
            Column::new("q", DataType::Boolean),
        ]);
        let or = Expr::or(attr(&schema, "p"), attr(&schema, "q")).unwrap();

        let eval = |p: Value, q: Value| or.evaluate(&[p, q]).unwrap();
        assert_eq!(eval(Value::Bool(true), Value::Null), Value::Bool(true));
        assert_eq!(eval(Value::Null, Value::Bool(true)), Value::Bool(true));
        assert_eq!(eval(Value::Bool(false), Value::Null), Value::Null);
        assert_eq!(eval(Value::Null, Value::Bool(false)), Value::Null);
        assert_eq!(
            eval(Value::Bool(false), Value::Bool(false)),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_logical_operand_types_checked() {
        assert!(Expr::and(Expr::constant(1i64), Expr::constant(true)).is_err());
        assert!(Expr::or(Expr::constant(true), Expr::constant("x")).is_err());
        assert!(Expr::not(Expr::constant(0i64)).is_err());
    }

    #[test]
    fn test_not() {
        let not = Expr::not(Expr::constant(true)).unwrap();
        assert_eq!(not.evaluate(&[]).unwrap(), Value::Bool(false));

        let schema = Schema::new(vec![Column::new("p", DataType::Boolean)]);
        let not_p = Expr::not(attr(&schema, "p")).unwrap();
        assert_eq!(not_p.evaluate(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_is_null_never_null() {
        let schema = schema_ab();
        let is_null = Expr::is_null(attr(&schema, "a"));
        assert!(!is_null.nullable());
        assert_eq!(
            is_null.evaluate(&[Value::Null, Value::Int(0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            is_null.evaluate(&[Value::Int(1), Value::Int(0)]).unwrap(),
            Value::Bool(false)
        );

        let is_not_null = Expr::is_not_null(attr(&schema, "a"));
        assert_eq!(
            is_not_null
                .evaluate(&[Value::Null, Value::Int(0)])
                .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_cast_matrix_rejections() {
        assert!(Expr::cast(Expr::constant(true), DataType::Float).is_err());
        assert!(Expr::cast(Expr::constant(1.5f64), DataType::Boolean).is_err());
        assert!(Expr::cast(Expr::null(), DataType::Integer).is_err());
    }

    #[test]
    fn test_identity_casts_allowed() {
        let cast = Expr::cast(Expr::constant(3i64), DataType::Integer).unwrap();
        assert_eq!(cast.evaluate(&[]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_cast_from_bool() {
        let to_int = Expr::cast(Expr::constant(true), DataType::Integer).unwrap();
        assert_eq!(to_int.evaluate(&[]).unwrap(), Value::Int(1));
        let to_str = Expr::cast(Expr::constant(false), DataType::Text).unwrap();
        assert_eq!(to_str.evaluate(&[]).unwrap(), Value::Str("false".into()));
    }

    #[test]
    fn test_cast_from_int() {
        let to_bool = Expr::cast(Expr::constant(0i64), DataType::Boolean).unwrap();
        assert_eq!(to_bool.evaluate(&[]).unwrap(), Value::Bool(false));
        let to_float = Expr::cast(Expr::constant(10i64), DataType::Float).unwrap();
        assert_eq!(to_float.evaluate(&[]).unwrap(), Value::Float(10.0));
        let to_str = Expr::cast(Expr::constant(10i64), DataType::Text).unwrap();
        assert_eq!(to_str.evaluate(&[]).unwrap(), Value::Str("10".into()));
    }

    #[test]
    fn test_cast_from_float() {
        let to_int = Expr::cast(Expr::constant(3.14f64), DataType::Integer).unwrap();
        assert_eq!(to_int.evaluate(&[]).unwrap(), Value::Int(3));
        let truncates_toward_zero =
            Expr::cast(Expr::constant(-3.9f64), DataType::Integer).unwrap();
        assert_eq!(truncates_toward_zero.evaluate(&[]).unwrap(), Value::Int(-3));
        let to_str = Expr::cast(Expr::constant(3.14f64), DataType::Text).unwrap();
        assert_eq!(to_str.evaluate(&[]).unwrap(), Value::Str("3.14".into()));
    }

    #[test]
    fn test_cast_from_string() {
        let bool_cast = |s: &str| {
            Expr::cast(Expr::constant(s), DataType::Boolean)
                .unwrap()
                .evaluate(&[])
        };
        assert_eq!(bool_cast("true").unwrap(), Value::Bool(true));
        assert_eq!(bool_cast("FALSE").unwrap(), Value::Bool(false));
        assert_eq!(bool_cast("1").unwrap(), Value::Bool(true));
        assert_eq!(bool_cast("0").unwrap(), Value::Bool(false));
        assert!(bool_cast("yes").is_err());

        let int_cast = Expr::cast(Expr::constant("-42"), DataType::Integer).unwrap();
        assert_eq!(int_cast.evaluate(&[]).unwrap(), Value::Int(-42));
        assert!(Expr::cast(Expr::constant("4x2"), DataType::Integer)
            .unwrap()
            .evaluate(&[])
            .is_err());

        let float_cast = Expr::cast(Expr::constant("2.5"), DataType::Float).unwrap();
        assert_eq!(float_cast.evaluate(&[]).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_cast_preserves_null() {
        let schema = schema_ab();
        let cast = Expr::cast(attr(&schema, "a"), DataType::Text).unwrap();
        assert!(cast.nullable());
        assert_eq!(
            cast.evaluate(&[Value::Null, Value::Int(0)]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_evaluation_matches_reported_type() {
        // For a sample of expressions: evaluate() yields the reported type
        // or NULL, and NULL only when nullable() is true.
        let schema = schema_ab();
        let exprs = vec![
            Expr::arithmetic(ArithOp::Add, attr(&schema, "a"), attr(&schema, "b")).unwrap(),
            Expr::comparison(CmpOp::Lt, attr(&schema, "a"), attr(&schema, "b")).unwrap(),
            Expr::is_null(attr(&schema, "a")),
            Expr::cast(attr(&schema, "b"), DataType::Float).unwrap(),
        ];
        let rows = [
            vec![Value::Int(1), Value::Int(2)],
            vec![Value::Null, Value::Int(2)],
        ];
        for expr in &exprs {
            for row in &rows {
                let value = expr.evaluate(row).unwrap();
                match value.data_type() {
                    Some(t) => assert_eq!(Some(t), expr.value_type()),
                    None => assert!(expr.nullable()),
                }
            }
        }
    }
}
