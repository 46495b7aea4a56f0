//! Compilation of AST expressions into typed engine expressions.

use quarry_sql::ast;

use super::environment::ColumnEnvironment;
use crate::error::{Error, Result};
use crate::expr::{ArithOp, CmpOp, Expr};
use crate::schema::Column;
use crate::value::{DataType, Value};

/// The aggregate-call substitution built during compilation of an
/// aggregated SELECT: each collected call maps to the GroupBy output
/// column that now carries its value.
pub(crate) struct AggregateRewrite {
    calls: Vec<ast::Expr>,
    outputs: Vec<Column>,
}

impl AggregateRewrite {
    pub(crate) fn new(calls: Vec<ast::Expr>, outputs: Vec<Column>) -> Self {
        Self { calls, outputs }
    }

    fn lookup(&self, call: &ast::Expr) -> Option<&Column> {
        self.calls
            .iter()
            .position(|c| c == call)
            .map(|i| &self.outputs[i])
    }
}

/// Maps a parser data type to the engine's.
pub(crate) const fn data_type(ast_type: ast::DataType) -> DataType {
    match ast_type {
        ast::DataType::Boolean => DataType::Boolean,
        ast::DataType::Integer => DataType::Integer,
        ast::DataType::Float => DataType::Float,
        ast::DataType::String => DataType::Text,
    }
}

/// Converts a parsed literal to a runtime value.
pub(crate) fn literal_value(literal: &ast::Literal) -> Value {
    match literal {
        ast::Literal::Integer(i) => Value::Int(*i),
        ast::Literal::Float(x) => Value::Float(*x),
        ast::Literal::String(s) => Value::Str(s.clone()),
        ast::Literal::Boolean(b) => Value::Bool(*b),
        ast::Literal::Null => Value::Null,
    }
}

/// Compiles an AST expression against the environment.
///
/// When a rewrite is supplied, aggregate calls resolve to their GroupBy
/// output columns; without one (WHERE clauses, aggregate arguments), any
/// aggregate call is an error.
pub(crate) fn compile_expr(
    expr: &ast::Expr,
    env: &ColumnEnvironment,
    rewrite: Option<&AggregateRewrite>,
) -> Result<Expr> {
    match expr {
        ast::Expr::Literal(literal) => Ok(Expr::Constant(literal_value(literal))),

        ast::Expr::Column(column_ref) => {
            let entry = env.resolve(column_ref.qualifier.as_deref(), &column_ref.name)?;
            Expr::attribute(entry.column.clone())
        }

        ast::Expr::Binary { left, op, right } => {
            let lhs = compile_expr(left, env, rewrite)?;
            let rhs = compile_expr(right, env, rewrite)?;
            match op {
                ast::BinaryOp::Add => Expr::arithmetic(ArithOp::Add, lhs, rhs),
                ast::BinaryOp::Sub => Expr::arithmetic(ArithOp::Sub, lhs, rhs),
                ast::BinaryOp::Mul => Expr::arithmetic(ArithOp::Mul, lhs, rhs),
                ast::BinaryOp::Div => Expr::arithmetic(ArithOp::Div, lhs, rhs),
                ast::BinaryOp::Mod => Expr::arithmetic(ArithOp::Mod, lhs, rhs),
                ast::BinaryOp::Eq => Expr::comparison(CmpOp::Eq, lhs, rhs),
                ast::BinaryOp::NotEq => Expr::comparison(CmpOp::NotEq, lhs, rhs),
                ast::BinaryOp::Lt => Expr::comparison(CmpOp::Lt, lhs, rhs),
                ast::BinaryOp::LtEq => Expr::comparison(CmpOp::LtEq, lhs, rhs),
                ast::BinaryOp::Gt => Expr::comparison(CmpOp::Gt, lhs, rhs),
                ast::BinaryOp::GtEq => Expr::comparison(CmpOp::GtEq, lhs, rhs),
                ast::BinaryOp::And => Expr::and(lhs, rhs),
                ast::BinaryOp::Or => Expr::or(lhs, rhs),
            }
        }

        ast::Expr::Unary { op, operand } => {
            let input = compile_expr(operand, env, rewrite)?;
            match op {
                ast::UnaryOp::Neg => Expr::unary_minus(input),
                ast::UnaryOp::Not => Expr::not(input),
            }
        }

        ast::Expr::IsNull {
            expr: inner,
            negated,
        } => {
            let input = compile_expr(inner, env, rewrite)?;
            Ok(if *negated {
                Expr::is_not_null(input)
            } else {
                Expr::is_null(input)
            })
        }

        ast::Expr::Cast {
            expr: inner,
            data_type: target,
        } => {
            let input = compile_expr(inner, env, rewrite)?;
            Expr::cast(input, data_type(*target))
        }

        ast::Expr::Aggregate { .. } => match rewrite.and_then(|r| r.lookup(expr)) {
            Some(column) => Expr::attribute(column.clone()),
            None => Err(Error::type_error(format!(
                "aggregate function is not allowed here: {expr}"
            ))),
        },

        ast::Expr::Wildcard { qualifier } => Err(Error::type_error(format!(
            "'{qualifier}.*' is not a value expression"
        ))),
    }
}

/// Collects the aggregate calls appearing anywhere in `expr`, in reading
/// order and deduplicated, rejecting aggregates nested inside aggregate
/// arguments.
pub(crate) fn collect_aggregates(expr: &ast::Expr, out: &mut Vec<ast::Expr>) -> Result<()> {
    match expr {
        ast::Expr::Aggregate { arg, .. } => {
            if let Some(arg) = arg {
                if contains_aggregate(arg) {
                    return Err(Error::type_error(format!(
                        "aggregate calls cannot be nested: {expr}"
                    )));
                }
            }
            if !out.contains(expr) {
                out.push(expr.clone());
            }
            Ok(())
        }
        ast::Expr::Binary { left, right, .. } => {
            collect_aggregates(left, out)?;
            collect_aggregates(right, out)
        }
        ast::Expr::Unary { operand, .. } => collect_aggregates(operand, out),
        ast::Expr::IsNull { expr: inner, .. } | ast::Expr::Cast { expr: inner, .. } => {
            collect_aggregates(inner, out)
        }
        ast::Expr::Literal(_) | ast::Expr::Column(_) | ast::Expr::Wildcard { .. } => Ok(()),
    }
}

fn contains_aggregate(expr: &ast::Expr) -> bool {
    match expr {
        ast::Expr::Aggregate { .. } => true,
        ast::Expr::Binary { left, right, .. } => {
            contains_aggregate(left) || contains_aggregate(right)
        }
        ast::Expr::Unary { operand, .. } => contains_aggregate(operand),
        ast::Expr::IsNull { expr: inner, .. } | ast::Expr::Cast { expr: inner, .. } => {
            contains_aggregate(inner)
        }
        ast::Expr::Literal(_) | ast::Expr::Column(_) | ast::Expr::Wildcard { .. } => false,
    }
}
