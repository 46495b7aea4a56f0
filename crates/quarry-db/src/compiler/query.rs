//! Compilation of queries into relation-operator trees.

use quarry_sql::ast;
use tracing::debug;

use super::environment::ColumnEnvironment;
use super::expression::{collect_aggregates, compile_expr, AggregateRewrite};
use crate::aggregate::{
    AggregateFactory, AvgFactory, CountFactory, MaxFactory, MinFactory, SumFactory,
};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::relation::{CrossJoin, GroupBy, Projection, Relation, Selection, SetCombination};

/// Compiles a query AST into an operator tree bound to the catalog.
///
/// # Errors
///
/// Returns name, type, or invalid-operation errors for resolution
/// failures, ill-typed expressions, and incompatible set operations.
pub fn compile_query(query: &ast::Query, catalog: &Catalog) -> Result<Box<dyn Relation>> {
    match query {
        ast::Query::Select(select) => compile_select(select, catalog),
        ast::Query::Compound {
            op,
            distinct,
            left,
            right,
        } => {
            let lhs = compile_query(left, catalog)?;
            let rhs = compile_query(right, catalog)?;
            let combined = match op {
                ast::SetOp::Union => SetCombination::union(lhs, rhs, *distinct)?,
                ast::SetOp::Intersect => SetCombination::intersection(lhs, rhs, *distinct)?,
                ast::SetOp::Except => SetCombination::difference(lhs, rhs, *distinct)?,
            };
            Ok(Box::new(combined))
        }
    }
}

fn compile_select(
    select: &ast::SelectStatement,
    catalog: &Catalog,
) -> Result<Box<dyn Relation>> {
    // 1. Column environment and cross-join over the FROM items.
    let mut env = ColumnEnvironment::new();
    let mut relation: Option<Box<dyn Relation>> = None;
    for item in &select.from {
        let (source, default_qualifier): (Box<dyn Relation>, Option<String>) = match &item.source {
            ast::TableSource::Table(name) => {
                (Box::new(catalog.table(name)?), Some(name.clone()))
            }
            ast::TableSource::Subquery(query) => (compile_query(query, catalog)?, None),
        };
        let qualifier = item.alias.clone().or(default_qualifier);
        env.add_source(qualifier.as_deref(), source.schema())?;
        relation = Some(match relation {
            None => source,
            Some(joined) => Box::new(CrossJoin::new(joined, source)),
        });
    }
    let Some(mut relation) = relation else {
        // The grammar requires a FROM clause; guard anyway.
        return Err(Error::Invalid(String::from(
            "query requires at least one FROM source",
        )));
    };

    // 2. Selection.
    if let Some(predicate) = &select.predicate {
        let predicate = compile_expr(predicate, &env, None)?;
        relation = Box::new(Selection::new(relation, predicate)?);
    }

    // 3. Aggregation.
    let mut aggregate_calls = Vec::new();
    for item in &select.items {
        if let ast::SelectItem::Expression { expr, .. } = item {
            collect_aggregates(expr, &mut aggregate_calls)?;
        }
    }

    let mut rewrite = None;
    if !aggregate_calls.is_empty() || !select.group_by.is_empty() {
        let mut grouping = Vec::with_capacity(select.group_by.len());
        let mut qualifiers = Vec::with_capacity(select.group_by.len());
        for key in &select.group_by {
            let entry = env.resolve(key.qualifier.as_deref(), &key.name)?;
            grouping.push(entry.column.clone());
            qualifiers.push(entry.qualifier.clone());
        }

        let mut factories: Vec<Box<dyn AggregateFactory>> =
            Vec::with_capacity(aggregate_calls.len());
        for call in &aggregate_calls {
            factories.push(compile_aggregate(call, &env)?);
        }

        debug!(
            keys = grouping.len(),
            aggregates = factories.len(),
            "inserting group-by"
        );
        let group = GroupBy::new(relation, grouping, factories)?;
        let schema = group.schema().clone();

        // The post-aggregation environment exposes only the grouping
        // columns (under their original qualifiers) and the aggregate
        // outputs (unqualified, unnamed).
        let mut post = ColumnEnvironment::new();
        let mut outputs = Vec::with_capacity(aggregate_calls.len());
        for (i, qualifier) in qualifiers.iter().enumerate() {
            post.push(qualifier.clone(), schema.columns()[i].clone());
        }
        for column in &schema.columns()[qualifiers.len()..] {
            post.push(None, column.clone());
            outputs.push(column.clone());
        }

        rewrite = Some(AggregateRewrite::new(aggregate_calls, outputs));
        env = post;
        relation = Box::new(group);
    }

    // 4 & 5. Wildcard expansion and the final projection.
    let mut items: Vec<(Expr, Option<String>)> = Vec::new();
    for item in &select.items {
        match item {
            ast::SelectItem::Wildcard { qualifier: None } => {
                for entry in env.entries() {
                    items.push((Expr::attribute(entry.column.clone())?, None));
                }
            }
            ast::SelectItem::Wildcard {
                qualifier: Some(qualifier),
            } => {
                let entries = env.with_qualifier(qualifier);
                if entries.is_empty() {
                    return Err(Error::TableNotFound(qualifier.clone()));
                }
                for entry in entries {
                    items.push((Expr::attribute(entry.column.clone())?, None));
                }
            }
            ast::SelectItem::Expression { expr, alias } => {
                let compiled = compile_expr(expr, &env, rewrite.as_ref())?;
                items.push((compiled, alias.clone()));
            }
        }
    }

    Ok(Box::new(Projection::with_aliases(relation, items)))
}

/// Builds the factory for one collected aggregate call, compiling its
/// argument against the pre-aggregation environment.
fn compile_aggregate(
    call: &ast::Expr,
    env: &ColumnEnvironment,
) -> Result<Box<dyn AggregateFactory>> {
    let ast::Expr::Aggregate { func, arg } = call else {
        return Err(Error::Invalid(format!(
            "expected an aggregate call, found {call}"
        )));
    };

    let arg = match arg {
        Some(arg) => Some(compile_expr(arg, env, None)?),
        None => None,
    };

    Ok(match (func, arg) {
        (ast::AggregateFunc::Count, None) => Box::new(CountFactory::star()),
        (ast::AggregateFunc::Count, Some(expr)) => Box::new(CountFactory::new(expr)),
        (ast::AggregateFunc::Min, Some(expr)) => Box::new(MinFactory::new(expr)?),
        (ast::AggregateFunc::Max, Some(expr)) => Box::new(MaxFactory::new(expr)?),
        (ast::AggregateFunc::Sum, Some(expr)) => Box::new(SumFactory::new(expr)?),
        (ast::AggregateFunc::Avg, Some(expr)) => Box::new(AvgFactory::new(expr)?),
        (func, None) => {
            return Err(Error::type_error(format!(
                "{func} requires an expression argument"
            )));
        }
    })
}
