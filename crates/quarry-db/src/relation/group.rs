//! Grouped aggregation.

use super::{Relation, Rows, Sort, Tuple};
use crate::aggregate::{Aggregate, AggregateFactory};
use crate::error::{Error, Result};
use crate::schema::{Column, Schema};
use crate::value::Value;

/// One output tuple per distinct combination of grouping-column values,
/// carrying the key values followed by one aggregate final per factory.
///
/// The input is sorted by the grouping columns, so groups arrive as
/// consecutive runs; each run gets fresh accumulators. With no grouping
/// columns and at least one aggregate there is a single implicit group,
/// emitted even when the input is empty.
pub struct GroupBy {
    input: Sort,
    key: Vec<usize>,
    factories: Vec<Box<dyn AggregateFactory>>,
    schema: Schema,
}

impl GroupBy {
    /// Creates a grouped aggregation over `input`.
    ///
    /// Grouping columns must be bound to positions of the input schema.
    /// The output schema keeps the grouping columns' names and appends one
    /// unnamed column per aggregate.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error for unbound or out-of-range
    /// grouping columns.
    pub fn new(
        input: Box<dyn Relation>,
        grouping: Vec<Column>,
        factories: Vec<Box<dyn AggregateFactory>>,
    ) -> Result<Self> {
        let mut key = Vec::with_capacity(grouping.len());
        for column in &grouping {
            let index = column.index.ok_or_else(|| {
                Error::Invalid(format!(
                    "grouping column '{}' is not bound to a schema position",
                    column.display_name()
                ))
            })?;
            if index >= input.schema().len() {
                return Err(Error::Invalid(format!(
                    "grouping column '{}' is not a column of the relation",
                    column.display_name()
                )));
            }
            key.push(index);
        }

        let mut columns = grouping;
        for factory in &factories {
            columns.push(Column::unnamed(factory.value_type(), factory.nullable()));
        }
        let schema = Schema::new(columns);

        let input = Sort::new(input, Some(key.clone()), false, true)?;
        Ok(Self {
            input,
            key,
            factories,
            schema,
        })
    }
}

impl Relation for GroupBy {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        Box::new(GroupRows {
            input: self.input.rows(),
            key: &self.key,
            factories: &self.factories,
            current: None,
            emitted: false,
            finished: false,
        })
    }
}

/// Walks the sorted stream forming runs of equal keys.
struct GroupRows<'a> {
    input: Rows<'a>,
    key: &'a [usize],
    factories: &'a [Box<dyn AggregateFactory>],
    current: Option<(Vec<Value>, Vec<Box<dyn Aggregate>>)>,
    emitted: bool,
    finished: bool,
}

impl GroupRows<'_> {
    fn extract_key(&self, row: &[Value]) -> Vec<Value> {
        self.key.iter().map(|&i| row[i].clone()).collect()
    }

    fn fresh_accumulators(&self) -> Vec<Box<dyn Aggregate>> {
        self.factories.iter().map(|f| f.make()).collect()
    }

    fn finish_group(key: Vec<Value>, accumulators: &[Box<dyn Aggregate>]) -> Tuple {
        let mut tuple = key;
        tuple.extend(accumulators.iter().map(|a| a.finish()));
        tuple
    }
}

impl Iterator for GroupRows<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.input.next() {
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(row)) => {
                    let row_key = self.extract_key(&row);

                    // A key change closes the current run.
                    let key_changed = self
                        .current
                        .as_ref()
                        .is_some_and(|(current_key, _)| *current_key != row_key);
                    let closed = if key_changed { self.current.take() } else { None };

                    if self.current.is_none() {
                        self.current = Some((row_key, self.fresh_accumulators()));
                    }
                    if let Some((_, accumulators)) = &mut self.current {
                        for accumulator in accumulators.iter_mut() {
                            if let Err(e) = accumulator.update(&row) {
                                self.finished = true;
                                return Some(Err(e));
                            }
                        }
                    }

                    if let Some((key, accumulators)) = closed {
                        self.emitted = true;
                        return Some(Ok(Self::finish_group(key, &accumulators)));
                    }
                }
                None => {
                    self.finished = true;
                    if let Some((key, accumulators)) = self.current.take() {
                        self.emitted = true;
                        return Some(Ok(Self::finish_group(key, &accumulators)));
                    }
                    // The implicit group over an empty input still yields
                    // one row of aggregate finals.
                    if self.key.is_empty() && !self.emitted {
                        self.emitted = true;
                        let accumulators = self.fresh_accumulators();
                        return Some(Ok(Self::finish_group(Vec::new(), &accumulators)));
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AvgFactory, CountFactory, MaxFactory, MinFactory, SumFactory};
    use crate::expr::Expr;
    use crate::relation::test_support::{collect, int_relation};
    use crate::relation::MaterialRelation;
    use crate::value::DataType;

    /// Builds a two-integer-column relation (a, b).
    fn pairs(rows: &[(i64, i64)]) -> MaterialRelation {
        let schema = Schema::new(vec![
            Column::new("a", DataType::Integer),
            Column::new("b", DataType::Integer),
        ]);
        let mut relation = MaterialRelation::new(Some(String::from("t")), schema);
        for (a, b) in rows {
            relation
                .insert(vec![Value::Int(*a), Value::Int(*b)])
                .unwrap();
        }
        relation
    }

    fn column(relation: &dyn Relation, name: &str) -> Column {
        relation.schema().column(name).cloned().unwrap()
    }

    fn attr(relation: &dyn Relation, name: &str) -> Expr {
        Expr::attribute(column(relation, name)).unwrap()
    }

    #[test]
    fn test_group_by_without_aggregates() {
        let relation = pairs(&[(1, 11), (1, 12), (3, 31), (3, 32)]);
        let a = column(&relation, "a");
        let group = GroupBy::new(Box::new(relation), vec![a], vec![]).unwrap();
        assert_eq!(
            collect(&group),
            vec![vec![Value::Int(1)], vec![Value::Int(3)]]
        );
    }

    #[test]
    fn test_group_by_with_aggregates() {
        let relation = pairs(&[(1, 11), (1, 12), (3, 31), (3, 32)]);
        let a = column(&relation, "a");
        let b = || attr(&relation, "b");
        let factories: Vec<Box<dyn AggregateFactory>> = vec![
            Box::new(MaxFactory::new(b()).unwrap()),
            Box::new(MinFactory::new(b()).unwrap()),
            Box::new(CountFactory::new(b())),
            Box::new(AvgFactory::new(b()).unwrap()),
            Box::new(SumFactory::new(b()).unwrap()),
        ];
        let group = GroupBy::new(Box::new(relation), vec![a], factories).unwrap();
        assert_eq!(
            collect(&group),
            vec![
                vec![
                    Value::Int(1),
                    Value::Int(12),
                    Value::Int(11),
                    Value::Int(2),
                    Value::Float(11.5),
                    Value::Int(23),
                ],
                vec![
                    Value::Int(3),
                    Value::Int(32),
                    Value::Int(31),
                    Value::Int(2),
                    Value::Float(31.5),
                    Value::Int(63),
                ],
            ]
        );
    }

    #[test]
    fn test_output_schema() {
        let relation = pairs(&[]);
        let a = column(&relation, "a");
        let count: Vec<Box<dyn AggregateFactory>> = vec![Box::new(CountFactory::star())];
        let group = GroupBy::new(Box::new(relation), vec![a], count).unwrap();
        let columns = group.schema().columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name.as_deref(), Some("a"));
        assert_eq!(columns[1].name, None);
        assert_eq!(columns[1].data_type, DataType::Integer);
        assert_eq!(columns[1].index, Some(1));
    }

    #[test]
    fn test_implicit_group_spans_all_rows() {
        let relation = pairs(&[(1, 11), (1, 12), (3, 31)]);
        let count: Vec<Box<dyn AggregateFactory>> = vec![Box::new(CountFactory::star())];
        let group = GroupBy::new(Box::new(relation), vec![], count).unwrap();
        assert_eq!(collect(&group), vec![vec![Value::Int(3)]]);
    }

    #[test]
    fn test_implicit_group_on_empty_input() {
        let relation = pairs(&[]);
        let b = attr(&relation, "b");
        let factories: Vec<Box<dyn AggregateFactory>> = vec![
            Box::new(CountFactory::star()),
            Box::new(MinFactory::new(b).unwrap()),
        ];
        let group = GroupBy::new(Box::new(relation), vec![], factories).unwrap();
        assert_eq!(collect(&group), vec![vec![Value::Int(0), Value::Null]]);
    }

    #[test]
    fn test_null_keys_form_one_group() {
        let relation = int_relation(&[Some(1), None, None]);
        let a = column(&relation, "a");
        let count: Vec<Box<dyn AggregateFactory>> = vec![Box::new(CountFactory::star())];
        let group = GroupBy::new(Box::new(relation), vec![a], count).unwrap();
        assert_eq!(
            collect(&group),
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Null, Value::Int(2)],
            ]
        );
    }

    #[test]
    fn test_restartable() {
        let relation = pairs(&[(1, 11), (3, 31)]);
        let a = column(&relation, "a");
        let group = GroupBy::new(Box::new(relation), vec![a], vec![]).unwrap();
        assert_eq!(collect(&group).len(), 2);
        assert_eq!(collect(&group).len(), 2);
    }

    #[test]
    fn test_unbound_grouping_column_rejected() {
        let relation = pairs(&[]);
        let unbound = Column::new("a", DataType::Integer);
        assert!(GroupBy::new(Box::new(relation), vec![unbound], vec![]).is_err());
    }
}
