//! Set operations via sort-merge.
//!
//! Both inputs are wrapped in ascending whole-tuple sorts (NULLs last) and
//! merged linearly. The merge semantics for the bag (`ALL`) variants follow
//! the engine's historical behavior rather than standard SQL bag counting:
//! an intersection emits a matching left run followed by the matching right
//! run, and a difference emits a left run only when the right side has no
//! occurrence of that tuple at all. The distinct variants filter
//! consecutive duplicates from the merged (sorted) output.

use std::cmp::Ordering;
use std::collections::VecDeque;

use super::{Relation, Rows, Sort, Tuple};
use crate::error::Result;
use crate::schema::Schema;
use crate::value::compare_tuples;

/// Which set operation a [`SetCombination`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetOpKind {
    Union,
    Intersect,
    Except,
}

/// A set operation over two schema-compatible relations.
///
/// The inputs must have the same number of columns with pairwise equal
/// types; the output schema takes names from the left side and OR-combines
/// nullability.
pub struct SetCombination {
    kind: SetOpKind,
    distinct: bool,
    lhs: Sort,
    rhs: Sort,
    schema: Schema,
}

impl SetCombination {
    fn new(
        kind: SetOpKind,
        lhs: Box<dyn Relation>,
        rhs: Box<dyn Relation>,
        distinct: bool,
    ) -> Result<Self> {
        let schema = Schema::merge_compatible(lhs.schema(), rhs.schema())?;
        Ok(Self {
            kind,
            distinct,
            lhs: Sort::by_tuple(lhs)?,
            rhs: Sort::by_tuple(rhs)?,
            schema,
        })
    }

    /// All tuples from both inputs.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error when the schemas are not
    /// compatible for set operations.
    pub fn union(lhs: Box<dyn Relation>, rhs: Box<dyn Relation>, distinct: bool) -> Result<Self> {
        Self::new(SetOpKind::Union, lhs, rhs, distinct)
    }

    /// Tuples present in both inputs.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error when the schemas are not
    /// compatible for set operations.
    pub fn intersection(
        lhs: Box<dyn Relation>,
        rhs: Box<dyn Relation>,
        distinct: bool,
    ) -> Result<Self> {
        Self::new(SetOpKind::Intersect, lhs, rhs, distinct)
    }

    /// Tuples present in the left input but not the right.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error when the schemas are not
    /// compatible for set operations.
    pub fn difference(
        lhs: Box<dyn Relation>,
        rhs: Box<dyn Relation>,
        distinct: bool,
    ) -> Result<Self> {
        Self::new(SetOpKind::Except, lhs, rhs, distinct)
    }
}

impl Relation for SetCombination {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn rows(&self) -> Rows<'_> {
        let merge = MergeRows::new(self.kind, self.lhs.rows(), self.rhs.rows());
        if self.distinct {
            Box::new(Dedup {
                inner: Box::new(merge),
                last: None,
            })
        } else {
            Box::new(merge)
        }
    }
}

/// Linear merge of two sorted tuple streams.
struct MergeRows<'a> {
    kind: SetOpKind,
    lhs: Rows<'a>,
    rhs: Rows<'a>,
    lhs_head: Option<Tuple>,
    rhs_head: Option<Tuple>,
    /// Buffered run emissions (used by the intersection).
    pending: VecDeque<Tuple>,
    primed: bool,
    failed: bool,
}

impl<'a> MergeRows<'a> {
    fn new(kind: SetOpKind, lhs: Rows<'a>, rhs: Rows<'a>) -> Self {
        Self {
            kind,
            lhs,
            rhs,
            lhs_head: None,
            rhs_head: None,
            pending: VecDeque::new(),
            primed: false,
            failed: false,
        }
    }

    fn advance_lhs(&mut self) -> Result<()> {
        self.lhs_head = self.lhs.next().transpose()?;
        Ok(())
    }

    fn advance_rhs(&mut self) -> Result<()> {
        self.rhs_head = self.rhs.next().transpose()?;
        Ok(())
    }

    fn lhs_matches(&self, value: &Tuple) -> bool {
        self.lhs_head
            .as_ref()
            .is_some_and(|head| compare_tuples(head, value, true) == Ordering::Equal)
    }

    fn rhs_matches(&self, value: &Tuple) -> bool {
        self.rhs_head
            .as_ref()
            .is_some_and(|head| compare_tuples(head, value, true) == Ordering::Equal)
    }

    /// Moves every leading left tuple equal to `value` into `pending`.
    fn buffer_lhs_run(&mut self, value: &Tuple) -> Result<()> {
        while self.lhs_matches(value) {
            if let Some(tuple) = self.lhs_head.take() {
                self.pending.push_back(tuple);
            }
            self.advance_lhs()?;
        }
        Ok(())
    }

    /// Moves every leading right tuple equal to `value` into `pending`.
    fn buffer_rhs_run(&mut self, value: &Tuple) -> Result<()> {
        while self.rhs_matches(value) {
            if let Some(tuple) = self.rhs_head.take() {
                self.pending.push_back(tuple);
            }
            self.advance_rhs()?;
        }
        Ok(())
    }

    /// Drops every leading left tuple equal to `value`.
    fn skip_lhs_run(&mut self, value: &Tuple) -> Result<()> {
        while self.lhs_matches(value) {
            self.advance_lhs()?;
        }
        Ok(())
    }

    /// Compares the two heads, if both streams still have one.
    fn head_ordering(&self) -> Option<Ordering> {
        match (&self.lhs_head, &self.rhs_head) {
            (Some(l), Some(r)) => Some(compare_tuples(l, r, true)),
            _ => None,
        }
    }

    fn step(&mut self) -> Result<Option<Tuple>> {
        if !self.primed {
            self.primed = true;
            self.advance_lhs()?;
            self.advance_rhs()?;
        }

        if let Some(tuple) = self.pending.pop_front() {
            return Ok(Some(tuple));
        }

        match self.kind {
            SetOpKind::Union => self.step_union(),
            SetOpKind::Intersect => self.step_intersection(),
            SetOpKind::Except => self.step_difference(),
        }
    }

    fn emit_lhs(&mut self) -> Result<Option<Tuple>> {
        let tuple = self.lhs_head.take();
        self.advance_lhs()?;
        Ok(tuple)
    }

    fn emit_rhs(&mut self) -> Result<Option<Tuple>> {
        let tuple = self.rhs_head.take();
        self.advance_rhs()?;
        Ok(tuple)
    }

    /// Emits the smaller head; ties go left, preserving multiplicities.
    fn step_union(&mut self) -> Result<Option<Tuple>> {
        match (self.lhs_head.is_some(), self.rhs_head.is_some()) {
            (true, true) => {
                if self.head_ordering() == Some(Ordering::Greater) {
                    self.emit_rhs()
                } else {
                    self.emit_lhs()
                }
            }
            (true, false) => self.emit_lhs(),
            (false, true) => self.emit_rhs(),
            (false, false) => Ok(None),
        }
    }

    /// On a match, emits the whole left run then the whole right run.
    fn step_intersection(&mut self) -> Result<Option<Tuple>> {
        loop {
            match self.head_ordering() {
                None => return Ok(None),
                Some(Ordering::Less) => self.advance_lhs()?,
                Some(Ordering::Greater) => self.advance_rhs()?,
                Some(Ordering::Equal) => {
                    let Some(value) = self.lhs_head.clone() else {
                        return Ok(None);
                    };
                    self.buffer_lhs_run(&value)?;
                    self.buffer_rhs_run(&value)?;
                    return Ok(self.pending.pop_front());
                }
            }
        }
    }

    /// Emits left runs with no equal tuple on the right; a matching right
    /// occurrence cancels the entire left run.
    fn step_difference(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.lhs_head.is_none() {
                return Ok(None);
            }
            match self.head_ordering() {
                // Right side exhausted: the rest of the left stream passes
                // through untouched.
                None => return self.emit_lhs(),
                Some(Ordering::Less) => {
                    let Some(value) = self.lhs_head.clone() else {
                        return Ok(None);
                    };
                    self.buffer_lhs_run(&value)?;
                    return Ok(self.pending.pop_front());
                }
                Some(Ordering::Equal) => {
                    let Some(value) = self.lhs_head.clone() else {
                        return Ok(None);
                    };
                    self.skip_lhs_run(&value)?;
                }
                Some(Ordering::Greater) => self.advance_rhs()?,
            }
        }
    }
}

impl Iterator for MergeRows<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(Some(tuple)) => Some(Ok(tuple)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Removes consecutive duplicate tuples from a sorted stream.
struct Dedup<'a> {
    inner: Rows<'a>,
    last: Option<Tuple>,
}

impl Iterator for Dedup<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(tuple) => {
                    if self.last.as_ref() == Some(&tuple) {
                        continue;
                    }
                    self.last = Some(tuple.clone());
                    return Some(Ok(tuple));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
