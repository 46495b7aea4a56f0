//! The column environment used for name resolution.

use crate::error::{Error, Result};
use crate::schema::{Column, Schema};

/// One visible column: the qualifier it is reachable under and the column
/// itself, bound to its position in the joined row.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    /// Table name or alias; `None` for columns without a qualifier
    /// (unaliased subqueries, aggregate outputs).
    pub qualifier: Option<String>,
    /// The column, indexed into the joined row.
    pub column: Column,
}

/// An ordered list of visible columns, extended one FROM source at a time.
/// Positions are reassigned consecutively across sources so attribute
/// evaluation works against the cross-joined tuple.
#[derive(Debug, Default)]
pub struct ColumnEnvironment {
    entries: Vec<EnvEntry>,
}

impl ColumnEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every column of a source schema under the given qualifier.
    ///
    /// # Errors
    ///
    /// Returns a name error if the qualifier is already present.
    pub fn add_source(&mut self, qualifier: Option<&str>, schema: &Schema) -> Result<()> {
        if let Some(q) = qualifier {
            if self
                .entries
                .iter()
                .any(|entry| entry.qualifier.as_deref() == Some(q))
            {
                return Err(Error::DuplicateAlias(q.to_string()));
            }
        }
        for column in schema.columns() {
            self.push(qualifier.map(str::to_string), column.clone());
        }
        Ok(())
    }

    /// Appends a single column, rebinding it to the next position.
    pub fn push(&mut self, qualifier: Option<String>, column: Column) {
        let index = self.entries.len();
        self.entries.push(EnvEntry {
            qualifier,
            column: column.at_index(index),
        });
    }

    /// The visible columns in order.
    #[must_use]
    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    /// Resolves a column reference.
    ///
    /// An unqualified name must match exactly one entry; a qualified name
    /// additionally requires the qualifier to match.
    ///
    /// # Errors
    ///
    /// Returns a name error for zero matches (unknown) or several
    /// (ambiguous).
    pub fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<&EnvEntry> {
        let mut matches = self.entries.iter().filter(|entry| {
            entry.column.name.as_deref() == Some(name)
                && qualifier.is_none_or(|q| entry.qualifier.as_deref() == Some(q))
        });

        let display = || match qualifier {
            Some(q) => format!("{q}.{name}"),
            None => name.to_string(),
        };
        let Some(first) = matches.next() else {
            return Err(Error::ColumnNotFound(display()));
        };
        if matches.next().is_some() {
            return Err(Error::AmbiguousColumn(display()));
        }
        Ok(first)
    }

    /// The entries visible under a qualifier, for `t.*` expansion.
    #[must_use]
    pub fn with_qualifier(&self, qualifier: &str) -> Vec<&EnvEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.qualifier.as_deref() == Some(qualifier))
            .collect()
    }
}
