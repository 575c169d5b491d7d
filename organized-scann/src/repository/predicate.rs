//! Conjunctive exact-match predicates
//!
//! A [`Predicate`] is a list of [`FilterCondition`]s that must all hold. It is
//! built once per request and handed whole to the gateway, which evaluates it
//! in memory or renders it as a SQL `WHERE` clause.

use std::fmt;

/// Value compared against a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// String equality
    Text(String),
    /// Integer equality
    Integer(i64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

/// A single `column = value` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    /// Storage column name
    pub column: &'static str,
    /// Value the column must equal
    pub value: FilterValue,
}

impl FilterCondition {
    /// Equality condition
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

/// Records that expose column values for in-memory predicate evaluation
pub trait Filterable {
    /// Current value of `column`, or `None` when the column is null or unknown
    fn column_value(&self, column: &str) -> Option<FilterValue>;
}

/// Conjunction of equality conditions; empty means "match everything"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<FilterCondition>,
}

impl Predicate {
    /// Predicate matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// AND another condition into this predicate
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Conditions in insertion order
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Whether no condition constrains the result
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate against a record; null columns never match
    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        self.conditions
            .iter()
            .all(|c| record.column_value(c.column).as_ref() == Some(&c.value))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "true");
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}
