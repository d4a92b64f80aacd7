//! Search query trees.

use crate::field::FieldType;
use std::fmt;

/// Comparison between a field and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `:` (the field contains the value).
    Has,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl Operator {
    /// Returns the operator's query syntax.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Has => ":",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A logical field, optionally pinned to one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Logical field name.
    pub name: String,
    /// Pinned type; `None` searches every type.
    pub field_type: Option<FieldType>,
}

impl FieldRef {
    /// References every type of a field.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
        }
    }

    /// References one type of a field.
    pub fn typed(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type: Some(field_type),
        }
    }
}

/// A parsed search query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// A value compared against a field, or against all fields when `field`
    /// is `None`.
    Term {
        /// Target field.
        field: Option<FieldRef>,
        /// Comparison.
        op: Operator,
        /// Value text, unquoted.
        text: String,
    },
    /// Every sub-query must match.
    And(Vec<SearchQuery>),
    /// At least one sub-query must match.
    Or(Vec<SearchQuery>),
    /// The sub-query must not match.
    Not(Box<SearchQuery>),
}

impl SearchQuery {
    /// A bare value searched in all fields.
    pub fn global(text: impl Into<String>) -> Self {
        SearchQuery::Term {
            field: None,
            op: Operator::Has,
            text: text.into(),
        }
    }

    /// A value compared against a field.
    pub fn field(field: FieldRef, op: Operator, text: impl Into<String>) -> Self {
        SearchQuery::Term {
            field: Some(field),
            op,
            text: text.into(),
        }
    }

    /// Negates a query.
    #[must_use]
    pub fn negate(self) -> Self {
        SearchQuery::Not(Box::new(self))
    }
}
