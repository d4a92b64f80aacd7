//! Query descriptors.

use crate::entity::Entity;
use crate::key::Key;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison operator of a property filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
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
    /// Membership in a list; the filter value must be a list of candidates
    /// expressed through [`Filter::one_of`].
    In,
}

/// Predicate tree applied to entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Compares one property against a value.
    Property {
        /// Property name.
        name: String,
        /// Comparison operator.
        op: FilterOperator,
        /// Values to compare against. Holds exactly one value except for `In`.
        values: Vec<Value>,
    },
    /// All sub-filters must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
}

impl Filter {
    /// Creates a single-value property filter.
    pub fn property(name: impl Into<String>, op: FilterOperator, value: impl Into<Value>) -> Self {
        Filter::Property {
            name: name.into(),
            op,
            values: vec![value.into()],
        }
    }

    /// Creates an `In` filter over the candidate values.
    pub fn one_of(name: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Filter::Property {
            name: name.into(),
            op: FilterOperator::In,
            values: values.into_iter().collect(),
        }
    }

    /// Evaluates the filter against an entity.
    ///
    /// A property filter never matches an entity that lacks the property or
    /// holds a value of an incomparable type.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Filter::Property { name, op, values } => {
                let Some(actual) = entity.property(name) else {
                    return false;
                };
                match op {
                    FilterOperator::In => values
                        .iter()
                        .any(|v| actual.compare(v) == Some(Ordering::Equal)),
                    _ => values
                        .first()
                        .and_then(|expected| actual.compare(expected))
                        .is_some_and(|ord| op_accepts(*op, ord)),
                }
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entity)),
        }
    }
}

fn op_accepts(op: FilterOperator, ord: Ordering) -> bool {
    match op {
        FilterOperator::Equal | FilterOperator::In => ord == Ordering::Equal,
        FilterOperator::NotEqual => ord != Ordering::Equal,
        FilterOperator::LessThan => ord == Ordering::Less,
        FilterOperator::LessThanOrEqual => ord != Ordering::Greater,
        FilterOperator::GreaterThan => ord == Ordering::Greater,
        FilterOperator::GreaterThanOrEqual => ord != Ordering::Less,
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Property to sort on.
    pub property: String,
    /// Direction.
    pub direction: SortDirection,
}

/// What the query executor materializes for every result.
///
/// Keys-only and projection are exclusive alternatives to a full fetch, which
/// the enum encodes directly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FetchMode {
    /// Key and every property.
    #[default]
    Full,
    /// Key only, with an empty property map.
    KeysOnly,
    /// Key plus exactly the named properties.
    Projection(Vec<String>),
}

/// Description of a query: kind, ancestor, predicate tree, sort and fetch mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryDescriptor {
    kind: Option<String>,
    ancestor: Option<Key>,
    filter: Option<Filter>,
    sort: Vec<SortOrder>,
    fetch: FetchMode,
}

impl QueryDescriptor {
    /// Creates a query over one kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Creates a query across all kinds.
    #[must_use]
    pub fn kindless() -> Self {
        Self::default()
    }

    /// Restricts results to descendants of `ancestor` (inclusive).
    #[must_use]
    pub fn with_ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Sets the predicate tree, replacing any previous filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Appends a sort criterion.
    #[must_use]
    pub fn sort_by(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortOrder {
            property: property.into(),
            direction,
        });
        self
    }

    /// Switches to keys-only fetching.
    #[must_use]
    pub fn keys_only(mut self) -> Self {
        self.fetch = FetchMode::KeysOnly;
        self
    }

    /// Switches to projection fetching of the given properties.
    #[must_use]
    pub fn project<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = FetchMode::Projection(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the kind filter.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the ancestor restriction.
    #[must_use]
    pub fn ancestor(&self) -> Option<&Key> {
        self.ancestor.as_ref()
    }

    /// Returns the predicate tree.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Returns the sort criteria.
    #[must_use]
    pub fn sort(&self) -> &[SortOrder] {
        &self.sort
    }

    /// Returns the fetch mode.
    #[must_use]
    pub fn fetch(&self) -> &FetchMode {
        &self.fetch
    }

    /// Sets the fetch mode.
    pub fn set_fetch(&mut self, fetch: FetchMode) {
        self.fetch = fetch;
    }

    /// Sets or clears the predicate tree.
    pub fn set_filter(&mut self, filter: Option<Filter>) {
        self.filter = filter;
    }

    /// Returns true if the entity's key satisfies the kind and ancestor
    /// restrictions and its properties satisfy the filter.
    #[must_use]
    pub fn accepts(&self, entity: &Entity) -> bool {
        if let Some(kind) = &self.kind {
            if entity.kind() != kind {
                return false;
            }
        }
        if let Some(ancestor) = &self.ancestor {
            if !entity.key().has_ancestor(ancestor) {
                return false;
            }
        }
        self.filter.as_ref().map_or(true, |f| f.matches(entity))
    }

    /// Orders two entities according to the sort criteria, falling back to
    /// key order so results are deterministic.
    #[must_use]
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        for order in &self.sort {
            let ord = match (a.property(&order.property), b.property(&order.property)) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ord = match order.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.key().cmp(b.key())
    }
}
