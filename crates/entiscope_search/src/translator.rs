//! Translation of search queries into index queries.

use crate::error::{SearchError, SearchResult};
use crate::field::{FieldNamePrefixer, FieldType};
use crate::query::{FieldRef, Operator, SearchQuery};

/// How a clause participates in a boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// The clause may match; with no `Must` clause at least one must.
    Should,
    /// The clause must not match.
    MustNot,
}

/// Query tree understood by [`SearchIndex`](crate::SearchIndex).
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// Compares one physical slot.
    Term {
        /// Physical slot name.
        slot: String,
        /// Comparison.
        op: Operator,
        /// Value text.
        text: String,
    },
    /// Boolean combination of clauses.
    Boolean(Vec<(Occur, IndexQuery)>),
}

/// Translates [`SearchQuery`] trees into [`IndexQuery`] trees.
///
/// A term on a field with no pinned type becomes a `Should` disjunction
/// over that field's slot for every [`FieldType`], in declared order. A
/// pinned term targets its one slot; a term without a field targets the
/// all-fields slot.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    all_field_name: String,
    prefixer: FieldNamePrefixer,
}

impl QueryTranslator {
    /// Creates a translator using `all_field_name` for field-less terms.
    pub fn new(all_field_name: impl Into<String>) -> Self {
        Self {
            all_field_name: all_field_name.into(),
            prefixer: FieldNamePrefixer,
        }
    }

    /// Returns the all-fields slot name.
    #[must_use]
    pub fn all_field_name(&self) -> &str {
        &self.all_field_name
    }

    /// Translates a query tree.
    pub fn translate(&self, query: &SearchQuery) -> SearchResult<IndexQuery> {
        match query {
            SearchQuery::Term { field, op, text } => Ok(self.term(field.as_ref(), *op, text)),
            SearchQuery::And(clauses) => self.boolean(clauses, Occur::Must),
            SearchQuery::Or(clauses) => self.boolean(clauses, Occur::Should),
            SearchQuery::Not(inner) => Ok(IndexQuery::Boolean(vec![(
                Occur::MustNot,
                self.translate(inner)?,
            )])),
        }
    }

    fn term(&self, field: Option<&FieldRef>, op: Operator, text: &str) -> IndexQuery {
        let slot_term = |slot: String| IndexQuery::Term {
            slot,
            op,
            text: text.to_string(),
        };
        match field {
            None => slot_term(self.all_field_name.clone()),
            Some(FieldRef {
                name,
                field_type: Some(field_type),
            }) => slot_term(self.prefixer.prefixed(name, *field_type)),
            Some(FieldRef {
                name,
                field_type: None,
            }) => IndexQuery::Boolean(
                FieldType::ALL
                    .iter()
                    .map(|&t| (Occur::Should, slot_term(self.prefixer.prefixed(name, t))))
                    .collect(),
            ),
        }
    }

    fn boolean(&self, clauses: &[SearchQuery], occur: Occur) -> SearchResult<IndexQuery> {
        if clauses.is_empty() {
            return Err(SearchError::invalid_query("empty boolean query"));
        }
        let clauses = clauses
            .iter()
            .map(|c| Ok((occur, self.translate(c)?)))
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(IndexQuery::Boolean(clauses))
    }
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new("all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn term(slot: &str, text: &str) -> IndexQuery {
        IndexQuery::Term {
            slot: slot.to_string(),
            op: Operator::Has,
            text: text.to_string(),
        }
    }

    #[test]
    fn untyped_field_fans_out_in_declared_order() {
        let translator = QueryTranslator::default();
        let query = SearchQuery::field(FieldRef::untyped("name"), Operator::Has, "Acme");

        let IndexQuery::Boolean(clauses) = translator.translate(&query).unwrap() else {
            panic!("expected a boolean query");
        };
        let slots: Vec<&str> = clauses
            .iter()
            .map(|(occur, q)| {
                assert_eq!(*occur, Occur::Should);
                match q {
                    IndexQuery::Term { slot, .. } => slot.as_str(),
                    IndexQuery::Boolean(_) => panic!("expected a term"),
                }
            })
            .collect();
        assert_eq!(
            slots,
            vec!["text:name", "html:name", "atom:name", "date:name", "number:name", "geo:name"]
        );
    }

    #[test]
    fn pinned_field_targets_one_slot() {
        let translator = QueryTranslator::default();
        let query = SearchQuery::field(
            FieldRef::typed("name", FieldType::Number),
            Operator::Has,
            "Acme",
        );
        assert_eq!(translator.translate(&query).unwrap(), term("number:name", "Acme"));
    }

    #[test]
    fn global_term_targets_all_fields_slot() {
        let translator = QueryTranslator::new("_all");
        assert_eq!(
            translator.translate(&SearchQuery::global("acme")).unwrap(),
            term("_all", "acme")
        );
    }

    #[test]
    fn boolean_structure_is_kept() {
        let translator = QueryTranslator::new("all");
        let query = SearchQuery::And(vec![
            SearchQuery::global("a"),
            SearchQuery::global("b").negate(),
        ]);
        assert_eq!(
            translator.translate(&query).unwrap(),
            IndexQuery::Boolean(vec![
                (Occur::Must, term("all", "a")),
                (
                    Occur::Must,
                    IndexQuery::Boolean(vec![(Occur::MustNot, term("all", "b"))])
                ),
            ])
        );
        assert!(translator.translate(&SearchQuery::Or(vec![])).is_err());
    }

    proptest! {
        #[test]
        fn every_untyped_term_has_one_clause_per_type(name in "[a-z]{1,8}", text in "[A-Za-z0-9]{1,8}") {
            let translator = QueryTranslator::default();
            let query = SearchQuery::field(FieldRef::untyped(name.clone()), Operator::Equal, text);
            match translator.translate(&query).unwrap() {
                IndexQuery::Boolean(clauses) => {
                    prop_assert_eq!(clauses.len(), FieldType::ALL.len());
                    for ((_, clause), ty) in clauses.iter().zip(FieldType::ALL) {
                        let expected = format!("{}:{}", ty.as_str(), name);
                        prop_assert!(matches!(clause, IndexQuery::Term { slot, .. } if *slot == expected), "clause slot mismatch for {}", expected);
                    }
                }
                IndexQuery::Term { .. } => prop_assert!(false, "expected a boolean query"),
            }
        }
    }
}
