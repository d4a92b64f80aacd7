//! Untyped field queries fanned out across typed slots.

use entiscope_search::{
    parse_query, Document, FieldRef, FieldType, IndexQuery, Occur, Operator, QueryTranslator,
    SearchDate, SearchIndex, SearchQuery,
};

fn corpus() -> SearchIndex {
    let mut index = SearchIndex::new();
    index
        .add_document(Document::new("acme").with_text("name", "Acme"))
        .unwrap();
    index
        .add_document(
            Document::new("numbered")
                .with_number("name", 42.0)
                .with_date("founded", SearchDate::new(1999, 1, 1).unwrap()),
        )
        .unwrap();
    index
}

#[test]
fn untyped_field_matches_its_text_variant_only_when_unpinned() {
    let index = corpus();
    let translator = index.translator();

    let untyped = SearchQuery::field(FieldRef::untyped("name"), Operator::Has, "Acme");
    let hits = index.search(&translator.translate(&untyped).unwrap());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "acme");

    let numeric = SearchQuery::field(
        FieldRef::typed("name", FieldType::Number),
        Operator::Has,
        "Acme",
    );
    assert!(index.search(&translator.translate(&numeric).unwrap()).is_empty());
}

#[test]
fn one_field_name_can_hold_several_types() {
    let index = corpus();
    let ids = |q: &str| -> Vec<String> {
        index
            .query(q)
            .unwrap()
            .into_iter()
            .map(|hit| hit.id)
            .collect()
    };

    assert_eq!(ids("name = 42"), vec!["numbered"]);
    assert_eq!(ids("name:acme"), vec!["acme"]);
    assert_eq!(ids("name:acme OR name = 42"), vec!["acme", "numbered"]);
    assert_eq!(ids("founded < 2000-01-01"), vec!["numbered"]);
}

#[test]
fn parsed_queries_translate_into_slot_disjunctions() {
    let translator = QueryTranslator::new("all");
    let parsed = parse_query("name:Acme NOT draft").unwrap();

    let IndexQuery::Boolean(clauses) = translator.translate(&parsed).unwrap() else {
        panic!("expected a conjunction");
    };
    assert_eq!(clauses.len(), 2);
    assert!(matches!(&clauses[0], (Occur::Must, IndexQuery::Boolean(fan)) if fan.len() == FieldType::ALL.len()));
    assert!(matches!(
        &clauses[1],
        (Occur::Must, IndexQuery::Boolean(inner))
            if matches!(inner.as_slice(), [(Occur::MustNot, IndexQuery::Term { slot, .. })] if slot == "all")
    ));
}
