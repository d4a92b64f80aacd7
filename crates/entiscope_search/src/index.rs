//! In-memory search index with one physical slot per typed field.

use crate::document::Document;
use crate::error::{SearchError, SearchResult};
use crate::field::{FieldNamePrefixer, FieldValue, SearchDate};
use crate::parser::parse_query;
use crate::query::Operator;
use crate::tokenizer::{merge_counts, TermCounts, Tokenizer};
use crate::translator::{IndexQuery, Occur, QueryTranslator};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A matching document and its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Document identifier.
    pub id: String,
    /// Sum of the scores of the matching clauses.
    pub score: f64,
}

#[derive(Debug, Clone)]
enum SlotValue {
    /// Term to occurrence count.
    Terms(TermCounts),
    Atom(String),
    Number(f64),
    Date(SearchDate),
    Geo(f64, f64),
}

#[derive(Debug, Default)]
struct IndexedDocument {
    slots: HashMap<String, Vec<SlotValue>>,
}

/// In-memory full-text index.
///
/// Each field is stored under its `"{type}:{field}"` slot. Text, HTML and
/// atom values are also tokenized into the all-fields slot.
///
/// # Example
///
/// ```rust
/// use entiscope_search::{Document, SearchIndex};
///
/// let mut index = SearchIndex::new();
/// index.add_document(Document::new("d1").with_text("name", "Acme Corp")).unwrap();
///
/// let hits = index.query("name:acme").unwrap();
/// assert_eq!(hits[0].id, "d1");
/// ```
#[derive(Debug)]
pub struct SearchIndex {
    tokenizer: Tokenizer,
    translator: QueryTranslator,
    prefixer: FieldNamePrefixer,
    documents: BTreeMap<String, IndexedDocument>,
}

impl SearchIndex {
    /// Creates an empty index with the default tokenizer and `"all"` as
    /// the all-fields slot.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Tokenizer::default(), "all")
    }

    /// Creates an empty index.
    pub fn with_config(tokenizer: Tokenizer, all_field_name: impl Into<String>) -> Self {
        Self {
            tokenizer,
            translator: QueryTranslator::new(all_field_name),
            prefixer: FieldNamePrefixer,
            documents: BTreeMap::new(),
        }
    }

    /// Returns the tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Returns the translator used by [`query`](Self::query).
    #[must_use]
    pub fn translator(&self) -> &QueryTranslator {
        &self.translator
    }

    /// Returns the number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no document is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns true if a document with this id is indexed.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Indexes a document, replacing any document with the same id.
    ///
    /// Returns true if a document was replaced.
    pub fn add_document(&mut self, document: Document) -> SearchResult<bool> {
        if document.id().is_empty() {
            return Err(SearchError::invalid_document("", "empty document id"));
        }

        let mut indexed = IndexedDocument::default();
        for field in document.fields() {
            if field.name.is_empty() {
                return Err(SearchError::invalid_document(document.id(), "empty field name"));
            }
            let slot = self.prefixer.prefixed(&field.name, field.value.field_type());
            let value = match &field.value {
                FieldValue::Text(text) => {
                    let counts = self.tokenizer.text_counts(text);
                    self.add_to_all(&mut indexed, counts.clone());
                    SlotValue::Terms(counts)
                }
                FieldValue::Html(html) => {
                    let counts = self.tokenizer.html_counts(html);
                    self.add_to_all(&mut indexed, counts.clone());
                    SlotValue::Terms(counts)
                }
                FieldValue::Atom(atom) => {
                    self.add_to_all(&mut indexed, self.tokenizer.text_counts(atom));
                    SlotValue::Atom(self.tokenizer.atom(atom))
                }
                FieldValue::Number(n) => {
                    if !n.is_finite() {
                        return Err(SearchError::invalid_document(
                            document.id(),
                            format!("field '{}' is not a finite number", field.name),
                        ));
                    }
                    SlotValue::Number(*n)
                }
                FieldValue::Date(date) => SlotValue::Date(*date),
                FieldValue::GeoPoint {
                    latitude,
                    longitude,
                } => {
                    if !(-90.0..=90.0).contains(latitude) || !(-180.0..=180.0).contains(longitude) {
                        return Err(SearchError::invalid_document(
                            document.id(),
                            format!("field '{}' is not a valid geo point", field.name),
                        ));
                    }
                    SlotValue::Geo(*latitude, *longitude)
                }
            };
            indexed.slots.entry(slot).or_default().push(value);
        }

        let replaced = self
            .documents
            .insert(document.id().to_string(), indexed)
            .is_some();
        debug!(id = document.id(), replaced, "Indexed search document");
        Ok(replaced)
    }

    /// Removes a document. Returns true if it was indexed.
    pub fn remove_document(&mut self, id: &str) -> bool {
        self.documents.remove(id).is_some()
    }

    /// Removes every document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Runs an index query.
    ///
    /// Results are ordered by descending score, then by id.
    #[must_use]
    pub fn search(&self, query: &IndexQuery) -> Vec<ScoredDocument> {
        let mut hits: Vec<ScoredDocument> = self
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                self.score(doc, query).map(|score| ScoredDocument {
                    id: id.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        debug!(hits = hits.len(), "Search completed");
        hits
    }

    /// Parses, translates and runs a query string.
    pub fn query(&self, input: &str) -> SearchResult<Vec<ScoredDocument>> {
        let parsed = parse_query(input)?;
        let translated = self.translator.translate(&parsed)?;
        Ok(self.search(&translated))
    }

    fn add_to_all(&self, indexed: &mut IndexedDocument, counts: TermCounts) {
        let values = indexed
            .slots
            .entry(self.translator.all_field_name().to_string())
            .or_default();
        match values.first_mut() {
            Some(SlotValue::Terms(all)) => merge_counts(all, counts),
            _ => values.push(SlotValue::Terms(counts)),
        }
    }

    fn score(&self, doc: &IndexedDocument, query: &IndexQuery) -> Option<f64> {
        match query {
            IndexQuery::Term { slot, op, text } => doc
                .slots
                .get(slot)?
                .iter()
                .filter_map(|value| self.match_value(value, *op, text))
                .reduce(f64::max),
            IndexQuery::Boolean(clauses) => {
                let mut total = 0.0;
                let mut has_must = false;
                let mut has_should = false;
                let mut matched_should = false;
                for (occur, clause) in clauses {
                    let score = self.score(doc, clause);
                    match occur {
                        Occur::Must => {
                            has_must = true;
                            total += score?;
                        }
                        Occur::Should => {
                            has_should = true;
                            if let Some(s) = score {
                                matched_should = true;
                                total += s;
                            }
                        }
                        Occur::MustNot => {
                            if score.is_some() {
                                return None;
                            }
                        }
                    }
                }
                if has_should && !has_must && !matched_should {
                    return None;
                }
                Some(total)
            }
        }
    }

    fn match_value(&self, value: &SlotValue, op: Operator, text: &str) -> Option<f64> {
        match value {
            SlotValue::Terms(counts) => {
                let terms = self.tokenizer.terms(text);
                if terms.is_empty() {
                    return None;
                }
                let present = terms.iter().all(|t| counts.contains_key(t));
                match op {
                    Operator::Has | Operator::Equal if present => {
                        Some(terms.iter().filter_map(|t| counts.get(t)).sum::<usize>() as f64)
                    }
                    Operator::NotEqual if !present => Some(1.0),
                    _ => None,
                }
            }
            SlotValue::Atom(atom) => {
                let equal = *atom == self.tokenizer.atom(text);
                match op {
                    Operator::Has | Operator::Equal if equal => Some(1.0),
                    Operator::NotEqual if !equal => Some(1.0),
                    _ => None,
                }
            }
            SlotValue::Number(n) => {
                let wanted: f64 = text.trim().parse().ok()?;
                compare(op, n.partial_cmp(&wanted)?).then_some(1.0)
            }
            SlotValue::Date(date) => {
                let wanted = SearchDate::parse(text)?;
                compare(op, date.cmp(&wanted)).then_some(1.0)
            }
            SlotValue::Geo(lat, lon) => {
                let (a, b) = text.split_once(',')?;
                let wanted: (f64, f64) = (a.trim().parse().ok()?, b.trim().parse().ok()?);
                let equal = (*lat, *lon) == wanted;
                match op {
                    Operator::Has | Operator::Equal if equal => Some(1.0),
                    Operator::NotEqual if !equal => Some(1.0),
                    _ => None,
                }
            }
        }
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(op: Operator, ordering: Ordering) -> bool {
    match op {
        Operator::Has | Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanOrEqual => ordering != Ordering::Greater,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanOrEqual => ordering != Ordering::Less,
    }
}
