//! # Entiscope Search
//!
//! Search queries over documents whose fields are stored per type.
//!
//! A logical field such as `name` may hold text in one document and a number
//! in another. The index keeps one physical slot per field and type, and the
//! [`QueryTranslator`] expands a query on a field with no pinned type into a
//! disjunction over all of those slots. Relevance is the index's own OR
//! scoring; the translation adds no boosts.
//!
//! ## Example
//!
//! ```rust
//! use entiscope_search::{Document, FieldRef, FieldType, Operator, SearchIndex, SearchQuery};
//!
//! let mut index = SearchIndex::new();
//! index.add_document(Document::new("d1").with_text("name", "Acme")).unwrap();
//!
//! let untyped = SearchQuery::field(FieldRef::untyped("name"), Operator::Has, "Acme");
//! let query = index.translator().translate(&untyped).unwrap();
//! assert_eq!(index.search(&query).len(), 1);
//!
//! let numeric = SearchQuery::field(FieldRef::typed("name", FieldType::Number), Operator::Has, "Acme");
//! let query = index.translator().translate(&numeric).unwrap();
//! assert!(index.search(&query).is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod field;
mod index;
mod parser;
mod query;
mod tokenizer;
mod translator;

pub use document::{Document, Field};
pub use error::{SearchError, SearchResult};
pub use field::{FieldNamePrefixer, FieldType, FieldValue, SearchDate};
pub use index::{ScoredDocument, SearchIndex};
pub use parser::parse_query;
pub use query::{FieldRef, Operator, SearchQuery};
pub use tokenizer::Tokenizer;
pub use translator::{IndexQuery, Occur, QueryTranslator};
