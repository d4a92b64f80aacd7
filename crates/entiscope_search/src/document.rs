//! Searchable documents.

use crate::field::{FieldType, FieldValue, SearchDate};

/// A named, typed field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Logical field name.
    pub name: String,
    /// Value.
    pub value: FieldValue,
}

/// A document: an identifier and its fields.
///
/// A field name may repeat with different types; each type lands in its own
/// physical slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    fields: Vec<Field>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
        self
    }

    /// Adds a text field.
    #[must_use]
    pub fn with_text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Text(text.into()))
    }

    /// Adds an HTML field.
    #[must_use]
    pub fn with_html(self, name: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Html(html.into()))
    }

    /// Adds an atom field.
    #[must_use]
    pub fn with_atom(self, name: impl Into<String>, atom: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Atom(atom.into()))
    }

    /// Adds a number field.
    #[must_use]
    pub fn with_number(self, name: impl Into<String>, number: f64) -> Self {
        self.with_field(name, FieldValue::Number(number))
    }

    /// Adds a date field.
    #[must_use]
    pub fn with_date(self, name: impl Into<String>, date: SearchDate) -> Self {
        self.with_field(name, FieldValue::Date(date))
    }

    /// Adds a geo point field.
    #[must_use]
    pub fn with_geo_point(self, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.with_field(
            name,
            FieldValue::GeoPoint {
                latitude,
                longitude,
            },
        )
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the types stored under a field name.
    #[must_use]
    pub fn field_types(&self, name: &str) -> Vec<FieldType> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.field_type())
            .collect()
    }
}
