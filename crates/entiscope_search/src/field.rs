//! Field types and typed field values.

use std::fmt;

/// Type of a document field.
///
/// The index stores one physical slot per field name and type, so the same
/// logical field can hold text in one document and a number in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    /// Tokenized plain text.
    Text,
    /// Tokenized text with markup stripped.
    Html,
    /// Untokenized string matched as a whole.
    Atom,
    /// Calendar date.
    Date,
    /// Floating point number.
    Number,
    /// Latitude and longitude.
    GeoPoint,
}

impl FieldType {
    /// Every type, in declared order.
    pub const ALL: [FieldType; 6] = [
        FieldType::Text,
        FieldType::Html,
        FieldType::Atom,
        FieldType::Date,
        FieldType::Number,
        FieldType::GeoPoint,
    ];

    /// Returns the prefix used for this type's physical slots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Html => "html",
            FieldType::Atom => "atom",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::GeoPoint => "geo",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a logical field name and type to its physical slot name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldNamePrefixer;

impl FieldNamePrefixer {
    /// Returns `"{type}:{field}"`.
    #[must_use]
    pub fn prefixed(&self, field: &str, field_type: FieldType) -> String {
        format!("{}:{field}", field_type.as_str())
    }
}

/// A calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchDate {
    year: i32,
    month: u8,
    day: u8,
}

impl SearchDate {
    /// Creates a date, or `None` if the month or day is out of range.
    #[must_use]
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some(Self { year, month, day })
    }

    /// Parses `YYYY-MM-DD`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(3, '-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        Self::new(year, month, day)
    }
}

impl fmt::Display for SearchDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain text.
    Text(String),
    /// HTML text.
    Html(String),
    /// Untokenized string.
    Atom(String),
    /// Date.
    Date(SearchDate),
    /// Number.
    Number(f64),
    /// Latitude and longitude in degrees.
    GeoPoint {
        /// Latitude.
        latitude: f64,
        /// Longitude.
        longitude: f64,
    },
}

impl FieldValue {
    /// Returns the type of the value.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Html(_) => FieldType::Html,
            FieldValue::Atom(_) => FieldType::Atom,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::GeoPoint { .. } => FieldType::GeoPoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_slot_names() {
        let prefixer = FieldNamePrefixer;
        assert_eq!(prefixer.prefixed("name", FieldType::Text), "text:name");
        assert_eq!(prefixer.prefixed("loc", FieldType::GeoPoint), "geo:loc");
    }

    #[test]
    fn declared_order() {
        assert_eq!(FieldType::ALL[0], FieldType::Text);
        assert_eq!(FieldType::ALL[3], FieldType::Date);
        assert_eq!(FieldType::ALL[4], FieldType::Number);
    }

    #[test]
    fn dates_parse_and_order() {
        let a = SearchDate::parse("2012-03-04").unwrap();
        let b = SearchDate::parse("2012-11-01").unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "2012-03-04");
        assert!(SearchDate::parse("2012-13-01").is_none());
        assert!(SearchDate::parse("Acme").is_none());
    }
}
