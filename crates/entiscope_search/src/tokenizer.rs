//! Term extraction for the text, HTML and atom slots.

use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Occurrences of each term in one slot value.
pub(crate) type TermCounts = HashMap<String, usize>;

/// Turns slot values and query text into comparable terms.
///
/// Text is split on whitespace, ASCII punctuation and any extra separator;
/// terms whose length falls outside the accepted range are dropped. Case is
/// folded unless [`preserve_case`](Self::preserve_case) is set, for terms
/// and atoms alike, so that query text and stored values compare equal.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lengths: RangeInclusive<usize>,
    fold_case: bool,
    separators: Vec<char>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            lengths: 1..=256,
            fold_case: true,
            separators: Vec::new(),
        }
    }
}

impl Tokenizer {
    /// Creates a tokenizer that folds case and keeps terms of 1 to 256 bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only terms whose byte length is within `lengths`.
    #[must_use]
    pub fn term_lengths(mut self, lengths: RangeInclusive<usize>) -> Self {
        self.lengths = lengths;
        self
    }

    /// Compares terms and atoms exactly as written.
    #[must_use]
    pub fn preserve_case(mut self) -> Self {
        self.fold_case = false;
        self
    }

    /// Splits terms on these characters too.
    #[must_use]
    pub fn split_on(mut self, separators: impl IntoIterator<Item = char>) -> Self {
        self.separators.extend(separators);
        self
    }

    /// Returns the accepted term lengths.
    #[must_use]
    pub fn lengths(&self) -> &RangeInclusive<usize> {
        &self.lengths
    }

    /// Returns true if case is folded.
    #[must_use]
    pub fn folds_case(&self) -> bool {
        self.fold_case
    }

    /// Normalizes an atom, which is matched whole.
    #[must_use]
    pub fn atom(&self, value: &str) -> String {
        if self.fold_case {
            value.to_lowercase()
        } else {
            value.to_string()
        }
    }

    /// Splits text into normalized terms, in order and with repeats.
    #[must_use]
    pub fn terms(&self, text: &str) -> Vec<String> {
        text.split(|c: char| {
            c.is_whitespace() || c.is_ascii_punctuation() || self.separators.contains(&c)
        })
        .filter(|t| !t.is_empty() && self.lengths.contains(&t.len()))
        .map(|t| self.atom(t))
        .collect()
    }

    /// Counts the terms of a text value.
    pub(crate) fn text_counts(&self, text: &str) -> TermCounts {
        let mut counts = TermCounts::new();
        for term in self.terms(text) {
            *counts.entry(term).or_insert(0) += 1;
        }
        counts
    }

    /// Counts the terms of an HTML value, ignoring its markup.
    pub(crate) fn html_counts(&self, html: &str) -> TermCounts {
        self.text_counts(&strip_markup(html))
    }
}

/// Adds `other` into `counts`.
pub(crate) fn merge_counts(counts: &mut TermCounts, other: TermCounts) {
    for (term, n) in other {
        *counts.entry(term).or_insert(0) += n;
    }
}

/// Removes markup tags and decodes the common entities.
fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        assert_eq!(
            Tokenizer::new().terms("Hello, World! foo-bar"),
            vec!["hello", "world", "foo", "bar"]
        );
    }

    #[test]
    fn length_range_and_case() {
        let tokenizer = Tokenizer::new().term_lengths(3..=5).preserve_case();
        assert_eq!(tokenizer.terms("a Abc abcdef Xyz"), vec!["Abc", "Xyz"]);
        assert_eq!(tokenizer.atom("MiXed"), "MiXed");
    }

    #[test]
    fn extra_separators() {
        let tokenizer = Tokenizer::new().split_on(['|', '/']);
        assert_eq!(tokenizer.terms("one|two/three"), vec!["one", "two", "three"]);
    }

    #[test]
    fn counts_repeated_terms() {
        let counts = Tokenizer::new().text_counts("fish and Fish and chips");
        assert_eq!(counts.get("fish"), Some(&2));
        assert_eq!(counts.get("and"), Some(&2));
        assert_eq!(counts.get("chips"), Some(&1));
    }

    #[test]
    fn html_counts_skip_markup() {
        let counts = Tokenizer::new().html_counts("<p class=\"x\">Fish &amp; <b>Chips</b></p>");
        let mut terms: Vec<_> = counts.keys().cloned().collect();
        terms.sort();
        assert_eq!(terms, vec!["chips", "fish"]);
    }

    #[test]
    fn merging_adds_counts() {
        let tokenizer = Tokenizer::new();
        let mut all = tokenizer.text_counts("red fish");
        merge_counts(&mut all, tokenizer.text_counts("blue fish"));
        assert_eq!(all.get("fish"), Some(&2));
        assert_eq!(all.len(), 3);
    }
}
