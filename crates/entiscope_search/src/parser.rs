//! Query string parser.
//!
//! Grammar:
//!
//! ```text
//! query   := or
//! or      := and ("OR" and)*
//! and     := unary ("AND"? unary)*
//! unary   := "NOT" unary | primary
//! primary := "(" or ")" | term
//! term    := value | WORD op value
//! value   := WORD | QUOTED
//! op      := ":" | "=" | "!=" | "<" | "<=" | ">" | ">="
//! ```
//!
//! Adjacent terms without an operator between them are joined with AND.

use crate::error::{SearchError, SearchResult};
use crate::query::{FieldRef, Operator, SearchQuery};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Op(Operator),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ':' | '=' | '<' | '>' | '!' | '"')
}

fn lex(input: &str) -> SearchResult<Vec<(usize, Token)>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let token = match c {
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            ':' => {
                i += 1;
                Token::Op(Operator::Has)
            }
            '=' => {
                i += 1;
                Token::Op(Operator::Equal)
            }
            '<' | '>' | '!' => {
                let followed_by_eq = chars.get(i + 1) == Some(&'=');
                i += if followed_by_eq { 2 } else { 1 };
                match (c, followed_by_eq) {
                    ('<', false) => Token::Op(Operator::LessThan),
                    ('<', true) => Token::Op(Operator::LessThanOrEqual),
                    ('>', false) => Token::Op(Operator::GreaterThan),
                    ('>', true) => Token::Op(Operator::GreaterThanOrEqual),
                    ('!', true) => Token::Op(Operator::NotEqual),
                    _ => return Err(SearchError::parse(start, "expected '=' after '!'")),
                }
            }
            '"' => {
                i += 1;
                let mut text = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(SearchError::parse(start, "unterminated quote")),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') if chars.get(i + 1).is_some() => {
                            text.push(chars[i + 1]);
                            i += 2;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                Token::Quoted(text)
            }
            _ => {
                while i < chars.len() && !is_special(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Word(word),
                }
            }
        };
        tokens.push((start, token));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> SearchResult<SearchQuery> {
        let mut clauses = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            clauses.push(self.parse_and()?);
        }
        Ok(collapse(clauses, SearchQuery::Or))
    }

    fn parse_and(&mut self) -> SearchResult<SearchQuery> {
        let mut clauses = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    clauses.push(self.parse_unary()?);
                }
                Some(Token::Word(_) | Token::Quoted(_) | Token::Not | Token::LParen) => {
                    clauses.push(self.parse_unary()?);
                }
                _ => break,
            }
        }
        Ok(collapse(clauses, SearchQuery::And))
    }

    fn parse_unary(&mut self) -> SearchResult<SearchQuery> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> SearchResult<SearchQuery> {
        let position = self.position();
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(SearchError::parse(position, "unclosed parenthesis")),
                }
            }
            Some(Token::Word(word)) => match self.peek() {
                Some(Token::Op(op)) => {
                    let op = *op;
                    self.advance();
                    let value = self.parse_value()?;
                    Ok(SearchQuery::field(FieldRef::untyped(word), op, value))
                }
                _ => Ok(SearchQuery::global(word)),
            },
            Some(Token::Quoted(text)) => Ok(SearchQuery::global(text)),
            Some(other) => Err(SearchError::parse(
                position,
                format!("unexpected {}", describe(&other)),
            )),
            None => Err(SearchError::parse(position, "unexpected end of query")),
        }
    }

    fn parse_value(&mut self) -> SearchResult<String> {
        let position = self.position();
        match self.advance() {
            Some(Token::Word(text) | Token::Quoted(text)) => Ok(text),
            Some(other) => Err(SearchError::parse(
                position,
                format!("expected a value, found {}", describe(&other)),
            )),
            None => Err(SearchError::parse(position, "expected a value")),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("word '{w}'"),
        Token::Quoted(q) => format!("phrase \"{q}\""),
        Token::Op(op) => format!("operator '{op}'"),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
    }
}

fn collapse(mut clauses: Vec<SearchQuery>, combine: fn(Vec<SearchQuery>) -> SearchQuery) -> SearchQuery {
    if clauses.len() == 1 {
        if let Some(only) = clauses.pop() {
            return only;
        }
    }
    combine(clauses)
}

/// Parses a query string.
pub fn parse_query(input: &str) -> SearchResult<SearchQuery> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(SearchError::parse(0, "empty query"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.chars().count(),
    };
    let query = parser.parse_or()?;
    if parser.peek().is_some() {
        let position = parser.position();
        let token = parser.advance();
        return Err(SearchError::parse(
            position,
            format!("unexpected {}", token.as_ref().map_or_else(String::new, describe)),
        ));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, op: Operator, text: &str) -> SearchQuery {
        SearchQuery::field(FieldRef::untyped(name), op, text)
    }

    #[test]
    fn bare_word() {
        assert_eq!(parse_query("Acme").unwrap(), SearchQuery::global("Acme"));
    }

    #[test]
    fn field_terms_and_operators() {
        assert_eq!(
            parse_query("name:Acme").unwrap(),
            field("name", Operator::Has, "Acme")
        );
        assert_eq!(
            parse_query("price >= 10").unwrap(),
            field("price", Operator::GreaterThanOrEqual, "10")
        );
        assert_eq!(
            parse_query("date<2012-01-01").unwrap(),
            field("date", Operator::LessThan, "2012-01-01")
        );
        assert_eq!(
            parse_query("kind != draft").unwrap(),
            field("kind", Operator::NotEqual, "draft")
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            parse_query("title:\"hello world\"").unwrap(),
            field("title", Operator::Has, "hello world")
        );
        assert_eq!(
            parse_query("\"say \\\"hi\\\"\"").unwrap(),
            SearchQuery::global("say \"hi\"")
        );
    }

    #[test]
    fn implicit_and_with_precedence() {
        let parsed = parse_query("a b OR c").unwrap();
        assert_eq!(
            parsed,
            SearchQuery::Or(vec![
                SearchQuery::And(vec![SearchQuery::global("a"), SearchQuery::global("b")]),
                SearchQuery::global("c"),
            ])
        );
    }

    #[test]
    fn not_and_parentheses() {
        let parsed = parse_query("NOT (a OR name:b) AND c").unwrap();
        assert_eq!(
            parsed,
            SearchQuery::And(vec![
                SearchQuery::Or(vec![
                    SearchQuery::global("a"),
                    field("name", Operator::Has, "b"),
                ])
                .negate(),
                SearchQuery::global("c"),
            ])
        );
    }

    #[test]
    fn errors_carry_position() {
        assert!(matches!(parse_query(""), Err(SearchError::Parse { position: 0, .. })));
        assert!(matches!(
            parse_query("\"open"),
            Err(SearchError::Parse { position: 0, .. })
        ));
        assert!(matches!(
            parse_query("(a OR b"),
            Err(SearchError::Parse { .. })
        ));
        assert!(matches!(
            parse_query("name:"),
            Err(SearchError::Parse { position: 5, .. })
        ));
        assert!(matches!(parse_query("a )"), Err(SearchError::Parse { position: 2, .. })));
        assert!(parse_query("a ! b").is_err());
    }
}
