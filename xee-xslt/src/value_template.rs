// attribute value templates: https://www.w3.org/TR/xslt#attribute-value-templates

use crate::ast::{Expression, Namespaces};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) enum Part {
    Text(String),
    Value(Expression),
}

/// Text with embedded `{expr}` values. `{{` and `}}` stand for literal
/// braces.
#[derive(Debug, Clone)]
pub(crate) struct ValueTemplate {
    parts: Vec<Part>,
}

#[derive(Debug, PartialEq, Eq)]
enum Item<'a> {
    String(&'a str),
    Curly(char),
    Value(&'a str),
}

struct Tokenizer<'a> {
    s: &'a str,
    char_indices: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(s: &'a str) -> Self {
        Tokenizer {
            s,
            char_indices: s.char_indices().peekable(),
        }
    }

    fn next_is(&mut self, c: char) -> bool {
        if self.char_indices.peek().map(|(_, next)| *next) == Some(c) {
            self.char_indices.next();
            true
        } else {
            false
        }
    }

    // an expression runs to the first closing curly outside a string literal
    fn value(&mut self, start: usize) -> Option<Item<'a>> {
        let mut quote = None;
        for (i, c) in self.char_indices.by_ref() {
            match (quote, c) {
                (None, '}') => return Some(Item::Value(&self.s[start..i])),
                (None, '\'' | '"') => quote = Some(c),
                (Some(q), c) if q == c => quote = None,
                _ => {}
            }
        }
        None
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Item<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, c) = self.char_indices.next()?;
        match c {
            '{' if self.next_is('{') => Some(Ok(Item::Curly('{'))),
            '{' => Some(
                self.value(start + 1)
                    .ok_or_else(|| Error::ValueTemplate(self.s.to_string())),
            ),
            '}' if self.next_is('}') => Some(Ok(Item::Curly('}'))),
            '}' => Some(Err(Error::ValueTemplate(self.s.to_string()))),
            _ => {
                let end = loop {
                    match self.char_indices.peek() {
                        Some((i, '{' | '}')) => break *i,
                        Some(_) => {
                            self.char_indices.next();
                        }
                        None => break self.s.len(),
                    }
                };
                Some(Ok(Item::String(&self.s[start..end])))
            }
        }
    }
}

impl ValueTemplate {
    pub(crate) fn parse(s: &str, namespaces: &Namespaces) -> Result<Self> {
        let mut parts = Vec::new();
        let mut text = String::new();
        for item in Tokenizer::new(s) {
            match item? {
                Item::String(s) => text.push_str(s),
                Item::Curly(c) => text.push(c),
                Item::Value(expr) => {
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(Part::Value(Expression::compile(expr, namespaces)?));
                }
            }
        }
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }
        Ok(ValueTemplate { parts })
    }

    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(s: &str) -> Vec<Item> {
        Tokenizer::new(s).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_string() {
        assert_eq!(tokenize("foo"), vec![Item::String("foo")]);
    }

    #[test]
    fn test_value() {
        assert_eq!(
            tokenize("a{@b}c"),
            vec![Item::String("a"), Item::Value("@b"), Item::String("c")]
        );
    }

    #[test]
    fn test_escaped_curly() {
        assert_eq!(
            tokenize("{{x}}"),
            vec![Item::Curly('{'), Item::String("x"), Item::Curly('}')]
        );
    }

    #[test]
    fn test_curly_in_literal() {
        assert_eq!(
            tokenize("{concat('}', .)}"),
            vec![Item::Value("concat('}', .)")]
        );
    }

    #[test]
    fn test_unfinished_value() {
        assert!(matches!(
            Tokenizer::new("a{b").collect::<Result<Vec<_>>>(),
            Err(Error::ValueTemplate(_))
        ));
    }

    #[test]
    fn test_lone_closing_curly() {
        assert!(matches!(
            ValueTemplate::parse("a}b", &Namespaces::default()),
            Err(Error::ValueTemplate(_))
        ));
    }

    #[test]
    fn test_parse_merges_text() {
        let template = ValueTemplate::parse("x{{y}}{1}", &Namespaces::default()).unwrap();
        assert_eq!(template.parts().len(), 2);
        assert!(matches!(&template.parts()[0], Part::Text(text) if text == "x{y}"));
        assert!(matches!(&template.parts()[1], Part::Value(_)));
    }
}
