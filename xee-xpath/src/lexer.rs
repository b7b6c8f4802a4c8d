use logos::{Lexer, Logos};

use crate::error::{Error, Result, Span};

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[\u{20}\u{9}\u{d}\u{a}]+")]
#[logos(subpattern name_start_char = r"[A-Za-z_\u{c0}-\u{d6}\u{d8}-\u{f6}\u{f8}-\u{2ff}\u{370}-\u{37d}\u{37f}-\u{1fff}\u{200c}-\u{200d}\u{2070}-\u{218f}\u{2c00}-\u{2fef}\u{3001}-\u{d7ff}\u{f900}-\u{fdcf}\u{fdf0}-\u{fffd}\u{10000}-\u{effff}]")]
#[logos(subpattern name_char = r"(?&name_start_char)|[\-\.0-9\u{b7}\u{300}-\u{36F}\u{203f}-\u{2040}]")]
#[logos(subpattern ncname = r"(?&name_start_char)(?&name_char)*")]
pub enum Token<'a> {
    #[regex(r"([0-9]+(\.[0-9]*)?)|(\.[0-9]+)", number_literal)]
    Number(f64),
    #[regex(r#""[^"]*"|'[^']*'"#, string_literal)]
    Literal(&'a str),
    #[regex(r"\$(?&ncname)(:(?&ncname))?", variable_reference)]
    Variable(&'a str),
    #[regex(r"(?&ncname)")]
    NCName(&'a str),

    // The following are not produced by logos directly but by the
    // disambiguation pass in `tokenize`, which knows about adjacency and the
    // preceding token.
    PrefixedName((&'a str, &'a str)),
    PrefixWildcard(&'a str),
    Multiply,
    And,
    Or,
    Div,
    Mod,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("@")]
    At,
    #[token(",")]
    Comma,
    #[token("::")]
    DoubleColon,
    #[token(":")]
    Colon,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("|")]
    Pipe,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("=")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEqual,
    #[token("*")]
    Asterisk,
}

fn number_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn string_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> &'a str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

fn variable_reference<'a>(lex: &mut Lexer<'a, Token<'a>>) -> &'a str {
    &lex.slice()[1..]
}

impl Token<'_> {
    pub(crate) fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
                | Token::Multiply
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Equal
                | Token::NotEqual
                | Token::LessThan
                | Token::LessThanEqual
                | Token::GreaterThan
                | Token::GreaterThanEqual
        )
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Literal(s) => format!("literal '{}'", s),
            Token::Variable(name) => format!("variable ${}", name),
            Token::NCName(name) => format!("name '{}'", name),
            Token::PrefixedName((prefix, local)) => format!("name '{}:{}'", prefix, local),
            Token::PrefixWildcard(prefix) => format!("'{}:*'", prefix),
            other => format!("{:?}", other),
        }
    }
}

// XPath 1.0 section 3.7: if there is a preceding token and it is not one of
// `@`, `::`, `(`, `[`, `,` or an operator, then `*` is the multiply operator
// and an NCName is an operator name.
fn operator_position(previous: Option<&Token>) -> bool {
    match previous {
        None => false,
        Some(token) => !matches!(
            token,
            Token::At | Token::DoubleColon | Token::LeftParen | Token::LeftBracket | Token::Comma
        ) && !token.is_operator(),
    }
}

/// Turn an expression into a token stream with byte spans.
///
/// This runs the logos lexer and then resolves the context dependent parts
/// of XPath's lexical structure: `prefix:local` names (which may not contain
/// whitespace), `prefix:*` wildcards and operator names.
pub fn tokenize(input: &str) -> Result<Vec<(Token<'_>, Span)>> {
    let mut raw = Vec::new();
    for (token, span) in Token::lexer(input).spanned() {
        match token {
            Ok(token) => raw.push((token, span)),
            Err(()) => {
                return Err(Error::syntax(
                    format!("unexpected character '{}'", &input[span.clone()]),
                    span,
                ))
            }
        }
    }

    let mut tokens: Vec<(Token, Span)> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let (token, span) = raw[i].clone();
        let in_operator_position = operator_position(tokens.last().map(|(t, _)| t));
        match token {
            Token::NCName(name) if in_operator_position => {
                let operator = match name {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "div" => Token::Div,
                    "mod" => Token::Mod,
                    _ => {
                        return Err(Error::syntax(
                            format!("expected an operator, found '{}'", name),
                            span,
                        ))
                    }
                };
                tokens.push((operator, span));
                i += 1;
            }
            Token::NCName(prefix) if adjacent(&raw, i, Token::Colon) => {
                let (_, colon_span) = &raw[i + 1];
                match raw.get(i + 2) {
                    Some((Token::NCName(local), local_span)) if local_span.start == colon_span.end => {
                        tokens.push((
                            Token::PrefixedName((prefix, local)),
                            span.start..local_span.end,
                        ));
                        i += 3;
                    }
                    Some((Token::Asterisk, star_span)) if star_span.start == colon_span.end => {
                        tokens.push((Token::PrefixWildcard(prefix), span.start..star_span.end));
                        i += 3;
                    }
                    _ => {
                        return Err(Error::syntax(
                            "expected a local name after ':'",
                            colon_span.clone(),
                        ))
                    }
                }
            }
            Token::Asterisk if in_operator_position => {
                tokens.push((Token::Multiply, span));
                i += 1;
            }
            Token::Colon => {
                return Err(Error::syntax("unexpected ':'", span));
            }
            token => {
                tokens.push((token, span));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

fn adjacent(raw: &[(Token, Span)], i: usize, expected: Token) -> bool {
    match (raw.get(i), raw.get(i + 1)) {
        (Some((_, span)), Some((token, next_span))) => {
            *token == expected && span.end == next_span.start
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            kinds("//a/text()"),
            vec![
                Token::DoubleSlash,
                Token::NCName("a"),
                Token::Slash,
                Token::NCName("text"),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("a = 'b'").unwrap();
        assert_eq!(tokens[0], (Token::NCName("a"), 0..1));
        assert_eq!(tokens[1], (Token::Equal, 2..3));
        assert_eq!(tokens[2], (Token::Literal("b"), 4..7));
    }

    #[test]
    fn test_star_as_name_test_and_multiply() {
        assert_eq!(
            kinds("* * *"),
            vec![Token::Asterisk, Token::Multiply, Token::Asterisk]
        );
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(
            kinds("div div div"),
            vec![Token::NCName("div"), Token::Div, Token::NCName("div")]
        );
        assert_eq!(
            kinds("a and b or c mod 2"),
            vec![
                Token::NCName("a"),
                Token::And,
                Token::NCName("b"),
                Token::Or,
                Token::NCName("c"),
                Token::Mod,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_prefixed_names() {
        assert_eq!(
            kinds("xhtml:p/svg:*"),
            vec![
                Token::PrefixedName(("xhtml", "p")),
                Token::Slash,
                Token::PrefixWildcard("svg"),
            ]
        );
    }

    #[test]
    fn test_axis_is_not_prefixed_name() {
        assert_eq!(
            kinds("child::a"),
            vec![Token::NCName("child"), Token::DoubleColon, Token::NCName("a")]
        );
    }

    #[test]
    fn test_numbers_and_dots() {
        assert_eq!(
            kinds(". .. .5 1.5 3"),
            vec![
                Token::Dot,
                Token::DotDot,
                Token::Number(0.5),
                Token::Number(1.5),
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_variable() {
        assert_eq!(kinds("$foo"), vec![Token::Variable("foo")]);
    }

    #[test]
    fn test_names_with_hyphens() {
        assert_eq!(
            kinds("following-sibling::a-b"),
            vec![
                Token::NCName("following-sibling"),
                Token::DoubleColon,
                Token::NCName("a-b"),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let error = tokenize("a # b").unwrap_err();
        assert_eq!(error.span(), Some(2..3));
    }

    #[test]
    fn test_unterminated_literal() {
        assert!(tokenize("'abc").is_err());
    }

    #[test]
    fn test_spaced_prefix_is_error() {
        assert!(tokenize("a : b").is_err());
    }
}
