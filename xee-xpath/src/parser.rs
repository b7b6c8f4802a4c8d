use crate::ast::{
    ArithmeticOp, Axis, CompareOp, Expr, KindTest, NameTest, NodeTest, PathStart, Step,
};
use crate::error::{Error, Result, Span};
use crate::function;
use crate::lexer::{tokenize, Token};

/// Parse an XPath 1.0 expression.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        end: input.len(),
    };
    let expr = parser.expr()?;
    if let Some((token, span)) = parser.tokens.get(parser.position) {
        return Err(Error::syntax(
            format!("unexpected {} after end of expression", token.describe()),
            span.clone(),
        ));
    }
    Ok(expr)
}

const NODE_TYPES: [&str; 4] = ["comment", "text", "processing-instruction", "node"];

struct Parser<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens
            .get(self.position + offset)
            .map(|(token, _)| token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.position).map(|(token, _)| token.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> Error {
        match self.peek() {
            Some(token) => Error::syntax(
                format!("expected {}, found {}", what, token.describe()),
                self.span(),
            ),
            None => Error::syntax(
                format!("expected {}, found end of expression", what),
                self.span(),
            ),
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.equality_expr()?;
        while self.eat(&Token::And) {
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equal) => CompareOp::Equal,
                Some(Token::NotEqual) => CompareOp::NotEqual,
                _ => break,
            };
            self.position += 1;
            let right = self.relational_expr()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn relational_expr(&mut self) -> Result<Expr> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::LessThan) => CompareOp::LessThan,
                Some(Token::LessThanEqual) => CompareOp::LessThanEqual,
                Some(Token::GreaterThan) => CompareOp::GreaterThan,
                Some(Token::GreaterThanEqual) => CompareOp::GreaterThanEqual,
                _ => break,
            };
            self.position += 1;
            let right = self.additive_expr()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Subtract,
                _ => break,
            };
            self.position += 1;
            let right = self.multiplicative_expr()?;
            left = Expr::Arithmetic(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithmeticOp::Multiply,
                Some(Token::Div) => ArithmeticOp::Divide,
                Some(Token::Mod) => ArithmeticOp::Modulo,
                _ => break,
            };
            self.position += 1;
            let right = self.unary_expr()?;
            left = Expr::Arithmetic(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn is_function_call(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::NCName(name)), Some(Token::LeftParen)) => !NODE_TYPES.contains(name),
            (Some(Token::PrefixedName(..)), Some(Token::LeftParen)) => true,
            _ => false,
        }
    }

    fn path_expr(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Variable(_) | Token::Literal(_) | Token::Number(_) | Token::LeftParen) => {
                self.filter_path()
            }
            Some(Token::NCName(_) | Token::PrefixedName(..)) if self.is_function_call() => {
                self.filter_path()
            }
            Some(Token::Slash) => {
                self.position += 1;
                let steps = if self.is_step_start() {
                    self.relative_location_path(Vec::new())?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(PathStart::Root, steps))
            }
            Some(Token::DoubleSlash) => {
                self.position += 1;
                let steps = self.relative_location_path(vec![Step::descendant_or_self()])?;
                Ok(Expr::Path(PathStart::Root, steps))
            }
            _ if self.is_step_start() => {
                let steps = self.relative_location_path(Vec::new())?;
                Ok(Expr::Path(PathStart::Context, steps))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn filter_path(&mut self) -> Result<Expr> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let filter = if predicates.is_empty() {
            primary
        } else {
            Expr::Filter(Box::new(primary), predicates)
        };
        let steps = if self.eat(&Token::Slash) {
            Vec::new()
        } else if self.eat(&Token::DoubleSlash) {
            vec![Step::descendant_or_self()]
        } else {
            return Ok(filter);
        };
        let steps = self.relative_location_path(steps)?;
        Ok(Expr::Path(PathStart::Filter(Box::new(filter)), steps))
    }

    fn primary_expr(&mut self) -> Result<Expr> {
        let expr = match self.peek().cloned() {
            Some(Token::Variable(name)) => Expr::Variable(name.to_string()),
            Some(Token::Literal(value)) => Expr::Literal(value.to_string()),
            Some(Token::Number(value)) => Expr::Number(value),
            Some(Token::LeftParen) => {
                self.position += 1;
                let expr = self.expr()?;
                self.expect(&Token::RightParen, "')'")?;
                return Ok(expr);
            }
            Some(Token::NCName(name)) => {
                self.position += 1;
                return self.function_call(name);
            }
            Some(Token::PrefixedName((prefix, local))) => {
                return Err(Error::UnknownFunction(format!("{}:{}", prefix, local)))
            }
            _ => return Err(self.unexpected("a primary expression")),
        };
        self.position += 1;
        Ok(expr)
    }

    fn function_call(&mut self, name: &str) -> Result<Expr> {
        self.expect(&Token::LeftParen, "'('")?;
        let mut arguments = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                arguments.push(self.expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RightParen, "',' or ')'")?;
                break;
            }
        }
        let function = function::lookup(name, arguments.len())?;
        Ok(Expr::FunctionCall(function, arguments))
    }

    fn is_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::Asterisk
                    | Token::NCName(_)
                    | Token::PrefixedName(..)
                    | Token::PrefixWildcard(_)
            )
        )
    }

    fn relative_location_path(&mut self, mut steps: Vec<Step>) -> Result<Vec<Step>> {
        steps.push(self.step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn step(&mut self) -> Result<Step> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::Self_,
                test: NodeTest::Kind(KindTest::Node),
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Kind(KindTest::Node),
                predicates: Vec::new(),
            });
        }
        let axis = self.axis_specifier()?;
        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn axis_specifier(&mut self) -> Result<Axis> {
        if self.eat(&Token::At) {
            return Ok(Axis::Attribute);
        }
        if let (Some(Token::NCName(name)), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let name = *name;
            let span = self.span();
            let axis = Axis::from_name(name)
                .ok_or_else(|| Error::syntax(format!("unknown axis '{}'", name), span))?;
            self.position += 2;
            return Ok(axis);
        }
        Ok(Axis::Child)
    }

    fn node_test(&mut self) -> Result<NodeTest> {
        match self.peek().cloned() {
            Some(Token::Asterisk) => {
                self.position += 1;
                Ok(NodeTest::Name(NameTest::Star))
            }
            Some(Token::PrefixWildcard(prefix)) => {
                self.position += 1;
                Ok(NodeTest::Name(NameTest::Namespace(prefix.to_string())))
            }
            Some(Token::PrefixedName((prefix, local))) => {
                self.position += 1;
                Ok(NodeTest::Name(NameTest::Name {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                }))
            }
            Some(Token::NCName(name))
                if NODE_TYPES.contains(&name) && self.peek_at(1) == Some(&Token::LeftParen) =>
            {
                self.position += 2;
                let test = match name {
                    "comment" => KindTest::Comment,
                    "text" => KindTest::Text,
                    "node" => KindTest::Node,
                    _ => {
                        let span = self.span();
                        match self.advance() {
                            Some(Token::Literal(target)) => {
                                KindTest::ProcessingInstruction(Some(target.to_string()))
                            }
                            Some(Token::RightParen) => {
                                return Ok(NodeTest::Kind(KindTest::ProcessingInstruction(None)))
                            }
                            _ => {
                                return Err(Error::syntax(
                                    "expected a literal or ')' in processing-instruction()",
                                    span,
                                ))
                            }
                        }
                    }
                };
                self.expect(&Token::RightParen, "')'")?;
                Ok(NodeTest::Kind(test))
            }
            Some(Token::NCName(name)) => {
                self.position += 1;
                Ok(NodeTest::Name(NameTest::Name {
                    prefix: None,
                    local: name.to_string(),
                }))
            }
            _ => Err(self.unexpected("a node test")),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RightBracket, "']'")?;
        }
        Ok(predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Function;

    fn child(local: &str) -> Step {
        Step {
            axis: Axis::Child,
            test: NodeTest::Name(NameTest::Name {
                prefix: None,
                local: local.to_string(),
            }),
            predicates: Vec::new(),
        }
    }

    #[test]
    fn test_root_only() {
        assert_eq!(parse("/").unwrap(), Expr::Path(PathStart::Root, vec![]));
    }

    #[test]
    fn test_abbreviated_descendant() {
        assert_eq!(
            parse("//a").unwrap(),
            Expr::Path(PathStart::Root, vec![Step::descendant_or_self(), child("a")])
        );
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            parse("a/b").unwrap(),
            Expr::Path(PathStart::Context, vec![child("a"), child("b")])
        );
    }

    #[test]
    fn test_attribute_abbreviation() {
        assert_eq!(
            parse("@id").unwrap(),
            Expr::Path(
                PathStart::Context,
                vec![Step {
                    axis: Axis::Attribute,
                    test: NodeTest::Name(NameTest::Name {
                        prefix: None,
                        local: "id".to_string()
                    }),
                    predicates: vec![],
                }]
            )
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Arithmetic(
                Box::new(Expr::Number(1.0)),
                ArithmeticOp::Add,
                Box::new(Expr::Arithmetic(
                    Box::new(Expr::Number(2.0)),
                    ArithmeticOp::Multiply,
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            parse("count(a)").unwrap(),
            Expr::FunctionCall(
                Function::Count,
                vec![Expr::Path(PathStart::Context, vec![child("a")])]
            )
        );
    }

    #[test]
    fn test_filter_path() {
        assert_eq!(
            parse("$x/a").unwrap(),
            Expr::Path(
                PathStart::Filter(Box::new(Expr::Variable("x".to_string()))),
                vec![child("a")]
            )
        );
    }

    #[test]
    fn test_kind_tests() {
        let expr = parse("processing-instruction('x')").unwrap();
        assert_eq!(
            expr,
            Expr::Path(
                PathStart::Context,
                vec![Step {
                    axis: Axis::Child,
                    test: NodeTest::Kind(KindTest::ProcessingInstruction(Some("x".to_string()))),
                    predicates: vec![],
                }]
            )
        );
        assert!(parse("text()").is_ok());
        assert!(parse("comment()").is_ok());
        assert!(parse("node()").is_ok());
    }

    #[test]
    fn test_element_named_like_node_type() {
        assert_eq!(
            parse("text").unwrap(),
            Expr::Path(PathStart::Context, vec![child("text")])
        );
    }

    #[test]
    fn test_all_axes() {
        for axis in [
            "ancestor",
            "ancestor-or-self",
            "attribute",
            "child",
            "descendant",
            "descendant-or-self",
            "following",
            "following-sibling",
            "namespace",
            "parent",
            "preceding",
            "preceding-sibling",
            "self",
        ] {
            assert!(parse(&format!("{}::node()", axis)).is_ok(), "{}", axis);
        }
    }

    #[test]
    fn test_unknown_axis() {
        assert!(matches!(
            parse("sideways::a"),
            Err(Error::Syntax { span, .. }) if span == (0..8)
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            parse("1 + frob()"),
            Err(Error::UnknownFunction("frob".to_string()))
        );
        assert_eq!(
            parse("ex:frob()"),
            Err(Error::UnknownFunction("ex:frob".to_string()))
        );
    }

    #[test]
    fn test_arity_error() {
        assert_eq!(
            parse("count()"),
            Err(Error::Arity {
                name: "count".to_string(),
                found: 0
            })
        );
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(matches!(
            parse("a b"),
            Err(Error::Syntax { span, .. }) if span == (2..3)
        ));
    }

    #[test]
    fn test_unbalanced() {
        assert!(parse("(1").is_err());
        assert!(parse("a[1").is_err());
        assert!(parse("").is_err());
        assert!(parse("/a/").is_err());
    }
}
