/// A byte range into the XPath expression text.
pub type Span = std::ops::Range<usize>;

/// An error raised while compiling or evaluating an XPath expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The expression is not a valid instance of the XPath 1.0 grammar.
    #[error("{message} at position {}", .span.start)]
    Syntax { message: String, span: Span },
    #[error("no namespace is bound to prefix '{0}'")]
    UnboundPrefix(String),
    #[error("unknown function {0}()")]
    UnknownFunction(String),
    #[error("function {name}() cannot be called with {found} argument(s)")]
    Arity { name: String, found: usize },
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    #[error("type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },
    /// The expression was evaluated where a node-set was required, but it
    /// produced some other kind of value.
    #[error("expression does not select nodes, it returns a {0}")]
    NotANodeSet(&'static str),
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>, span: Span) -> Self {
        Error::Syntax {
            message: message.into(),
            span,
        }
    }

    /// The location of the error in the expression text, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Syntax { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
