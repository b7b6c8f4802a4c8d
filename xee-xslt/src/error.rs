use thiserror::Error;

/// Something went wrong compiling or applying a stylesheet.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not well-formed: {0}")]
    Parse(String),
    #[error("<xsl:{element}> requires a {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("<xsl:{element}> must contain <xsl:{child}>")]
    MissingChild {
        element: &'static str,
        child: &'static str,
    },
    #[error("<{0}> is not a stylesheet: a literal result element used as one needs xsl:version")]
    NotAStylesheet(String),
    #[error("unexpected element <{0}>")]
    UnexpectedElement(String),
    #[error("<xsl:{0}> is not supported")]
    Unsupported(String),
    #[error("invalid value {value:?} for attribute {attribute}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },
    #[error("{0:?} is not a valid pattern")]
    InvalidPattern(String),
    #[error("unbalanced curly braces in attribute value template {0:?}")]
    ValueTemplate(String),
    #[error("in expression {expr:?}: {source}")]
    XPath {
        expr: String,
        #[source]
        source: xee_xpath::Error,
    },
    #[error(transparent)]
    Name(#[from] xee_name::Error),
    #[error("no template named {0}")]
    UnknownTemplate(String),
    #[error("terminated by xsl:message: {0}")]
    Terminated(String),
    #[error("cannot construct output: {0}")]
    Output(#[from] xot::Error),
}

impl Error {
    /// Attach the expression text to an XPath error.
    pub(crate) fn xpath(expr: &str) -> impl FnOnce(xee_xpath::Error) -> Error + '_ {
        move |source| Error::XPath {
            expr: expr.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
