use thiserror::Error;
use xee_xpath::NodeKind;

#[derive(Debug, Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("not well-formed XML: {0}")]
    Parse(String),
    /// The XPath expression could not be compiled or evaluated.
    #[error("invalid XPath query '{query}': {source}")]
    Query {
        query: String,
        #[source]
        source: xee_xpath::Error,
    },
    /// A string query matched a node that has no string value to extract.
    #[error("only text and attribute nodes are retrievable with query '{query}', found {kind}")]
    Type { query: String, kind: NodeKind },
    #[error("transformation failed: {0}")]
    Transform(#[from] xee_xslt::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Raised by callers that expected a query to produce exactly one item.
    #[error("expected exactly one item, found {found}, from query '{query}' on {document}")]
    Cardinality {
        found: usize,
        query: String,
        document: String,
    },
    #[error("cannot render: {0}")]
    Render(#[from] xot::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
