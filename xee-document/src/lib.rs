//! Immutable XML documents with XPath queries and XSLT transformations.
//!
//! A [`Document`] is parsed once and never changes afterwards. Queries
//! return a [`ResultList`], either of strings ([`Document::query`]) or of
//! documents that point into the same tree ([`Document::nodes`]).
//! Registering a namespace or transforming produces a new document and
//! leaves the old one as it was, so a document can be shared freely between
//! threads.
//!
//! ```
//! use xee_document::Document;
//!
//! let document = Document::from_text(r#"<r id="5"><a>1</a><a>2</a></r>"#)?;
//! assert_eq!(document.query("//a/text()")?.to_vec(), vec!["1", "2"]);
//! assert_eq!(document.value("/r/@id")?, "5");
//! # Ok::<(), xee_document::Error>(())
//! ```
mod document;
mod equality;
mod error;
mod result;
mod source;

pub use document::{Document, DocumentNode};
pub use error::{Error, Result};
pub use result::{Provenance, ResultList};

pub use xee_name::NamespaceContext;
pub use xee_xpath::NodeKind;
pub use xee_xslt::{Parameters, Stylesheet};
