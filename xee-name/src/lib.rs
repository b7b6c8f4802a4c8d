//! Names and namespace contexts.
//!
//! [`NamespaceContext`] is the immutable prefix to URI mapping that XPath
//! queries are resolved against. [`Name`] is an owned, expanded XML name.
mod name;
mod namespaces;

pub use name::{Error, Name};
pub use namespaces::{
    NamespaceContext, NamespaceLookup, SVG_NAMESPACE, XHTML_NAMESPACE, XML_NAMESPACE,
    XSI_NAMESPACE, XSL_NAMESPACE, XS_NAMESPACE,
};
