use std::fmt;
use std::sync::{Arc, LazyLock};

use ahash::{HashMap, HashMapExt};

use crate::name::Error;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

const STATIC_NAMESPACES: [(&str, &str); 5] = [
    ("xhtml", XHTML_NAMESPACE),
    ("xs", XS_NAMESPACE),
    ("xsi", XSI_NAMESPACE),
    ("xsl", XSL_NAMESPACE),
    ("svg", SVG_NAMESPACE),
];

// Built once per process and shared by every context that starts from the
// defaults.
static DEFAULT: LazyLock<NamespaceContext> = LazyLock::new(|| {
    STATIC_NAMESPACES
        .into_iter()
        .fold(NamespaceContext::empty(), |context, (prefix, uri)| {
            context.add(prefix, uri)
        })
});

/// Something that can resolve a namespace prefix to a namespace URI.
///
/// This is the callback XPath evaluation uses to resolve `prefix:name`
/// tests.
pub trait NamespaceLookup {
    fn by_prefix(&self, prefix: &str) -> Option<&str>;
}

impl<T: NamespaceLookup + ?Sized> NamespaceLookup for &T {
    fn by_prefix(&self, prefix: &str) -> Option<&str> {
        (**self).by_prefix(prefix)
    }
}

impl NamespaceLookup for HashMap<String, String> {
    fn by_prefix(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(String::as_str)
    }
}

/// An immutable mapping from namespace prefixes to namespace URIs.
///
/// A context is a chain of shared layers. Deriving a new context with
/// [`NamespaceContext::add`] or [`NamespaceContext::merge`] pushes a single
/// layer in front of the existing chain, so it costs O(1) and never changes
/// the context it was derived from. Lookups walk the chain front to back;
/// the first layer that knows a prefix wins.
///
/// Cloning is cheap: it's a reference count bump.
#[derive(Clone)]
pub struct NamespaceContext {
    head: Option<Arc<Layer>>,
}

struct Layer {
    scope: Scope,
    next: Option<Arc<Layer>>,
}

enum Scope {
    Binding { prefix: String, uri: String },
    Merged(NamespaceContext),
}

impl NamespaceContext {
    /// A context without any bindings.
    pub fn empty() -> Self {
        Self { head: None }
    }

    /// Return a new context where `prefix` is bound to `uri`.
    ///
    /// Any earlier binding for `prefix` is shadowed in the new context. The
    /// current context is left untouched.
    ///
    /// `prefix` must be non-empty and free of colons; use
    /// [`NamespaceContext::try_add`] for prefixes that come from outside.
    pub fn add(&self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(is_prefix(&prefix), "invalid namespace prefix {prefix:?}");
        self.push(Scope::Binding {
            prefix,
            uri: uri.into(),
        })
    }

    /// Like [`NamespaceContext::add`], but rejects an empty prefix or one
    /// containing a colon.
    pub fn try_add(&self, prefix: &str, uri: impl Into<String>) -> Result<Self, Error> {
        if !is_prefix(prefix) {
            return Err(Error::InvalidPrefix(prefix.to_string()));
        }
        Ok(self.add(prefix, uri))
    }

    /// Return a new context containing the bindings of both contexts.
    ///
    /// On a prefix collision the binding in `other` wins.
    pub fn merge(&self, other: &NamespaceContext) -> Self {
        if other.head.is_none() {
            return self.clone();
        }
        self.push(Scope::Merged(other.clone()))
    }

    fn push(&self, scope: Scope) -> Self {
        Self {
            head: Some(Arc::new(Layer {
                scope,
                next: self.head.clone(),
            })),
        }
    }

    /// Look up the namespace URI bound to `prefix`.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            match &current.scope {
                Scope::Binding { prefix: p, uri } if p == prefix => return Some(uri),
                Scope::Binding { .. } => {}
                Scope::Merged(context) => {
                    if let Some(uri) = context.resolve(prefix) {
                        return Some(uri);
                    }
                }
            }
            layer = current.next.as_deref();
        }
        None
    }

    /// The effective bindings, sorted by prefix.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        self.collect(&mut seen);
        let mut bindings = seen.into_iter().collect::<Vec<_>>();
        bindings.sort_unstable();
        bindings
    }

    fn collect<'a>(&'a self, seen: &mut HashMap<&'a str, &'a str>) {
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            match &current.scope {
                Scope::Binding { prefix, uri } => {
                    seen.entry(prefix.as_str()).or_insert(uri.as_str());
                }
                Scope::Merged(context) => context.collect(seen),
            }
            layer = current.next.as_deref();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings().is_empty()
    }
}

fn is_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && !prefix.contains(':') && !prefix.contains(char::is_whitespace)
}

impl Default for NamespaceContext {
    /// The standard context: `xhtml`, `xs`, `xsi`, `xsl` and `svg`.
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl NamespaceLookup for NamespaceContext {
    fn by_prefix(&self, prefix: &str) -> Option<&str> {
        self.resolve(prefix)
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceContext {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(NamespaceContext::empty(), |context, (prefix, uri)| {
                context.add(prefix, uri)
            })
    }
}

impl PartialEq for NamespaceContext {
    fn eq(&self, other: &Self) -> bool {
        self.bindings() == other.bindings()
    }
}

impl Eq for NamespaceContext {}

impl fmt::Debug for NamespaceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.bindings()).finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("xhtml", XHTML_NAMESPACE)]
    #[case("xs", XS_NAMESPACE)]
    #[case("xsi", XSI_NAMESPACE)]
    #[case("xsl", XSL_NAMESPACE)]
    #[case("svg", SVG_NAMESPACE)]
    fn test_default_bindings(#[case] prefix: &str, #[case] uri: &str) {
        assert_eq!(NamespaceContext::default().resolve(prefix), Some(uri));
    }

    #[test]
    fn test_default_has_five_bindings() {
        assert_eq!(NamespaceContext::default().bindings().len(), 5);
    }

    #[test]
    fn test_add_leaves_original_alone() {
        let original = NamespaceContext::default();
        let derived = original.add("ex", "http://example.com");
        assert_eq!(derived.resolve("ex"), Some("http://example.com"));
        assert_eq!(original.resolve("ex"), None);
    }

    #[test]
    fn test_add_rebinds_prefix() {
        let context = NamespaceContext::default().add("xs", "urn:other");
        assert_eq!(context.resolve("xs"), Some("urn:other"));
        assert_eq!(NamespaceContext::default().resolve("xs"), Some(XS_NAMESPACE));
    }

    #[test]
    fn test_merge_other_wins() {
        let left: NamespaceContext = [("a", "urn:left"), ("b", "urn:b")].into_iter().collect();
        let right: NamespaceContext = [("a", "urn:right"), ("c", "urn:c")].into_iter().collect();
        let merged = left.merge(&right);
        assert_eq!(merged.resolve("a"), Some("urn:right"));
        assert_eq!(merged.resolve("b"), Some("urn:b"));
        assert_eq!(merged.resolve("c"), Some("urn:c"));
        assert_eq!(left.resolve("a"), Some("urn:left"));
        assert_eq!(left.resolve("c"), None);
    }

    #[test]
    fn test_add_after_merge_wins() {
        let other: NamespaceContext = [("a", "urn:merged")].into_iter().collect();
        let context = NamespaceContext::empty().merge(&other).add("a", "urn:added");
        assert_eq!(context.resolve("a"), Some("urn:added"));
    }

    #[test]
    fn test_bindings_are_effective_and_sorted() {
        let context = NamespaceContext::empty()
            .add("b", "urn:1")
            .add("a", "urn:2")
            .add("b", "urn:3");
        assert_eq!(context.bindings(), vec![("a", "urn:2"), ("b", "urn:3")]);
    }

    #[test]
    fn test_equality_uses_effective_bindings() {
        let one = NamespaceContext::empty().add("a", "urn:x").add("a", "urn:y");
        let two = NamespaceContext::empty().add("a", "urn:y");
        assert_eq!(one, two);
    }

    #[rstest]
    #[case("")]
    #[case("a:b")]
    #[case("a b")]
    fn test_try_add_rejects_invalid_prefix(#[case] prefix: &str) {
        assert_eq!(
            NamespaceContext::default().try_add(prefix, "urn:x"),
            Err(Error::InvalidPrefix(prefix.to_string()))
        );
    }

    #[test]
    fn test_try_add() {
        let context = NamespaceContext::empty().try_add("p", "urn:p").unwrap();
        assert_eq!(context.resolve("p"), Some("urn:p"));
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let context = NamespaceContext::default();
        assert_eq!(context.merge(&NamespaceContext::empty()), context);
    }
}
