use xot::Xot;

use crate::namespaces::{NamespaceLookup, XML_NAMESPACE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no namespace is bound to prefix '{0}'")]
    UnknownPrefix(String),
    #[error("'{0}' is not a valid qualified name")]
    InvalidQName(String),
    #[error("'{0}' is not a valid namespace prefix")]
    InvalidPrefix(String),
}

/// An expanded XML name: a local name with an optional namespace.
///
/// The prefix is carried along so that output can reuse it, but it plays no
/// role in equality or hashing.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    name: String,
    prefix: Option<String>,
    namespace: Option<String>,
}

// a custom hasher that ignores the prefix
impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.namespace.hash(state);
    }
}

// and partial eq that ignores the prefix
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.namespace == other.namespace
    }
}

impl Name {
    pub fn new(name: String, namespace: Option<String>, prefix: Option<String>) -> Self {
        Name {
            name,
            namespace,
            prefix,
        }
    }

    pub fn from_xot(name: xot::NameId, xot: &Xot) -> Self {
        let (name, namespace) = xot.name_ns_str(name);
        let namespace = if !namespace.is_empty() {
            Some(namespace.to_string())
        } else {
            None
        };
        Name {
            name: name.to_string(),
            namespace,
            prefix: None,
        }
    }

    /// Resolve a lexical `prefix:local` or `local` name.
    ///
    /// Unprefixed names are in no namespace, which is the rule for attribute
    /// names and for XPath name tests.
    pub fn parse(qname: &str, namespaces: impl NamespaceLookup) -> Result<Self, Error> {
        Self::parse_with_default(qname, namespaces, None)
    }

    /// Resolve a lexical element name.
    ///
    /// Unprefixed names pick up the default namespace (bound to the empty
    /// prefix), if any.
    pub fn parse_element(qname: &str, namespaces: impl NamespaceLookup) -> Result<Self, Error> {
        let default = namespaces.by_prefix("").map(str::to_string);
        Self::parse_with_default(qname, namespaces, default)
    }

    fn parse_with_default(
        qname: &str,
        namespaces: impl NamespaceLookup,
        default: Option<String>,
    ) -> Result<Self, Error> {
        let qname = qname.trim();
        match qname.split_once(':') {
            Some((prefix, local)) => {
                if prefix.is_empty() || local.is_empty() || local.contains(':') {
                    return Err(Error::InvalidQName(qname.to_string()));
                }
                let namespace = if prefix == "xml" {
                    XML_NAMESPACE
                } else {
                    namespaces
                        .by_prefix(prefix)
                        .ok_or_else(|| Error::UnknownPrefix(prefix.to_string()))?
                };
                Ok(Name {
                    name: local.to_string(),
                    namespace: Some(namespace.to_string()),
                    prefix: Some(prefix.to_string()),
                })
            }
            None => {
                if qname.is_empty() {
                    return Err(Error::InvalidQName(qname.to_string()));
                }
                Ok(Name {
                    name: qname.to_string(),
                    namespace: default.filter(|uri| !uri.is_empty()),
                    prefix: None,
                })
            }
        }
    }

    pub fn unprefixed(name: &str) -> Self {
        Name {
            name: name.to_string(),
            namespace: None,
            prefix: None,
        }
    }

    pub fn uri_qualified(uri: &str, name: &str) -> Self {
        Name {
            name: name.to_string(),
            namespace: Some(uri.to_string()),
            prefix: None,
        }
    }

    pub fn with_prefix(self, prefix: Option<String>) -> Self {
        Name { prefix, ..self }
    }

    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.name
    }

    pub fn to_full_name(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn add_name_id(&self, xot: &mut Xot) -> xot::NameId {
        if let Some(namespace) = &self.namespace {
            let ns = xot.add_namespace(namespace);
            xot.add_name_ns(&self.name, ns)
        } else {
            xot.add_name(&self.name)
        }
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::unprefixed(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::NamespaceContext;

    use super::*;

    #[test]
    fn test_parse_prefixed() {
        let context = NamespaceContext::empty().add("ex", "urn:ex");
        let name = Name::parse("ex:item", &context).unwrap();
        assert_eq!(name.local_name(), "item");
        assert_eq!(name.namespace(), Some("urn:ex"));
        assert_eq!(name.to_full_name(), "ex:item");
    }

    #[test]
    fn test_parse_unknown_prefix() {
        let context = NamespaceContext::empty();
        assert_eq!(
            Name::parse("ex:item", &context),
            Err(Error::UnknownPrefix("ex".to_string()))
        );
    }

    #[test]
    fn test_parse_unprefixed_ignores_default() {
        // the default namespace lives under the empty prefix in the lookups
        // XSLT builds from stylesheet declarations
        let context = [(String::new(), "urn:default".to_string())]
            .into_iter()
            .collect::<ahash::HashMap<String, String>>();
        let name = Name::parse("item", &context).unwrap();
        assert_eq!(name.namespace(), None);
        let name = Name::parse_element("item", &context).unwrap();
        assert_eq!(name.namespace(), Some("urn:default"));
    }

    #[test]
    fn test_parse_xml_prefix() {
        let name = Name::parse("xml:lang", NamespaceContext::empty()).unwrap();
        assert_eq!(name.namespace(), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Name::parse("a:b:c", NamespaceContext::default()).is_err());
        assert!(Name::parse("", NamespaceContext::default()).is_err());
    }

    #[test]
    fn test_equality_ignores_prefix() {
        let a = Name::uri_qualified("urn:x", "a").with_prefix(Some("p".to_string()));
        let b = Name::uri_qualified("urn:x", "a").with_prefix(Some("q".to_string()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_name_id_round_trip() {
        let mut xot = Xot::new();
        let name = Name::uri_qualified("urn:x", "a");
        let name_id = name.add_name_id(&mut xot);
        assert_eq!(Name::from_xot(name_id, &xot), name);
    }
}
