use std::fmt;
use std::ops::Index;

use crate::document::Document;
use crate::error::Error;

/// Where a [`ResultList`] came from: the document that was queried and the
/// query text.
#[derive(Clone)]
pub struct Provenance {
    source: Document,
    query: String,
}

impl Provenance {
    pub(crate) fn new(source: Document, query: &str) -> Self {
        Provenance {
            source,
            query: query.to_string(),
        }
    }

    pub fn source(&self) -> &Document {
        &self.source
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// An error for a caller that expected exactly one item but got `found`.
    pub fn cardinality(&self, found: usize) -> Error {
        let document = self
            .source
            .render()
            .unwrap_or_else(|_| format!("{:?}", self.source));
        Error::Cardinality {
            found,
            query: self.query.clone(),
            document,
        }
    }
}

impl fmt::Debug for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provenance")
            .field("query", &self.query)
            .field("source", &self.source)
            .finish()
    }
}

/// The results of a query, in document order.
///
/// The list is read-only. It remembers its [`Provenance`] so that callers
/// can produce a useful message when the results aren't what they expected.
/// Equality compares the items only.
#[derive(Clone)]
pub struct ResultList<T> {
    items: Vec<T>,
    provenance: Provenance,
}

impl<T> ResultList<T> {
    pub(crate) fn new(items: Vec<T>, provenance: Provenance) -> Self {
        ResultList { items, provenance }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> ResultList<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

impl<T> Index<usize> for ResultList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IntoIterator for ResultList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq> PartialEq for ResultList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for ResultList<T> {}

impl<T: fmt::Debug> fmt::Debug for ResultList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultList")
            .field("query", &self.provenance.query)
            .field("items", &self.items)
            .finish()
    }
}
