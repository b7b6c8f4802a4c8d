use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use xee_name::NamespaceContext;
use xee_xpath::{NodeKind, Tree};
use xee_xslt::{Parameters, Stylesheet};
use xot::{Node, Value, Xot};

use crate::equality::{deep_equal, deep_hash};
use crate::error::{Error, Result};
use crate::result::{Provenance, ResultList};

/// An immutable XML document, or a node within one.
///
/// A `Document` is a handle: a shared [`Tree`] plus the node it refers to and
/// the [`NamespaceContext`] queries are resolved against. The tree is never
/// modified after parsing, so documents can be cloned cheaply and shared
/// between threads. Operations that would change something (registering a
/// namespace, transforming) return a new `Document` instead.
///
/// Two documents are equal when the nodes they refer to are structurally
/// equal; the namespace context doesn't take part.
#[derive(Clone)]
pub struct Document {
    tree: Arc<Tree>,
    node: Node,
    namespaces: NamespaceContext,
}

/// A read-only view on the node a [`Document`] refers to.
#[derive(Debug, Clone, Copy)]
pub struct DocumentNode<'a> {
    tree: &'a Tree,
    node: Node,
}

impl<'a> DocumentNode<'a> {
    pub fn xot(&self) -> &'a Xot {
        self.tree.xot()
    }

    pub fn node(&self) -> Node {
        self.node
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.node)
    }

    /// The XPath string-value of the node.
    pub fn value(&self) -> String {
        self.tree.string_value(self.node)
    }

    /// The expanded name as `(local name, namespace URI)`, if the node has one.
    pub fn name(&self) -> Option<(&'a str, &'a str)> {
        self.tree.expanded_name(self.node)
    }
}

impl Document {
    /// Parse XML text into a document with the default namespace context.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut xot = Xot::new();
        let root = xot.parse(text).map_err(|e| Error::Parse(e.to_string()))?;
        tracing::debug!(bytes = text.len(), "parsed document");
        Ok(Self::from_tree(xot, root))
    }

    /// Adopt an arena that was built elsewhere, referring to `node`.
    ///
    /// The arena is frozen: it can't be modified once it's part of a
    /// document.
    pub fn from_tree(xot: Xot, node: Node) -> Self {
        let root = top(&xot, node);
        Self::new(Arc::new(Tree::new(xot, root)), node, NamespaceContext::default())
    }

    fn new(tree: Arc<Tree>, node: Node, namespaces: NamespaceContext) -> Self {
        Document {
            tree,
            node,
            namespaces,
        }
    }

    fn derive(&self, node: Node) -> Self {
        Self::new(self.tree.clone(), node, self.namespaces.clone())
    }

    pub fn node(&self) -> DocumentNode<'_> {
        DocumentNode {
            tree: &self.tree,
            node: self.node,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.node)
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Serialize the node as XML.
    ///
    /// Document and element nodes serialize as markup. A text node renders
    /// as its escaped text and an attribute as `name="value"`.
    pub fn render(&self) -> Result<String> {
        let xot = self.tree.xot();
        match xot.value(self.node) {
            Value::Text(text) => Ok(escape(text.get(), false)),
            Value::Attribute(attribute) => Ok(format!(
                "{}=\"{}\"",
                self.tree.qualified_name(self.node),
                escape(&attribute.value()[..], true)
            )),
            Value::Namespace(namespace) => {
                let prefix = xot.prefix_str(namespace.prefix());
                let uri = escape(xot.namespace_str(namespace.namespace()), true);
                if prefix.is_empty() {
                    Ok(format!("xmlns=\"{}\"", uri))
                } else {
                    Ok(format!("xmlns:{}=\"{}\"", prefix, uri))
                }
            }
            _ => Ok(xot.to_string(self.node)?),
        }
    }

    /// Evaluate `expr` and return the string values of the matched nodes.
    ///
    /// Only text and attribute nodes can be retrieved this way; use
    /// [`Document::nodes`] for anything else.
    pub fn query(&self, expr: &str) -> Result<ResultList<String>> {
        let matched = self.evaluate(expr)?;
        let items = matched
            .into_iter()
            .map(|matched| match matched.kind {
                NodeKind::Text | NodeKind::Attribute => Ok(self.tree.string_value(matched.node)),
                kind => Err(Error::Type {
                    query: expr.to_string(),
                    kind,
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultList::new(items, self.provenance(expr)))
    }

    /// Evaluate `expr` and wrap every matched node as a document.
    ///
    /// The results share this document's tree and namespace context.
    pub fn nodes(&self, expr: &str) -> Result<ResultList<Document>> {
        let items = self
            .evaluate(expr)?
            .into_iter()
            .map(|matched| self.derive(matched.node))
            .collect();
        Ok(ResultList::new(items, self.provenance(expr)))
    }

    /// Evaluate `expr`, requiring exactly one text or attribute result.
    pub fn value(&self, expr: &str) -> Result<String> {
        let list = self.query(expr)?;
        if list.len() != 1 {
            return Err(list.provenance().cardinality(list.len()));
        }
        Ok(list.into_iter().next().unwrap_or_default())
    }

    fn evaluate(&self, expr: &str) -> Result<Vec<xee_xpath::MatchedNode>> {
        let matched = xee_xpath::evaluate(expr, &self.tree, self.node, &self.namespaces)
            .map_err(|source| Error::Query {
                query: expr.to_string(),
                source,
            })?;
        tracing::debug!(query = expr, matched = matched.len(), "queried document");
        Ok(matched)
    }

    fn provenance(&self, expr: &str) -> Provenance {
        Provenance::new(self.clone(), expr)
    }

    /// A new document over the same tree with `prefix` bound to `uri`.
    pub fn register_namespace(&self, prefix: &str, uri: &str) -> Document {
        tracing::debug!(prefix, uri, "registered namespace");
        Self::new(self.tree.clone(), self.node, self.namespaces.add(prefix, uri))
    }

    /// A new document over the same tree, with `context` merged into the
    /// namespace context. Bindings in `context` win.
    pub fn merge_namespaces(&self, context: &NamespaceContext) -> Document {
        tracing::debug!(?context, "merged namespaces");
        Self::new(self.tree.clone(), self.node, self.namespaces.merge(context))
    }

    /// Compile `stylesheet` and apply it to this node.
    pub fn transform(&self, stylesheet: &str) -> Result<Document> {
        self.transform_with(stylesheet, &Parameters::default())
    }

    /// Like [`Document::transform`], passing values for top-level
    /// `xsl:param` declarations.
    pub fn transform_with(&self, stylesheet: &str, parameters: &Parameters) -> Result<Document> {
        let stylesheet = xee_xslt::compile(stylesheet)?;
        self.apply_stylesheet(&stylesheet, parameters)
    }

    /// Apply an already compiled stylesheet to this node.
    ///
    /// The output is a new tree; the namespace context carries over.
    pub fn apply_stylesheet(
        &self,
        stylesheet: &Stylesheet,
        parameters: &Parameters,
    ) -> Result<Document> {
        let output = stylesheet.apply(&self.tree, self.node, parameters)?;
        tracing::debug!(kind = %self.kind(), "transformed document");
        let root = output.root();
        Ok(Self::new(Arc::new(output), root, self.namespaces.clone()))
    }
}

fn top(xot: &Xot, node: Node) -> Node {
    let mut top = node;
    while let Some(parent) = xot.parent(top) {
        top = parent;
    }
    top
}

fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Document::from_text(s)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render().map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("kind", &self.kind())
            .field("node", &self.node)
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self.tree.xot(), self.node, other.tree.xot(), other.node)
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        deep_hash(self.tree.xot(), self.node, state)
    }
}
