use std::fmt;

use ahash::{HashMap, HashMapExt};
use xot::{Node, Xot};

/// The kind of a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Attribute,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Attribute => "attribute",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
            NodeKind::Namespace => "namespace",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed XML tree that is never modified again.
///
/// The tree owns its [`Xot`] arena. On construction every node reachable
/// from the root (attribute and namespace nodes included) is numbered in
/// pre-order, so that node-sets can be put in document order without walking
/// the tree again. The namespace nodes of each element are collected in the
/// same pass.
pub struct Tree {
    xot: Xot,
    root: Node,
    order: HashMap<Node, usize>,
    declarations: HashMap<Node, Vec<Node>>,
}

impl Tree {
    pub fn new(xot: Xot, root: Node) -> Self {
        let mut order = HashMap::new();
        let mut declarations: HashMap<Node, Vec<Node>> = HashMap::new();
        for (i, node) in xot.all_descendants(root).enumerate() {
            order.insert(node, i);
            if let (xot::Value::Namespace(_), Some(parent)) = (xot.value(node), xot.parent(node)) {
                declarations.entry(parent).or_default().push(node);
            }
        }
        Tree {
            xot,
            root,
            order,
            declarations,
        }
    }

    #[inline]
    pub fn xot(&self) -> &Xot {
        &self.xot
    }

    #[inline]
    pub fn root(&self) -> Node {
        self.root
    }

    /// The pre-order position of `node`. Nodes that don't belong to this
    /// tree sort last.
    #[inline]
    pub fn order(&self, node: Node) -> usize {
        self.order.get(&node).copied().unwrap_or(usize::MAX)
    }

    pub fn contains(&self, node: Node) -> bool {
        self.order.contains_key(&node)
    }

    /// Put nodes in document order and drop duplicates.
    pub fn sort(&self, nodes: &mut Vec<Node>) {
        nodes.sort_by_key(|node| self.order(*node));
        nodes.dedup();
    }

    pub fn kind(&self, node: Node) -> NodeKind {
        match self.xot.value(node) {
            xot::Value::Document => NodeKind::Document,
            xot::Value::Element(_) => NodeKind::Element,
            xot::Value::Text(_) => NodeKind::Text,
            xot::Value::Attribute(_) => NodeKind::Attribute,
            xot::Value::Comment(_) => NodeKind::Comment,
            xot::Value::ProcessingInstruction(_) => NodeKind::ProcessingInstruction,
            xot::Value::Namespace(_) => NodeKind::Namespace,
        }
    }

    /// The topmost ancestor of `node`, which is what `/` selects.
    pub fn top(&self, node: Node) -> Node {
        let mut top = node;
        while let Some(parent) = self.xot.parent(top) {
            top = parent;
        }
        top
    }

    /// The XPath string-value of a node.
    pub fn string_value(&self, node: Node) -> String {
        match self.xot.value(node) {
            xot::Value::Document | xot::Value::Element(_) => self
                .xot
                .descendants(node)
                .filter_map(|descendant| self.xot.text_str(descendant))
                .collect(),
            xot::Value::Text(text) => text.get().to_string(),
            xot::Value::Comment(comment) => comment.get().to_string(),
            xot::Value::ProcessingInstruction(pi) => pi.data().unwrap_or("").to_string(),
            xot::Value::Attribute(attribute) => attribute.value().to_string(),
            xot::Value::Namespace(namespace) => {
                self.xot.namespace_str(namespace.namespace()).to_string()
            }
        }
    }

    /// The expanded name of a node as `(local name, namespace URI)`.
    ///
    /// The URI is empty for names in no namespace. Processing instructions
    /// are named by their target and namespace nodes by their prefix. Other
    /// node kinds have no name.
    pub fn expanded_name(&self, node: Node) -> Option<(&str, &str)> {
        match self.xot.value(node) {
            xot::Value::Element(element) => Some(self.xot.name_ns_str(element.name())),
            xot::Value::Attribute(attribute) => Some(self.xot.name_ns_str(attribute.name())),
            xot::Value::ProcessingInstruction(pi) => Some((self.xot.name_ns_str(pi.target()).0, "")),
            xot::Value::Namespace(namespace) => Some((self.xot.prefix_str(namespace.prefix()), "")),
            _ => None,
        }
    }

    /// The name of a node as it was written, `prefix:local` or `local`.
    pub fn qualified_name(&self, node: Node) -> String {
        let (name_id, scope) = match self.xot.value(node) {
            xot::Value::Element(element) => (element.name(), node),
            xot::Value::Attribute(attribute) => {
                (attribute.name(), self.xot.parent(node).unwrap_or(node))
            }
            _ => {
                return self
                    .expanded_name(node)
                    .map(|(local, _)| local.to_string())
                    .unwrap_or_default()
            }
        };
        let (local, uri) = self.xot.name_ns_str(name_id);
        if uri.is_empty() {
            return local.to_string();
        }
        let namespace = self.xot.namespace_for_name(name_id);
        match self.xot.prefix_for_namespace(scope, namespace) {
            Some(prefix) => {
                let prefix = self.xot.prefix_str(prefix);
                if prefix.is_empty() {
                    local.to_string()
                } else {
                    format!("{}:{}", prefix, local)
                }
            }
            None => local.to_string(),
        }
    }

    /// The namespace nodes in scope for an element, innermost declaration
    /// first per prefix.
    pub fn namespace_nodes(&self, node: Node) -> Vec<Node> {
        if !self.xot.is_element(node) {
            return Vec::new();
        }
        let mut seen = Vec::new();
        let mut nodes = Vec::new();
        let mut current = Some(node);
        while let Some(element) = current {
            let declared = self.declarations.get(&element).map(Vec::as_slice);
            for child in declared.unwrap_or_default() {
                if let xot::Value::Namespace(namespace) = self.xot.value(*child) {
                    if !seen.contains(&namespace.prefix()) {
                        seen.push(namespace.prefix());
                        nodes.push(*child);
                    }
                }
            }
            current = self.xot.parent(element).filter(|parent| self.xot.is_element(*parent));
        }
        nodes
    }

    /// An identifier that is unique per node within this tree.
    pub fn generate_id(&self, node: Node) -> String {
        // must be a valid XML name, so it starts with a letter
        format!("n{}", self.order(node))
    }

    pub fn into_inner(self) -> (Xot, Node) {
        (self.xot, self.root)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("nodes", &self.order.len())
            .finish()
    }
}

/// Serializes the tree as XML, without an XML declaration.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.xot.to_string(self.root).map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}
