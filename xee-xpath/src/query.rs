use xee_name::NamespaceLookup;
use xot::Node;

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::eval::{self, Context, Focus};
use crate::parser::parse;
use crate::tree::{NodeKind, Tree};
use crate::value::Value;

/// A compiled XPath 1.0 expression.
///
/// Compiling checks the grammar, function names and function arities.
/// Namespace prefixes are resolved against the [`NamespaceLookup`] of the
/// [`Context`] before evaluation touches any node, so an unbound prefix fails
/// whatever the tree contains.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(source: &str) -> Result<Self> {
        let expr = parse(source)?;
        Ok(XPath {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.expr
    }

    /// Split a top-level union `a | b | c` into its operands, left to right.
    /// Any other expression is returned as the only branch.
    pub fn branches(&self) -> Vec<XPath> {
        fn collect(expr: &Expr, source: &str, branches: &mut Vec<XPath>) {
            match expr {
                Expr::Union(left, right) => {
                    collect(left, source, branches);
                    collect(right, source, branches);
                }
                other => branches.push(XPath {
                    source: source.to_string(),
                    expr: other.clone(),
                }),
            }
        }
        let mut branches = Vec::new();
        collect(&self.expr, &self.source, &mut branches);
        branches
    }

    /// Evaluate with `node` as the context node.
    pub fn evaluate(&self, context: &Context, node: Node) -> Result<Value> {
        self.evaluate_with_focus(context, Focus::new(node))
    }

    /// Evaluate with a full focus: context node, position and size.
    pub fn evaluate_with_focus(&self, context: &Context, focus: Focus) -> Result<Value> {
        for prefix in self.expr.prefixes() {
            context.resolve_prefix(prefix)?;
        }
        let context = match context.current {
            Some(_) => *context,
            None => context.with_current(focus.node),
        };
        eval::evaluate(&self.expr, &context, &focus)
    }

    /// Evaluate and require a node-set, returned in document order.
    pub fn select(&self, context: &Context, node: Node) -> Result<Vec<Node>> {
        match self.evaluate(context, node)? {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::NotANodeSet(other.type_name())),
        }
    }
}

/// A node selected by a query, together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchedNode {
    pub node: Node,
    pub kind: NodeKind,
}

/// Compile `expr` and evaluate it against `node`.
///
/// This is the entry point for callers that want nodes back: the expression
/// must produce a node-set. An empty node-set is a valid result.
pub fn evaluate(
    expr: &str,
    tree: &Tree,
    node: Node,
    namespaces: &dyn NamespaceLookup,
) -> Result<Vec<MatchedNode>> {
    let xpath = XPath::compile(expr)?;
    let context = Context::new(tree, namespaces);
    let nodes = xpath.select(&context, node)?;
    tracing::trace!(expr, matched = nodes.len(), "evaluated query");
    Ok(nodes
        .into_iter()
        .map(|node| MatchedNode {
            node,
            kind: tree.kind(node),
        })
        .collect())
}
